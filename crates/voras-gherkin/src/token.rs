//! Parse tokens
//!
//! Terminals come from the lexer; non-terminals are built by `reduce`.

use std::fmt;

/// Terminal and non-terminal token types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Terminals
    /// `Feature:` line
    FeatureStart,
    /// `Scenario:` line
    ScenarioStart,
    /// `Scenario Outline:` line
    ScenarioOutlineStart,
    /// `Examples:` line
    ExamplesStart,
    /// `|`-prefixed table row
    DataLine,
    /// Any other non-blank, non-comment line
    Step,
    /// End of input
    EndOfFile,

    // Non-terminals
    /// Root
    Feature,
    /// Zero or more scenario parts
    ScenarioPartList,
    /// Scenario or outline
    ScenarioPart,
    /// Plain scenario
    Scenario,
    /// Outline with examples
    ScenarioOutline,
    /// Zero or more steps
    StepList,
    /// Header and value rows
    DataTable,
    /// First table row
    DataHeaderLine,
    /// Zero or more value rows
    DataValuesLineList,
}

impl TokenType {
    /// True for lexer-produced tokens
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::FeatureStart
                | Self::ScenarioStart
                | Self::ScenarioOutlineStart
                | Self::ExamplesStart
                | Self::DataLine
                | Self::Step
                | Self::EndOfFile
        )
    }

    /// Name as written in the grammar
    #[must_use]
    pub fn grammar_name(self) -> &'static str {
        match self {
            Self::FeatureStart => "FEATURE_START",
            Self::ScenarioStart => "SCENARIO_START",
            Self::ScenarioOutlineStart => "SCENARIO_OUTLINE_START",
            Self::ExamplesStart => "EXAMPLES_START",
            Self::DataLine => "DATA_LINE",
            Self::Step => "STEP",
            Self::EndOfFile => "END_OF_FILE",
            Self::Feature => "feature",
            Self::ScenarioPartList => "scenarioPartList",
            Self::ScenarioPart => "scenarioPart",
            Self::Scenario => "scenario",
            Self::ScenarioOutline => "scenarioOutline",
            Self::StepList => "stepList",
            Self::DataTable => "dataTable",
            Self::DataHeaderLine => "dataHeaderLine",
            Self::DataValuesLineList => "dataValuesLineList",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.grammar_name())
    }
}

/// One node of the parse tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseToken {
    /// Token type
    pub kind: TokenType,
    /// Line text with any keyword removed
    pub text: String,
    /// 1-based source line
    pub line: usize,
    /// Children, left to right
    pub children: Vec<ParseToken>,
}

impl ParseToken {
    /// Create leaf token
    pub fn new(kind: TokenType, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            children: Vec::new(),
        }
    }

    /// Children of a given type
    pub fn children_of(&self, kind: TokenType) -> impl Iterator<Item = &ParseToken> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// First child of a given type
    #[must_use]
    pub fn child(&self, kind: TokenType) -> Option<&ParseToken> {
        self.children_of(kind).next()
    }

    /// Terminals of a given type anywhere below this token, in source order
    #[must_use]
    pub fn terminals(&self, kind: TokenType) -> Vec<&ParseToken> {
        let mut out = Vec::new();
        self.collect_terminals(kind, &mut out);
        out
    }

    fn collect_terminals<'a>(&'a self, kind: TokenType, out: &mut Vec<&'a ParseToken>) {
        for child in &self.children {
            if child.kind == kind {
                out.push(child);
            }
            child.collect_terminals(kind, out);
        }
    }
}

impl fmt::Display for ParseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            write!(f, "{} (line {})", self.kind, self.line)
        } else {
            write!(f, "{} '{}' (line {})", self.kind, self.text, self.line)
        }
    }
}
