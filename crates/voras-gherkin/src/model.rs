//! Feature model built from the parse tree

use crate::error::ParseError;
use crate::parser::{self, ParseResult};
use crate::token::{ParseToken, TokenType};
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

/// Step keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepKeyword {
    /// `Given`
    Given,
    /// `When`
    When,
    /// `Then`
    Then,
    /// `And`
    And,
}

impl StepKeyword {
    /// All keywords
    pub const ALL: [Self; 4] = [Self::Given, Self::When, Self::Then, Self::And];

    /// Keyword as written
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
            Self::And => "And",
        }
    }
}

impl fmt::Display for StepKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKeyword {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|k| k.as_str() == s).ok_or(())
    }
}

/// One step line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Leading keyword
    pub keyword: StepKeyword,
    /// Text after the keyword
    pub text: String,
    /// 1-based source line
    pub line: usize,
}

impl Step {
    fn from_token(token: &ParseToken) -> ParseResult<Self> {
        let raw = token.text.trim();
        let (word, rest) = raw.split_once(char::is_whitespace).unwrap_or((raw, ""));
        let keyword = word.parse().map_err(|()| ParseError::UnknownKeyword {
            text: raw.to_string(),
            line: token.line,
        })?;
        Ok(Self {
            keyword,
            text: rest.trim().to_string(),
            line: token.line,
        })
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.keyword, self.text)
    }
}

/// Examples table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTable {
    /// Column names
    pub headers: Vec<String>,
    /// Value rows, each `headers.len()` wide
    pub rows: Vec<Vec<String>>,
}

fn split_cells(line: &str) -> Vec<String> {
    let inner = line.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|c| c.trim().to_string()).collect()
}

impl DataTable {
    fn from_token(token: &ParseToken) -> ParseResult<Self> {
        let lines = token.terminals(TokenType::DataLine);
        let Some((header, values)) = lines.split_first() else {
            return Err(ParseError::EmptyDataTable { line: token.line });
        };
        let headers = split_cells(&header.text);

        let mut rows = Vec::with_capacity(values.len());
        for value in values {
            let cells = split_cells(&value.text);
            if cells.len() != headers.len() {
                return Err(ParseError::RaggedDataRow {
                    line: value.line,
                    expected: headers.len(),
                    found: cells.len(),
                });
            }
            rows.push(cells);
        }
        Ok(Self { headers, rows })
    }

    /// Each row as column name to value
    #[must_use]
    pub fn row_maps(&self) -> Vec<IndexMap<String, String>> {
        self.rows
            .iter()
            .map(|row| self.headers.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }
}

/// A scenario or scenario outline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Name after the keyword
    pub name: String,
    /// 1-based source line
    pub line: usize,
    /// Steps in order
    pub steps: Vec<Step>,
    /// Examples, present only for outlines
    pub examples: Option<DataTable>,
}

impl Scenario {
    /// True for a `Scenario Outline:`
    #[inline]
    #[must_use]
    pub fn is_outline(&self) -> bool {
        self.examples.is_some()
    }

    fn from_token(token: &ParseToken) -> ParseResult<Self> {
        let steps = token
            .terminals(TokenType::Step)
            .into_iter()
            .map(Step::from_token)
            .collect::<ParseResult<Vec<_>>>()?;
        let examples = token
            .child(TokenType::DataTable)
            .map(DataTable::from_token)
            .transpose()?;
        Ok(Self {
            name: token.text.clone(),
            line: token.line,
            steps,
            examples,
        })
    }
}

/// A parsed feature file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    /// Name after `Feature:`
    pub name: String,
    /// Scenarios in source order
    pub scenarios: Vec<Scenario>,
}

impl Feature {
    /// Build from a `Feature` parse tree
    ///
    /// # Errors
    /// Unknown step keywords and ragged data rows
    pub fn from_tree(tree: &ParseToken) -> ParseResult<Self> {
        let mut scenarios = Vec::new();
        collect_scenarios(tree, &mut scenarios)?;
        Ok(Self {
            name: tree.text.clone(),
            scenarios,
        })
    }

    /// Parse feature text
    ///
    /// # Errors
    /// Any [`ParseError`]
    pub fn parse(source: &str) -> ParseResult<Self> {
        Self::from_tree(&parser::parse(source)?)
    }

    /// Total steps across all scenarios
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.scenarios.iter().map(|s| s.steps.len()).sum()
    }
}

fn collect_scenarios(token: &ParseToken, out: &mut Vec<Scenario>) -> ParseResult<()> {
    for child in &token.children {
        match child.kind {
            TokenType::Scenario | TokenType::ScenarioOutline => out.push(Scenario::from_token(child)?),
            _ => collect_scenarios(child, out)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_keyword() {
        let token = ParseToken::new(TokenType::Step, "Then   x is \"y\"", 7);
        let step = Step::from_token(&token).unwrap();
        assert_eq!(step.keyword, StepKeyword::Then);
        assert_eq!(step.text, "x is \"y\"");
        assert_eq!(step.to_string(), "Then x is \"y\"");
    }

    #[test]
    fn rejects_unknown_keyword() {
        let token = ParseToken::new(TokenType::Step, "But nothing", 2);
        assert!(matches!(
            Step::from_token(&token),
            Err(ParseError::UnknownKeyword { line: 2, .. })
        ));
    }

    #[test]
    fn cells_are_trimmed() {
        assert_eq!(split_cells("| a | b  |"), vec!["a", "b"]);
        assert_eq!(split_cells("|x|"), vec!["x"]);
    }

    #[test]
    fn ragged_row_is_rejected() {
        let err = Feature::parse(
            "Feature: F\nScenario Outline: O\nGiven <a>\nExamples:\n| a | b |\n| 1 |\n",
        )
        .unwrap_err();
        assert_eq!(
            err,
            ParseError::RaggedDataRow {
                line: 6,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn row_maps_keep_column_order() {
        let table = DataTable {
            headers: vec!["b".into(), "a".into()],
            rows: vec![vec!["2".into(), "1".into()]],
        };
        let row = &table.row_maps()[0];
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["b", "a"]);
    }
}
