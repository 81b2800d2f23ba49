//! Recursive-descent, shift/reduce parser
//!
//! ```text
//! feature            := FEATURE_START scenarioPartList END_OF_FILE
//! scenarioPartList   := ε | scenarioPart scenarioPartList
//! scenarioPart       := scenario | scenarioOutline
//! scenario           := SCENARIO_START stepList
//! scenarioOutline    := SCENARIO_OUTLINE_START stepList EXAMPLES_START dataTable
//! stepList           := ε | STEP stepList
//! dataTable          := dataHeaderLine dataValuesLineList
//! dataHeaderLine     := DATA_LINE
//! dataValuesLineList := ε | DATA_LINE dataValuesLineList
//! ```
//!
//! Each rule is a function taking the lexer and the token stack. A rule
//! leaves exactly one token on the stack: the non-terminal it recognised.

use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{ParseToken, TokenType};

/// Token stack shared by the rule functions
pub type Stack = Vec<ParseToken>;

/// Result alias for grammar rules
pub type ParseResult<T> = Result<T, ParseError>;

/// Push a token
pub fn shift(stack: &mut Stack, token: ParseToken) {
    stack.push(token);
}

/// Pop `n` tokens as the children of `parent` and push `parent`
///
/// A parent with children takes its line and text from the first child.
/// An empty reduction keeps the parent's own line and text.
pub fn reduce(stack: &mut Stack, n: usize, mut parent: ParseToken) {
    let children = stack.split_off(stack.len().saturating_sub(n));
    if let Some(first) = children.first() {
        parent.line = first.line;
        parent.text.clone_from(&first.text);
    }
    parent.children = children;
    stack.push(parent);
}

fn unexpected(token: &ParseToken, expected: &str) -> ParseError {
    ParseError::UnexpectedToken {
        found: token.kind,
        text: token.text.clone(),
        line: token.line,
        expected: expected.to_string(),
    }
}

fn empty(kind: TokenType, at: &ParseToken) -> ParseToken {
    ParseToken::new(kind, "", at.line)
}

/// Parse feature text into a tree rooted at a `Feature` token
///
/// # Errors
/// The first grammar violation, with its line
pub fn parse(source: &str) -> ParseResult<ParseToken> {
    let mut lexer = Lexer::new(source);
    let mut stack = Stack::new();
    parse_feature(&mut lexer, &mut stack)?;
    match stack.pop() {
        Some(root) => Ok(root),
        None => Err(unexpected(lexer.peek(), "Feature:")),
    }
}

/// `feature := FEATURE_START scenarioPartList END_OF_FILE`
///
/// # Errors
/// Grammar violations
pub fn parse_feature(lexer: &mut Lexer<'_>, stack: &mut Stack) -> ParseResult<()> {
    let start = lexer.next_token();
    if start.kind != TokenType::FeatureStart {
        return Err(unexpected(&start, "Feature:"));
    }
    shift(stack, start);

    parse_scenario_part_list(lexer, stack)?;

    let end = lexer.next_token();
    if end.kind != TokenType::EndOfFile {
        return Err(unexpected(&end, "end of file"));
    }
    shift(stack, end);

    reduce(stack, 3, ParseToken::new(TokenType::Feature, "", 0));
    Ok(())
}

/// `scenarioPartList := ε | scenarioPart scenarioPartList`
///
/// # Errors
/// Grammar violations
pub fn parse_scenario_part_list(lexer: &mut Lexer<'_>, stack: &mut Stack) -> ParseResult<()> {
    // Right recursion unrolled; reductions run innermost first.
    let mut parts = 0;
    loop {
        let next = lexer.peek().clone();
        match next.kind {
            TokenType::ScenarioStart | TokenType::ScenarioOutlineStart => {
                parse_scenario_part(lexer, stack)?;
                parts += 1;
            }
            TokenType::EndOfFile => break,
            TokenType::ExamplesStart => {
                return Err(ParseError::ExamplesOutsideOutline { line: next.line });
            }
            _ => return Err(unexpected(&next, "Scenario: or Scenario Outline:")),
        }
    }

    let end = empty(TokenType::ScenarioPartList, lexer.peek());
    reduce(stack, 0, end);
    for _ in 0..parts {
        // part, list -> list
        reduce(stack, 2, ParseToken::new(TokenType::ScenarioPartList, "", 0));
    }
    Ok(())
}

/// `scenarioPart := scenario | scenarioOutline`
///
/// # Errors
/// Grammar violations
pub fn parse_scenario_part(lexer: &mut Lexer<'_>, stack: &mut Stack) -> ParseResult<()> {
    let next = lexer.peek().clone();
    match next.kind {
        TokenType::ScenarioStart => parse_scenario(lexer, stack)?,
        TokenType::ScenarioOutlineStart => parse_scenario_outline(lexer, stack)?,
        _ => return Err(unexpected(&next, "Scenario: or Scenario Outline:")),
    }
    reduce(stack, 1, ParseToken::new(TokenType::ScenarioPart, "", 0));
    Ok(())
}

/// `scenario := SCENARIO_START stepList`
///
/// # Errors
/// Grammar violations
pub fn parse_scenario(lexer: &mut Lexer<'_>, stack: &mut Stack) -> ParseResult<()> {
    let start = lexer.next_token();
    if start.kind != TokenType::ScenarioStart {
        return Err(unexpected(&start, "Scenario:"));
    }
    shift(stack, start);
    parse_step_list(lexer, stack)?;
    reduce(stack, 2, ParseToken::new(TokenType::Scenario, "", 0));
    Ok(())
}

/// `scenarioOutline := SCENARIO_OUTLINE_START stepList EXAMPLES_START dataTable`
///
/// # Errors
/// `ParseError::OutlineMissingExamples` when the steps are not followed by
/// `Examples:`, and other grammar violations
pub fn parse_scenario_outline(lexer: &mut Lexer<'_>, stack: &mut Stack) -> ParseResult<()> {
    let start = lexer.next_token();
    if start.kind != TokenType::ScenarioOutlineStart {
        return Err(unexpected(&start, "Scenario Outline:"));
    }
    let (name, line) = (start.text.clone(), start.line);
    shift(stack, start);

    parse_step_list(lexer, stack)?;

    let examples = lexer.next_token();
    if examples.kind != TokenType::ExamplesStart {
        return Err(ParseError::OutlineMissingExamples { name, line });
    }
    shift(stack, examples);

    parse_data_table(lexer, stack)?;
    reduce(stack, 4, ParseToken::new(TokenType::ScenarioOutline, "", 0));
    Ok(())
}

/// `stepList := ε | STEP stepList`
///
/// # Errors
/// Never; kept fallible like the other rules
pub fn parse_step_list(lexer: &mut Lexer<'_>, stack: &mut Stack) -> ParseResult<()> {
    let mut steps = 0;
    loop {
        let next = lexer.next_token();
        if next.kind == TokenType::Step {
            shift(stack, next);
            steps += 1;
        } else {
            let list = empty(TokenType::StepList, &next);
            lexer.push_back(next);
            reduce(stack, 0, list);
            break;
        }
    }
    for _ in 0..steps {
        // STEP, list -> list
        reduce(stack, 2, ParseToken::new(TokenType::StepList, "", 0));
    }
    Ok(())
}

/// `dataTable := dataHeaderLine dataValuesLineList`
///
/// # Errors
/// `ParseError::EmptyDataTable` without a header row
pub fn parse_data_table(lexer: &mut Lexer<'_>, stack: &mut Stack) -> ParseResult<()> {
    parse_data_header_line(lexer, stack)?;
    parse_data_values_line_list(lexer, stack)?;
    reduce(stack, 2, ParseToken::new(TokenType::DataTable, "", 0));
    Ok(())
}

/// `dataHeaderLine := DATA_LINE`
///
/// # Errors
/// `ParseError::EmptyDataTable` if the next token is not a data line
pub fn parse_data_header_line(lexer: &mut Lexer<'_>, stack: &mut Stack) -> ParseResult<()> {
    let header = lexer.next_token();
    if header.kind != TokenType::DataLine {
        let line = header.line;
        lexer.push_back(header);
        return Err(ParseError::EmptyDataTable { line });
    }
    shift(stack, header);
    reduce(stack, 1, ParseToken::new(TokenType::DataHeaderLine, "", 0));
    Ok(())
}

/// `dataValuesLineList := ε | DATA_LINE dataValuesLineList`
///
/// # Errors
/// Never; kept fallible like the other rules
pub fn parse_data_values_line_list(lexer: &mut Lexer<'_>, stack: &mut Stack) -> ParseResult<()> {
    let mut rows = 0;
    loop {
        let next = lexer.next_token();
        if next.kind == TokenType::DataLine {
            shift(stack, next);
            rows += 1;
        } else {
            let list = empty(TokenType::DataValuesLineList, &next);
            lexer.push_back(next);
            reduce(stack, 0, list);
            break;
        }
    }
    for _ in 0..rows {
        // DATA_LINE, list -> list
        reduce(stack, 2, ParseToken::new(TokenType::DataValuesLineList, "", 0));
    }
    Ok(())
}
