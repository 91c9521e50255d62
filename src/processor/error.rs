use super::lexer::LexError;
use thiserror::Error;

/// Compile-time fault. Parsing stops at the first one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("syntax error: {0}")]
    Lex(#[from] LexError),

    #[error("syntax error: line {line}: unexpected token '{text}'")]
    UnexpectedToken { text: String, line: usize },

    #[error("syntax error: line {line}: expected ')'")]
    UnmatchedParen { line: usize },

    #[error("syntax error: line {line}: invalid number '{text}'")]
    InvalidNumber { text: String, line: usize },

    #[error("syntax error: line {line}: unknown command: '{name}'")]
    UnknownCommand { name: String, line: usize },

    #[error("syntax error: line {line}: '{name}' expects {expected} arguments, found {found}")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
        line: usize,
    },

    #[error("syntax error: unknown label: '{name}'")]
    UnknownLabel { name: String },

    #[error("syntax error: line {line}: label '{name}' declared twice")]
    DuplicateLabel { name: String, line: usize },

    #[error("syntax error: line {line}: macro '{name}' is missing 'endmacro'")]
    UnterminatedMacro { name: String, line: usize },

    #[error("syntax error: line {line}: expected a name after '{after}'")]
    ExpectedName { after: String, line: usize },

    #[error("syntax error: cannot look {requested} tokens ahead, buffer holds {capacity}")]
    LookaheadOverflow { requested: usize, capacity: usize },
}
