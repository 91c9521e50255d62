//! Front end: text → tokens → `Script`.
//!
//! The lexer is only the default token source; anything implementing
//! `TokenSource` can feed the parser.
pub mod ast;
pub mod error;
pub mod labels;
pub mod lexer;
pub mod lookahead;
pub mod script_parser;

pub use ast::{BinaryOp, Command, Expr, Script, UnaryOp};
pub use error::SyntaxError;
pub use lexer::{Lexer, Token, TokenKind, TokenSource};
pub use lookahead::LookaheadConfig;
pub use script_parser::{Parser, parse_source};

use crate::model::Registries;

/// Parse and label-resolve one source text.
pub fn compile(
    src: &str,
    registries: &Registries,
    lookahead: LookaheadConfig,
) -> Result<Script, SyntaxError> {
    Parser::with_lookahead(Lexer::new(src), registries, lookahead).parse()
}
