//! Parser that consumes tokens and builds a `Script`.
//!
//! Top level grammar (one node per iteration):
//!
//! ```text
//! node     ::= 'macro' IDENT node* 'endmacro'
//!            | 'const' IDENT expr
//!            | IDENT ':'
//!            | IDENT (expr (',' expr)*)? (NEWLINE | EOF)
//!            | NEWLINE
//! expr     ::= term (('+' | '-') term)*
//! term     ::= primary (('*' | '/' | '%') primary)*
//! primary  ::= ('+' | '-') primary | '(' expr ')' | NUMBER | STRING | IDENT
//! ```

use super::ast::{BinaryOp, Command, Expr, Script, UnaryOp};
use super::error::SyntaxError;
use super::labels;
use super::lexer::{Lexer, Token, TokenKind, TokenSource};
use super::lookahead::{Lookahead, LookaheadConfig};
use crate::model::{CommandType, Registries};
use tracing::{debug, trace};

/// Compile `src` with the default lexer and lookahead settings.
pub fn parse_source(src: &str, registries: &Registries) -> Result<Script, SyntaxError> {
    Parser::new(Lexer::new(src), registries).parse()
}

pub struct Parser<'r, S> {
    tokens: Lookahead<S>,
    registries: &'r Registries,
    root: Script,
    /// Bodies of the macros currently being declared, innermost last.
    macros: Vec<Script>,
}

fn unexpected(tok: &Token) -> SyntaxError {
    let text = match tok.kind {
        TokenKind::Newline => "end of line".to_string(),
        TokenKind::Eof => "end of input".to_string(),
        _ => tok.text.clone(),
    };
    SyntaxError::UnexpectedToken {
        text,
        line: tok.line,
    }
}

impl<'r, S: TokenSource> Parser<'r, S> {
    pub fn new(source: S, registries: &'r Registries) -> Self {
        Self::with_lookahead(source, registries, LookaheadConfig::default())
    }

    pub fn with_lookahead(source: S, registries: &'r Registries, config: LookaheadConfig) -> Self {
        Self {
            tokens: Lookahead::with_config(source, config),
            registries,
            root: Script::new(),
            macros: Vec::new(),
        }
    }

    /// Parse the whole input, then resolve labels on the result.
    pub fn parse(mut self) -> Result<Script, SyntaxError> {
        while self.parse_next_node(TokenKind::Eof)? {}

        let mut script = self.root;
        labels::resolve(&mut script)?;

        debug!(
            commands = script.len(),
            labels = script.labels.len(),
            macros = script.macros.len(),
            "script compiled"
        );
        Ok(script)
    }

    /// Script that receives the next command, label or declaration.
    fn current(&mut self) -> &mut Script {
        match self.macros.last_mut() {
            Some(body) => body,
            None => &mut self.root,
        }
    }

    /// Open macro bodies innermost first, then the root.
    fn scopes(&self) -> impl Iterator<Item = &Script> {
        self.macros.iter().rev().chain(std::iter::once(&self.root))
    }

    /// Returns `false` once the `end` token of the current scope is consumed.
    fn parse_next_node(&mut self, end: TokenKind) -> Result<bool, SyntaxError> {
        let tok = self.tokens.peek(0)?;

        match tok.kind {
            k if k == end => {
                self.tokens.advance()?;
                Ok(false)
            }
            TokenKind::Macro => {
                self.parse_macro()?;
                Ok(true)
            }
            TokenKind::Const => {
                self.parse_const()?;
                Ok(true)
            }
            TokenKind::Ident => {
                self.parse_ident()?;
                Ok(true)
            }
            TokenKind::Newline => {
                self.tokens.advance()?;
                Ok(true)
            }
            _ => Err(unexpected(&tok)),
        }
    }

    fn expect_name(&mut self, after: &str) -> Result<String, SyntaxError> {
        let tok = self.tokens.advance()?;
        match tok.kind {
            TokenKind::Ident => Ok(tok.text),
            _ => Err(SyntaxError::ExpectedName {
                after: after.to_string(),
                line: tok.line,
            }),
        }
    }

    fn parse_macro(&mut self) -> Result<(), SyntaxError> {
        let keyword = self.tokens.advance()?;
        let name = self.expect_name(&keyword.text)?;

        self.macros.push(Script::new());
        loop {
            if self.tokens.peek(0)?.is_end() {
                return Err(SyntaxError::UnterminatedMacro {
                    name,
                    line: keyword.line,
                });
            }
            if !self.parse_next_node(TokenKind::EndMacro)? {
                break;
            }
        }
        let body = self.macros.pop().unwrap_or_default();

        debug!(name = %name, commands = body.len(), "macro declared");
        self.current().macros.insert(name, body);
        Ok(())
    }

    fn parse_const(&mut self) -> Result<(), SyntaxError> {
        let keyword = self.tokens.advance()?;
        let name = self.expect_name(&keyword.text)?;
        let expr = self.parse_expression()?;

        debug!(name = %name, value = %expr, "constant declared");
        self.current().constants.insert(name, expr);
        Ok(())
    }

    fn parse_ident(&mut self) -> Result<(), SyntaxError> {
        if self.tokens.peek(1)?.kind == TokenKind::Colon {
            return self.parse_label_declaration();
        }
        self.parse_command()
    }

    fn parse_label_declaration(&mut self) -> Result<(), SyntaxError> {
        let name = self.tokens.advance()?;
        self.tokens.advance()?;

        let script = self.current();
        if script.labels.contains_key(&name.text) {
            return Err(SyntaxError::DuplicateLabel {
                name: name.text,
                line: name.line,
            });
        }
        let pc = script.pc();
        trace!(name = %name.text, pc, "label declared");
        script.labels.insert(name.text, pc);
        Ok(())
    }

    fn find_macro(&self, name: &str) -> Option<&Script> {
        self.scopes().find_map(|s| s.macro_def(name))
    }

    fn find_constant(&self, name: &str) -> Option<&Expr> {
        self.scopes().find_map(|s| s.constant(name))
    }

    fn parse_command(&mut self) -> Result<(), SyntaxError> {
        // Command under construction and the token that named it.
        let mut cmd: Option<(Command, Token)> = None;

        loop {
            let tok = self.tokens.peek(0)?;

            if matches!(tok.kind, TokenKind::Newline | TokenKind::Eof) {
                if let Some((cmd, head)) = cmd {
                    check_arity(&cmd, &head)?;
                    self.current().push(cmd);
                }
                self.tokens.advance()?;
                return Ok(());
            }

            if cmd.is_none() {
                self.tokens.advance()?;
                if tok.kind != TokenKind::Ident {
                    return Err(unexpected(&tok));
                }

                if let Some(ty) = self.registries.command_type(&tok.text) {
                    if ty != CommandType::NONE {
                        cmd = Some((Command::new(ty, Vec::new()), tok));
                    }
                } else if let Some(body) = self.find_macro(&tok.text).cloned() {
                    trace!(name = %tok.text, commands = body.len(), "macro spliced");
                    labels::splice(self.current(), &body);
                } else {
                    return Err(SyntaxError::UnknownCommand {
                        name: tok.text,
                        line: tok.line,
                    });
                }
                continue;
            }

            let arg = self.parse_expression()?;
            if let Some((cmd, _)) = cmd.as_mut() {
                cmd.args.push(arg);
            }

            let next = self.tokens.peek(0)?;
            match next.kind {
                TokenKind::Comma => {
                    self.tokens.advance()?;
                    let after = self.tokens.peek(0)?;
                    if matches!(after.kind, TokenKind::Newline | TokenKind::Eof) {
                        return Err(unexpected(&after));
                    }
                }
                TokenKind::Newline | TokenKind::Eof => {}
                _ => return Err(unexpected(&next)),
            }
        }
    }

    pub(crate) fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_additive()
    }

    /// Next token as a binary operator of the requested precedence level.
    fn peek_binary(&mut self, multiplicative: bool) -> Result<Option<BinaryOp>, SyntaxError> {
        let tok = self.tokens.peek(0)?;
        if tok.kind != TokenKind::Operator {
            return Ok(None);
        }
        Ok(BinaryOp::from_symbol(&tok.text).filter(|op| op.is_multiplicative() == multiplicative))
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_multiplicative()?;
        while let Some(op) = self.peek_binary(false)? {
            self.tokens.advance()?;
            let right = self.parse_multiplicative()?;
            expr = Expr::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;
        while let Some(op) = self.peek_binary(true)? {
            self.tokens.advance()?;
            let right = self.parse_primary()?;
            expr = Expr::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let tok = self.tokens.advance()?;

        match tok.kind {
            TokenKind::Operator => {
                let op = match tok.text.as_str() {
                    "+" => UnaryOp::Plus,
                    "-" => UnaryOp::Minus,
                    _ => return Err(unexpected(&tok)),
                };
                let operand = self.parse_primary()?;
                Ok(Expr::unary(op, operand))
            }
            TokenKind::LParen => {
                let expr = self.parse_expression()?;
                let close = self.tokens.advance()?;
                if close.kind != TokenKind::RParen {
                    return Err(SyntaxError::UnmatchedParen { line: close.line });
                }
                Ok(expr)
            }
            TokenKind::Number => parse_number(&tok),
            TokenKind::String => Ok(Expr::String(tok.text)),
            TokenKind::Ident => Ok(self.resolve_ident(&tok.text)),
            _ => Err(unexpected(&tok)),
        }
    }

    /// Constants (innermost scope first), then identifiers, variables and
    /// flags. Anything else is taken to be a label.
    fn resolve_ident(&self, name: &str) -> Expr {
        if let Some(expr) = self.find_constant(name) {
            return expr.clone();
        }
        if let Some(h) = self.registries.identifier(name) {
            return Expr::Identifier(h);
        }
        if let Some(h) = self.registries.variable(name) {
            return Expr::Variable(h);
        }
        if let Some(h) = self.registries.flag(name) {
            return Expr::Flag(h);
        }
        Expr::Label(name.to_string())
    }
}

/// Built-in commands take a fixed number of arguments.
fn check_arity(cmd: &Command, head: &Token) -> Result<(), SyntaxError> {
    match cmd.ty.arity() {
        Some(expected) if expected != cmd.args.len() => Err(SyntaxError::ArgumentCount {
            name: head.text.clone(),
            expected,
            found: cmd.args.len(),
            line: head.line,
        }),
        _ => Ok(()),
    }
}

fn parse_number(tok: &Token) -> Result<Expr, SyntaxError> {
    let invalid = || SyntaxError::InvalidNumber {
        text: tok.text.clone(),
        line: tok.line,
    };
    if let Some(hex) = tok.text.strip_prefix("0x") {
        i32::from_str_radix(hex, 16).map(Expr::Integer).map_err(|_| invalid())
    } else if tok.text.contains('.') {
        tok.text.parse::<f64>().map(Expr::Float).map_err(|_| invalid())
    } else {
        tok.text.parse::<i32>().map(Expr::Integer).map_err(|_| invalid())
    }
}
