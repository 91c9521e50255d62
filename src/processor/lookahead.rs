//! Bounded token queue sitting between a `TokenSource` and the parser.
//!
//! Tokens are pulled from the source in batches so the parser can look a
//! few tokens ahead (label detection needs one) without consuming them.

use super::error::SyntaxError;
use super::lexer::{Token, TokenSource};
use serde::Deserialize;
use std::collections::VecDeque;

pub const DEFAULT_BATCH: usize = 16;
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LookaheadConfig {
    pub batch: usize,
    pub capacity: usize,
}

impl Default for LookaheadConfig {
    fn default() -> Self {
        Self {
            batch: DEFAULT_BATCH,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

pub struct Lookahead<S> {
    source: S,
    buf: VecDeque<Token>,
    config: LookaheadConfig,
    /// Copy of the end marker once the source has produced it.
    end: Option<Token>,
}

impl<S: TokenSource> Lookahead<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, LookaheadConfig::default())
    }

    pub fn with_config(source: S, config: LookaheadConfig) -> Self {
        let config = LookaheadConfig {
            batch: config.batch.max(1),
            capacity: config.capacity.max(1),
        };
        Self {
            source,
            buf: VecDeque::with_capacity(config.capacity),
            config,
            end: None,
        }
    }

    /// Pull batches until the token at `n` is buffered or the source is done.
    fn fill(&mut self, n: usize) -> Result<(), SyntaxError> {
        if n >= self.config.capacity {
            return Err(SyntaxError::LookaheadOverflow {
                requested: n,
                capacity: self.config.capacity,
            });
        }

        while self.end.is_none() && self.buf.len() <= n {
            let room = self.config.capacity - self.buf.len();
            for _ in 0..self.config.batch.min(room) {
                let tok = self.source.next_token()?;
                if tok.is_end() {
                    self.end = Some(tok.clone());
                    self.buf.push_back(tok);
                    break;
                }
                self.buf.push_back(tok);
            }
        }

        Ok(())
    }

    fn end_marker(&self) -> Token {
        // `fill` only stops short of `n` once the end marker is stored.
        self.end
            .clone()
            .unwrap_or_else(|| Token::new(super::lexer::TokenKind::Eof, "", 0))
    }

    /// Token `n` positions ahead, without consuming anything.
    pub fn peek(&mut self, n: usize) -> Result<Token, SyntaxError> {
        self.fill(n)?;
        match self.buf.get(n) {
            Some(tok) => Ok(tok.clone()),
            None => Ok(self.end_marker()),
        }
    }

    /// Consume and return the next token.
    pub fn advance(&mut self) -> Result<Token, SyntaxError> {
        self.fill(0)?;
        match self.buf.pop_front() {
            Some(tok) => Ok(tok),
            None => Ok(self.end_marker()),
        }
    }

    /// Tokens pulled from the source but not consumed yet.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}
