//! Very small hand-written lexer for the script language.
//!
//! Command names are *not* keywords: `set`, `goto` etc. all come out as
//! `Ident` and the parser resolves them against the registries. Only the
//! three structural words `macro`, `endmacro` and `const` get their own
//! token kinds.
//
//  Lexical items:
//
//      Ident    ::= [A-Za-z_][A-Za-z0-9_]*
//      Number   ::= '0x' [0-9A-Fa-f]* | [0-9]+ ('.' [0-9]*)?
//      String   ::= '"' ('\\' any | [^"])* '"'
//      Operator ::= '+' | '-' | '*' | '/' | '%'
//      Punct    ::= '(' | ')' | ',' | ':' | '\n'
//      Blanks and comments (# until end-of-line) are discarded.

use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    String,
    Operator,
    LParen,
    RParen,
    Comma,
    Colon,
    Newline,
    Macro,
    EndMacro,
    Const,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("line {line}: unexpected character '{ch}'")]
    UnexpectedChar { ch: char, line: usize },
    #[error("line {line}: no closing '\"' found")]
    UnterminatedString { line: usize },
}

/// Pull-based token producer. After `Eof` has been returned once, every
/// further call returns `Eof` again.
pub trait TokenSource {
    fn next_token(&mut self) -> Result<Token, LexError>;
}

#[derive(Clone)]
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            finished: false,
        }
    }

    fn next_char(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F, buf: &mut String) {
        while let Some(c) = self.peek_char() {
            if pred(c) {
                buf.push(c);
                self.next_char();
            } else {
                break;
            }
        }
    }

    fn skip_blanks_and_comments(&mut self) {
        while let Some(c) = self.peek_char() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.next_char();
                }
                '#' => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.next_char();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_word(&mut self, first: char) -> Token {
        let mut word = String::new();
        word.push(first);
        self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_', &mut word);
        let kind = match word.as_str() {
            "macro" => TokenKind::Macro,
            "endmacro" => TokenKind::EndMacro,
            "const" => TokenKind::Const,
            _ => TokenKind::Ident,
        };
        Token::new(kind, word, self.line)
    }

    fn read_number(&mut self, first: char) -> Token {
        let mut num = String::new();
        num.push(first);
        if first == '0' && self.peek_char() == Some('x') {
            num.push('x');
            self.next_char();
            self.consume_while(|c| c.is_ascii_hexdigit(), &mut num);
            return Token::new(TokenKind::Number, num, self.line);
        }
        self.consume_while(|c| c.is_ascii_digit(), &mut num);
        if self.peek_char() == Some('.') {
            num.push('.');
            self.next_char();
            self.consume_while(|c| c.is_ascii_digit(), &mut num);
        }
        Token::new(TokenKind::Number, num, self.line)
    }

    fn read_string(&mut self) -> Result<Token, LexError> {
        let start_line = self.line;
        let mut txt = String::new();
        while let Some(c) = self.next_char() {
            match c {
                '"' => return Ok(Token::new(TokenKind::String, txt, start_line)),
                // The escaped character is taken literally.
                '\\' => match self.next_char() {
                    Some(escaped) => {
                        if escaped == '\n' {
                            self.line += 1;
                        }
                        txt.push(escaped);
                    }
                    None => break,
                },
                '\n' => {
                    self.line += 1;
                    txt.push(c);
                }
                _ => txt.push(c),
            }
        }
        Err(LexError::UnterminatedString { line: start_line })
    }
}

impl TokenSource for Lexer<'_> {
    fn next_token(&mut self) -> Result<Token, LexError> {
        if self.finished {
            return Ok(Token::new(TokenKind::Eof, "", self.line));
        }

        self.skip_blanks_and_comments();

        let ch = match self.next_char() {
            Some(c) => c,
            None => {
                self.finished = true;
                return Ok(Token::new(TokenKind::Eof, "", self.line));
            }
        };

        let line = self.line;
        let single =
            |kind: TokenKind| -> Result<Token, LexError> { Ok(Token::new(kind, ch.to_string(), line)) };

        match ch {
            '\n' => {
                self.line += 1;
                single(TokenKind::Newline)
            }
            '(' => single(TokenKind::LParen),
            ')' => single(TokenKind::RParen),
            ',' => single(TokenKind::Comma),
            ':' => single(TokenKind::Colon),
            '+' | '-' | '*' | '/' | '%' => single(TokenKind::Operator),
            '"' => self.read_string(),
            c if c.is_ascii_digit() => Ok(self.read_number(c)),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.read_word(c)),
            c => Err(LexError::UnexpectedChar { ch: c, line }),
        }
    }
}

/// Drain a source into a vector, stopping after the first `Eof`.
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token()?;
        let end = tok.is_end();
        tokens.push(tok);
        if end {
            return Ok(tokens);
        }
    }
}
