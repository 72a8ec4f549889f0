//! Lexical analyzer

use phf::phf_map;

use crate::token::{LexErrorKind, Token, TokenKind};

static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "and" => TokenKind::And,
    "class" => TokenKind::Class,
    "else" => TokenKind::Else,
    "false" => TokenKind::False,
    "for" => TokenKind::For,
    "fun" => TokenKind::Fun,
    "if" => TokenKind::If,
    "nil" => TokenKind::Nil,
    "or" => TokenKind::Or,
    "print" => TokenKind::Print,
    "return" => TokenKind::Return,
    "super" => TokenKind::Super,
    "this" => TokenKind::This,
    "true" => TokenKind::True,
    "var" => TokenKind::Var,
    "while" => TokenKind::While,
    "break" => TokenKind::Break,
    "continue" => TokenKind::Continue,
};

/// Turn a source string into a sequence of positioned tokens.
///
/// The scanner owns no lookahead state: [`Scanner::peek`] saves and restores
/// the byte cursor around a call to [`Scanner::advance`].  Once the input is
/// exhausted, `Eof` tokens are produced indefinitely.
#[derive(Debug)]
pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Scanner<'a> {
        Scanner {
            src: source,
            pos: 0,
        }
    }

    /// Return the next token without consuming it.
    pub fn peek(&mut self) -> Token {
        let saved = self.pos;
        let token = self.advance();
        self.pos = saved;
        token
    }

    /// Return and consume the next token.
    pub fn advance(&mut self) -> Token {
        self.skip_blanks_and_comments();
        let start = self.pos;
        let byte = match self.byte(self.pos) {
            Some(b) => b,
            None => {
                return Token {
                    kind: TokenKind::Eof,
                    start,
                    len: 0,
                }
            }
        };
        self.pos += 1;

        let kind = match byte {
            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b'{' => TokenKind::LeftBrace,
            b'}' => TokenKind::RightBrace,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b';' => TokenKind::Semicolon,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'!' => self.operator_pair(TokenKind::BangEqual, TokenKind::Bang),
            b'=' => self.operator_pair(TokenKind::EqualEqual, TokenKind::Equal),
            b'<' => self.operator_pair(TokenKind::LessEqual, TokenKind::Less),
            b'>' => self.operator_pair(TokenKind::GreaterEqual, TokenKind::Greater),
            b'"' => return self.string(start),
            b'0'..=b'9' => return self.number(start),
            b if b.is_ascii_alphabetic() => return self.identifier(start),
            _ => {
                return Token {
                    kind: TokenKind::Error(LexErrorKind::InvalidToken),
                    start,
                    len: 0,
                }
            }
        };
        Token {
            kind,
            start,
            len: self.pos - start,
        }
    }

    fn byte(&self, at: usize) -> Option<u8> {
        self.src.as_bytes().get(at).copied()
    }

    /// Select the `=`-suffixed variant of an operator when applicable.
    fn operator_pair(&mut self, with_equal: TokenKind, without: TokenKind) -> TokenKind {
        if self.byte(self.pos) == Some(b'=') {
            self.pos += 1;
            with_equal
        } else {
            without
        }
    }

    fn skip_blanks_and_comments(&mut self) {
        loop {
            match self.byte(self.pos) {
                Some(b' ' | b'\t' | b'\r' | b'\n' | 0x0b) => self.pos += 1,
                Some(b'/') if self.byte(self.pos + 1) == Some(b'/') => {
                    self.pos += 2;
                    while let Some(b) = self.byte(self.pos) {
                        if b == b'\n' || b == b'\r' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn number(&mut self, start: usize) -> Token {
        while matches!(self.byte(self.pos), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.byte(self.pos) == Some(b'.') {
            self.pos += 1;
            if !matches!(self.byte(self.pos), Some(b) if b.is_ascii_digit()) {
                return Token {
                    kind: TokenKind::Error(LexErrorKind::NumberMissingDecimal),
                    start,
                    len: self.pos - start,
                };
            }
            while matches!(self.byte(self.pos), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        Token {
            kind: TokenKind::Number,
            start,
            len: self.pos - start,
        }
    }

    /// Scan a string literal.  The lexeme keeps the surrounding quotes; the
    /// literal must close on the same source line.
    fn string(&mut self, start: usize) -> Token {
        loop {
            match self.byte(self.pos) {
                None | Some(b'\n') | Some(b'\r') => {
                    return Token {
                        kind: TokenKind::Error(LexErrorKind::InvalidSingleLineString),
                        start,
                        len: self.pos - start,
                    }
                }
                Some(b'"') => {
                    self.pos += 1;
                    return Token {
                        kind: TokenKind::Str,
                        start,
                        len: self.pos - start,
                    };
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn identifier(&mut self, start: usize) -> Token {
        while matches!(self.byte(self.pos), Some(b) if b.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        let lexeme = &self.src[start..self.pos];
        let kind = KEYWORDS
            .get(lexeme)
            .copied()
            .unwrap_or(TokenKind::Identifier);
        Token {
            kind,
            start,
            len: self.pos - start,
        }
    }
}
