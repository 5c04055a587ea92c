// src/parser.rs
use serde_json::Value;

use crate::errors::EvalError;

#[derive(Debug)]
pub enum ParseError {
    InvalidSyntax(String),
}

impl From<String> for ParseError {
    fn from(msg: String) -> Self {
        ParseError::InvalidSyntax(msg)
    }
}

impl From<ParseError> for EvalError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::InvalidSyntax(msg) => EvalError::Parse(msg),
        }
    }
}

/// Character cursor shared by the unit parser.
pub struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    /// Builds a syntax error annotated with the current line and column.
    pub fn error(&self, msg: impl AsRef<str>) -> ParseError {
        let consumed = &self.s[..self.i];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        ParseError::InvalidSyntax(format!("{} at {line}:{column}", msg.as_ref()))
    }

    pub fn parse_identifier(&mut self) -> Result<String, ParseError> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c == '_' || c == '$' || c.is_ascii_alphanumeric() {
                self.i += 1;
            } else {
                break;
            }
        }
        if self.i == start || self.s[start..].starts_with(|c: char| c.is_ascii_digit()) {
            self.i = start;
            return Err(self.error("identifier expected"));
        }
        Ok(self.s[start..self.i].to_string())
    }

    pub fn parse_number_literal(&mut self) -> Result<Value, ParseError> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || c == '_' {
                self.i += 1;
            } else {
                break;
            }
        }
        if self.peek_char() == Some('.') {
            self.i += 1;
            while let Some(c) = self.peek_char() {
                if c.is_ascii_digit() || c == '_' {
                    self.i += 1;
                } else {
                    break;
                }
            }
        }
        let s: String = self.s[start..self.i].chars().filter(|c| *c != '_').collect();
        if s.is_empty() || s == "." {
            return Err(self.error("number expected"));
        }
        if s.contains('.') {
            let f: f64 = s.parse().map_err(|_| self.error("bad float"))?;
            Ok(Value::from(f))
        } else if let Ok(i) = s.parse::<i64>() {
            Ok(Value::from(i))
        } else {
            // Too wide for i64: keep it as a float, like arithmetic overflow does.
            let f: f64 = s.parse().map_err(|_| self.error("bad int"))?;
            Ok(Value::from(f))
        }
    }

    pub fn parse_quoted_string(&mut self) -> Result<String, ParseError> {
        let quote = self.peek_char().ok_or_else(|| self.error("string expected"))?;
        if quote != '\'' && quote != '"' && quote != '`' {
            return Err(self.error("expected quoted string"));
        }
        self.i += quote.len_utf8();
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            self.i += c.len_utf8();
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                if let Some(nc) = self.peek_char() {
                    self.i += nc.len_utf8();
                    match nc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        '\\' | '"' | '\'' | '`' => out.push(nc),
                        _ => {
                            out.push('\\');
                            out.push(nc);
                        }
                    }
                } else {
                    break;
                }
            } else {
                out.push(c);
            }
        }
        Err(self.error("unterminated string"))
    }

    pub fn expect(&mut self, c: char) -> Result<(), ParseError> {
        if self.consume_char(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}'")))
        }
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn peek_str(&self, lit: &str) -> bool {
        self.s[self.i..].starts_with(lit)
    }

    /// True when `word` follows and is not the prefix of a longer identifier.
    pub fn peek_keyword(&self, word: &str) -> bool {
        self.peek_str(word)
            && !self.s[self.i + word.len()..]
                .starts_with(|c: char| c == '_' || c == '$' || c.is_ascii_alphanumeric())
    }

    pub fn advance(&mut self, n: usize) {
        self.i = (self.i + n).min(self.s.len());
    }

    pub fn offset(&self) -> usize {
        self.i
    }

    pub fn rewind(&mut self, offset: usize) {
        self.i = offset;
    }

    /// Skips whitespace together with `//` and `/* */` comments.
    pub fn skip_ws(&mut self) {
        loop {
            while let Some(c) = self.peek_char() {
                if c.is_whitespace() {
                    self.i += c.len_utf8();
                } else {
                    break;
                }
            }
            if self.peek_str("//") {
                match self.s[self.i..].find('\n') {
                    Some(n) => self.i += n + 1,
                    None => self.i = self.s.len(),
                }
            } else if self.peek_str("/*") {
                match self.s[self.i + 2..].find("*/") {
                    Some(n) => self.i += n + 4,
                    None => self.i = self.s.len(),
                }
            } else {
                break;
            }
        }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }
}
