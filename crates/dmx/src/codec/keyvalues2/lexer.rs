//! Tokenizer for the KeyValues2 text encoding.

use std::borrow::Cow;
use std::fmt;

use crate::error::DecodeError;
use crate::limits::MAX_STRING_LEN;

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// A quoted string with escapes resolved. Borrowed when it had none.
    Str(Cow<'a, str>),
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Comma,
    Eof,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Str(s) => write!(f, "{s:?}"),
            Token::OpenBrace => f.write_str("`{`"),
            Token::CloseBrace => f.write_str("`}`"),
            Token::OpenBracket => f.write_str("`[`"),
            Token::CloseBracket => f.write_str("`]`"),
            Token::Comma => f.write_str("`,`"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

/// Splits KeyValues2 text into tokens, skipping whitespace and `//` comments.
///
/// Cloning a lexer is cheap and gives an independent cursor for lookahead.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    token_line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            token_line: 1,
        }
    }

    /// Line on which the most recently returned token started.
    pub fn line(&self) -> usize {
        self.token_line
    }

    /// Returns the next token without consuming it.
    pub fn peek(&self) -> Result<Token<'a>, DecodeError> {
        self.clone().next_token()
    }

    /// Consumes and returns the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>, DecodeError> {
        self.skip_trivia();
        self.token_line = self.line;

        let bytes = self.src.as_bytes();
        let Some(&byte) = bytes.get(self.pos) else {
            return Ok(Token::Eof);
        };
        let token = match byte {
            b'{' => Token::OpenBrace,
            b'}' => Token::CloseBrace,
            b'[' => Token::OpenBracket,
            b']' => Token::CloseBracket,
            b',' => Token::Comma,
            b'"' => {
                self.pos += 1;
                return self.quoted().map(Token::Str);
            }
            _ => {
                let found = self.src[self.pos..].chars().next().unwrap_or('\u{FFFD}');
                return Err(DecodeError::UnexpectedCharacter {
                    line: self.line,
                    found,
                });
            }
        };
        self.pos += 1;
        Ok(token)
    }

    fn skip_trivia(&mut self) {
        let bytes = self.src.as_bytes();
        while let Some(&b) = bytes.get(self.pos) {
            match b {
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'/' if bytes.get(self.pos + 1) == Some(&b'/') => {
                    while let Some(&c) = bytes.get(self.pos) {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    /// Reads the rest of a quoted string; the opening quote is consumed.
    fn quoted(&mut self) -> Result<Cow<'a, str>, DecodeError> {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        let mut owned: Option<String> = None;
        let mut run_start = start;

        loop {
            let Some(&b) = bytes.get(self.pos) else {
                return Err(DecodeError::UnexpectedEof {
                    context: "quoted string",
                });
            };
            if self.pos - start > MAX_STRING_LEN {
                return Err(DecodeError::LengthExceedsLimit {
                    field: "quoted string",
                    len: self.pos - start,
                    max: MAX_STRING_LEN,
                });
            }
            match b {
                b'"' => {
                    let run = &self.src[run_start..self.pos];
                    self.pos += 1;
                    return Ok(match owned {
                        Some(mut s) => {
                            s.push_str(run);
                            Cow::Owned(s)
                        }
                        None => Cow::Borrowed(run),
                    });
                }
                b'\\' => {
                    let s = owned.get_or_insert_with(String::new);
                    s.push_str(&self.src[run_start..self.pos]);
                    let Some(&escaped) = bytes.get(self.pos + 1) else {
                        return Err(DecodeError::UnexpectedEof {
                            context: "quoted string",
                        });
                    };
                    match escaped {
                        b'n' => s.push('\n'),
                        b't' => s.push('\t'),
                        b'r' => s.push('\r'),
                        b'"' => s.push('"'),
                        b'\\' => s.push('\\'),
                        _ => {
                            // Unknown escapes are kept verbatim.
                            s.push('\\');
                            run_start = self.pos + 1;
                            self.pos += 1;
                            continue;
                        }
                    }
                    self.pos += 2;
                    run_start = self.pos;
                }
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
    }
}

/// Escapes a string for output between double quotes.
pub fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['"', '\\', '\n', '\t', '\r']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
