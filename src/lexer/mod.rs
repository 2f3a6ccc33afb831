//! Scanner (C2): turns the character stream from the reader into a stream of
//! tokens, one per [`Scanner::next_token`] call, skipping whitespace and
//! nested comments along the way.

pub mod token;


use crate::error::{CompileError, ErrorKind, Position};
use crate::reader::{Reader, EOF};
use token::{lookup_reserved, Token, TokenKind};

const MAX_IDENT_LEN: usize = 72;

pub struct Scanner<'a> {
    reader: Reader<'a>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            reader: Reader::new(source),
        }
    }

    fn pos(&self) -> Position {
        let (line, col) = self.reader.pos();
        Position::new(line, col)
    }

    /// Consumes whitespace and nested `{ ... }` comments, leaving the reader
    /// positioned at the first character of the next token (or at EOF).
    fn skip_trivia(&mut self) -> Result<(), CompileError> {
        loop {
            match self.reader.peek() {
                ' ' | '\t' | '\r' | '\n' => {
                    self.reader.advance();
                }
                '{' => {
                    let outer = self.pos();
                    self.reader.advance();
                    let mut depth = 1u32;
                    loop {
                        match self.reader.peek() {
                            EOF => {
                                return Err(CompileError::new(ErrorKind::UnterminatedComment, outer))
                            }
                            '{' => {
                                depth += 1;
                                self.reader.advance();
                            }
                            '}' => {
                                depth -= 1;
                                self.reader.advance();
                                if depth == 0 {
                                    break;
                                }
                            }
                            _ => {
                                self.reader.advance();
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Produces exactly one token. At EOF, returns `TokenKind::Eof`
    /// indefinitely.
    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        self.skip_trivia()?;
        let start = self.pos();

        if self.reader.is_at_end() {
            return Ok(Token::new(TokenKind::Eof, start));
        }

        let ch = self.reader.peek();
        match ch {
            c if c.is_ascii_digit() => self.lex_number(start),
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_word(start),
            '"' => self.lex_string(start),
            // Multi-char operators are disambiguated by looking one
            // character past the one already under `peek()`, so the
            // decision is made before either character is consumed.
            ':' => {
                if self.reader.peek_next() == '=' {
                    self.reader.advance();
                    self.reader.advance();
                    Ok(Token::new(TokenKind::Gets, start))
                } else {
                    self.reader.advance();
                    Err(CompileError::expected(
                        "'='",
                        describe_char(self.reader.peek()),
                        self.pos(),
                    ))
                }
            }
            '=' => self.single(start, TokenKind::Eq),
            '<' => match self.reader.peek_next() {
                '=' => {
                    self.reader.advance();
                    self.reader.advance();
                    Ok(Token::new(TokenKind::Le, start))
                }
                '>' => {
                    self.reader.advance();
                    self.reader.advance();
                    Ok(Token::new(TokenKind::Ne, start))
                }
                _ => {
                    self.reader.advance();
                    Ok(Token::new(TokenKind::Lt, start))
                }
            },
            '>' => {
                if self.reader.peek_next() == '=' {
                    self.reader.advance();
                    self.reader.advance();
                    Ok(Token::new(TokenKind::Ge, start))
                } else {
                    self.reader.advance();
                    Ok(Token::new(TokenKind::Gt, start))
                }
            }
            '+' => self.single(start, TokenKind::Plus),
            '-' => self.single(start, TokenKind::Minus),
            '*' => self.single(start, TokenKind::Star),
            '/' => self.single(start, TokenKind::Slash),
            ',' => self.single(start, TokenKind::Comma),
            '.' => self.single(start, TokenKind::Concatenate),
            ';' => self.single(start, TokenKind::Semicolon),
            '(' => self.single(start, TokenKind::LParen),
            ')' => self.single(start, TokenKind::RParen),
            '[' => self.single(start, TokenKind::LBracket),
            ']' => self.single(start, TokenKind::RBracket),
            // Everything else is illegal: the documented punctuation set above
            // covers every legal symbol, so any remaining character — the
            // explicitly-listed `}!#$%&@|~\`` or any other byte, ASCII or not
            // — falls through here.
            c => {
                self.reader.advance();
                Err(CompileError::new(ErrorKind::IllegalCharacter(c), start))
            }
        }
    }

    fn single(&mut self, start: Position, kind: TokenKind) -> Result<Token, CompileError> {
        self.reader.advance();
        Ok(Token::new(kind, start))
    }

    fn lex_number(&mut self, start: Position) -> Result<Token, CompileError> {
        let mut value: i32 = 0;
        while self.reader.peek().is_ascii_digit() {
            let digit = (self.reader.advance() as u8 - b'0') as i32;
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| CompileError::new(ErrorKind::NumberTooLarge, start))?;
        }
        Ok(Token::new(TokenKind::Number(value), start))
    }

    fn lex_word(&mut self, start: Position) -> Result<Token, CompileError> {
        let mut word = String::with_capacity(16);
        while self.reader.peek().is_ascii_alphanumeric() || self.reader.peek() == '_' {
            word.push(self.reader.advance());
            if word.len() > MAX_IDENT_LEN {
                return Err(CompileError::new(ErrorKind::IdentifierTooLong, start));
            }
        }
        let upper = word.to_ascii_uppercase();
        let kind = lookup_reserved(&upper).unwrap_or(TokenKind::Id(word));
        Ok(Token::new(kind, start))
    }

    fn lex_string(&mut self, start: Position) -> Result<Token, CompileError> {
        self.reader.advance(); // opening quote
        // Starts at a 1024-byte buffer; `String::push` reallocates
        // geometrically past that, matching the "doubles on overflow" rule.
        let mut buf = String::with_capacity(1024);
        loop {
            match self.reader.peek() {
                EOF => return Err(CompileError::new(ErrorKind::UnterminatedString, start)),
                '\n' => return Err(CompileError::new(ErrorKind::NewlineInString, start)),
                '"' => {
                    self.reader.advance();
                    return Ok(Token::new(TokenKind::Str(buf), start));
                }
                '\\' => {
                    self.reader.advance();
                    let esc = self.reader.peek();
                    let decoded = match esc {
                        'n' => '\n',
                        't' => '\t',
                        '"' => '"',
                        '\\' => '\\',
                        EOF => return Err(CompileError::new(ErrorKind::UnterminatedString, start)),
                        other => return Err(CompileError::new(ErrorKind::IllegalEscape(other), start)),
                    };
                    self.reader.advance();
                    buf.push(decoded);
                }
                // A raw tab is non-printable and must be rejected here too —
                // only the `\t` escape may produce a tab character.
                c if !c.is_ascii() || (!c.is_ascii_graphic() && c != ' ') => {
                    return Err(CompileError::new(ErrorKind::NonPrintableInString, start))
                }
                c => {
                    self.reader.advance();
                    buf.push(c);
                }
            }
        }
    }
}

fn describe_char(c: char) -> String {
    if c == EOF {
        "end of file".to_string()
    } else {
        format!("'{}'", c)
    }
}
