use crate::token::{Token, TokenType};
use log::debug;
use phf::phf_map;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("[index {index}] Invalid escape sequence.")]
    InvalidEscape { index: usize },
    #[error("[index {index}] Empty character literal.")]
    EmptyCharacter { index: usize },
    #[error("[index {index}] Unterminated character literal.")]
    UnterminatedCharacter { index: usize },
    #[error("[index {index}] Unterminated string.")]
    UnterminatedString { index: usize },
}

impl LexError {
    pub fn index(&self) -> usize {
        match self {
            LexError::InvalidEscape { index }
            | LexError::EmptyCharacter { index }
            | LexError::UnterminatedCharacter { index }
            | LexError::UnterminatedString { index } => *index,
        }
    }
}

/// Characters allowed after a backslash, mapped to what they stand for.
pub static ESCAPES: phf::Map<char, char> = phf_map! {
    'b' => '\u{8}',
    'n' => '\n',
    'r' => '\r',
    't' => '\t',
    '\'' => '\'',
    '"' => '"',
    '\\' => '\\',
};

/// Cursor over the source characters.
///
/// `index` is the absolute offset of the next unread character and `length`
/// counts the characters consumed into the token being built.
pub struct CharStream {
    chars: Vec<char>,
    index: usize,
    length: usize,
}

impl CharStream {
    pub fn new(source: &str) -> CharStream {
        CharStream {
            chars: source.chars().collect(),
            index: 0,
            length: 0,
        }
    }
    pub fn has(&self, offset: usize) -> bool {
        self.index + offset < self.chars.len()
    }
    pub fn get(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }
    pub fn index(&self) -> usize {
        self.index
    }
    pub fn advance(&mut self) {
        self.index += 1;
        self.length += 1;
    }
    /// Drops the characters consumed so far without emitting them.
    pub fn skip(&mut self) {
        self.length = 0;
    }
    pub fn emit(&mut self, tokentype: TokenType) -> Token {
        let start = self.index - self.length;
        self.skip();
        let literal: String = self.chars[start..self.index].iter().collect();
        Token {
            tokentype,
            literal,
            index: start,
        }
    }
}

type Pattern = fn(char) -> bool;

pub struct Lexer {
    chars: CharStream,
}

pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).lex()
}

impl Lexer {
    pub fn new(source: &str) -> Lexer {
        Lexer {
            chars: CharStream::new(source),
        }
    }

    /// Lexes the whole input, discarding whitespace between tokens.
    pub fn lex(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while self.chars.has(0) {
            if self.next_if(&[is_whitespace]) {
                self.chars.skip();
            } else {
                tokens.push(self.lex_token()?);
            }
        }
        debug!("lexed {} tokens", tokens.len());
        Ok(tokens)
    }

    /// Lexes a single token starting at the current character, which must
    /// not be whitespace.
    pub fn lex_token(&mut self) -> Result<Token, LexError> {
        if self.peek(&[is_identifier_start]) {
            Ok(self.lex_identifier())
        } else if self.peek(&[is_digit])
            || self.peek(&[is_minus, is_nonzero_digit])
            || self.peek(&[is_minus, is_zero, is_dot, is_digit])
        {
            Ok(self.lex_number())
        } else if self.peek(&[is_single_quote]) {
            self.lex_character()
        } else if self.peek(&[is_double_quote]) {
            self.lex_string()
        } else {
            Ok(self.lex_operator())
        }
    }

    fn lex_identifier(&mut self) -> Token {
        self.chars.advance();
        while self.next_if(&[is_identifier_part]) {}
        self.chars.emit(TokenType::Identifier)
    }

    // Only entered when the lookahead in lex_token guarantees a number.
    fn lex_number(&mut self) -> Token {
        self.next_if(&[is_minus]);
        if !self.next_if(&[is_zero]) {
            while self.next_if(&[is_digit]) {}
        }
        if self.peek(&[is_dot, is_digit]) {
            self.chars.advance();
            while self.next_if(&[is_digit]) {}
            return self.chars.emit(TokenType::Decimal);
        }
        self.chars.emit(TokenType::Integer)
    }

    fn lex_character(&mut self) -> Result<Token, LexError> {
        self.chars.advance();
        match self.chars.get(0) {
            None | Some('\n') | Some('\r') => {
                return Err(LexError::UnterminatedCharacter {
                    index: self.chars.index(),
                })
            }
            Some('\'') => {
                return Err(LexError::EmptyCharacter {
                    index: self.chars.index(),
                })
            }
            Some('\\') => self.lex_escape()?,
            Some(_) => self.chars.advance(),
        }
        if !self.next_if(&[is_single_quote]) {
            return Err(LexError::UnterminatedCharacter {
                index: self.chars.index(),
            });
        }
        Ok(self.chars.emit(TokenType::Character))
    }

    fn lex_string(&mut self) -> Result<Token, LexError> {
        self.chars.advance();
        loop {
            match self.chars.get(0) {
                None | Some('\n') | Some('\r') => {
                    return Err(LexError::UnterminatedString {
                        index: self.chars.index(),
                    })
                }
                Some('"') => {
                    self.chars.advance();
                    return Ok(self.chars.emit(TokenType::String));
                }
                Some('\\') => self.lex_escape()?,
                Some(_) => self.chars.advance(),
            }
        }
    }

    fn lex_escape(&mut self) -> Result<(), LexError> {
        self.chars.advance();
        match self.chars.get(0) {
            Some(c) if ESCAPES.contains_key(&c) => {
                self.chars.advance();
                Ok(())
            }
            _ => Err(LexError::InvalidEscape {
                index: self.chars.index(),
            }),
        }
    }

    fn lex_operator(&mut self) -> Token {
        let two = (self.chars.get(0), self.chars.get(1));
        match two {
            (Some('='), Some('='))
            | (Some('!'), Some('='))
            | (Some('&'), Some('&'))
            | (Some('|'), Some('|')) => {
                self.chars.advance();
                self.chars.advance();
            }
            _ => self.chars.advance(),
        }
        self.chars.emit(TokenType::Operator)
    }

    /// True if the upcoming characters satisfy `patterns` in order.
    fn peek(&self, patterns: &[Pattern]) -> bool {
        patterns
            .iter()
            .enumerate()
            .all(|(offset, pattern)| self.chars.get(offset).map_or(false, |c| pattern(c)))
    }

    fn next_if(&mut self, patterns: &[Pattern]) -> bool {
        let matched = self.peek(patterns);
        if matched {
            for _ in patterns {
                self.chars.advance();
            }
        }
        matched
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\u{8}' | '\n' | '\r' | '\t')
}

fn is_identifier_start(c: char) -> bool {
    c == '@' || c.is_ascii_alphabetic()
}

fn is_identifier_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_nonzero_digit(c: char) -> bool {
    matches!(c, '1'..='9')
}

fn is_zero(c: char) -> bool {
    c == '0'
}

fn is_minus(c: char) -> bool {
    c == '-'
}

fn is_dot(c: char) -> bool {
    c == '.'
}

fn is_single_quote(c: char) -> bool {
    c == '\''
}

fn is_double_quote(c: char) -> bool {
    c == '"'
}
