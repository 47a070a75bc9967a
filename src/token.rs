use strum_macros::Display;

/// Keywords are not a token type of their own: `LET`, `FUN`, `TRUE` and
/// friends are lexed as identifiers and matched by literal in the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TokenType {
    #[strum(serialize = "identifier")]
    Identifier,
    #[strum(serialize = "integer")]
    Integer,
    #[strum(serialize = "decimal")]
    Decimal,
    #[strum(serialize = "character")]
    Character,
    #[strum(serialize = "string")]
    String,
    #[strum(serialize = "operator")]
    Operator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub tokentype: TokenType,
    pub literal: String,
    /// Offset of the first character, counted in chars.
    pub index: usize,
}

impl Token {
    pub fn new(tokentype: TokenType, literal: &str, index: usize) -> Token {
        Token {
            tokentype,
            literal: literal.to_string(),
            index,
        }
    }

    /// Offset one past the last character of the token.
    pub fn end(&self) -> usize {
        self.index + self.literal.chars().count()
    }
}
