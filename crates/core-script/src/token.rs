//! Token types for the script lexer

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenType {
    // Literals
    Int(i64),
    Str(String),
    Identifier(String),

    // Keywords
    If,
    Else,
    And,
    Or,
    Not,
    True,
    False,
    Nil,

    // Operators
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Percent,      // %
    Assign,       // =
    PlusAssign,   // +=
    Equal,        // ==
    NotEqual,     // !=
    Less,         // <
    LessEqual,    // <=
    Greater,      // >
    GreaterEqual, // >=
    ShiftRight,   // >>
    ShiftLeft,    // <<
    Dot,          // .
    Comma,        // ,

    // Delimiters
    OpenParen,    // (
    CloseParen,   // )
    OpenBracket,  // [
    CloseBracket, // ]
    OpenBrace,    // {
    CloseBrace,   // }

    /// Statement separator: newline or `;`.
    Separator,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(token_type: TokenType, line: usize, column: usize) -> Self {
        Self {
            token_type,
            line,
            column,
        }
    }
}

/// Map an identifier to its keyword token, if it is one.
pub fn keyword(ident: &str) -> Option<TokenType> {
    Some(match ident {
        "if" => TokenType::If,
        "else" => TokenType::Else,
        "and" => TokenType::And,
        "or" => TokenType::Or,
        "not" => TokenType::Not,
        "true" | "True" => TokenType::True,
        "false" | "False" => TokenType::False,
        "nil" | "None" => TokenType::Nil,
        _ => return None,
    })
}
