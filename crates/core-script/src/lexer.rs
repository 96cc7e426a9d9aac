//! Script lexer - turns source text into tokens
//!
//! Newlines separate statements except inside parentheses or brackets, where
//! they are insignificant. `#` starts a comment running to the end of the line.

use crate::error::{Result, ScriptError};
use crate::token::{Token, TokenType, keyword};

pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    nesting: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            nesting: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.current() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Lex {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    /// Tokenize the whole input; the last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.token_type == TokenType::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn skip_blanks(&mut self) {
        while let Some(c) = self.current() {
            match c {
                ' ' | '\t' | '\r' => self.advance(),
                '\n' if self.nesting > 0 => self.advance(),
                '#' => {
                    while self.current().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_blanks();
        let (line, column) = (self.line, self.column);
        let Some(c) = self.current() else {
            return Ok(Token::new(TokenType::Eof, line, column));
        };

        let token_type = match c {
            '\n' | ';' => {
                self.advance();
                TokenType::Separator
            }
            '0'..='9' => self.read_number()?,
            '"' | '\'' => self.read_string(c)?,
            c if c.is_alphabetic() || c == '_' => {
                let ident = self.read_identifier();
                keyword(&ident).unwrap_or(TokenType::Identifier(ident))
            }
            _ => self.read_operator(c)?,
        };
        Ok(Token::new(token_type, line, column))
    }

    fn read_number(&mut self) -> Result<TokenType> {
        let mut digits = String::new();
        while let Some(c) = self.current().filter(char::is_ascii_digit) {
            digits.push(c);
            self.advance();
        }
        digits
            .parse::<i64>()
            .map(TokenType::Int)
            .map_err(|_| self.error(format!("integer literal out of range: {digits}")))
    }

    fn read_string(&mut self, quote: char) -> Result<TokenType> {
        self.advance();
        let mut out = String::new();
        loop {
            let Some(c) = self.current() else {
                return Err(self.error("unterminated string literal"));
            };
            self.advance();
            if c == quote {
                return Ok(TokenType::Str(out));
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            let Some(e) = self.current() else {
                return Err(self.error("unterminated string literal"));
            };
            self.advance();
            match e {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                '\\' | '"' | '\'' => out.push(e),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self
            .current()
            .filter(|c| c.is_alphanumeric() || *c == '_')
        {
            out.push(c);
            self.advance();
        }
        out
    }

    fn read_operator(&mut self, c: char) -> Result<TokenType> {
        let next = self.peek();
        let (token, width) = match (c, next) {
            ('+', Some('=')) => (TokenType::PlusAssign, 2),
            ('=', Some('=')) => (TokenType::Equal, 2),
            ('!', Some('=')) => (TokenType::NotEqual, 2),
            ('<', Some('=')) => (TokenType::LessEqual, 2),
            ('>', Some('=')) => (TokenType::GreaterEqual, 2),
            ('<', Some('<')) => (TokenType::ShiftLeft, 2),
            ('>', Some('>')) => (TokenType::ShiftRight, 2),
            ('+', _) => (TokenType::Plus, 1),
            ('-', _) => (TokenType::Minus, 1),
            ('*', _) => (TokenType::Star, 1),
            ('/', _) => (TokenType::Slash, 1),
            ('%', _) => (TokenType::Percent, 1),
            ('=', _) => (TokenType::Assign, 1),
            ('<', _) => (TokenType::Less, 1),
            ('>', _) => (TokenType::Greater, 1),
            ('.', _) => (TokenType::Dot, 1),
            (',', _) => (TokenType::Comma, 1),
            ('(', _) => (TokenType::OpenParen, 1),
            (')', _) => (TokenType::CloseParen, 1),
            ('[', _) => (TokenType::OpenBracket, 1),
            (']', _) => (TokenType::CloseBracket, 1),
            ('{', _) => (TokenType::OpenBrace, 1),
            ('}', _) => (TokenType::CloseBrace, 1),
            _ => return Err(self.error(format!("unexpected character '{c}'"))),
        };
        match token {
            TokenType::OpenParen | TokenType::OpenBracket => self.nesting += 1,
            TokenType::CloseParen | TokenType::CloseBracket => {
                self.nesting = self.nesting.saturating_sub(1)
            }
            _ => {}
        }
        for _ in 0..width {
            self.advance();
        }
        Ok(token)
    }
}
