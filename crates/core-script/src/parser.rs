//! Script parser - recursive descent over the token stream
//!
//! Statements are separated by newlines or `;`:
//! * `target = expr` / `target += expr` where target is a name, field or index
//! * `if expr { ... } else { ... }` (`else if` chains allowed)
//! * any expression, evaluated for its effect (`snip >> 1`, `snip.shift()`)
//!
//! Expression precedence (lowest to highest):
//! 1. or
//! 2. and
//! 3. not
//! 4. comparison (==, !=, <, <=, >, >=)
//! 5. shift (>>, <<)
//! 6. additive (+, -)
//! 7. multiplicative (*, /, %)
//! 8. unary minus
//! 9. postfix (.field, call, [index])
//! 10. term (literal, name, parenthesized)

use crate::ast::{BinaryOp, Expr, Program, Stmt};
use crate::error::{Result, ScriptError};
use crate::lexer::Lexer;
use crate::token::{Token, TokenType};

/// Nesting budget shared by parenthesized, chained and block constructs.
pub const MAX_RECURSION_DEPTH: usize = 64;

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    recursion_depth: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self> {
        Ok(Self {
            tokens: Lexer::new(input).tokenize()?,
            position: 0,
            recursion_depth: 0,
        })
    }

    fn current(&self) -> &Token {
        // tokenize() always ends with Eof and we never advance past it.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn current_is(&self, token_type: &TokenType) -> bool {
        &self.current().token_type == token_type
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.token_type != TokenType::Eof {
            self.position += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        let t = self.current();
        ScriptError::Parse {
            line: t.line,
            column: t.column,
            message: message.into(),
        }
    }

    fn expect(&mut self, token_type: TokenType) -> Result<Token> {
        if self.current_is(&token_type) {
            Ok(self.advance())
        } else {
            Err(self.error(format!(
                "expected {:?}, got {:?}",
                token_type,
                self.current().token_type
            )))
        }
    }

    fn skip_separators(&mut self) {
        while self.current_is(&TokenType::Separator) {
            self.advance();
        }
    }

    fn check_recursion_depth(&mut self) -> Result<()> {
        self.recursion_depth += 1;
        if self.recursion_depth > MAX_RECURSION_DEPTH {
            return Err(self.error(format!(
                "expression too deeply nested (max depth: {MAX_RECURSION_DEPTH})"
            )));
        }
        Ok(())
    }

    /// Parse a whole program.
    pub fn parse_program(&mut self) -> Result<Program> {
        let body = self.parse_statements(&TokenType::Eof)?;
        self.expect(TokenType::Eof)?;
        Ok(Program { body })
    }

    /// Parse a single expression spanning the whole input.
    pub fn parse_standalone_expression(&mut self) -> Result<Expr> {
        self.skip_separators();
        let expr = self.parse_expression()?;
        self.skip_separators();
        self.expect(TokenType::Eof)?;
        Ok(expr)
    }

    fn parse_statements(&mut self, end: &TokenType) -> Result<Vec<Stmt>> {
        let mut out = Vec::new();
        loop {
            self.skip_separators();
            if self.current_is(end) || self.current_is(&TokenType::Eof) {
                return Ok(out);
            }
            out.push(self.parse_statement()?);
            if !(self.current_is(&TokenType::Separator) || self.current_is(end)) {
                return Err(self.error(format!(
                    "expected end of statement, got {:?}",
                    self.current().token_type
                )));
            }
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.expect(TokenType::OpenBrace)?;
        let body = self.parse_statements(&TokenType::CloseBrace)?;
        self.expect(TokenType::CloseBrace)?;
        Ok(body)
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        if self.current_is(&TokenType::If) {
            return self.parse_if();
        }
        let expr = self.parse_expression()?;
        match self.current().token_type {
            TokenType::Assign => {
                self.advance();
                let value = self.parse_expression()?;
                Ok(Stmt::Assign {
                    target: self.check_target(expr)?,
                    value,
                })
            }
            TokenType::PlusAssign => {
                self.advance();
                let value = self.parse_expression()?;
                Ok(Stmt::AddAssign {
                    target: self.check_target(expr)?,
                    value,
                })
            }
            _ => Ok(Stmt::Expr(expr)),
        }
    }

    fn check_target(&self, expr: Expr) -> Result<Expr> {
        match expr {
            Expr::Ident(_) | Expr::Field(..) | Expr::Index(..) => Ok(expr),
            other => Err(self.error(format!("invalid assignment target {other:?}"))),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        self.check_recursion_depth()?;
        let stmt = self.parse_if_inner();
        self.recursion_depth -= 1;
        stmt
    }

    fn parse_if_inner(&mut self) -> Result<Stmt> {
        self.expect(TokenType::If)?;
        let cond = self.parse_expression()?;
        let then = self.parse_block()?;
        let otherwise = if self.current_is(&TokenType::Else) {
            self.advance();
            if self.current_is(&TokenType::If) {
                vec![self.parse_if()?]
            } else {
                self.parse_block()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::If {
            cond,
            then,
            otherwise,
        })
    }

    fn parse_expression(&mut self) -> Result<Expr> {
        self.check_recursion_depth()?;
        let expr = self.parse_or();
        self.recursion_depth -= 1;
        expr
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let depth = self.recursion_depth;
        let mut left = self.parse_and()?;
        while self.current_is(&TokenType::Or) {
            self.advance();
            self.check_recursion_depth()?;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.recursion_depth = depth;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let depth = self.recursion_depth;
        let mut left = self.parse_not()?;
        while self.current_is(&TokenType::And) {
            self.advance();
            self.check_recursion_depth()?;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.recursion_depth = depth;
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.current_is(&TokenType::Not) {
            self.advance();
            self.check_recursion_depth()?;
            let inner = self.parse_not();
            self.recursion_depth -= 1;
            return Ok(Expr::Not(Box::new(inner?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_shift()?;
        let op = match self.current().token_type {
            TokenType::Equal => BinaryOp::Eq,
            TokenType::NotEqual => BinaryOp::Ne,
            TokenType::Less => BinaryOp::Lt,
            TokenType::LessEqual => BinaryOp::Le,
            TokenType::Greater => BinaryOp::Gt,
            TokenType::GreaterEqual => BinaryOp::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_shift()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn parse_shift(&mut self) -> Result<Expr> {
        let depth = self.recursion_depth;
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current().token_type {
                TokenType::ShiftRight => BinaryOp::Shr,
                TokenType::ShiftLeft => BinaryOp::Shl,
                _ => {
                    self.recursion_depth = depth;
                    return Ok(left);
                }
            };
            self.advance();
            self.check_recursion_depth()?;
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let depth = self.recursion_depth;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current().token_type {
                TokenType::Plus => BinaryOp::Add,
                TokenType::Minus => BinaryOp::Sub,
                _ => {
                    self.recursion_depth = depth;
                    return Ok(left);
                }
            };
            self.advance();
            self.check_recursion_depth()?;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let depth = self.recursion_depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current().token_type {
                TokenType::Star => BinaryOp::Mul,
                TokenType::Slash => BinaryOp::Div,
                TokenType::Percent => BinaryOp::Rem,
                _ => {
                    self.recursion_depth = depth;
                    return Ok(left);
                }
            };
            self.advance();
            self.check_recursion_depth()?;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.current_is(&TokenType::Minus) {
            self.advance();
            self.check_recursion_depth()?;
            let inner = self.parse_unary();
            self.recursion_depth -= 1;
            return Ok(Expr::Neg(Box::new(inner?)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let depth = self.recursion_depth;
        let mut expr = self.parse_term()?;
        loop {
            if matches!(
                self.current().token_type,
                TokenType::Dot | TokenType::OpenParen | TokenType::OpenBracket
            ) {
                self.check_recursion_depth()?;
            }
            match self.current().token_type {
                TokenType::Dot => {
                    self.advance();
                    let name = match self.advance().token_type {
                        TokenType::Identifier(name) => name,
                        other => {
                            return Err(self.error(format!("expected field name, got {other:?}")));
                        }
                    };
                    expr = Expr::Field(Box::new(expr), name);
                }
                TokenType::OpenParen => {
                    self.advance();
                    let mut args = Vec::new();
                    while !self.current_is(&TokenType::CloseParen) {
                        args.push(self.parse_expression()?);
                        if !self.current_is(&TokenType::Comma) {
                            break;
                        }
                        self.advance();
                    }
                    self.expect(TokenType::CloseParen)?;
                    expr = Expr::Call(Box::new(expr), args);
                }
                TokenType::OpenBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenType::CloseBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => {
                    self.recursion_depth = depth;
                    return Ok(expr);
                }
            }
        }
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let token = self.advance();
        Ok(match token.token_type {
            TokenType::Int(n) => Expr::Int(n),
            TokenType::Str(s) => Expr::Str(s),
            TokenType::True => Expr::Bool(true),
            TokenType::False => Expr::Bool(false),
            TokenType::Nil => Expr::Nil,
            TokenType::Identifier(name) => Expr::Ident(name),
            TokenType::OpenParen => {
                self.check_recursion_depth()?;
                let inner = self.parse_expression()?;
                self.expect(TokenType::CloseParen)?;
                self.recursion_depth -= 1;
                inner
            }
            other => {
                return Err(ScriptError::Parse {
                    line: token.line,
                    column: token.column,
                    message: format!("unexpected token {other:?}"),
                });
            }
        })
    }
}

/// Parse a program from source.
pub fn parse_program(input: &str) -> Result<Program> {
    Parser::new(input)?.parse_program()
}

/// Parse a single expression from source.
pub fn parse_expression(input: &str) -> Result<Expr> {
    Parser::new(input)?.parse_standalone_expression()
}
