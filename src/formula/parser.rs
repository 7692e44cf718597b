use super::expression::{Expression, Function, Value};
use super::lexer::{Spanned, Token};
use crate::error::FormulaError;
use chrono::NaiveDate;

/// Recursive-descent parser over formula tokens.
///
/// Grammar:
///
/// ```text
/// expr    := term (('+' | '-') term)*
/// term    := unary (('*' | '/') unary)*
/// unary   := ('-' | '+') unary | primary
/// primary := NUMBER | DATE | STRING | FUNCTION '(' args? ')' | '(' expr ')'
/// args    := expr (',' expr)*
/// ```
pub struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Spanned]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parses the whole token stream into a single expression.
    pub fn parse(mut self) -> Result<Expression, FormulaError> {
        let expr = self.parse_expr()?;
        match self.tokens.get(self.pos) {
            None => Ok(expr),
            Some(extra) => Err(unexpected(extra)),
        }
    }

    fn parse_expr(&mut self) -> Result<Expression, FormulaError> {
        let mut left = self.parse_term()?;
        loop {
            if self.eat(&Token::Plus) {
                let right = self.parse_term()?;
                left = Expression::Sum(Box::new(left), Box::new(right));
            } else if self.eat(&Token::Minus) {
                let right = self.parse_term()?;
                left = Expression::Subtract(Box::new(left), Box::new(right));
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_term(&mut self) -> Result<Expression, FormulaError> {
        let mut left = self.parse_unary()?;
        loop {
            if self.eat(&Token::Star) {
                let right = self.parse_unary()?;
                left = Expression::Multiply(Box::new(left), Box::new(right));
            } else if self.eat(&Token::Slash) {
                let right = self.parse_unary()?;
                left = Expression::Divide(Box::new(left), Box::new(right));
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, FormulaError> {
        if self.eat(&Token::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expression::Negate(Box::new(operand)));
        }
        if self.eat(&Token::Plus) {
            return self.parse_unary();
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, FormulaError> {
        let spanned = self.next().ok_or(FormulaError::UnexpectedEnd)?;
        match &spanned.token {
            Token::Number(n) => Ok(Expression::Literal(Value::Number(*n))),
            Token::Date(text) => parse_date(text).map(|d| Expression::Literal(Value::Date(d))),
            Token::Str(text) => Ok(Expression::Literal(Value::Text(text.clone()))),
            Token::Function(function) => self.parse_call(*function),
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            _ => Err(unexpected(spanned)),
        }
    }

    fn parse_call(&mut self, function: Function) -> Result<Expression, FormulaError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.eat(&Token::Comma) {
                    continue;
                }
                self.expect(&Token::RParen)?;
                break;
            }
        }
        if args.len() != function.arity() {
            return Err(FormulaError::Arity {
                function: function.name(),
                expected: function.arity(),
                found: args.len(),
            });
        }
        Ok(Expression::Call { function, args })
    }

    fn next(&mut self) -> Option<&'a Spanned> {
        let spanned = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(spanned)
    }

    fn eat(&mut self, token: &Token) -> bool {
        match self.tokens.get(self.pos) {
            Some(spanned) if spanned.token == *token => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), FormulaError> {
        match self.next() {
            Some(spanned) if spanned.token == *token => Ok(()),
            Some(spanned) => Err(unexpected(spanned)),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }
}

fn unexpected(spanned: &Spanned) -> FormulaError {
    FormulaError::UnexpectedToken {
        found: spanned.token.to_string(),
        position: spanned.position,
    }
}

/// Parses `YYYY-MM-DD`, also accepting a trailing time part (`1990-05-01T10:00`).
pub fn parse_date(text: &str) -> Result<NaiveDate, FormulaError> {
    let trimmed = text.trim();
    let invalid = || FormulaError::InvalidDate(trimmed.to_string());
    let date_part = match (trimmed.get(..10), trimmed.get(10..11)) {
        (Some(date), None) => date,
        (Some(date), Some("T" | " ")) => date,
        _ => return Err(invalid()),
    };
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| invalid())
}
