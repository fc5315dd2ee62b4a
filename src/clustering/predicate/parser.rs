//! Recursive-descent parser for the rule predicate language.
//!
//! Grammar (keywords case-insensitive):
//!
//! ```text
//! expr       := or_expr
//! or_expr    := and_expr ( OR and_expr )*
//! and_expr   := not_expr ( AND not_expr )*
//! not_expr   := NOT not_expr | primary
//! primary    := '(' expr ')' | comparison
//! comparison := field ( '=' | '!=' | LIKE ) string
//! field      := 'test' | 'reason' | 'variant' '.' ident
//! ```

use super::{Comparison, Expr, Field};
use crate::domain::errors::{DomainError, DomainResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Eq,
    NotEq,
    LParen,
    RParen,
    Dot,
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn tokenize(mut self) -> DomainResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '(' => {
                    self.bump();
                    tokens.push(Token::LParen);
                }
                ')' => {
                    self.bump();
                    tokens.push(Token::RParen);
                }
                '.' => {
                    self.bump();
                    tokens.push(Token::Dot);
                }
                '=' => {
                    self.bump();
                    tokens.push(Token::Eq);
                }
                '!' => {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        tokens.push(Token::NotEq);
                    } else {
                        return Err(invalid("expected '=' after '!'"));
                    }
                }
                '"' => tokens.push(Token::Str(self.string()?)),
                c if c.is_ascii_alphabetic() || c == '_' => {
                    tokens.push(Token::Ident(self.ident()));
                }
                c => return Err(invalid(&format!("unexpected character {c:?}"))),
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn string(&mut self) -> DomainResult<String> {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(invalid("unterminated string literal")),
                Some('"') => {
                    self.bump();
                    return Ok(value);
                }
                Some('\\') => {
                    self.bump();
                    match self.peek() {
                        Some(c @ ('"' | '\\' | '%' | '_')) => {
                            // Escapes for quote/backslash resolve here;
                            // LIKE wildcards keep their escape for the
                            // pattern compiler.
                            if c == '%' || c == '_' {
                                value.push('\\');
                            }
                            value.push(c);
                            self.bump();
                        }
                        Some(c) => return Err(invalid(&format!("invalid escape \\{c}"))),
                        None => return Err(invalid("unterminated string literal")),
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn parse(input: &str) -> DomainResult<Expr> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Self { tokens, pos: 0 };
        let expr = parser.or_expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(invalid("trailing input after expression"));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(id)) if id.eq_ignore_ascii_case(word))
    }

    fn or_expr(&mut self) -> DomainResult<Expr> {
        let mut left = self.and_expr()?;
        while self.keyword("or") {
            self.bump();
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> DomainResult<Expr> {
        let mut left = self.not_expr()?;
        while self.keyword("and") {
            self.bump();
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> DomainResult<Expr> {
        if self.keyword("not") {
            self.bump();
            let inner = self.not_expr()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> DomainResult<Expr> {
        if self.peek() == Some(&Token::LParen) {
            self.bump();
            let expr = self.or_expr()?;
            if self.bump() != Some(Token::RParen) {
                return Err(invalid("expected ')'"));
            }
            return Ok(expr);
        }
        self.comparison()
    }

    fn comparison(&mut self) -> DomainResult<Expr> {
        let field = self.field()?;
        let op = self.bump().ok_or_else(|| invalid("expected operator"))?;
        match op {
            Token::Eq => Ok(Expr::Compare(field, Comparison::Eq, self.string_literal()?)),
            Token::NotEq => Ok(Expr::Compare(field, Comparison::NotEq, self.string_literal()?)),
            Token::Ident(id) if id.eq_ignore_ascii_case("like") => {
                Ok(Expr::Compare(field, Comparison::Like, self.string_literal()?))
            }
            _ => Err(invalid("expected '=', '!=' or LIKE")),
        }
    }

    fn field(&mut self) -> DomainResult<Field> {
        match self.bump() {
            Some(Token::Ident(id)) if id == "test" => Ok(Field::Test),
            Some(Token::Ident(id)) if id == "reason" => Ok(Field::Reason),
            Some(Token::Ident(id)) if id == "variant" => {
                if self.bump() != Some(Token::Dot) {
                    return Err(invalid("expected '.' after 'variant'"));
                }
                match self.bump() {
                    Some(Token::Ident(key)) => Ok(Field::Variant(key)),
                    _ => Err(invalid("expected variant key after 'variant.'")),
                }
            }
            Some(Token::Ident(id)) => Err(invalid(&format!("unknown field {id:?}"))),
            _ => Err(invalid("expected a field name")),
        }
    }

    fn string_literal(&mut self) -> DomainResult<String> {
        match self.bump() {
            Some(Token::Str(s)) => Ok(s),
            _ => Err(invalid("expected a string literal")),
        }
    }
}

fn invalid(msg: &str) -> DomainError {
    DomainError::InvalidPredicate(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_equality() {
        let expr = Parser::parse(r#"test = "my-test""#).unwrap();
        assert_eq!(
            expr,
            Expr::Compare(Field::Test, Comparison::Eq, "my-test".to_string())
        );
    }

    #[test]
    fn parses_boolean_combinations_with_precedence() {
        // AND binds tighter than OR.
        let expr =
            Parser::parse(r#"test = "a" OR test = "b" AND reason = "c""#).unwrap();
        match expr {
            Expr::Or(left, right) => {
                assert!(matches!(*left, Expr::Compare(..)));
                assert!(matches!(*right, Expr::And(..)));
            }
            other => panic!("expected Or at top level, got {other:?}"),
        }
    }

    #[test]
    fn parses_not_and_parentheses() {
        let expr = Parser::parse(r#"NOT (test = "a" OR reason LIKE "x%")"#).unwrap();
        assert!(matches!(expr, Expr::Not(_)));
    }

    #[test]
    fn parses_variant_fields() {
        let expr = Parser::parse(r#"variant.os = "linux""#).unwrap();
        assert_eq!(
            expr,
            Expr::Compare(Field::Variant("os".into()), Comparison::Eq, "linux".into())
        );
    }

    #[test]
    fn rejects_unknown_fields_and_trailing_input() {
        assert!(Parser::parse(r#"bogus = "a""#).is_err());
        assert!(Parser::parse(r#"test = "a" test"#).is_err());
        assert!(Parser::parse(r#"test = "#).is_err());
    }

    #[test]
    fn string_escapes_resolve() {
        let expr = Parser::parse(r#"reason = "say \"hi\"""#).unwrap();
        assert_eq!(
            expr,
            Expr::Compare(Field::Reason, Comparison::Eq, r#"say "hi""#.to_string())
        );
    }
}
