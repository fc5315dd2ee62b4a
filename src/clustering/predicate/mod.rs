//! The rule predicate language: boolean expressions over failure
//! fields, e.g. `reason LIKE "timed out%" AND variant.os = "linux"`.
//!
//! Predicates are parsed and compiled once per rule (LIKE patterns
//! compile to anchored regexes) and evaluated per failure on the
//! re-clustering hot path.

mod parser;

use regex::Regex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Failure;

pub use parser::Parser;

/// A failure field a comparison can address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// The test identifier.
    Test,
    /// The primary error message ("" when absent).
    Reason,
    /// A variant key, e.g. `variant.os`.
    Variant(String),
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    NotEq,
    Like,
}

/// Parsed predicate expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare(Field, Comparison, String),
}

/// A compiled predicate, ready for repeated evaluation.
#[derive(Debug, Clone)]
pub struct Predicate {
    source: String,
    compiled: Compiled,
}

#[derive(Debug, Clone)]
enum Compiled {
    And(Box<Compiled>, Box<Compiled>),
    Or(Box<Compiled>, Box<Compiled>),
    Not(Box<Compiled>),
    Eq(Field, String),
    NotEq(Field, String),
    Like(Field, Regex),
}

impl Predicate {
    /// Parse and compile a predicate from its source text.
    pub fn compile(source: &str) -> DomainResult<Self> {
        let expr = Parser::parse(source)?;
        let compiled = compile_expr(&expr)?;
        Ok(Self { source: source.to_string(), compiled })
    }

    /// The source text the predicate was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate the predicate against a failure.
    pub fn matches(&self, failure: &Failure) -> bool {
        eval(&self.compiled, failure)
    }
}

fn compile_expr(expr: &Expr) -> DomainResult<Compiled> {
    Ok(match expr {
        Expr::And(l, r) => Compiled::And(Box::new(compile_expr(l)?), Box::new(compile_expr(r)?)),
        Expr::Or(l, r) => Compiled::Or(Box::new(compile_expr(l)?), Box::new(compile_expr(r)?)),
        Expr::Not(e) => Compiled::Not(Box::new(compile_expr(e)?)),
        Expr::Compare(field, Comparison::Eq, value) => {
            Compiled::Eq(field.clone(), value.clone())
        }
        Expr::Compare(field, Comparison::NotEq, value) => {
            Compiled::NotEq(field.clone(), value.clone())
        }
        Expr::Compare(field, Comparison::Like, pattern) => {
            Compiled::Like(field.clone(), like_to_regex(pattern)?)
        }
    })
}

fn eval(compiled: &Compiled, failure: &Failure) -> bool {
    match compiled {
        Compiled::And(l, r) => eval(l, failure) && eval(r, failure),
        Compiled::Or(l, r) => eval(l, failure) || eval(r, failure),
        Compiled::Not(e) => !eval(e, failure),
        Compiled::Eq(field, value) => field_value(field, failure) == value.as_str(),
        Compiled::NotEq(field, value) => field_value(field, failure) != value.as_str(),
        Compiled::Like(field, re) => re.is_match(field_value(field, failure)),
    }
}

fn field_value<'a>(field: &'a Field, failure: &'a Failure) -> &'a str {
    match field {
        Field::Test => &failure.test_id,
        Field::Reason => failure.reason.as_deref().unwrap_or(""),
        Field::Variant(key) => failure.variant.get(key).map_or("", String::as_str),
    }
}

/// Translate a LIKE pattern into an anchored regex. `%` matches any
/// run of characters, `_` any single character; `\%`, `\_` and `\\`
/// match literally.
fn like_to_regex(pattern: &str) -> DomainResult<Regex> {
    let mut out = String::from("^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => match chars.next() {
                Some(escaped @ ('%' | '_' | '\\')) => out.push_str(&regex::escape(
                    &escaped.to_string(),
                )),
                Some(other) => {
                    return Err(DomainError::InvalidPredicate(format!(
                        "invalid LIKE escape \\{other}"
                    )))
                }
                None => {
                    return Err(DomainError::InvalidPredicate(
                        "LIKE pattern ends in a bare backslash".into(),
                    ))
                }
            },
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out)
        .map_err(|e| DomainError::InvalidPredicate(format!("LIKE pattern: {e}")))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn failure(test_id: &str, reason: Option<&str>) -> Failure {
        Failure {
            test_id: test_id.to_string(),
            variant: [("os".to_string(), "linux".to_string())].into(),
            reason: reason.map(String::from),
            partition_time: Utc::now(),
        }
    }

    #[test]
    fn equality_matches_exact_test_id() {
        let p = Predicate::compile(r#"test = "suite.case""#).unwrap();
        assert!(p.matches(&failure("suite.case", None)));
        assert!(!p.matches(&failure("suite.other", None)));
    }

    #[test]
    fn like_wildcards_match() {
        let p = Predicate::compile(r#"reason LIKE "failed to connect to %""#).unwrap();
        assert!(p.matches(&failure("t", Some("failed to connect to 10.0.0.1"))));
        assert!(!p.matches(&failure("t", Some("connection refused"))));
    }

    #[test]
    fn like_underscore_matches_single_character() {
        let p = Predicate::compile(r#"test = "t" OR reason LIKE "error _""#).unwrap();
        assert!(p.matches(&failure("x", Some("error 7"))));
        assert!(!p.matches(&failure("x", Some("error 77"))));
    }

    #[test]
    fn escaped_percent_is_literal() {
        let p = Predicate::compile(r#"reason LIKE "100\% loss""#).unwrap();
        assert!(p.matches(&failure("t", Some("100% loss"))));
        assert!(!p.matches(&failure("t", Some("100x loss"))));
    }

    #[test]
    fn missing_reason_compares_as_empty() {
        let p = Predicate::compile(r#"reason = """#).unwrap();
        assert!(p.matches(&failure("t", None)));
    }

    #[test]
    fn variant_comparison() {
        let p = Predicate::compile(r#"variant.os = "linux" AND test = "t""#).unwrap();
        assert!(p.matches(&failure("t", None)));
        let q = Predicate::compile(r#"variant.arch = "arm""#).unwrap();
        assert!(!q.matches(&failure("t", None)));
    }

    #[test]
    fn not_inverts() {
        let p = Predicate::compile(r#"NOT test = "t""#).unwrap();
        assert!(!p.matches(&failure("t", None)));
        assert!(p.matches(&failure("u", None)));
    }

    #[test]
    fn regex_metacharacters_in_patterns_are_literal() {
        let p = Predicate::compile(r#"reason LIKE "a.b(c)%""#).unwrap();
        assert!(p.matches(&failure("t", Some("a.b(c) failed"))));
        assert!(!p.matches(&failure("t", Some("aXb(c) failed"))));
    }
}
