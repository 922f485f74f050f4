use htsql_ast::Span;
use htsql_lexer::Token;
use thiserror::Error;

/// §7 `ParseError` — unexpected token, with the set of alternatives the
/// parser would have accepted at that position.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    pub expected: Vec<String>,
}

impl ParseError {
    pub fn unexpected(found: &Token, expected: &[&str]) -> Self {
        let found_desc = if found.is_end() {
            "end of input".to_string()
        } else {
            format!("{:?}", found.raw.as_str())
        };
        let message = if expected.is_empty() {
            format!("unexpected {found_desc}")
        } else {
            format!(
                "unexpected {found_desc}, expected one of: {}",
                expected.join(", ")
            )
        };
        Self {
            message,
            span: found.span,
            expected: expected.iter().map(|s| s.to_string()).collect(),
        }
    }
}
