use htsql_ast::Span;
use thiserror::Error;

/// §7 `LexError` — illegal character, malformed percent escape, unterminated
/// string, or an embedded `NUL` byte.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl LexError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    pub fn illegal_char(ch: char, span: Span) -> Self {
        Self::new(format!("illegal character {ch:?}"), span)
    }

    pub fn nul_byte(span: Span) -> Self {
        Self::new("NUL byte is not permitted in source text", span)
    }

    pub fn bad_percent_escape(span: Span) -> Self {
        Self::new("'%' must be followed by two hexadecimal digits", span)
    }

    pub fn unterminated_string(span: Span) -> Self {
        Self::new("unterminated string literal", span)
    }
}
