//! The parser (§4.2): operator-precedence recursive descent from a token
//! stream to a [`htsql_ast::Syntax`] tree.

pub mod error;
pub mod parser;

pub use error::ParseError;
pub use parser::{parse, Parser};

/// Scans and parses `source` in one step, the composition the binder
/// actually calls.
pub fn parse_source(source: &str) -> Result<htsql_ast::Syntax, SourceError> {
    let tokens = htsql_lexer::scan(source)?;
    let syntax = parse(&tokens)?;
    Ok(syntax)
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error(transparent)]
    Lex(#[from] htsql_lexer::LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}
