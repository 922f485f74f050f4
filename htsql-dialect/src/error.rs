use htsql_ast::Domain;
use thiserror::Error;

use crate::kind::DialectKind;

/// A construct that the selected dialect has no representation for (§7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DialectError {
    #[error("{dialect:?} has no native representation for domain {domain}")]
    UnsupportedDomain { dialect: DialectKind, domain: String },
    #[error("identifier `{identifier}` exceeds {dialect:?}'s maximum length of {limit}")]
    IdentifierTooLong { dialect: DialectKind, identifier: String, limit: usize },
}

impl DialectError {
    pub fn unsupported_domain(dialect: DialectKind, domain: &Domain) -> Self {
        Self::UnsupportedDomain { dialect, domain: domain.to_string() }
    }
}
