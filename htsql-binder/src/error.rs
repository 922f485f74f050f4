use htsql_ast::{Domain, Span};
use htsql_catalog::CatalogError;
use smol_str::SmolStr;
use thiserror::Error;

/// §7 `BindError` — unresolved name, wrong arity, scope mismatch.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct BindError {
    pub message: String,
    pub span: Span,
    pub secondary: Vec<Span>,
}

impl BindError {
    pub fn unresolved_name(name: &str, scopes_searched: &[&str], span: Span) -> Self {
        Self {
            message: format!(
                "'{name}' is not defined in {} (searched: {})",
                scopes_searched.first().unwrap_or(&"scope"),
                scopes_searched.join(", ")
            ),
            span,
            secondary: Vec::new(),
        }
    }

    pub fn wrong_arity(name: &str, expected: usize, found: usize, span: Span) -> Self {
        Self {
            message: format!("'{name}' takes {expected} argument(s), found {found}"),
            span,
            secondary: Vec::new(),
        }
    }

    pub fn scope_mismatch(message: impl Into<String>, span: Span) -> Self {
        Self { message: message.into(), span, secondary: Vec::new() }
    }
}

/// §7 `TypeError` — no overload for operand domains, including coercion
/// failure of a quoted literal under its target domain.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct TypeError {
    pub message: String,
    pub span: Span,
}

impl TypeError {
    pub fn no_overload(op: &str, domains: &[Domain], span: Span) -> Self {
        let list = domains.iter().map(Domain::to_string).collect::<Vec<_>>().join(", ");
        Self { message: format!("no overload of '{op}' for ({list})"), span }
    }

    pub fn bad_literal(raw: &str, target: &Domain, span: Span) -> Self {
        Self { message: format!("{raw:?} is not a valid {target} literal"), span }
    }
}

/// §7 `PluralityError` — a plural expression used where a singular is
/// required.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("plural expression used where a singular value is required")]
pub struct PluralityError {
    pub span: Span,
}

impl PluralityError {
    pub fn plural_in_singular_position(span: Span) -> Self {
        Self { span }
    }
}

/// §7 `LinkError` — ambiguous/missing foreign-key path, projection without
/// kernel, or a cross-class reference that cannot be reached.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct LinkError {
    pub message: String,
    pub span: Span,
}

impl LinkError {
    pub fn ambiguous(from: &str, to: &str, span: Span) -> Self {
        Self { message: format!("ambiguous link from {from} to {to}"), span }
    }

    pub fn no_kernel(span: Span) -> Self {
        Self { message: "projection requires a kernel expression".to_string(), span }
    }

    pub fn unreachable(name: &str, span: Span) -> Self {
        Self { message: format!("{name:?} cannot be reached from the current class"), span }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BinderError {
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Plurality(#[from] PluralityError),
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Source(#[from] htsql_parser::SourceError),
    #[error("{0}")]
    Name(SmolStr),
}
