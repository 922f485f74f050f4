use thiserror::Error;

/// The unified error surface (§7): every phase-local error type converts
/// into one of these via `#[from]`, so callers match on phase without
/// depending on every intermediate crate directly.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Source(#[from] htsql_parser::SourceError),
    #[error(transparent)]
    Catalog(#[from] htsql_catalog::CatalogError),
    #[error(transparent)]
    Bind(#[from] htsql_binder::BinderError),
    #[error(transparent)]
    Compile(#[from] htsql_compiler::CompileError),
    #[error(transparent)]
    Assemble(#[from] htsql_assembler::AssemblerError),
    /// An invariant violation with no well-formed-input trigger (§7
    /// `InternalError`); reserved for a compiler/assembler mismatch, never
    /// constructed from a user's source text or catalog.
    #[error("internal invariant violation: {0}")]
    Internal(String),
}
