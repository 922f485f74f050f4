use smol_str::SmolStr;
use thiserror::Error;

/// Failures turning a compiled term tree into SQL text (§4.6, §7
/// `InternalError`). None of these should be reachable from well-formed
/// input; they exist to turn a compiler/assembler mismatch into a
/// diagnosable error instead of a panic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssemblerError {
    #[error("no table or subquery in scope resolves column `{column}`")]
    UnresolvedColumn { column: SmolStr },
    #[error("routing table has no entry for a flow referenced by the term tree")]
    UnresolvedFlow,
    #[error("{what} is not supported by the assembler")]
    Unsupported { what: String },
    #[error(transparent)]
    Dialect(#[from] htsql_dialect::DialectError),
}
