use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised while lowering a flow/code segment into a term tree (§7).
/// Every variant here indicates a flow shape the compiler does not (yet,
/// or by design) know how to turn into SQL, rather than a user mistake —
/// those are caught earlier, by the binder.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CompileError {
    #[error("cannot determine a join condition for arrow `{arrow}`: no matching arrow on its origin class")]
    UnknownArrow { arrow: SmolStr },

    #[error("flow has no class identity to join against (arrow `{arrow}`)")]
    UnresolvedJoinBase { arrow: SmolStr },

    #[error("aggregate base flow has no table identity to group by")]
    UngroupableAggregateBase,

    #[error("unsupported flow shape: {what}")]
    Unsupported { what: String },
}
