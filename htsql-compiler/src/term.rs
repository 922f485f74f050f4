use ahash::AHashMap;
use htsql_ast::{Domain, SortDirection};
use htsql_catalog::ClassId;
use htsql_encoder::{Code, Flow};
use smol_str::SmolStr;

/// Identifies one node of a [`Term`] tree. Tags are assigned in construction
/// order and never reused within a single compile call; a term may only
/// reference tags allocated before its own (§4.5 "every term carries a
/// unique tag... and refers only backward").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermTag(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Cross,
}

/// One aggregate bundled into a grouped subquery: `signature(operand)`,
/// exposed under `alias` in the subquery's select list.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateColumn {
    pub alias: SmolStr,
    pub signature: SmolStr,
    pub operand: Code,
    pub domain: Domain,
}

/// A value produced by a segment: either a scalar expression or a nested
/// segment (itself a full `Term`, compiled independently).
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentValue {
    Scalar(Code),
    Nested(Term),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TermKind {
    /// The one-row scalar term at the root of a query with no table access.
    Scalar,
    /// A single table, read directly (the root of some traversal, or the
    /// right-hand side of a join).
    Table { class: ClassId, table: SmolStr },
    Filter { child: Box<Term>, predicate: Code },
    Join { left: Box<Term>, right: Box<Term>, kind: JoinKind, conditions: Vec<(Code, Code)> },
    /// `GROUP BY kernel`, producing one row per distinct kernel value.
    Projection { child: Box<Term>, kernel: Vec<Code> },
    /// A projection bundled specifically to compute aggregates: groups
    /// `child` by `kernel` and exposes each `columns` entry alongside it.
    /// `base_flow` is the flow each `AggregateColumn`'s placeholder code was
    /// pinned to outside the bundle (not the same as this term's own
    /// `space`, which is the plural flow being grouped).
    Aggregate { child: Box<Term>, kernel: Vec<Code>, columns: Vec<AggregateColumn>, base_flow: Flow },
    Order { child: Box<Term>, order: Vec<(Code, SortDirection)>, limit: Option<u64>, offset: Option<u64> },
    /// A transparent alias boundary with no semantic effect of its own —
    /// used by the assembler's frame-folding pass as a fold point.
    Wrapper { child: Box<Term> },
    /// The outermost term of a segment: the final projected column list.
    Segment { child: Box<Term>, items: Vec<(SmolStr, SegmentValue)> },
}

/// One node of the relational term tree (§4.5). `routing` maps a flow to
/// the term that is the *entry point* for resolving a code computed over
/// that flow — not necessarily the leaf that owns the physical column.
/// Because a join's left child still contains every term nested under it,
/// the assembler resolves a flow to a physical table/alias by walking down
/// from the routed term through its children until the owning leaf is
/// found, rather than by a single flat lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub tag: TermTag,
    pub space: Flow,
    pub routing: AHashMap<Flow, TermTag>,
    pub kind: TermKind,
}
