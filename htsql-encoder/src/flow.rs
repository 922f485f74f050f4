use std::rc::Rc;

use htsql_ast::SortDirection;
use htsql_catalog::ClassId;
use smol_str::SmolStr;

use crate::code::Code;

/// A flow (§3 "Code/flow algebra", §4.4): the rooted chain describing the
/// collection of rows a value ranges over. `Flow` nodes are content-addressed
/// — two flows built from equal arguments compare and hash equal regardless
/// of allocation order, which is what lets the compiler's routing tables key
/// on flow identity without a separate interning pass.
pub type Flow = Rc<FlowKind>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlowKind {
    /// The one-row flow at the root of every query.
    Scalar,
    /// A class-extent traversal: unit → class, or a link followed from
    /// `base`. `arrow` names the model-graph arrow that produced this step
    /// (an extent name when `base` is `Scalar`, a link name otherwise), which
    /// is what the compiler needs to recover the join condition without
    /// re-disambiguating between several arrows that could target the same
    /// class.
    Class { class: ClassId, base: Flow, arrow: SmolStr },
    /// Two flows combined without a filtering relationship (reserved for
    /// cross-product navigation; unused by the current encoder rules, kept
    /// for the full flow-variant surface).
    Product { base: Flow, seed: Flow },
    Filtered { base: Flow, predicate: Code },
    Ordered { base: Flow, order: Vec<(Code, SortDirection)>, limit: Option<u64>, offset: Option<u64> },
    Quotient { base: Flow, kernel: Vec<Code> },
    Complement { quotient: Flow },
}

pub fn scalar_flow() -> Flow {
    Rc::new(FlowKind::Scalar)
}

pub fn class_flow(class: ClassId, base: Flow, arrow: impl Into<SmolStr>) -> Flow {
    Rc::new(FlowKind::Class { class, base, arrow: arrow.into() })
}

pub fn product_flow(base: Flow, seed: Flow) -> Flow {
    Rc::new(FlowKind::Product { base, seed })
}

pub fn filtered_flow(base: Flow, predicate: Code) -> Flow {
    Rc::new(FlowKind::Filtered { base, predicate })
}

pub fn ordered_flow(base: Flow, order: Vec<(Code, SortDirection)>, limit: Option<u64>, offset: Option<u64>) -> Flow {
    Rc::new(FlowKind::Ordered { base, order, limit, offset })
}

pub fn quotient_flow(base: Flow, kernel: Vec<Code>) -> Flow {
    Rc::new(FlowKind::Quotient { base, kernel })
}

pub fn complement_flow(quotient: Flow) -> Flow {
    Rc::new(FlowKind::Complement { quotient })
}

/// Two flows are *conforming* when one is a filtered/ordered extension of
/// the other — i.e. same row set, possibly narrowed or reordered but not
/// joined to a different class (§3).
pub fn conforms(a: &Flow, b: &Flow) -> bool {
    Rc::ptr_eq(a, b) || a == b || strip_extensions(a) == strip_extensions(b)
}

fn strip_extensions(flow: &Flow) -> Flow {
    match &**flow {
        FlowKind::Filtered { base, .. } => strip_extensions(base),
        FlowKind::Ordered { base, .. } => strip_extensions(base),
        _ => flow.clone(),
    }
}

/// Walks down to the nearest enclosing class/scalar flow, past any
/// filter/order/quotient/complement wrapper — used to recover a binding's
/// "ambient" context, e.g. an aggregate's `base_flow`.
pub fn enclosing_base(flow: &Flow) -> Flow {
    match &**flow {
        FlowKind::Scalar => flow.clone(),
        FlowKind::Class { base, .. } => base.clone(),
        FlowKind::Product { base, .. } => enclosing_base(base),
        FlowKind::Filtered { base, .. } => enclosing_base(base),
        FlowKind::Ordered { base, .. } => enclosing_base(base),
        FlowKind::Quotient { base, .. } => enclosing_base(base),
        // A complement's rows fold back to one row per quotient group, not
        // past the quotient into whatever the grouped class was based on.
        FlowKind::Complement { quotient } => quotient.clone(),
    }
}
