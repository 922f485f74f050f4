use std::rc::Rc;

use htsql_ast::Domain;
use htsql_binder::LiteralValue;
use smol_str::SmolStr;

use crate::flow::Flow;

/// A code (§3 "Code/flow algebra", §4.4): an expression over units, each
/// attached to the flow it is computed on. Like [`Flow`], content-addressed.
pub type Code = Rc<CodeKind>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CodeKind {
    Literal { value: LiteralValue, domain: Domain },
    Cast { inner: Code, target: Domain },
    /// One primitive operator/function, named by its canonical signature.
    Formula { signature: SmolStr, operands: Vec<Code>, domain: Domain },
    /// Reading `column` off a row of `flow`.
    Column { column: SmolStr, flow: Flow, domain: Domain },
    /// A code computed elsewhere but pinned to a specific flow for routing
    /// purposes (e.g. a calculated field's body, or a kernel element reused
    /// across a quotient's complement).
    Compound { code: Code, flow: Flow },
    /// The `i`-th kernel element of `quotient`.
    Kernel { quotient: Flow, index: usize, domain: Domain },
    /// Existence test: true iff `flow` has at least one row.
    Covering { flow: Flow },
    /// `signature(operand)` computed over `plural_flow`, collapsed back to
    /// `base_flow`'s singular context.
    Aggregate { signature: SmolStr, operand: Code, plural_flow: Flow, base_flow: Flow, domain: Domain },
}

pub fn literal_code(value: LiteralValue, domain: Domain) -> Code {
    Rc::new(CodeKind::Literal { value, domain })
}

pub fn cast_code(inner: Code, target: Domain) -> Code {
    Rc::new(CodeKind::Cast { inner, target })
}

pub fn formula_code(signature: impl Into<SmolStr>, operands: Vec<Code>, domain: Domain) -> Code {
    Rc::new(CodeKind::Formula { signature: signature.into(), operands, domain })
}

pub fn column_unit(column: impl Into<SmolStr>, flow: Flow, domain: Domain) -> Code {
    Rc::new(CodeKind::Column { column: column.into(), flow, domain })
}

pub fn compound_unit(code: Code, flow: Flow) -> Code {
    Rc::new(CodeKind::Compound { code, flow })
}

pub fn kernel_unit(quotient: Flow, index: usize, domain: Domain) -> Code {
    Rc::new(CodeKind::Kernel { quotient, index, domain })
}

pub fn covering_unit(flow: Flow) -> Code {
    Rc::new(CodeKind::Covering { flow })
}

pub fn aggregate_unit(signature: impl Into<SmolStr>, operand: Code, plural_flow: Flow, base_flow: Flow, domain: Domain) -> Code {
    Rc::new(CodeKind::Aggregate { signature: signature.into(), operand, plural_flow, base_flow, domain })
}

/// The domain a code's value carries, used by the assembler's output
/// profile and by dialect-sensitive literal rendering.
pub fn domain_of(code: &Code) -> Domain {
    match &**code {
        CodeKind::Literal { domain, .. } => domain.clone(),
        CodeKind::Cast { target, .. } => target.clone(),
        CodeKind::Formula { domain, .. } => domain.clone(),
        CodeKind::Column { domain, .. } => domain.clone(),
        CodeKind::Compound { code, .. } => domain_of(code),
        CodeKind::Kernel { domain, .. } => domain.clone(),
        CodeKind::Covering { .. } => Domain::Boolean,
        CodeKind::Aggregate { domain, .. } => domain.clone(),
    }
}

/// The flow a code is computed over — the unit(s) a term's routing table
/// must resolve for this code to be selectable (§3 invariant i).
pub fn flow_of(code: &Code) -> Flow {
    match &**code {
        CodeKind::Literal { .. } => crate::flow::scalar_flow(),
        CodeKind::Cast { inner, .. } => flow_of(inner),
        CodeKind::Formula { operands, .. } => operands.first().map(flow_of).unwrap_or_else(crate::flow::scalar_flow),
        CodeKind::Column { flow, .. } => flow.clone(),
        CodeKind::Compound { flow, .. } => flow.clone(),
        CodeKind::Kernel { quotient, .. } => quotient.clone(),
        CodeKind::Covering { flow } => flow.clone(),
        CodeKind::Aggregate { base_flow, .. } => base_flow.clone(),
    }
}
