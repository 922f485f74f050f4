use smol_str::SmolStr;

use crate::code::Code;
use crate::flow::Flow;

/// One output row/list (§3 "Segment", glossary): the flow its rows range
/// over, plus its labeled output items in selector order.
#[derive(Debug, Clone)]
pub struct Segment {
    pub flow: Flow,
    pub items: Vec<(SmolStr, SegmentItem)>,
}

#[derive(Debug, Clone)]
pub enum SegmentItem {
    Scalar(Code),
    /// A selection item that is itself a full flow expression (a nested
    /// `/program{title}` inside `/school{code, /program{title}}`), producing
    /// a list-valued output column.
    Nested(Segment),
}
