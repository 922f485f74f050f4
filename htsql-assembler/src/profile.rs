use htsql_ast::Domain;
use smol_str::SmolStr;

/// The shape of a compiled query's result (§4.6 "output profile"): one
/// entry per selected item, in selector order, carrying enough to decode a
/// result set without re-parsing the source — a label, its domain, whether
/// it may come back `NULL`, and (for a nested selection) the profile of its
/// own rows.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputColumn {
    pub label: SmolStr,
    pub domain: Domain,
    pub nullable: bool,
    pub nested: Option<OutputProfile>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputProfile {
    pub columns: Vec<OutputColumn>,
}

impl OutputProfile {
    pub fn new(columns: Vec<OutputColumn>) -> Self {
        Self { columns }
    }
}
