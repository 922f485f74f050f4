use htsql_ast::Domain;
use htsql_binder::{Binding, BindingKind, BoundQuery};
use htsql_catalog::{ClassId, ModelGraph};
use smol_str::SmolStr;

use crate::code::{
    aggregate_unit, cast_code, column_unit, covering_unit, domain_of, formula_code, literal_code, Code,
};
use crate::flow::{
    class_flow, complement_flow, enclosing_base, filtered_flow, ordered_flow, quotient_flow, scalar_flow, Flow,
};
use crate::segment::{Segment, SegmentItem};

/// The encoder (§4.4): lowers a binding tree into the flow/code algebra.
/// Carries only a borrowed [`ModelGraph`] — every [`Flow`]/[`Code`] it
/// produces is content-addressed, so there is no identity bookkeeping to
/// thread through beyond that.
#[derive(Debug, Clone, Copy)]
pub struct Encoder<'g> {
    graph: &'g ModelGraph,
}

impl<'g> Encoder<'g> {
    pub fn new(graph: &'g ModelGraph) -> Self {
        Self { graph }
    }

    /// The arrow name that reaches `class` directly from the unit class —
    /// a table's own extent arrow, used when building its root `Class` flow.
    fn extent_arrow_name(&self, class: ClassId) -> SmolStr {
        self.graph
            .arrows_from(self.graph.unit_class())
            .find(|a| matches!(a.target, htsql_catalog::ArrowTarget::Class(c) if c == class))
            .map(|a| a.name.clone())
            .unwrap_or_else(|| self.graph.class(class).name.clone())
    }

    pub fn encode_query(&self, query: &BoundQuery) -> Segment {
        self.encode_segment(&query.binding)
    }

    fn encode_segment(&self, binding: &Binding) -> Segment {
        match &*binding.kind {
            BindingKind::Selection { base, items } => self.encode_selection(base, items),
            _ => {
                let flow = self.flow_of(binding);
                Segment { flow: flow.clone(), items: vec![(SmolStr::new("*"), SegmentItem::Scalar(covering_unit(flow)))] }
            }
        }
    }

    fn encode_selection(&self, base: &Binding, items: &[htsql_binder::SelectionItem]) -> Segment {
        let base_flow = self.flow_of(base);

        let order: Vec<_> = items
            .iter()
            .filter_map(|item| match &*item.value.kind {
                BindingKind::Sort { base: sorted, direction } => Some((self.encode_code(sorted), *direction)),
                _ => None,
            })
            .collect();

        let flow = if order.is_empty() { base_flow } else { ordered_flow(base_flow, order, None, None) };

        let encoded = items
            .iter()
            .map(|item| {
                let segment_item = match &*item.value.kind {
                    BindingKind::Selection { base: inner_base, items: inner_items } => {
                        SegmentItem::Nested(self.encode_selection(inner_base, inner_items))
                    }
                    BindingKind::Sort { base: sorted, .. } => SegmentItem::Scalar(self.encode_code(sorted)),
                    _ => SegmentItem::Scalar(self.encode_code(&item.value)),
                };
                (item.label.clone(), segment_item)
            })
            .collect();

        Segment { flow, items: encoded }
    }

    /// The flow a binding's value is computed over — the flow parameter a
    /// unit derived from it must carry.
    pub fn flow_of(&self, binding: &Binding) -> Flow {
        match &*binding.kind {
            BindingKind::Unit => scalar_flow(),
            BindingKind::Table { class } => class_flow(*class, scalar_flow(), self.extent_arrow_name(*class)),
            BindingKind::Link { base, arrow_name, target } => class_flow(*target, self.flow_of(base), arrow_name.clone()),
            BindingKind::Attribute { base, .. } => self.flow_of(base),
            BindingKind::Sieve { base, condition } => {
                let base_flow = self.flow_of(base);
                let predicate = self.encode_code(condition);
                filtered_flow(base_flow, predicate)
            }
            BindingKind::Quotient { base, kernel, .. } => {
                let base_flow = self.flow_of(base);
                let kernel_codes = kernel.iter().map(|(_, k)| self.encode_code(k)).collect();
                quotient_flow(base_flow, kernel_codes)
            }
            BindingKind::Complement { quotient } => complement_flow(self.flow_of(quotient)),
            BindingKind::Sort { base, .. } => self.flow_of(base),
            BindingKind::Assignment { value, .. } | BindingKind::Reference { value, .. } => self.flow_of(value),
            BindingKind::Selection { base, .. } => self.flow_of(base),
            // Scalar-only bindings carry no navigable flow of their own.
            BindingKind::Literal { .. } | BindingKind::Cast { .. } | BindingKind::Formula { .. } | BindingKind::List { .. } => {
                scalar_flow()
            }
        }
    }

    pub fn encode_code(&self, binding: &Binding) -> Code {
        match &*binding.kind {
            BindingKind::Literal { value } => literal_code(value.clone(), binding.domain.clone()),
            BindingKind::Cast { inner, target } => cast_code(self.encode_code(inner), target.clone()),
            BindingKind::Formula { name, args } => {
                if htsql_binder::formula::is_aggregate_name(name) && args.len() == 1 {
                    self.encode_aggregate(name, &args[0], binding.domain.clone())
                } else {
                    formula_code(name.clone(), args.iter().map(|a| self.encode_code(a)).collect(), binding.domain.clone())
                }
            }
            BindingKind::Attribute { base, arrow_name } => {
                column_unit(arrow_name.clone(), self.flow_of(base), binding.domain.clone())
            }
            BindingKind::Table { .. } | BindingKind::Link { .. } | BindingKind::Quotient { .. } | BindingKind::Complement { .. } => {
                covering_unit(self.flow_of(binding))
            }
            BindingKind::Sort { base, .. } => self.encode_code(base),
            BindingKind::Assignment { value, .. } | BindingKind::Reference { value, .. } => self.encode_code(value),
            BindingKind::List { items } => {
                formula_code("list", items.iter().map(|i| self.encode_code(i)).collect(), binding.domain.clone())
            }
            BindingKind::Unit => covering_unit(scalar_flow()),
            BindingKind::Selection { .. } | BindingKind::Sieve { .. } => covering_unit(self.flow_of(binding)),
        }
    }

    fn encode_aggregate(&self, name: &str, arg: &Binding, domain: Domain) -> Code {
        let plural_flow = self.flow_of(arg);
        let base_flow = enclosing_base(&plural_flow);
        let operand = match &*arg.kind {
            BindingKind::Table { .. } | BindingKind::Link { .. } => covering_unit(plural_flow.clone()),
            _ => self.encode_code(arg),
        };
        let _ = domain_of(&operand);
        aggregate_unit(name, operand, plural_flow, base_flow, domain)
    }
}

#[cfg(test)]
mod tests {
    use htsql_catalog::{CatalogView, Column, ForeignKey, ModelGraph, Table, UniqueKey};

    use super::*;
    use crate::code::CodeKind;
    use crate::flow::FlowKind;

    fn sample_catalog() -> CatalogView {
        let school = Table::new("school")
            .with_column(Column::new("code", Domain::String, false))
            .with_column(Column::new("name", Domain::String, false))
            .with_unique_key(UniqueKey::new(vec!["code".into()], true));
        let department = Table::new("department")
            .with_column(Column::new("code", Domain::String, false))
            .with_column(Column::new("school_code", Domain::String, false))
            .with_unique_key(UniqueKey::new(vec!["code".into()], true))
            .with_foreign_key(ForeignKey::new(vec!["school_code".into()], "school", vec!["code".into()]));
        CatalogView::new("pgsql").with_table(school).with_table(department)
    }

    fn encode(source: &str) -> Segment {
        let catalog = sample_catalog();
        let graph = ModelGraph::build(&catalog).unwrap();
        let syntax = htsql_parser::parse_source(source).unwrap();
        let bound = htsql_binder::Binder::new(&graph).bind_query(&syntax).unwrap();
        Encoder::new(&graph).encode_query(&bound)
    }

    #[test]
    fn plain_selection_shares_one_class_flow() {
        let segment = encode("/school{code, name}");
        assert_eq!(segment.items.len(), 2);
        let flows: Vec<_> = segment
            .items
            .iter()
            .map(|(_, item)| match item {
                SegmentItem::Scalar(code) => crate::code::flow_of(code),
                SegmentItem::Nested(_) => panic!("expected scalar"),
            })
            .collect();
        assert_eq!(flows[0], flows[1]);
        assert!(matches!(&*flows[0], FlowKind::Class { .. }));
    }

    #[test]
    fn aggregate_plural_flow_nests_under_base_class() {
        let segment = encode("/school{code, count(department)}");
        let SegmentItem::Scalar(count_code) = &segment.items[1].1 else { panic!() };
        let CodeKind::Aggregate { signature, plural_flow, base_flow, .. } = &**count_code else { panic!() };
        assert_eq!(signature.as_str(), "count");
        assert!(matches!(&**plural_flow, FlowKind::Class { .. }));
        assert_eq!(base_flow, &segment.flow);
    }

    #[test]
    fn sort_decorator_orders_without_duplicating_the_column() {
        let segment = encode("/department?school_code='x' {code, code-}");
        assert!(matches!(&*segment.flow, FlowKind::Ordered { .. }));
        assert_eq!(segment.items.len(), 2);
    }
}
