use std::cell::Cell;

use ahash::AHashMap;
use htsql_ast::{Domain, SortDirection};
use htsql_catalog::{ArrowKind, ClassId, ModelGraph};
use htsql_encoder::code::column_unit;
use htsql_encoder::{Code, CodeKind, Flow, FlowKind, Segment, SegmentItem};
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::CompileError;
use crate::rewrite::rewrite_segment;
use crate::term::{AggregateColumn, JoinKind, SegmentValue, Term, TermKind, TermTag};

/// The compiler (§4.5): lowers a rewritten flow/code segment into a
/// relational term tree. One `Compiler` is built per `compile` call and
/// discarded afterward — its only state is the monotonic tag counter.
pub struct Compiler<'g> {
    catalog: &'g htsql_catalog::CatalogView,
    graph: &'g ModelGraph,
    next_tag: Cell<u32>,
}

impl<'g> Compiler<'g> {
    pub fn new(catalog: &'g htsql_catalog::CatalogView, graph: &'g ModelGraph) -> Self {
        Self { catalog, graph, next_tag: Cell::new(0) }
    }

    fn tag(&self) -> TermTag {
        let t = self.next_tag.get();
        self.next_tag.set(t + 1);
        TermTag(t)
    }

    pub fn compile_query(&self, segment: &Segment) -> Result<Term, CompileError> {
        let segment = rewrite_segment(segment);
        self.compile_segment(&segment)
    }

    fn table_of(&self, class: ClassId) -> &'g htsql_catalog::Table {
        match &self.graph.class(class).kind {
            htsql_catalog::ClassKind::Table { table_index } => &self.catalog.tables[*table_index],
            htsql_catalog::ClassKind::Unit => unreachable!("the unit class has no backing table"),
        }
    }

    fn column_domain(&self, class: ClassId, column: &str) -> Domain {
        self.table_of(class).column(column).map(|c| c.domain.clone()).unwrap_or(Domain::Untyped)
    }

    /// The two-sided grouping key for an aggregate bundle: codes evaluable
    /// on `agg_base_flow` (the outer side, for the join's left operand) and
    /// the corresponding codes evaluable on `plural_flow` itself (the inner
    /// side, for the bundle subquery's own `GROUP BY`). These differ
    /// whenever the link's origin and target columns are named differently
    /// (e.g. `department.school_code` vs `school.code`) — using one side's
    /// expression on both, as a flat primary-key lookup would, resolves
    /// fine outside the bundle but not inside it, where that table was
    /// never joined in.
    fn aggregate_join_keys(&self, plural_flow: &Flow, agg_base_flow: &Flow) -> Result<(Vec<Code>, Vec<Code>), CompileError> {
        if let FlowKind::Quotient { kernel, .. } = &**agg_base_flow {
            // Grouping by a quotient's own kernel: `plural_flow` is that
            // quotient's complement, computed within the very same
            // subquery, so both sides share one expression.
            return Ok((kernel.clone(), kernel.clone()));
        }

        let base_class = self.class_of_flow(agg_base_flow).ok_or(CompileError::UngroupableAggregateBase)?;
        let (plural_class, step_base, arrow_name) =
            innermost_class_step(plural_flow).ok_or(CompileError::UngroupableAggregateBase)?;
        if !htsql_encoder::flow::conforms(&step_base, agg_base_flow) {
            return Err(CompileError::UngroupableAggregateBase);
        }
        let arrow = self.graph.arrow_named(base_class, &arrow_name).ok_or_else(|| CompileError::UnknownArrow { arrow: arrow_name.clone() })?;
        let (origin_columns, target_columns) = match &arrow.kind {
            ArrowKind::DirectForeignKey { origin_columns, target_columns } => (origin_columns, target_columns),
            ArrowKind::ReverseForeignKey { origin_columns, target_columns } => (origin_columns, target_columns),
            ArrowKind::Extent | ArrowKind::Attribute { .. } | ArrowKind::Calculated { .. } => {
                return Err(CompileError::UnknownArrow { arrow: arrow_name.clone() })
            }
        };

        let outer = origin_columns
            .iter()
            .map(|c| column_unit(c.clone(), agg_base_flow.clone(), self.column_domain(base_class, c)))
            .collect();
        let inner = target_columns
            .iter()
            .map(|c| column_unit(c.clone(), plural_flow.clone(), self.column_domain(plural_class, c)))
            .collect();
        Ok((outer, inner))
    }

    /// The class a flow's rows currently belong to, if any (quotients and
    /// the scalar flow have no class identity).
    fn class_of_flow(&self, flow: &Flow) -> Option<ClassId> {
        match &**flow {
            FlowKind::Class { class, .. } => Some(*class),
            FlowKind::Filtered { base, .. } | FlowKind::Ordered { base, .. } => self.class_of_flow(base),
            FlowKind::Complement { quotient } => match &**quotient {
                FlowKind::Quotient { base, .. } => self.class_of_flow(base),
                _ => None,
            },
            FlowKind::Scalar | FlowKind::Product { .. } | FlowKind::Quotient { .. } => None,
        }
    }

    /// Appends the innermost class's primary key, ascending, as a final tie
    /// -break after any explicit sort keys already present on `flow` (§4.5
    /// (d) "ordering is stable: explicit sort keys first, then the primary
    /// key ... ascending"). A no-op when `flow` has no class identity to
    /// key by (a grouped or scalar segment), since there is no single
    /// table's primary key left to break ties on.
    fn append_primary_key_tiebreak(&self, child: Term, flow: &Flow) -> Term {
        let (base_flow, mut order, limit, offset) = match &**flow {
            FlowKind::Ordered { base, order, limit, offset } => (base.clone(), order.clone(), *limit, *offset),
            _ => (flow.clone(), Vec::new(), None, None),
        };
        let Some(class) = self.class_of_flow(&base_flow) else { return child };
        let Some(pk) = self.table_of(class).primary_key() else { return child };
        for column in &pk.columns {
            let code = column_unit(column.clone(), base_flow.clone(), self.column_domain(class, column));
            if !order.iter().any(|(c, _)| c == &code) {
                order.push((code, SortDirection::Ascending));
            }
        }

        let tag = self.tag();
        let mut routing = child.routing.clone();
        routing.insert(flow.clone(), tag);
        Term { tag, space: flow.clone(), routing, kind: TermKind::Order { child: Box::new(child), order, limit, offset } }
    }

    // -- Segment compilation -------------------------------------------------

    fn compile_segment(&self, segment: &Segment) -> Result<Term, CompileError> {
        let base_term = self.compile_flow(&segment.flow)?;

        let mut plan = AggregatePlan::default();
        let mut resolved: Vec<(SmolStr, PendingValue)> = Vec::with_capacity(segment.items.len());
        for (label, item) in &segment.items {
            match item {
                SegmentItem::Scalar(code) => {
                    let resolved_code = self.collect_aggregates(code, &mut plan);
                    resolved.push((label.clone(), PendingValue::Scalar(resolved_code)));
                }
                SegmentItem::Nested(inner) => {
                    let nested_term = self.compile_segment(inner)?;
                    resolved.push((label.clone(), PendingValue::Nested(nested_term)));
                }
            }
        }

        let mut child = base_term;
        for ((plural_flow, agg_base_flow), entries) in plan.bundles {
            child = self.attach_aggregate_bundle(child, plural_flow, agg_base_flow, entries)?;
        }
        let child = self.append_primary_key_tiebreak(child, &segment.flow);

        let tag = self.tag();
        let mut routing = child.routing.clone();
        routing.insert(segment.flow.clone(), tag);
        let items = resolved
            .into_iter()
            .map(|(label, value)| {
                let value = match value {
                    PendingValue::Scalar(code) => SegmentValue::Scalar(code),
                    PendingValue::Nested(term) => SegmentValue::Nested(term),
                };
                (label, value)
            })
            .collect();

        Ok(Term { tag, space: segment.flow.clone(), routing, kind: TermKind::Segment { child: Box::new(child), items } })
    }

    /// Replaces every `Aggregate` code reachable from `code` with a plain
    /// column reference into the bundle that will compute it, recording the
    /// aggregate's definition in `plan` keyed by `(plural_flow, base_flow)`
    /// so that repeated or sibling aggregates over the same group share one
    /// subquery (§9 "aggregate bundling").
    fn collect_aggregates(&self, code: &Code, plan: &mut AggregatePlan) -> Code {
        match &**code {
            CodeKind::Aggregate { signature, operand, plural_flow, base_flow, domain } => {
                let alias = plan.intern(plural_flow.clone(), base_flow.clone(), signature.clone(), operand.clone(), domain.clone());
                column_unit(alias, base_flow.clone(), domain.clone())
            }
            CodeKind::Cast { inner, target } => htsql_encoder::code::cast_code(self.collect_aggregates(inner, plan), target.clone()),
            CodeKind::Formula { signature, operands, domain } => htsql_encoder::code::formula_code(
                signature.clone(),
                operands.iter().map(|o| self.collect_aggregates(o, plan)).collect(),
                domain.clone(),
            ),
            CodeKind::Compound { code: inner, flow } => htsql_encoder::code::compound_unit(self.collect_aggregates(inner, plan), flow.clone()),
            _ => code.clone(),
        }
    }

    /// Left-joins one grouped subquery computing every aggregate bundled
    /// under `(plural_flow, agg_base_flow)` onto `base`, keyed by the base
    /// flow's primary key.
    fn attach_aggregate_bundle(
        &self,
        base: Term,
        plural_flow: Flow,
        agg_base_flow: Flow,
        entries: Vec<AggregateEntry>,
    ) -> Result<Term, CompileError> {
        let (outer_keys, inner_keys) = self.aggregate_join_keys(&plural_flow, &agg_base_flow)?;

        let inner = self.compile_flow(&plural_flow)?;
        let columns = entries
            .into_iter()
            .map(|e| AggregateColumn { alias: e.alias, signature: e.signature, operand: e.operand, domain: e.domain })
            .collect();

        let agg_tag = self.tag();
        let mut agg_routing = inner.routing.clone();
        agg_routing.insert(plural_flow.clone(), agg_tag);
        let aggregate_term = Term {
            tag: agg_tag,
            space: plural_flow.clone(),
            routing: agg_routing,
            kind: TermKind::Aggregate { child: Box::new(inner), kernel: inner_keys.clone(), columns, base_flow: agg_base_flow.clone() },
        };

        let conditions: Vec<(Code, Code)> = outer_keys.into_iter().zip(inner_keys).collect();

        let join_tag = self.tag();
        let mut routing = base.routing.clone();
        // The join now carries the alias columns; any later reference to
        // `agg_base_flow` resolves here first, which still contains `base`
        // as its left child for ordinary columns.
        routing.insert(agg_base_flow.clone(), join_tag);
        let space = base.space.clone();

        Ok(Term {
            tag: join_tag,
            space,
            routing,
            kind: TermKind::Join { left: Box::new(base), right: Box::new(aggregate_term), kind: JoinKind::Left, conditions },
        })
    }

    // -- Flow compilation -----------------------------------------------------

    fn compile_flow(&self, flow: &Flow) -> Result<Term, CompileError> {
        match &**flow {
            FlowKind::Scalar => {
                let tag = self.tag();
                let routing = AHashMap::from_iter([(flow.clone(), tag)]);
                Ok(Term { tag, space: flow.clone(), routing, kind: TermKind::Scalar })
            }
            FlowKind::Class { class, base, arrow } => self.compile_class(flow, *class, base, arrow),
            FlowKind::Product { .. } => Err(CompileError::Unsupported { what: "cross-product flow".into() }),
            FlowKind::Filtered { base, predicate } => {
                let child = self.compile_flow(base)?;
                let tag = self.tag();
                let mut routing = child.routing.clone();
                routing.insert(flow.clone(), tag);
                Ok(Term { tag, space: flow.clone(), routing, kind: TermKind::Filter { child: Box::new(child), predicate: predicate.clone() } })
            }
            FlowKind::Ordered { base, order, limit, offset } => {
                let child = self.compile_flow(base)?;
                let tag = self.tag();
                let mut routing = child.routing.clone();
                routing.insert(flow.clone(), tag);
                Ok(Term {
                    tag,
                    space: flow.clone(),
                    routing,
                    kind: TermKind::Order { child: Box::new(child), order: order.clone(), limit: *limit, offset: *offset },
                })
            }
            FlowKind::Quotient { base, kernel } => {
                let child = self.compile_flow(base)?;
                let tag = self.tag();
                // The projection exposes each kernel expression as one of its
                // own output columns (the GROUP BY key), so later references
                // to a kernel's flow — e.g. selecting it by name alongside an
                // aggregate — resolve through this term rather than `child`,
                // which is no longer addressable row-by-row from outside.
                let mut routing: AHashMap<Flow, TermTag> = kernel.iter().map(|k| (htsql_encoder::code::flow_of(k), tag)).collect();
                routing.insert(flow.clone(), tag);
                Ok(Term { tag, space: flow.clone(), routing, kind: TermKind::Projection { child: Box::new(child), kernel: kernel.clone() } })
            }
            FlowKind::Complement { quotient } => self.compile_complement(flow, quotient),
        }
    }

    fn compile_class(&self, flow: &Flow, class: ClassId, base: &Flow, arrow_name: &SmolStr) -> Result<Term, CompileError> {
        let table = self.table_of(class);

        if matches!(&**base, FlowKind::Scalar) {
            let tag = self.tag();
            let routing = AHashMap::from_iter([(flow.clone(), tag)]);
            return Ok(Term { tag, space: flow.clone(), routing, kind: TermKind::Table { class, table: table.name.clone() } });
        }

        let left = self.compile_flow(base)?;
        let base_class = self.class_of_flow(base).ok_or_else(|| CompileError::UnresolvedJoinBase { arrow: arrow_name.clone() })?;
        let arrow = self.graph.arrow_named(base_class, arrow_name).ok_or_else(|| CompileError::UnknownArrow { arrow: arrow_name.clone() })?;

        let (origin_columns, target_columns, join_kind) = match &arrow.kind {
            ArrowKind::DirectForeignKey { origin_columns, target_columns } => {
                (origin_columns, target_columns, if arrow.total { JoinKind::Inner } else { JoinKind::Left })
            }
            ArrowKind::ReverseForeignKey { origin_columns, target_columns } => (origin_columns, target_columns, JoinKind::Left),
            ArrowKind::Extent | ArrowKind::Attribute { .. } | ArrowKind::Calculated { .. } => {
                return Err(CompileError::UnknownArrow { arrow: arrow_name.clone() })
            }
        };

        let right_tag = self.tag();
        let right = Term { tag: right_tag, space: flow.clone(), routing: AHashMap::new(), kind: TermKind::Table { class, table: table.name.clone() } };

        let conditions: Vec<(Code, Code)> = origin_columns
            .iter()
            .zip(target_columns.iter())
            .map(|(oc, tc)| {
                let left_code = column_unit(oc.clone(), base.clone(), self.column_domain(base_class, oc));
                let right_code = column_unit(tc.clone(), flow.clone(), self.column_domain(class, tc));
                (left_code, right_code)
            })
            .collect();

        let tag = self.tag();
        let mut routing = left.routing.clone();
        routing.insert(flow.clone(), tag);
        Ok(Term { tag, space: flow.clone(), routing, kind: TermKind::Join { left: Box::new(left), right: Box::new(right), kind: join_kind, conditions } })
    }

    /// A complement's rows are exactly the quotient's pre-projection rows
    /// (§9 "cyclic schema references"): recompile the quotient's own base
    /// flow fresh, then register the complement flow on the same term so
    /// codes built against either identity resolve to it.
    fn compile_complement(&self, flow: &Flow, quotient: &Flow) -> Result<Term, CompileError> {
        let FlowKind::Quotient { base, .. } = &**quotient else {
            return Err(CompileError::Unsupported { what: "complement of a non-quotient flow".into() });
        };
        let mut inner = self.compile_flow(base)?;
        inner.routing.insert(flow.clone(), inner.tag);
        inner.space = flow.clone();
        Ok(inner)
    }
}

/// The innermost `Class` step of `flow`, walking past any `Filtered`/
/// `Ordered` wrapper a sieve or sort decorator added on top of it.
fn innermost_class_step(flow: &Flow) -> Option<(ClassId, Flow, SmolStr)> {
    match &**flow {
        FlowKind::Class { class, base, arrow } => Some((*class, base.clone(), arrow.clone())),
        FlowKind::Filtered { base, .. } | FlowKind::Ordered { base, .. } => innermost_class_step(base),
        _ => None,
    }
}

struct AggregateEntry {
    alias: SmolStr,
    signature: SmolStr,
    operand: Code,
    domain: Domain,
}

enum PendingValue {
    Scalar(Code),
    Nested(Term),
}

#[derive(Default)]
struct AggregatePlan {
    bundles: IndexMap<(Flow, Flow), Vec<AggregateEntry>>,
    counter: u32,
}

impl AggregatePlan {
    fn intern(&mut self, plural_flow: Flow, base_flow: Flow, signature: SmolStr, operand: Code, domain: Domain) -> SmolStr {
        let bucket = self.bundles.entry((plural_flow, base_flow)).or_default();
        if let Some(existing) = bucket.iter().find(|e| e.signature == signature && e.operand == operand) {
            return existing.alias.clone();
        }
        let alias = SmolStr::new(format!("agg_{}", self.counter));
        self.counter += 1;
        bucket.push(AggregateEntry { alias: alias.clone(), signature, operand, domain });
        alias
    }
}

#[cfg(test)]
mod tests {
    use htsql_catalog::{CatalogView, Column, ForeignKey, ModelGraph, Table, UniqueKey};
    use htsql_encoder::Encoder;

    use super::*;

    fn sample_catalog() -> CatalogView {
        let school = Table::new("school")
            .with_column(Column::new("code", Domain::String, false))
            .with_column(Column::new("name", Domain::String, false))
            .with_column(Column::new("campus", Domain::String, true))
            .with_unique_key(UniqueKey::new(vec!["code".into()], true));
        let department = Table::new("department")
            .with_column(Column::new("code", Domain::String, false))
            .with_column(Column::new("school_code", Domain::String, false))
            .with_unique_key(UniqueKey::new(vec!["code".into()], true))
            .with_foreign_key(ForeignKey::new(vec!["school_code".into()], "school", vec!["code".into()]));
        CatalogView::new("pgsql").with_table(school).with_table(department)
    }

    fn singular_reverse_catalog() -> CatalogView {
        let school = Table::new("school")
            .with_column(Column::new("code", Domain::String, false))
            .with_column(Column::new("name", Domain::String, false))
            .with_unique_key(UniqueKey::new(vec!["code".into()], true));
        let department = Table::new("department")
            .with_column(Column::new("code", Domain::String, false))
            .with_column(Column::new("school_code", Domain::String, false))
            .with_unique_key(UniqueKey::new(vec!["code".into()], true))
            .with_unique_key(UniqueKey::new(vec!["school_code".into()], false))
            .with_foreign_key(ForeignKey::new(vec!["school_code".into()], "school", vec!["code".into()]));
        CatalogView::new("pgsql").with_table(school).with_table(department)
    }

    fn compile_against(catalog: CatalogView, source: &str) -> Term {
        let graph = ModelGraph::build(&catalog).unwrap();
        let syntax = htsql_parser::parse_source(source).unwrap();
        let bound = htsql_binder::Binder::new(&graph).bind_query(&syntax).unwrap();
        let segment = Encoder::new(&graph).encode_query(&bound);
        Compiler::new(&catalog, &graph).compile_query(&segment).unwrap()
    }

    fn compile(source: &str) -> Term {
        compile_against(sample_catalog(), source)
    }

    #[test]
    fn plain_table_selection_needs_no_join() {
        let term = compile("/school{code, name}");
        let TermKind::Segment { child, .. } = &term.kind else { panic!() };
        let TermKind::Order { child, order, .. } = &child.kind else { panic!("expected the primary-key tie-break, got {child:?}") };
        assert_eq!(order.len(), 1);
        assert!(matches!(child.kind, TermKind::Table { .. }));
    }

    #[test]
    fn link_traversal_joins_the_target_table() {
        let term = compile("/department{code, school.name}");
        let TermKind::Segment { child, .. } = &term.kind else { panic!() };
        let TermKind::Order { child, .. } = &child.kind else { panic!("expected the primary-key tie-break, got {child:?}") };
        let TermKind::Join { left, right, kind, conditions } = &child.kind else { panic!("expected a join, got {child:?}") };
        assert!(matches!(left.kind, TermKind::Table { .. }));
        assert!(matches!(right.kind, TermKind::Table { .. }));
        assert_eq!(*kind, JoinKind::Inner);
        assert_eq!(conditions.len(), 1);
    }

    #[test]
    fn singular_reverse_link_is_still_a_left_join() {
        let term = compile_against(singular_reverse_catalog(), "/school{code, department.code}");
        let TermKind::Segment { child, .. } = &term.kind else { panic!() };
        let TermKind::Order { child, .. } = &child.kind else { panic!("expected the primary-key tie-break, got {child:?}") };
        let TermKind::Join { kind, .. } = &child.kind else { panic!() };
        assert_eq!(*kind, JoinKind::Left);
    }

    #[test]
    fn aggregate_bundles_into_one_left_joined_group_by() {
        let term = compile("/school{code, count(department), exists(department)}");
        let TermKind::Segment { child, items } = &term.kind else { panic!() };
        let TermKind::Order { child, .. } = &child.kind else { panic!("expected the primary-key tie-break, got {child:?}") };
        let TermKind::Join { right, .. } = &child.kind else { panic!("expected a join carrying the aggregate bundle") };
        let TermKind::Aggregate { columns, .. } = &right.kind else { panic!() };
        // Both aggregates group the same (plural, base) flow pair, so they
        // share one subquery with two output columns rather than one join
        // each.
        assert_eq!(columns.len(), 2);
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn explicit_sort_keeps_primary_key_as_a_trailing_tiebreak() {
        let term = compile("/school{code, name-}");
        let TermKind::Segment { child, .. } = &term.kind else { panic!() };
        let TermKind::Order { order, .. } = &child.kind else { panic!("expected an order term") };
        // The explicit `name-` key comes first, then `code` (the primary
        // key) is appended ascending as the deterministic tie-break.
        assert_eq!(order.len(), 2);
        assert_eq!(order[1].1, SortDirection::Ascending);
    }

    #[test]
    fn grouped_segment_gets_no_primary_key_tiebreak() {
        let term = compile("/school^campus{campus, count(school)}");
        let TermKind::Segment { child, .. } = &term.kind else { panic!() };
        // A quotient's rows have no single table's primary key left to
        // break ties on, so no `Order` term is injected here.
        assert!(!matches!(child.kind, TermKind::Order { .. }));
    }

    #[test]
    fn constant_arithmetic_is_folded_before_compiling() {
        let term = compile("/school{code, 2 + 3}");
        let TermKind::Segment { items, .. } = &term.kind else { panic!() };
        let SegmentValue::Scalar(code) = &items[1].1 else { panic!() };
        assert!(matches!(&**code, CodeKind::Literal { .. }));
    }
}
