use ahash::AHashMap;
use htsql_ast::{Domain, SortDirection};
use htsql_catalog::{CatalogView, ClassId, ClassKind, ModelGraph};
use htsql_compiler::{AggregateColumn, JoinKind, SegmentValue, Term, TermKind};
use htsql_dialect::Dialect;
use htsql_encoder::{Code, CodeKind, Flow};
use smol_str::SmolStr;

use crate::alias::AliasAllocator;
use crate::error::AssemblerError;
use crate::frame::{render_select, Frame, JoinFrame, LeafFrame, NestedFrame, ScalarFrame};
use crate::profile::{OutputColumn, OutputProfile};
use crate::resolve::{render_code, Resolved, Scope};

/// The result of a `compile` call: finished SQL text and the shape of the
/// rows it returns (§4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOutput {
    pub sql: String,
    pub profile: OutputProfile,
}

/// The part of assembling a subtree that isn't yet a finished `SELECT`:
/// the `FROM`-item built so far, the scope it makes resolvable, and any
/// predicate/order/paging clauses still waiting for an enclosing frame to
/// apply them.
struct Assembled {
    frame: Frame,
    scope: Scope,
    predicates: Vec<String>,
    order_by: Vec<(String, SortDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
    /// `true` once a table/join in this subtree was reached only via a
    /// `LEFT JOIN` — every column below is then nullable regardless of its
    /// catalog declaration (§4.6 "nullability propagation").
    outer_joined: bool,
}

impl Assembled {
    fn leaf(frame: Frame, scope: Scope) -> Self {
        Self { frame, scope, predicates: Vec::new(), order_by: Vec::new(), limit: None, offset: None, outer_joined: false }
    }
}

pub struct Assembler<'g> {
    catalog: &'g CatalogView,
    graph: &'g ModelGraph,
    dialect: Dialect,
    alias: AliasAllocator,
}

impl<'g> Assembler<'g> {
    pub fn new(catalog: &'g CatalogView, graph: &'g ModelGraph, dialect: Dialect) -> Self {
        Self { catalog, graph, dialect, alias: AliasAllocator::new() }
    }

    pub fn assemble(&self, term: &Term) -> Result<CompileOutput, AssemblerError> {
        let TermKind::Segment { child, items } = &term.kind else {
            return Err(AssemblerError::Unsupported { what: "a term tree not rooted in a Segment".into() });
        };

        let assembled = self.assemble_term(child)?;
        let mut columns = Vec::with_capacity(items.len());
        let mut profile_columns = Vec::with_capacity(items.len());

        for (label, value) in items {
            match value {
                SegmentValue::Scalar(code) => {
                    let sql = render_code(code, &assembled.scope, &self.dialect)?;
                    columns.push((label.clone(), sql));
                    profile_columns.push(OutputColumn {
                        label: label.clone(),
                        domain: htsql_encoder::code::domain_of(code),
                        nullable: self.is_nullable(code, assembled.outer_joined),
                        nested: None,
                    });
                }
                SegmentValue::Nested(nested_term) => {
                    let nested_output = self.assemble(nested_term)?;
                    let inline_alias = self.alias.next();
                    columns.push((label.clone(), self.correlated_list_placeholder(&nested_output.sql, &inline_alias)));
                    profile_columns.push(OutputColumn {
                        label: label.clone(),
                        domain: Domain::List(Box::new(Domain::Record(label.clone()))),
                        nullable: false,
                        nested: Some(nested_output.profile),
                    });
                }
            }
        }

        let nested = NestedFrame {
            alias: self.alias.next(),
            columns,
            from: Box::new(assembled.frame),
            predicates: assembled.predicates,
            group_by: Vec::new(),
            order_by: assembled.order_by,
            limit: assembled.limit,
            offset: assembled.offset,
        };
        let sql = render_select(&nested, &self.dialect)?;
        Ok(CompileOutput { sql, profile: OutputProfile::new(profile_columns) })
    }

    /// A nested segment is a distinct statement rather than a SQL subquery
    /// expression (no portable correlated-array literal exists across the
    /// dialect table) — it is assembled and returned as its own `CompileOutput`
    /// alongside the profile that marks it as nested; this placeholder keeps
    /// the outer column list aligned one-to-one with `items` until a caller
    /// runs the nested statement itself.
    fn correlated_list_placeholder(&self, nested_sql: &str, alias: &SmolStr) -> String {
        format!("/* nested: {nested_sql} */ NULL AS {alias}_placeholder")
    }

    fn is_nullable(&self, code: &Code, outer_joined: bool) -> bool {
        if outer_joined {
            return true;
        }
        match &**code {
            CodeKind::Literal { .. } => false,
            CodeKind::Column { column, flow, .. } => {
                self.class_of_flow(flow).map(|class| self.table_of(class).column(column).map(|c| c.nullable).unwrap_or(true)).unwrap_or(true)
            }
            CodeKind::Cast { inner, .. } | CodeKind::Compound { code: inner, .. } => self.is_nullable(inner, outer_joined),
            CodeKind::Formula { operands, .. } => operands.iter().any(|o| self.is_nullable(o, outer_joined)),
            CodeKind::Kernel { .. } => true,
            CodeKind::Covering { .. } => false,
            CodeKind::Aggregate { signature, .. } => !matches!(signature.as_str(), "count" | "exists" | "every" | "sum"),
        }
    }

    fn table_of(&self, class: ClassId) -> &'g htsql_catalog::Table {
        match &self.graph.class(class).kind {
            ClassKind::Table { table_index } => &self.catalog.tables[*table_index],
            ClassKind::Unit => unreachable!("the unit class has no backing table"),
        }
    }

    fn class_of_flow(&self, flow: &Flow) -> Option<ClassId> {
        use htsql_encoder::FlowKind;
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

    fn assemble_term(&self, term: &Term) -> Result<Assembled, AssemblerError> {
        match &term.kind {
            TermKind::Scalar => Ok(Assembled::leaf(Frame::Scalar(ScalarFrame), Scope::empty())),
            TermKind::Table { class, table } => {
                let alias = self.alias.next();
                let mut scope = Scope::empty();
                scope.bind_table(term.space.clone(), alias.clone());
                Ok(Assembled::leaf(Frame::Leaf(LeafFrame { alias, table: table.clone() }), scope))
            }
            TermKind::Filter { child, predicate } => {
                let mut assembled = self.assemble_term(child)?;
                let sql = render_code(predicate, &assembled.scope, &self.dialect)?;
                assembled.predicates.push(sql);
                Ok(assembled)
            }
            TermKind::Order { child, order, limit, offset } => {
                let mut assembled = self.assemble_term(child)?;
                assembled.order_by = order
                    .iter()
                    .map(|(code, direction)| Ok((render_code(code, &assembled.scope, &self.dialect)?, *direction)))
                    .collect::<Result<_, AssemblerError>>()?;
                assembled.limit = *limit;
                assembled.offset = *offset;
                Ok(assembled)
            }
            TermKind::Join { left, right, kind, conditions } => self.assemble_join(left, right, *kind, conditions),
            TermKind::Projection { child, kernel } => self.assemble_grouped(child, kernel, &[], term.space.clone(), true),
            TermKind::Aggregate { child, kernel, columns, base_flow } => {
                self.assemble_grouped(child, kernel, columns, base_flow.clone(), false)
            }
            TermKind::Wrapper { child } => self.assemble_term(child),
            TermKind::Segment { .. } => Err(AssemblerError::Unsupported { what: "a nested Segment reached outside assemble()".into() }),
        }
    }

    fn assemble_join(&self, left: &Term, right: &Term, kind: JoinKind, conditions: &[(Code, Code)]) -> Result<Assembled, AssemblerError> {
        let left_assembled = self.assemble_term(left)?;
        let right_assembled = self.assemble_term(right)?;

        let on = conditions
            .iter()
            .map(|(l, r)| {
                let left_sql = render_code(l, &left_assembled.scope, &self.dialect)?;
                let right_sql = render_code(r, &right_assembled.scope, &self.dialect)?;
                Ok(format!("{left_sql} = {right_sql}"))
            })
            .collect::<Result<Vec<_>, AssemblerError>>()?;

        let mut predicates = left_assembled.predicates;
        predicates.extend(right_assembled.predicates);

        let frame = Frame::Join(JoinFrame {
            left: Box::new(left_assembled.frame),
            right: Box::new(right_assembled.frame),
            kind,
            on,
        });

        Ok(Assembled {
            frame,
            scope: left_assembled.scope.merged_with(right_assembled.scope),
            predicates,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            outer_joined: left_assembled.outer_joined || right_assembled.outer_joined || matches!(kind, JoinKind::Left),
        })
    }

    /// Materializes a grouping boundary (`Projection` or bundled
    /// `Aggregate`) as its own `NestedFrame`, and registers, in the scope
    /// returned to the caller, an exact-code override for every kernel
    /// element (and, for an aggregate, every bundled column) so that a
    /// sibling or outer reference to the same content-addressed `Code`
    /// resolves to this subquery's output alias instead of recursing
    /// through columns no longer reachable from outside it.
    fn assemble_grouped(
        &self,
        child: &Term,
        kernel: &[Code],
        columns: &[AggregateColumn],
        space: Flow,
        drop_null_kernel: bool,
    ) -> Result<Assembled, AssemblerError> {
        let inner = self.assemble_term(child)?;

        let mut select_columns = Vec::with_capacity(kernel.len() + columns.len());
        let mut kernel_exprs = Vec::with_capacity(kernel.len());

        for (index, key) in kernel.iter().enumerate() {
            let synth = SmolStr::new(format!("k{index}"));
            let expr = render_code(key, &inner.scope, &self.dialect)?;
            kernel_exprs.push(expr.clone());
            select_columns.push((synth, expr));
        }

        for column in columns {
            let expr = render_aggregate_operand(&column.signature, &column.operand, &inner.scope, &self.dialect)?;
            select_columns.push((column.alias.clone(), expr));
        }

        let alias = self.alias.next();

        // Every kernel element and bundled column is keyed by the exact
        // `Code` the compiler reused for it, so any later reference to the
        // same content resolves here instead of recursing into columns no
        // longer reachable from outside this subquery.
        let mut scope = Scope::empty();
        for (index, key) in kernel.iter().enumerate() {
            scope.bind_override(key.clone(), Resolved { sql: format!("{alias}.k{index}"), coalesce_default: None });
        }
        for column in columns {
            let coalesce_default = match column.signature.as_str() {
                "count" | "sum" => Some("0"),
                "exists" => Some("false"),
                "every" => Some("true"),
                _ => None,
            };
            let placeholder_code =
                htsql_encoder::code::column_unit(column.alias.clone(), space.clone(), column.domain.clone());
            scope.bind_override(placeholder_code, Resolved { sql: format!("{alias}.{}", column.alias), coalesce_default });
        }

        // Oracle and MSSQL reject `GROUP BY` naming a SELECT-list alias, so
        // the grouping expressions are repeated verbatim here rather than
        // referencing `k0, k1, ...` by name.
        let group_by = select_columns[..kernel.len()].iter().map(|(_, expr)| expr.clone()).collect();

        // A projection's grouping classes are defined by distinct kernel
        // values; a row whose kernel is null belongs to no class and is
        // dropped rather than forming a null-keyed group. Aggregate
        // bundling reuses this same machinery with join keys standing in
        // for a kernel, which must NOT be null-filtered the same way.
        let mut predicates = inner.predicates;
        if drop_null_kernel {
            predicates.extend(kernel_exprs.into_iter().map(|expr| format!("{expr} IS NOT NULL")));
        }

        let frame = Frame::Nested(NestedFrame {
            alias,
            columns: select_columns,
            from: Box::new(inner.frame),
            predicates,
            group_by,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        });

        Ok(Assembled {
            frame,
            scope,
            predicates: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            outer_joined: false,
        })
    }
}

fn render_aggregate_operand(signature: &str, operand: &Code, scope: &Scope, dialect: &Dialect) -> Result<String, AssemblerError> {
    let is_covering = matches!(&**operand, CodeKind::Covering { .. });
    let operand_sql = if is_covering { "*".to_string() } else { render_code(operand, scope, dialect)? };

    Ok(match signature {
        "count" => format!("COUNT({operand_sql})"),
        "exists" => {
            if is_covering {
                "(COUNT(*) > 0)".to_string()
            } else {
                format!("(COUNT(CASE WHEN {operand_sql} THEN 1 END) > 0)")
            }
        }
        "every" => format!("(MIN(CASE WHEN {operand_sql} THEN 1 ELSE 0 END) = 1)"),
        "sum" => format!("SUM({operand_sql})"),
        "avg" => format!("AVG({operand_sql})"),
        "min" => format!("MIN({operand_sql})"),
        "max" => format!("MAX({operand_sql})"),
        other => format!("{}({operand_sql})", other.to_ascii_uppercase()),
    })
}
