use htsql_ast::SortDirection;
use htsql_compiler::JoinKind;
use htsql_dialect::{Dialect, PagingStyle};
use smol_str::SmolStr;

use crate::error::AssemblerError;

/// A single physical table reference: `table AS alias`.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafFrame {
    pub alias: SmolStr,
    pub table: SmolStr,
}

/// Two frames combined with a join condition. Left-deep, mirroring the
/// term tree's own `Join` shape.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinFrame {
    pub left: Box<Frame>,
    pub right: Box<Frame>,
    pub kind: JoinKind,
    pub on: Vec<String>,
}

/// A self-contained `SELECT`: the unit the assembler creates at every
/// grouping or final-projection boundary (Projection, Aggregate, Segment).
/// Nested inside another frame's `FROM`, it is parenthesized and aliased;
/// as the outermost frame of a query it is rendered bare.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedFrame {
    pub alias: SmolStr,
    pub columns: Vec<(SmolStr, String)>,
    pub from: Box<Frame>,
    pub predicates: Vec<String>,
    pub group_by: Vec<String>,
    pub order_by: Vec<(String, SortDirection)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Marks a `NestedFrame`'s `from` as having no table access at all: `SELECT
/// <items>` with no `FROM` (or `FROM dual` on dialects that require one).
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarFrame;

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Leaf(LeafFrame),
    Join(JoinFrame),
    Nested(NestedFrame),
    Scalar(ScalarFrame),
}

/// Renders `frame` as it appears inside a surrounding `FROM` clause (a
/// nested frame is parenthesized and aliased; a scalar frame cannot appear
/// here since it never has rows to join against).
pub fn render_from_item(frame: &Frame, dialect: &Dialect) -> Result<String, AssemblerError> {
    match frame {
        Frame::Leaf(leaf) => {
            let table = dialect.quote_identifier(&leaf.table)?;
            Ok(format!("{table} AS {}", leaf.alias))
        }
        Frame::Join(join) => {
            let left = render_from_item(&join.left, dialect)?;
            let right = render_from_item(&join.right, dialect)?;
            let keyword = match join.kind {
                JoinKind::Inner => "JOIN",
                JoinKind::Left => "LEFT JOIN",
                JoinKind::Cross => "CROSS JOIN",
            };
            if join.on.is_empty() || matches!(join.kind, JoinKind::Cross) {
                Ok(format!("{left} {keyword} {right}"))
            } else {
                Ok(format!("{left} {keyword} {right} ON {}", join.on.join(" AND ")))
            }
        }
        Frame::Nested(nested) => {
            let select = render_select(nested, dialect)?;
            Ok(format!("({select}) AS {}", nested.alias))
        }
        Frame::Scalar(_) => Err(AssemblerError::Unsupported { what: "a scalar frame inside a FROM clause".into() }),
    }
}

/// Renders `nested` as a full statement: `SELECT ... FROM ... [WHERE ...]
/// [GROUP BY ...] [ORDER BY ...] [paging]`. Used both for the outermost
/// query and, parenthesized by the caller, for any nested subquery.
pub fn render_select(nested: &NestedFrame, dialect: &Dialect) -> Result<String, AssemblerError> {
    let columns = nested
        .columns
        .iter()
        .map(|(label, expr)| Ok(format!("{expr} AS {}", dialect.quote_identifier(label)?)))
        .collect::<Result<Vec<_>, AssemblerError>>()?
        .join(", ");

    let mut sql = match &*nested.from {
        Frame::Scalar(_) => match dialect.scalar_from_clause() {
            Some(table) => format!("SELECT {columns} FROM {table}"),
            None => format!("SELECT {columns}"),
        },
        from => format!("SELECT {columns} FROM {}", render_from_item(from, dialect)?),
    };
    if !nested.predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&nested.predicates.join(" AND "));
    }
    if !nested.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&nested.group_by.join(", "));
    }

    let order_sql = render_order_by(&nested.order_by);
    if matches!(dialect.paging(), PagingStyle::RowNumber) && (nested.limit.is_some() || nested.offset.is_some()) {
        return Ok(render_row_number_paging(&sql, &order_sql, nested.limit, nested.offset));
    }

    if !order_sql.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_sql);
    }

    match dialect.paging() {
        PagingStyle::LimitOffset => {
            if let Some(limit) = nested.limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }
            if let Some(offset) = nested.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }
        PagingStyle::FetchFirst => {
            if let Some(offset) = nested.offset {
                sql.push_str(&format!(" OFFSET {offset} ROWS"));
            } else if nested.limit.is_some() {
                sql.push_str(" OFFSET 0 ROWS");
            }
            if let Some(limit) = nested.limit {
                sql.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
            }
        }
        PagingStyle::RowNumber => unreachable!("handled above"),
    }

    Ok(sql)
}

fn render_order_by(order_by: &[(String, SortDirection)]) -> String {
    order_by
        .iter()
        .map(|(expr, direction)| {
            let keyword = match direction {
                SortDirection::Ascending => "ASC",
                SortDirection::Descending => "DESC",
            };
            format!("{expr} {keyword}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Oracle-style pagination: a backend with no `LIMIT`/`FETCH FIRST` clause
/// gets a `ROW_NUMBER()` window wrapped around the base query and filtered
/// in an outer `SELECT` (§4.7 "paging").
fn render_row_number_paging(base_sql: &str, order_sql: &str, limit: Option<u64>, offset: Option<u64>) -> String {
    let order_clause = if order_sql.is_empty() { "ORDER BY 1".to_string() } else { format!("ORDER BY {order_sql}") };
    let offset = offset.unwrap_or(0);
    let lower = offset;
    let wrapped = format!(
        "SELECT * FROM (SELECT ranked.*, ROW_NUMBER() OVER ({order_clause}) AS rn__ FROM ({base_sql}) ranked) paged WHERE rn__ > {lower}"
    );
    match limit {
        Some(limit) => format!("{wrapped} AND rn__ <= {}", lower + limit),
        None => wrapped,
    }
}
