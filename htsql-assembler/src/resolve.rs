use ahash::AHashMap;
use htsql_dialect::Dialect;
use htsql_encoder::{Code, CodeKind, Flow};
use smol_str::SmolStr;

use crate::error::AssemblerError;

/// An already-rendered column this code resolves to once it crosses a
/// subquery boundary, plus the zero value to `COALESCE` it against when the
/// producing subquery can legitimately be absent (the left-joined aggregate
/// bundle's empty-group case, §8 "aggregate empty-set law").
#[derive(Debug, Clone)]
pub struct Resolved {
    pub sql: String,
    pub coalesce_default: Option<&'static str>,
}

/// Everything needed to render a `Code` into a SQL expression at one point
/// in the term tree: physical columns still reachable by table alias, plus
/// exact-code overrides for values a subquery has already materialized
/// under a synthesized output name.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    table_scope: AHashMap<Flow, SmolStr>,
    overrides: AHashMap<Code, Resolved>,
}

impl Scope {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bind_table(&mut self, flow: Flow, alias: SmolStr) {
        self.table_scope.insert(flow, alias);
    }

    pub fn bind_override(&mut self, code: Code, resolved: Resolved) {
        self.overrides.insert(code, resolved);
    }

    /// The union of two independently-assembled scopes (a join's two
    /// sides). Overrides from either side remain valid since `Code` keys
    /// are content-addressed, not positional.
    pub fn merged_with(mut self, other: Scope) -> Self {
        self.table_scope.extend(other.table_scope);
        self.overrides.extend(other.overrides);
        self
    }
}

pub fn render_code(code: &Code, scope: &Scope, dialect: &Dialect) -> Result<String, AssemblerError> {
    if let Some(resolved) = scope.overrides.get(code) {
        return Ok(match resolved.coalesce_default {
            Some(default) => format!("COALESCE({}, {default})", resolved.sql),
            None => resolved.sql.clone(),
        });
    }

    match &**code {
        CodeKind::Literal { value, domain } => Ok(render_literal(value, domain, dialect)),
        CodeKind::Cast { inner, target } => {
            let inner_sql = render_code(inner, scope, dialect)?;
            let type_name = dialect.sql_type_name(target)?;
            Ok(format!("CAST({inner_sql} AS {type_name})"))
        }
        CodeKind::Formula { signature, operands, domain } => render_formula(signature, operands, domain, scope, dialect),
        CodeKind::Column { column, flow, .. } => {
            let alias = scope
                .table_scope
                .get(flow)
                .ok_or_else(|| AssemblerError::UnresolvedColumn { column: column.clone() })?;
            let quoted = dialect.quote_identifier(column)?;
            Ok(format!("{alias}.{quoted}"))
        }
        CodeKind::Compound { code, .. } => render_code(code, scope, dialect),
        CodeKind::Kernel { .. } => {
            Err(AssemblerError::Unsupported { what: "a kernel reference with no recorded projection override".into() })
        }
        CodeKind::Covering { .. } => Ok("1".to_string()),
        CodeKind::Aggregate { .. } => {
            Err(AssemblerError::Unsupported { what: "an aggregate code reaching the assembler unbundled".into() })
        }
    }
}

fn render_literal(value: &htsql_binder::LiteralValue, domain: &htsql_ast::Domain, dialect: &Dialect) -> String {
    use htsql_binder::LiteralValue;
    match value {
        LiteralValue::Integer(text) | LiteralValue::Decimal(text) | LiteralValue::Float(text) => text.to_string(),
        LiteralValue::String(text) => {
            if matches!(domain, htsql_ast::Domain::Boolean) {
                let is_true = text.eq_ignore_ascii_case("true");
                dialect.boolean_literal(is_true).to_string()
            } else {
                dialect.string_literal(text)
            }
        }
    }
}

fn render_formula(
    signature: &str,
    operands: &[Code],
    domain: &htsql_ast::Domain,
    scope: &Scope,
    dialect: &Dialect,
) -> Result<String, AssemblerError> {
    let rendered: Vec<String> = operands.iter().map(|o| render_code(o, scope, dialect)).collect::<Result<_, _>>()?;

    let infix = |op: &str, rendered: &[String]| format!("({} {op} {})", rendered[0], rendered[1]);

    Ok(match signature {
        "or" => infix("OR", &rendered),
        "and" => infix("AND", &rendered),
        "eq" => infix("=", &rendered),
        "ne" => infix("<>", &rendered),
        "equal" => dialect.null_safe_equality(&rendered[0], &rendered[1], false),
        "not_equal" => dialect.null_safe_equality(&rendered[0], &rendered[1], true),
        "lt" => infix("<", &rendered),
        "le" => infix("<=", &rendered),
        "gt" => infix(">", &rendered),
        "ge" => infix(">=", &rendered),
        "add" => {
            if matches!(domain, htsql_ast::Domain::String) {
                dialect.concat(&rendered)
            } else {
                infix("+", &rendered)
            }
        }
        "sub" => infix("-", &rendered),
        "mul" => infix("*", &rendered),
        "div" => infix("/", &rendered),
        "not" => format!("(NOT {})", rendered[0]),
        "neg" => format!("(-{})", rendered[0]),
        "matches" | "not_matches" => {
            let keyword = dialect.like_keyword(false).unwrap_or("LIKE");
            let pattern = format!("'%' || {} || '%'", rendered[1]);
            let predicate = format!("{} {keyword} {pattern}", rendered[0]);
            if signature == "not_matches" {
                format!("(NOT {predicate})")
            } else {
                format!("({predicate})")
            }
        }
        "list" => format!("({})", rendered.join(", ")),
        // Any other signature is a named scalar function call (`upper`,
        // `length`, a user-defined calculated field, ...): render verbatim
        // uppercased, the one spelling that works unmodified across every
        // backend in the dialect table.
        other => format!("{}({})", other.to_ascii_uppercase(), rendered.join(", ")),
    })
}
