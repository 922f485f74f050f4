use htsql_ast::Domain;
use smol_str::SmolStr;

use crate::error::DialectError;
use crate::kind::DialectKind;
use crate::paging::{ConcatStyle, LikeCasing, PagingStyle};

/// A per-engine record of every primitive the assembler must render
/// differently (§4.7). Every dialect-sensitive choice in the serializer
/// goes through one of these methods; nothing downstream of the compiler
/// branches on `DialectKind` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub kind: DialectKind,
    /// `true` when the backend has a native boolean type; otherwise boolean
    /// values are rendered as `0`/`1` and comparisons need an explicit
    /// `CASE` wrapper to produce one in a `SELECT` list.
    native_boolean: bool,
    paging: PagingStyle,
    concat: ConcatStyle,
    like_casing: LikeCasing,
    quote_char: char,
    /// `true` when `/` between two integers truncates toward zero natively;
    /// otherwise an explicit `CAST .. AS integer` (or equivalent) wrapper is
    /// required to avoid the dialect returning a decimal.
    native_integer_division: bool,
    max_identifier_length: usize,
}

impl Dialect {
    pub fn for_kind(kind: DialectKind) -> Self {
        match kind {
            DialectKind::Pgsql => Self {
                kind,
                native_boolean: true,
                paging: PagingStyle::LimitOffset,
                concat: ConcatStyle::Operator,
                like_casing: LikeCasing::SensitiveWithIlike,
                quote_char: '"',
                native_integer_division: true,
                max_identifier_length: 63,
            },
            DialectKind::Sqlite => Self {
                kind,
                native_boolean: false,
                paging: PagingStyle::LimitOffset,
                concat: ConcatStyle::Operator,
                like_casing: LikeCasing::InsensitiveByDefault,
                quote_char: '"',
                native_integer_division: true,
                max_identifier_length: 1_000_000_000,
            },
            DialectKind::Mysql => Self {
                kind,
                native_boolean: false,
                paging: PagingStyle::LimitOffset,
                concat: ConcatStyle::Function,
                like_casing: LikeCasing::InsensitiveByDefault,
                quote_char: '`',
                native_integer_division: false,
                max_identifier_length: 64,
            },
            DialectKind::Oracle => Self {
                kind,
                native_boolean: false,
                paging: PagingStyle::RowNumber,
                concat: ConcatStyle::Operator,
                like_casing: LikeCasing::SensitiveNoIlike,
                quote_char: '"',
                native_integer_division: false,
                max_identifier_length: 128,
            },
            DialectKind::Mssql => Self {
                kind,
                native_boolean: false,
                paging: PagingStyle::FetchFirst,
                concat: ConcatStyle::Function,
                like_casing: LikeCasing::InsensitiveByDefault,
                quote_char: '"',
                native_integer_division: true,
                max_identifier_length: 128,
            },
        }
    }

    pub fn native_boolean(&self) -> bool {
        self.native_boolean
    }

    pub fn paging(&self) -> PagingStyle {
        self.paging
    }

    pub fn concat_style(&self) -> ConcatStyle {
        self.concat
    }

    pub fn like_casing(&self) -> LikeCasing {
        self.like_casing
    }

    pub fn native_integer_division(&self) -> bool {
        self.native_integer_division
    }

    pub fn max_identifier_length(&self) -> usize {
        self.max_identifier_length
    }

    /// Wraps `identifier` in this dialect's quoting, doubling any embedded
    /// quote character, and validates it against the length limit.
    pub fn quote_identifier(&self, identifier: &str) -> Result<SmolStr, DialectError> {
        if identifier.chars().count() > self.max_identifier_length {
            return Err(DialectError::IdentifierTooLong {
                dialect: self.kind,
                identifier: identifier.to_owned(),
                limit: self.max_identifier_length,
            });
        }
        let escaped = identifier.replace(self.quote_char, &format!("{0}{0}", self.quote_char));
        Ok(SmolStr::new(format!("{0}{1}{0}", self.quote_char, escaped)))
    }

    /// Renders a single-quoted string literal, doubling embedded quotes.
    pub fn string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Renders a boolean literal the way this backend expects it in a
    /// `SELECT` list or predicate position.
    pub fn boolean_literal(&self, value: bool) -> &'static str {
        if self.native_boolean {
            if value { "true" } else { "false" }
        } else if value {
            "1"
        } else {
            "0"
        }
    }

    /// Concatenates already-rendered SQL fragments per [`ConcatStyle`].
    pub fn concat(&self, parts: &[String]) -> String {
        match self.concat {
            ConcatStyle::Operator => parts.join(" || "),
            ConcatStyle::Function => format!("CONCAT({})", parts.join(", ")),
        }
    }

    /// The `LIKE`/`ILIKE` keyword to use for a given requested case
    /// sensitivity, or `None` when the comparison needs `UPPER`/`LOWER`
    /// emulation instead of a keyword ([`LikeCasing::SensitiveNoIlike`]).
    pub fn like_keyword(&self, case_insensitive: bool) -> Option<&'static str> {
        match (self.like_casing, case_insensitive) {
            (LikeCasing::SensitiveWithIlike, true) => Some("ILIKE"),
            (LikeCasing::SensitiveWithIlike, false) => Some("LIKE"),
            (LikeCasing::InsensitiveByDefault, _) => Some("LIKE"),
            (LikeCasing::SensitiveNoIlike, false) => Some("LIKE"),
            (LikeCasing::SensitiveNoIlike, true) => None,
        }
    }

    pub fn reject_unsupported_domain(&self, domain: &Domain) -> Result<(), DialectError> {
        match (self.kind, domain) {
            // Every dialect here can fall back to representing an enum as a
            // checked string column, so nothing is actually unsupported yet;
            // the hook exists for a future backend that truly cannot.
            _ => Ok(()),
        }
    }

    /// Renders null-safe equality (`==`/`!==`): unlike `=`/`<>`, a null
    /// operand compares as a value rather than propagating to null.
    /// `negate` selects `!==` over `==`.
    pub fn null_safe_equality(&self, lhs: &str, rhs: &str, negate: bool) -> String {
        match self.kind {
            DialectKind::Pgsql => {
                if negate { format!("({lhs} IS DISTINCT FROM {rhs})") } else { format!("({lhs} IS NOT DISTINCT FROM {rhs})") }
            }
            DialectKind::Sqlite => {
                if negate { format!("({lhs} IS NOT {rhs})") } else { format!("({lhs} IS {rhs})") }
            }
            DialectKind::Mysql => {
                if negate { format!("(NOT ({lhs} <=> {rhs}))") } else { format!("({lhs} <=> {rhs})") }
            }
            DialectKind::Oracle | DialectKind::Mssql => {
                let (then, otherwise) = if negate {
                    (self.boolean_literal(false), self.boolean_literal(true))
                } else {
                    (self.boolean_literal(true), self.boolean_literal(false))
                };
                format!("(CASE WHEN {lhs} = {rhs} OR ({lhs} IS NULL AND {rhs} IS NULL) THEN {then} ELSE {otherwise} END)")
            }
        }
    }

    /// The table name a `FROM`-less `SELECT` needs on backends with no
    /// implicit one-row relation, or `None` where `SELECT <expr>` alone is
    /// valid.
    pub fn scalar_from_clause(&self) -> Option<&'static str> {
        match self.kind {
            DialectKind::Oracle => Some("dual"),
            _ => None,
        }
    }

    /// The `CAST(.. AS <type>)` spelling for `domain` on this backend.
    pub fn sql_type_name(&self, domain: &Domain) -> Result<SmolStr, DialectError> {
        let name = match (self.kind, domain) {
            (_, Domain::Boolean) if self.native_boolean => "boolean",
            (_, Domain::Boolean) => "integer",
            (_, Domain::Integer) => "integer",
            (_, Domain::Decimal) => "decimal",
            (DialectKind::Mysql | DialectKind::Mssql, Domain::Float) => "float",
            (_, Domain::Float) => "double precision",
            (DialectKind::Mssql, Domain::String) | (DialectKind::Mssql, Domain::Enum(_)) => "nvarchar(max)",
            (_, Domain::String) | (_, Domain::Enum(_)) => "varchar",
            (_, Domain::Date) => "date",
            (_, Domain::Time) => "time",
            (DialectKind::Mssql, Domain::DateTime) => "datetime2",
            (_, Domain::DateTime) => "timestamp",
            (_, Domain::Untyped) => "varchar",
            (_, Domain::Record(_) | Domain::List(_) | Domain::Void) => {
                return Err(DialectError::unsupported_domain(self.kind, domain))
            }
        };
        Ok(SmolStr::new(name))
    }
}
