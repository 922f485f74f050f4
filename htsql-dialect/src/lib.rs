//! Per-engine SQL rendering differences (§4.7): every choice that varies by
//! backend — paging, boolean representation, string concatenation, `LIKE`
//! casing, identifier quoting and length limits, integer division — is
//! concentrated here so that no earlier phase needs to know which engine it
//! is compiling for.

pub mod dialect;
pub mod error;
pub mod kind;
pub mod paging;

pub use dialect::Dialect;
pub use error::DialectError;
pub use kind::DialectKind;
pub use paging::{ConcatStyle, LikeCasing, PagingStyle};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pgsql_quotes_with_double_quotes_and_dedupes_embedded_quotes() {
        let dialect = Dialect::for_kind(DialectKind::Pgsql);
        assert_eq!(dialect.quote_identifier("weird\"name").unwrap(), "\"weird\"\"name\"");
    }

    #[test]
    fn mysql_quotes_with_backticks() {
        let dialect = Dialect::for_kind(DialectKind::Mysql);
        assert_eq!(dialect.quote_identifier("school").unwrap(), "`school`");
    }

    #[test]
    fn identifier_over_the_limit_is_rejected() {
        let dialect = Dialect::for_kind(DialectKind::Mysql);
        let long_name = "x".repeat(65);
        assert!(matches!(
            dialect.quote_identifier(&long_name),
            Err(DialectError::IdentifierTooLong { limit: 64, .. })
        ));
    }

    #[test]
    fn non_native_boolean_dialects_render_zero_and_one() {
        let dialect = Dialect::for_kind(DialectKind::Mysql);
        assert_eq!(dialect.boolean_literal(true), "1");
        assert_eq!(dialect.boolean_literal(false), "0");
    }

    #[test]
    fn native_boolean_dialects_render_keywords() {
        let dialect = Dialect::for_kind(DialectKind::Pgsql);
        assert_eq!(dialect.boolean_literal(true), "true");
    }

    #[test]
    fn concat_style_follows_dialect() {
        let parts = vec!["a".to_string(), "b".to_string()];
        assert_eq!(Dialect::for_kind(DialectKind::Pgsql).concat(&parts), "a || b");
        assert_eq!(Dialect::for_kind(DialectKind::Mysql).concat(&parts), "CONCAT(a, b)");
    }

    #[test]
    fn oracle_has_no_ilike_keyword() {
        let dialect = Dialect::for_kind(DialectKind::Oracle);
        assert_eq!(dialect.like_keyword(false), Some("LIKE"));
        assert_eq!(dialect.like_keyword(true), None);
    }

    #[test]
    fn kind_name_is_snake_case() {
        assert_eq!(DialectKind::Pgsql.name(), "pgsql");
        assert_eq!(DialectKind::Mssql.name(), "mssql");
    }

    #[test]
    fn pgsql_null_safe_equality_uses_is_not_distinct_from() {
        let dialect = Dialect::for_kind(DialectKind::Pgsql);
        assert_eq!(dialect.null_safe_equality("a", "b", false), "(a IS NOT DISTINCT FROM b)");
        assert_eq!(dialect.null_safe_equality("a", "b", true), "(a IS DISTINCT FROM b)");
    }

    #[test]
    fn sqlite_null_safe_equality_uses_is() {
        let dialect = Dialect::for_kind(DialectKind::Sqlite);
        assert_eq!(dialect.null_safe_equality("a", "b", false), "(a IS b)");
        assert_eq!(dialect.null_safe_equality("a", "b", true), "(a IS NOT b)");
    }

    #[test]
    fn mysql_null_safe_equality_uses_null_safe_operator() {
        let dialect = Dialect::for_kind(DialectKind::Mysql);
        assert_eq!(dialect.null_safe_equality("a", "b", false), "(a <=> b)");
        assert_eq!(dialect.null_safe_equality("a", "b", true), "(NOT (a <=> b))");
    }

    #[test]
    fn oracle_null_safe_equality_falls_back_to_case() {
        let dialect = Dialect::for_kind(DialectKind::Oracle);
        assert_eq!(
            dialect.null_safe_equality("a", "b", false),
            "(CASE WHEN a = b OR (a IS NULL AND b IS NULL) THEN 1 ELSE 0 END)"
        );
        assert_eq!(
            dialect.null_safe_equality("a", "b", true),
            "(CASE WHEN a = b OR (a IS NULL AND b IS NULL) THEN 0 ELSE 1 END)"
        );
    }
}
