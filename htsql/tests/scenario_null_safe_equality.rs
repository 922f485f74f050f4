mod common;

use common::fixture_catalog;
use htsql_dialect::DialectKind;

/// `==`/`!==` are null-safe: unlike `=`/`<>`, a null operand compares as a
/// value instead of making the whole predicate null. On pgsql this is a
/// native operator; other dialects fall back to an explicit `CASE`.
#[test]
fn pgsql_null_safe_equality_uses_is_not_distinct_from() {
    let catalog = fixture_catalog();
    let output = htsql::compile(&catalog, DialectKind::Pgsql, "/program?degree=='BS'{title}").unwrap();
    assert!(output.sql.contains(r#"WHERE (t0."degree" IS NOT DISTINCT FROM 'BS')"#));
}

#[test]
fn pgsql_negated_null_safe_equality_uses_is_distinct_from() {
    let catalog = fixture_catalog();
    let output = htsql::compile(&catalog, DialectKind::Pgsql, "/program?degree!=='BS'{title}").unwrap();
    assert!(output.sql.contains(r#"WHERE (t0."degree" IS DISTINCT FROM 'BS')"#));
}

#[test]
fn ordinary_equality_stays_three_valued() {
    let catalog = fixture_catalog();
    let output = htsql::compile(&catalog, DialectKind::Pgsql, "/program?degree='BS'{title}").unwrap();
    assert!(output.sql.contains(r#"WHERE (t0."degree" = 'BS')"#));
}

#[test]
fn mssql_null_safe_equality_falls_back_to_case() {
    let catalog = fixture_catalog();
    let output = htsql::compile(&catalog, DialectKind::Mssql, "/program?degree=='BS'{title}").unwrap();
    assert!(output
        .sql
        .contains(r#"CASE WHEN t0."degree" = 'BS' OR (t0."degree" IS NULL AND 'BS' IS NULL) THEN 1 ELSE 0 END"#));
}
