mod common;

use common::fixture_catalog;
use htsql_dialect::DialectKind;

/// `/school{code, name}` selects the two visible columns of `school`,
/// ordered by its primary key, with no joins (scenario a).
#[test]
fn selecting_two_columns_needs_no_join_and_orders_by_primary_key() {
    let catalog = fixture_catalog();
    let output = htsql::compile(&catalog, DialectKind::Pgsql, "/school{code, name}").unwrap();

    assert_eq!(
        output.sql,
        r#"SELECT t0."code" AS "code", t0."name" AS "name" FROM "school" AS t0 ORDER BY t0."code" ASC"#
    );

    assert_eq!(output.profile.columns.len(), 2);
    assert_eq!(output.profile.columns[0].label, "code");
    assert_eq!(output.profile.columns[1].label, "name");
    assert!(!output.profile.columns[0].nullable);
    assert!(!output.profile.columns[1].nullable);
}

#[test]
fn sqlite_dialect_produces_the_same_structure_with_different_quoting() {
    let catalog = fixture_catalog();
    let output = htsql::compile(&catalog, DialectKind::Sqlite, "/school{code, name}").unwrap();

    assert!(output.sql.starts_with("SELECT"));
    assert!(output.sql.contains("FROM \"school\""));
    assert!(output.sql.ends_with("ORDER BY t0.\"code\" ASC"));
}
