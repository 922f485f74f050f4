mod common;

use common::fixture_catalog;
use htsql_dialect::DialectKind;

/// `/department{code, school.name}?school.campus='old'` inner-joins
/// `department` to `school`, since `department.school_code` is `NOT NULL`
/// in this catalog, and filters on a column reached through that join
/// (scenario e).
#[test]
fn sieving_on_a_joined_column_keeps_the_direct_foreign_key_as_an_inner_join() {
    let catalog = fixture_catalog();
    let output =
        htsql::compile(&catalog, DialectKind::Pgsql, "/department{code, school.name}?school.campus='old'").unwrap();

    assert!(output.sql.contains(r#"FROM "department" AS t0"#));
    assert!(output.sql.contains(r#" JOIN "school" AS t1 ON t0."school_code" = t1."code""#));
    assert!(!output.sql.contains("LEFT JOIN"));
    assert!(output.sql.contains(r#"WHERE (t1."campus" = 'old')"#));
    assert!(output.sql.ends_with(r#"ORDER BY t0."code" ASC"#));

    assert_eq!(output.profile.columns.len(), 2);
    assert_eq!(output.profile.columns[0].label, "code");
    assert_eq!(output.profile.columns[1].label, "name");
}
