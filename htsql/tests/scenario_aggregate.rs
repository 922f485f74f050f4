mod common;

use common::fixture_catalog;
use htsql_dialect::DialectKind;

/// `/school{code, count(department)}` left-joins `school` with an aggregate
/// subquery grouped by `school_code`; empty groups count as 0 (scenario b).
#[test]
fn counting_a_reverse_link_bundles_into_one_left_joined_group_by() {
    let catalog = fixture_catalog();
    let output = htsql::compile(&catalog, DialectKind::Pgsql, "/school{code, count(department)}").unwrap();

    assert!(output.sql.starts_with(r#"SELECT t0."code" AS "code", COALESCE("#));
    assert!(output.sql.contains(r#"FROM "school" AS t0 LEFT JOIN (SELECT"#));
    assert!(output.sql.contains(r#"COUNT(*) AS "agg_0""#));
    assert!(output.sql.contains(r#"FROM "department""#));
    assert!(output.sql.contains("GROUP BY"));
    // The GROUP BY repeats the grouping expression rather than naming a
    // SELECT-list alias, since Oracle/MSSQL reject the latter.
    assert!(!output.sql.contains("GROUP BY k0"));
    assert!(output.sql.ends_with(r#"ORDER BY t0."code" ASC"#));

    assert_eq!(output.profile.columns.len(), 2);
    assert_eq!(output.profile.columns[1].label, "count");
    assert!(!output.profile.columns[1].nullable);
}

/// `/school^campus{campus, count(school)}` groups by `campus`; rows with a
/// null campus are excluded from the projection entirely (scenario c).
#[test]
fn grouping_by_a_nullable_column_drops_the_null_group() {
    let catalog = fixture_catalog();
    let output = htsql::compile(&catalog, DialectKind::Pgsql, "/school^campus{campus, count(school)}").unwrap();

    assert!(output.sql.contains("GROUP BY"));
    assert!(output.sql.contains("IS NOT NULL"));
    assert!(output.sql.contains("COUNT(*)"));
    assert_eq!(output.profile.columns.len(), 2);
    assert_eq!(output.profile.columns[0].label, "campus");
    assert_eq!(output.profile.columns[1].label, "count");
}
