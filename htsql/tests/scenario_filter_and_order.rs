mod common;

use common::fixture_catalog;
use htsql_dialect::DialectKind;

/// `/course?credits>3{title, credits-}` filters on a predicate then orders
/// descending by `credits`, breaking ties with the (composite) primary key
/// ascending (scenario d).
#[test]
fn filtering_then_sorting_descending_keeps_the_composite_primary_key_as_tiebreak() {
    let catalog = fixture_catalog();
    let output = htsql::compile(&catalog, DialectKind::Pgsql, "/course?credits>3{title, credits-}").unwrap();

    assert_eq!(
        output.sql,
        r#"SELECT t0."title" AS "title", t0."credits" AS "credits" FROM "course" AS t0 WHERE (t0."credits" > 3) ORDER BY t0."credits" DESC, t0."department_code" ASC, t0."no" ASC"#
    );

    assert_eq!(output.profile.columns.len(), 2);
    assert_eq!(output.profile.columns[0].label, "title");
    assert_eq!(output.profile.columns[1].label, "credits");
}

#[test]
fn an_explicit_sort_key_already_present_is_not_duplicated_by_the_tiebreak() {
    let catalog = fixture_catalog();
    // Sorting by the primary key explicitly should not produce a repeated
    // `ORDER BY ... no ASC, no ASC` tail.
    let output = htsql::compile(&catalog, DialectKind::Pgsql, "/course{title, department_code+, no+}").unwrap();

    let order_by_count = output.sql.matches("ORDER BY").count();
    assert_eq!(order_by_count, 1);
    assert!(output.sql.ends_with(r#"ORDER BY t0."department_code" ASC, t0."no" ASC"#));
}
