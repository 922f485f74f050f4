mod common;

use common::fixture_catalog;
use htsql_dialect::DialectKind;

/// `/school{code, /program{title}}` nests a segment: one outer row per
/// school, carrying a list-valued `program` column with its own nested
/// profile subtree (scenario f).
#[test]
fn a_nested_selection_produces_a_list_valued_column_with_its_own_profile() {
    let catalog = fixture_catalog();
    let output = htsql::compile(&catalog, DialectKind::Pgsql, "/school{code, /program{title}}").unwrap();

    assert!(output.sql.contains(r#"t0."code" AS "code""#));
    assert!(output.sql.contains("program"));

    assert_eq!(output.profile.columns.len(), 2);
    assert_eq!(output.profile.columns[0].label, "code");
    assert_eq!(output.profile.columns[1].label, "program");
    assert!(output.profile.columns[1].nested.is_some());

    let nested_profile = output.profile.columns[1].nested.as_ref().unwrap();
    assert_eq!(nested_profile.columns.len(), 1);
    assert_eq!(nested_profile.columns[0].label, "title");
}
