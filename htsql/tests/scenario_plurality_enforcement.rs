mod common;

use common::fixture_catalog;
use htsql_binder::BinderError;
use htsql::CompileError;
use htsql_dialect::DialectKind;

/// A plural reverse foreign key used directly as a scalar selection item
/// has no single value per `school` row, and must be rejected rather than
/// silently narrowed.
#[test]
fn a_plural_link_in_a_scalar_item_is_rejected() {
    let catalog = fixture_catalog();
    let err = htsql::compile(&catalog, DialectKind::Pgsql, "/school{department}").unwrap_err();
    assert!(matches!(err, CompileError::Bind(BinderError::Plurality(_))));
}

/// Same rule for a sieve condition reached through a plural link: one
/// `school` row has many `department` rows, so comparing on a column
/// through that link without aggregating is ambiguous.
#[test]
fn a_plural_predicate_through_a_reverse_link_is_rejected() {
    let catalog = fixture_catalog();
    let err = htsql::compile(&catalog, DialectKind::Pgsql, "/school?department.code='CS'{code}").unwrap_err();
    assert!(matches!(err, CompileError::Bind(BinderError::Plurality(_))));
}

/// Aggregating the same plural link collapses it to one value per row, so
/// it remains valid in a scalar position.
#[test]
fn an_aggregate_over_a_plural_link_is_not_rejected() {
    let catalog = fixture_catalog();
    let output = htsql::compile(&catalog, DialectKind::Pgsql, "/school{code, count(department)}").unwrap();
    assert_eq!(output.profile.columns.len(), 2);
}

/// A nested segment binds its own rows independently of how plural the
/// link into it was, so `/program{title}` nested under `school` is fine.
#[test]
fn a_nested_segment_under_a_plural_link_is_not_rejected() {
    let catalog = fixture_catalog();
    let output = htsql::compile(&catalog, DialectKind::Pgsql, "/school{code, /program{title}}").unwrap();
    assert_eq!(output.profile.columns.len(), 2);
}
