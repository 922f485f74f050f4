//! The assembler/serializer (§4.6): turns a compiled term tree into a
//! frame tree, assigns deterministic aliases, and renders dialect-specific
//! SQL text alongside the output profile describing the result shape.

pub mod alias;
pub mod assembler;
pub mod error;
pub mod frame;
pub mod profile;
pub mod resolve;

pub use alias::AliasAllocator;
pub use assembler::{Assembler, CompileOutput};
pub use error::AssemblerError;
pub use frame::{Frame, JoinFrame, LeafFrame, NestedFrame};
pub use profile::{OutputColumn, OutputProfile};

#[cfg(test)]
mod tests {
    use htsql_ast::Domain;
    use htsql_catalog::{CatalogView, Column, ForeignKey, ModelGraph, Table, UniqueKey};
    use htsql_compiler::Compiler;
    use htsql_dialect::{Dialect, DialectKind};
    use htsql_encoder::Encoder;
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample_catalog() -> CatalogView {
        let school = Table::new("school")
            .with_column(Column::new("code", Domain::String, false))
            .with_column(Column::new("name", Domain::String, false))
            .with_unique_key(UniqueKey::new(vec!["code".into()], true));
        let department = Table::new("department")
            .with_column(Column::new("code", Domain::String, false))
            .with_column(Column::new("school_code", Domain::String, false))
            .with_unique_key(UniqueKey::new(vec!["code".into()], true))
            .with_foreign_key(ForeignKey::new(vec!["school_code".into()], "school", vec!["code".into()]));
        CatalogView::new("pgsql").with_table(school).with_table(department)
    }

    fn compile_sql(source: &str, dialect: DialectKind) -> CompileOutput {
        let catalog = sample_catalog();
        let graph = ModelGraph::build(&catalog).unwrap();
        let syntax = htsql_parser::parse_source(source).unwrap();
        let bound = htsql_binder::Binder::new(&graph).bind_query(&syntax).unwrap();
        let segment = Encoder::new(&graph).encode_query(&bound);
        let term = Compiler::new(&catalog, &graph).compile_query(&segment).unwrap();
        Assembler::new(&catalog, &graph, Dialect::for_kind(dialect)).assemble(&term).unwrap()
    }

    #[test]
    fn plain_table_selection_renders_a_simple_select() {
        let output = compile_sql("/school{code, name}", DialectKind::Pgsql);
        assert_eq!(
            output.sql,
            r#"SELECT t0."code" AS "code", t0."name" AS "name" FROM "school" AS t0 ORDER BY t0."code" ASC"#
        );
        assert_eq!(output.profile.columns.len(), 2);
        assert_eq!(output.profile.columns[0].label, "code");
        assert!(!output.profile.columns[0].nullable);
    }

    #[test]
    fn link_traversal_renders_an_inner_join() {
        let output = compile_sql("/department{code, school.name}", DialectKind::Pgsql);
        assert!(output.sql.contains("JOIN \"school\" AS t1 ON"));
        assert!(output.sql.contains("t0.\"school_code\" = t1.\"code\""));
        // The primary-key tie-break (§4.5(d)) keys off `department`, the
        // segment's own base table, not the joined `school`.
        assert!(output.sql.ends_with(r#"ORDER BY t0."code" ASC"#));
    }

    #[test]
    fn aggregate_bundle_renders_a_left_joined_grouped_subquery() {
        let output = compile_sql("/school{code, count(department)}", DialectKind::Pgsql);
        assert!(output.sql.contains("LEFT JOIN (SELECT"));
        assert!(output.sql.contains("COUNT(*) AS \"agg_0\""));
        assert!(output.sql.contains("COALESCE("));
    }

    #[test]
    fn mysql_dialect_quotes_with_backticks_and_uses_concat() {
        let output = compile_sql("/school{code, code + name}", DialectKind::Mysql);
        assert!(output.sql.contains('`'));
        assert!(output.sql.contains("CONCAT("));
    }
}
