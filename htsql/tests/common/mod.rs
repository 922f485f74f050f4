use htsql::{CatalogView, Column, ForeignKey, Table, UniqueKey};
use htsql_ast::Domain;

/// The catalog used throughout the end-to-end scenarios: four tables,
/// one self-referencing foreign key (`program.part_of_code`), and a
/// composite primary key (`program`).
#[allow(dead_code)]
pub fn fixture_catalog() -> CatalogView {
    let school = Table::new("school")
        .with_column(Column::new("code", Domain::String, false))
        .with_column(Column::new("name", Domain::String, false))
        .with_column(Column::new("campus", Domain::String, true))
        .with_unique_key(UniqueKey::new(vec!["code".into()], true));

    let department = Table::new("department")
        .with_column(Column::new("code", Domain::String, false))
        .with_column(Column::new("name", Domain::String, false))
        .with_column(Column::new("school_code", Domain::String, false))
        .with_unique_key(UniqueKey::new(vec!["code".into()], true))
        .with_foreign_key(ForeignKey::new(vec!["school_code".into()], "school", vec!["code".into()]));

    let program = Table::new("program")
        .with_column(Column::new("school_code", Domain::String, false))
        .with_column(Column::new("code", Domain::String, false))
        .with_column(Column::new("title", Domain::String, false))
        .with_column(Column::new("degree", Domain::String, true))
        .with_column(Column::new("part_of_code", Domain::String, true))
        .with_unique_key(UniqueKey::new(vec!["school_code".into(), "code".into()], true))
        .with_foreign_key(ForeignKey::new(vec!["school_code".into()], "school", vec!["code".into()]))
        .with_foreign_key(ForeignKey::new(vec!["part_of_code".into()], "program", vec!["code".into()]));

    let course = Table::new("course")
        .with_column(Column::new("department_code", Domain::String, false))
        .with_column(Column::new("no", Domain::Integer, false))
        .with_column(Column::new("title", Domain::String, false))
        .with_column(Column::new("credits", Domain::Integer, true))
        .with_unique_key(UniqueKey::new(vec!["department_code".into(), "no".into()], true))
        .with_foreign_key(ForeignKey::new(vec!["department_code".into()], "department", vec!["code".into()]));

    CatalogView::new("pgsql")
        .with_table(school)
        .with_table(department)
        .with_table(program)
        .with_table(course)
}
