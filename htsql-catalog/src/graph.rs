use htsql_ast::Domain;
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::CatalogError;
use crate::naming::{normalize_name, strip_key_suffix};
use crate::view::{CatalogView, Table, UniqueKey};

/// A class in the model graph (§3 "Model graph"): one per visible table,
/// plus the distinguished unit class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassKind {
    /// The single-inhabitant root class every query starts from.
    Unit,
    /// Backed by `tables[table_index]` of the source [`CatalogView`].
    Table { table_index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    pub id: ClassId,
    pub name: SmolStr,
    pub kind: ClassKind,
}

/// What an arrow points at: either another class, or (for attribute arrows)
/// the domain of the value it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrowTarget {
    Class(ClassId),
    Domain(Domain),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrowKind {
    /// Unit → class, the class extent.
    Extent,
    /// Class → domain, reading a single column.
    Attribute { column: SmolStr },
    /// Class → class, following a foreign key forward. Column lists are
    /// given from the arrow's own origin/target perspective, ready for a
    /// join condition with no further catalog lookup.
    DirectForeignKey { origin_columns: Vec<SmolStr>, target_columns: Vec<SmolStr> },
    /// Class → class, following a foreign key in reverse.
    ReverseForeignKey { origin_columns: Vec<SmolStr>, target_columns: Vec<SmolStr> },
    /// A calculated field from an override; its target domain is `Untyped`
    /// until the binder parses and types `source`.
    Calculated { source: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrow {
    pub name: SmolStr,
    pub origin: ClassId,
    pub target: ArrowTarget,
    pub singular: bool,
    pub total: bool,
    pub kind: ArrowKind,
}

/// The derived, read-only model graph (§3). Built once from a
/// [`CatalogView`] and consulted by the binder and compiler; never mutated
/// afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelGraph {
    pub classes: Vec<Class>,
    pub arrows: Vec<Arrow>,
    /// Root-scope user globals (name → unparsed HTSQL source), §3 overrides.
    pub globals: IndexMap<SmolStr, String>,
}

impl ModelGraph {
    pub fn unit_class(&self) -> ClassId {
        ClassId(0)
    }

    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.0]
    }

    pub fn class_named(&self, name: &str) -> Option<&Class> {
        let needle = normalize_name(name);
        self.classes.iter().find(|c| c.name == needle)
    }

    pub fn arrows_from(&self, origin: ClassId) -> impl Iterator<Item = &Arrow> {
        self.arrows.iter().filter(move |a| a.origin == origin)
    }

    pub fn arrow_named(&self, origin: ClassId, name: &str) -> Option<&Arrow> {
        let needle = normalize_name(name);
        self.arrows_from(origin).find(|a| a.name == needle)
    }

    pub fn build(catalog: &CatalogView) -> Result<Self, CatalogError> {
        validate_overrides(catalog)?;

        let mut classes = vec![Class { id: ClassId(0), name: normalize_name("unit"), kind: ClassKind::Unit }];
        let mut table_class: IndexMap<usize, ClassId> = IndexMap::new();

        for (table_index, table) in catalog.tables.iter().enumerate() {
            if !table.visible || catalog.overrides.is_hidden_table(&table.name) {
                continue;
            }
            let id = ClassId(classes.len());
            classes.push(Class { id, name: normalize_name(&table.name), kind: ClassKind::Table { table_index } });
            table_class.insert(table_index, id);
        }

        let mut arrows = Vec::new();
        let mut used_names: Vec<Vec<SmolStr>> = vec![Vec::new(); classes.len()];

        // Extent arrows: unit -> each visible table.
        for (&table_index, &class_id) in &table_class {
            let table = &catalog.tables[table_index];
            push_arrow(
                &mut arrows,
                &mut used_names,
                ClassId(0),
                normalize_name(&table.name),
                Arrow {
                    name: normalize_name(&table.name),
                    origin: ClassId(0),
                    target: ArrowTarget::Class(class_id),
                    singular: false,
                    total: false,
                    kind: ArrowKind::Extent,
                },
            )?;
        }

        // Attribute arrows.
        for (&table_index, &class_id) in &table_class {
            let table = &catalog.tables[table_index];
            for column in &table.columns {
                if catalog.overrides.is_hidden_column(&table.name, &column.name) {
                    continue;
                }
                let display_name = catalog
                    .overrides
                    .renamed_fields
                    .iter()
                    .find(|(t, c, _)| t.eq_ignore_ascii_case(&table.name) && c.eq_ignore_ascii_case(&column.name))
                    .map(|(_, _, new_name)| new_name.clone())
                    .unwrap_or_else(|| column.name.clone());
                let name = normalize_name(&display_name);
                push_arrow(
                    &mut arrows,
                    &mut used_names,
                    class_id,
                    name.clone(),
                    Arrow {
                        name,
                        origin: class_id,
                        target: ArrowTarget::Domain(column.domain.clone()),
                        singular: true,
                        total: !column.nullable,
                        kind: ArrowKind::Attribute { column: column.name.clone() },
                    },
                )?;
            }
        }

        // Foreign-key arrows: direct and reverse.
        for (&table_index, &origin_class) in &table_class {
            let table = &catalog.tables[table_index];
            for fk in &table.foreign_keys {
                let Some(&target_class) = catalog
                    .tables
                    .iter()
                    .position(|t| t.name.eq_ignore_ascii_case(&fk.target_table))
                    .and_then(|idx| table_class.get(&idx))
                else {
                    continue; // target hidden: no arrow, validated separately
                };

                let origin_nullable = fk.columns.iter().any(|c| {
                    table.column(c).map(|col| col.nullable).unwrap_or(false)
                });
                let direct_name = direct_fk_name(table, fk, &used_names[origin_class.0]);
                push_arrow(
                    &mut arrows,
                    &mut used_names,
                    origin_class,
                    direct_name.clone(),
                    Arrow {
                        name: direct_name,
                        origin: origin_class,
                        target: ArrowTarget::Class(target_class),
                        singular: true,
                        total: !origin_nullable,
                        kind: ArrowKind::DirectForeignKey {
                            origin_columns: fk.columns.clone(),
                            target_columns: fk.target_columns.clone(),
                        },
                    },
                )?;

                let origin_key_is_unique = effective_unique_keys(catalog, table)
                    .iter()
                    .any(|k| same_column_set(&k.columns, &fk.columns));
                let reverse_name = reverse_fk_name(table, fk, &used_names[target_class.0]);
                push_arrow(
                    &mut arrows,
                    &mut used_names,
                    target_class,
                    reverse_name.clone(),
                    Arrow {
                        name: reverse_name,
                        origin: target_class,
                        target: ArrowTarget::Class(origin_class),
                        singular: origin_key_is_unique,
                        total: false,
                        kind: ArrowKind::ReverseForeignKey {
                            origin_columns: fk.target_columns.clone(),
                            target_columns: fk.columns.clone(),
                        },
                    },
                )?;
            }
        }

        // Synthetic arrows: calculated fields from overrides.
        for (table_name, field_name, source) in &catalog.overrides.calculated_fields {
            let Some(class_id) = catalog
                .tables
                .iter()
                .position(|t| t.name.eq_ignore_ascii_case(table_name))
                .and_then(|idx| table_class.get(&idx))
                .copied()
            else {
                continue; // already reported by validate_overrides
            };
            let name = normalize_name(field_name);
            push_arrow(
                &mut arrows,
                &mut used_names,
                class_id,
                name.clone(),
                Arrow {
                    name,
                    origin: class_id,
                    target: ArrowTarget::Domain(Domain::Untyped),
                    singular: true,
                    total: false,
                    kind: ArrowKind::Calculated { source: source.clone() },
                },
            )?;
        }

        let globals = catalog
            .overrides
            .user_globals
            .iter()
            .map(|(name, source)| (normalize_name(name), source.clone()))
            .collect();

        Ok(ModelGraph { classes, arrows, globals })
    }
}

fn push_arrow(
    arrows: &mut Vec<Arrow>,
    used_names: &mut [Vec<SmolStr>],
    origin: ClassId,
    name: SmolStr,
    arrow: Arrow,
) -> Result<(), CatalogError> {
    let bucket = &mut used_names[origin.0];
    if bucket.contains(&name) {
        return Err(CatalogError::AmbiguousArrowName {
            class: SmolStr::new(format!("#{}", origin.0)),
            name,
        });
    }
    bucket.push(name);
    arrows.push(arrow);
    Ok(())
}

fn direct_fk_name(table: &Table, fk: &crate::view::ForeignKey, used: &[SmolStr]) -> SmolStr {
    if fk.columns.len() == 1 && fk.target_columns.len() == 1 {
        if let Some(prefix) = strip_key_suffix(&fk.columns[0], &fk.target_columns[0]) {
            if !used.contains(&prefix) {
                return prefix;
            }
        }
    }
    let _ = table;
    normalize_name(&fk.target_table)
}

fn reverse_fk_name(table: &Table, fk: &crate::view::ForeignKey, used: &[SmolStr]) -> SmolStr {
    let base = normalize_name(&table.name);
    if !used.contains(&base) {
        return base;
    }
    if fk.columns.len() == 1 && fk.target_columns.len() == 1 {
        if let Some(prefix) = strip_key_suffix(&fk.columns[0], &fk.target_columns[0]) {
            let via_prefix = normalize_name(&format!("{}_via_{}", table.name, prefix));
            if !used.contains(&via_prefix) {
                return via_prefix;
            }
        }
    }
    let joined: String = fk.columns.iter().map(|c| c.as_str()).collect::<Vec<_>>().join("_");
    normalize_name(&format!("{}_via_{}", table.name, joined))
}

fn same_column_set(a: &[SmolStr], b: &[SmolStr]) -> bool {
    a.len() == b.len()
        && a.iter().all(|x| b.iter().any(|y| x.eq_ignore_ascii_case(y)))
}

fn effective_unique_keys(catalog: &CatalogView, table: &Table) -> Vec<UniqueKey> {
    let mut keys = table.unique_keys.clone();
    for (name, key) in &catalog.overrides.synthetic_keys {
        if name.eq_ignore_ascii_case(&table.name) {
            keys.push(key.clone());
        }
    }
    keys
}

fn validate_overrides(catalog: &CatalogView) -> Result<(), CatalogError> {
    let find_table = |name: &str| catalog.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name));

    for name in &catalog.overrides.hidden_tables {
        if find_table(name).is_none() {
            return Err(CatalogError::UnknownTable { table: name.clone() });
        }
    }
    for (table, column) in &catalog.overrides.hidden_columns {
        let t = find_table(table).ok_or_else(|| CatalogError::UnknownTable { table: table.clone() })?;
        if t.column(column).is_none() {
            return Err(CatalogError::UnknownColumn { table: table.clone(), column: column.clone() });
        }
    }
    for (table, key) in &catalog.overrides.synthetic_keys {
        let t = find_table(table).ok_or_else(|| CatalogError::UnknownTable { table: table.clone() })?;
        for column in &key.columns {
            if t.column(column).is_none() {
                return Err(CatalogError::UnknownColumn { table: table.clone(), column: column.clone() });
            }
        }
    }
    for (table, column, _) in &catalog.overrides.renamed_fields {
        let t = find_table(table).ok_or_else(|| CatalogError::UnknownTable { table: table.clone() })?;
        if t.column(column).is_none() {
            return Err(CatalogError::UnknownColumn { table: table.clone(), column: column.clone() });
        }
    }
    for (table, _, _) in &catalog.overrides.calculated_fields {
        find_table(table).ok_or_else(|| CatalogError::UnknownTable { table: table.clone() })?;
    }

    for table in &catalog.tables {
        for fk in &table.foreign_keys {
            let target = find_table(&fk.target_table).ok_or_else(|| CatalogError::UnknownForeignKeyTarget {
                table: table.name.clone(),
                target: fk.target_table.clone(),
            })?;
            for column in &fk.target_columns {
                if target.column(column).is_none() {
                    return Err(CatalogError::UnknownForeignKeyColumn {
                        table: table.name.clone(),
                        target: fk.target_table.clone(),
                        column: column.clone(),
                    });
                }
            }
            for column in &fk.columns {
                if table.column(column).is_none() {
                    return Err(CatalogError::UnknownColumn {
                        table: table.name.clone(),
                        column: column.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{Column, ForeignKey, Table};
    use htsql_ast::Domain;

    fn sample_catalog() -> CatalogView {
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
            .with_foreign_key(ForeignKey::new(
                vec!["school_code".into()],
                "school",
                vec!["code".into()],
            ));
        CatalogView::new("pgsql").with_table(school).with_table(department)
    }

    #[test]
    fn builds_unit_and_table_classes() {
        let graph = ModelGraph::build(&sample_catalog()).unwrap();
        assert_eq!(graph.classes.len(), 3);
        assert!(graph.class_named("school").is_some());
        assert!(graph.class_named("department").is_some());
    }

    #[test]
    fn direct_fk_uses_stripped_prefix() {
        let graph = ModelGraph::build(&sample_catalog()).unwrap();
        let department = graph.class_named("department").unwrap().id;
        let arrow = graph.arrow_named(department, "school").unwrap();
        assert!(arrow.singular);
        assert!(arrow.total);
        assert!(matches!(arrow.kind, ArrowKind::DirectForeignKey { .. }));
    }

    #[test]
    fn reverse_fk_is_plural_unless_origin_key_unique() {
        let graph = ModelGraph::build(&sample_catalog()).unwrap();
        let school = graph.class_named("school").unwrap().id;
        let arrow = graph.arrow_named(school, "department").unwrap();
        assert!(!arrow.singular);
        assert!(!arrow.total);
    }

    #[test]
    fn hidden_override_on_unknown_table_is_rejected() {
        let mut catalog = sample_catalog();
        catalog.overrides.hidden_tables.push("ghost".into());
        let err = ModelGraph::build(&catalog).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownTable { .. }));
    }
}
