use htsql_ast::Domain;
use smol_str::SmolStr;

/// A single column of a [`Table`] (§3 "Catalog view").
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Column {
    pub name: SmolStr,
    pub domain: Domain,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<SmolStr>, domain: Domain, nullable: bool) -> Self {
        Self { name: name.into(), domain, nullable }
    }
}

/// A unique constraint over an ordered set of columns; at most one per table
/// is `primary`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UniqueKey {
    pub columns: Vec<SmolStr>,
    pub primary: bool,
}

impl UniqueKey {
    pub fn new(columns: Vec<SmolStr>, primary: bool) -> Self {
        Self { columns, primary }
    }
}

/// An ordered-column foreign key from this table to `target_table`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForeignKey {
    pub columns: Vec<SmolStr>,
    pub target_table: SmolStr,
    pub target_columns: Vec<SmolStr>,
}

impl ForeignKey {
    pub fn new(
        columns: Vec<SmolStr>,
        target_table: impl Into<SmolStr>,
        target_columns: Vec<SmolStr>,
    ) -> Self {
        Self { columns, target_table: target_table.into(), target_columns }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Table {
    pub name: SmolStr,
    pub visible: bool,
    pub columns: Vec<Column>,
    pub unique_keys: Vec<UniqueKey>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            columns: Vec::new(),
            unique_keys: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_unique_key(mut self, key: UniqueKey) -> Self {
        self.unique_keys.push(key);
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_key(&self) -> Option<&UniqueKey> {
        self.unique_keys.iter().find(|k| k.primary)
    }
}

/// Overrides (§3): the only hand-authored part of the catalog, layered over
/// the introspected tables. A renamed or calculated field, or a user global,
/// carries its HTSQL source as unparsed text — the binder parses and types
/// it lazily, since the catalog crate has no dependency on the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Overrides {
    pub hidden_tables: Vec<SmolStr>,
    pub hidden_columns: Vec<(SmolStr, SmolStr)>,
    pub synthetic_keys: Vec<(SmolStr, UniqueKey)>,
    pub renamed_fields: Vec<(SmolStr, SmolStr, SmolStr)>,
    pub calculated_fields: Vec<(SmolStr, SmolStr, String)>,
    pub user_globals: Vec<(SmolStr, String)>,
}

impl Overrides {
    pub fn is_hidden_table(&self, table: &str) -> bool {
        self.hidden_tables.iter().any(|t| t.eq_ignore_ascii_case(table))
    }

    pub fn is_hidden_column(&self, table: &str, column: &str) -> bool {
        self.hidden_columns
            .iter()
            .any(|(t, c)| t.eq_ignore_ascii_case(table) && c.eq_ignore_ascii_case(column))
    }
}

/// A snapshot of the target database's structure (§3 "Catalog view (input)"),
/// plus the engine tag that selects a SQL dialect and any overrides. This is
/// the sole input the compiler's later phases consume about the schema; it
/// carries no behavior beyond accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CatalogView {
    pub engine: SmolStr,
    pub tables: Vec<Table>,
    pub overrides: Overrides,
}

impl CatalogView {
    pub fn new(engine: impl Into<SmolStr>) -> Self {
        Self { engine: engine.into(), tables: Vec::new(), overrides: Overrides::default() }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }
}
