use strum_macros::{AsRefStr, EnumIter, EnumString};

/// The minimum dialect set (§6 "Dialect identifiers"). Every dialect-sensitive
/// primitive in the compiler routes through a [`crate::Dialect`] keyed by one
/// of these, never a string comparison scattered through the earlier phases.
#[derive(EnumString, EnumIter, AsRefStr, Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum DialectKind {
    #[default]
    Pgsql,
    Sqlite,
    Mysql,
    Oracle,
    Mssql,
}

impl DialectKind {
    pub fn name(&self) -> &'static str {
        self.as_ref()
    }
}
