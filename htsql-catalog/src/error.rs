use smol_str::SmolStr;
use thiserror::Error;

/// §7 `CatalogError` — an override refers to an entity the catalog view
/// doesn't have. Unlike the source-text phases, the catalog carries no
/// spans: there is no source position to blame, only the override itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("override refers to table {table:?}, which is not in the catalog")]
    UnknownTable { table: SmolStr },

    #[error("override refers to column {table}.{column:?}, which does not exist")]
    UnknownColumn { table: SmolStr, column: SmolStr },

    #[error("foreign key on {table} references unknown table {target:?}")]
    UnknownForeignKeyTarget { table: SmolStr, target: SmolStr },

    #[error("foreign key on {table} references unknown column {target}.{column:?}")]
    UnknownForeignKeyColumn { table: SmolStr, target: SmolStr, column: SmolStr },

    #[error("two arrows out of {class} both resolved to the name {name:?}")]
    AmbiguousArrowName { class: SmolStr, name: SmolStr },
}
