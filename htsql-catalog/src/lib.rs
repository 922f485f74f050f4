//! The catalog view and derived model graph (§3): the read-only schema
//! model consumed throughout binding and compilation.

pub mod error;
pub mod graph;
pub mod naming;
pub mod view;

pub use error::CatalogError;
pub use graph::{Arrow, ArrowKind, ArrowTarget, Class, ClassId, ClassKind, ModelGraph};
pub use view::{CatalogView, Column, ForeignKey, Overrides, Table, UniqueKey};
