//! The binder (§4.3): resolves a parsed syntax tree against a model graph,
//! producing a binding tree with scopes, names and plurality resolved and
//! every node carrying a domain.

pub mod binder;
pub mod binding;
pub mod error;
pub mod formula;
pub mod scope;

pub use binder::{BoundQuery, Binder};
pub use binding::{Binding, BindingKind, LiteralValue, SelectionItem};
pub use error::{BindError, BinderError, LinkError, PluralityError, TypeError};
pub use scope::{ScopeFrame, ScopeKind, Scopes};
