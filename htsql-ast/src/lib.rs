//! Types shared by every phase of the HTSQL compiler: source spans, the
//! closed domain set, and the parser's syntax tree.

pub mod domain;
pub mod span;
pub mod syntax;

pub use domain::Domain;
pub use span::Span;
pub use syntax::{BinaryOp, Literal, SortDirection, Syntax, UnaryOp};
