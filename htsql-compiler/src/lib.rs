//! The rewrite stage and compiler (§4.5, §9): lowers a rewritten flow/code
//! segment into a relational term tree, ready for the assembler to turn
//! into SQL.

pub mod compiler;
pub mod error;
pub mod rewrite;
pub mod term;

pub use compiler::Compiler;
pub use error::CompileError;
pub use rewrite::{fold_code, rewrite_segment};
pub use term::{AggregateColumn, JoinKind, SegmentValue, Term, TermKind, TermTag};
