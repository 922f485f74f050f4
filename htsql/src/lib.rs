//! The facade crate: wires every pipeline phase behind a single pure entry
//! point, `compile`. No phase here performs I/O, observes wall-clock time,
//! or shares mutable state across calls (§5) — a `CatalogView` is the only
//! input besides the dialect and source text, and it is read-only.

pub mod error;

pub use error::CompileError;
pub use htsql_assembler::{CompileOutput, OutputColumn, OutputProfile};
pub use htsql_catalog::{CatalogView, Column, ForeignKey, Overrides, Table, UniqueKey};
pub use htsql_dialect::DialectKind;

use htsql_assembler::Assembler;
use htsql_binder::Binder;
use htsql_catalog::ModelGraph;
use htsql_compiler::Compiler;
use htsql_dialect::Dialect;
use htsql_encoder::Encoder;

/// Compiles `source` against `catalog` for `dialect`: scan, parse, bind,
/// encode, compile, assemble, in that order, with no step able to see past
/// the one before it except through the tree it produced (§2).
pub fn compile(catalog: &CatalogView, dialect: DialectKind, source: &str) -> Result<CompileOutput, CompileError> {
    let syntax = htsql_parser::parse_source(source)?;
    let graph = ModelGraph::build(catalog)?;
    let bound = Binder::new(&graph).bind_query(&syntax)?;
    let segment = Encoder::new(&graph).encode_query(&bound);
    let term = Compiler::new(catalog, &graph).compile_query(&segment)?;
    let output = Assembler::new(catalog, &graph, Dialect::for_kind(dialect)).assemble(&term)?;
    Ok(output)
}
