//! Set-algebra queries over index views.
//!
//! `parse` turns `ix(1) + iy(2)` style text into an [`Expr`]; an
//! [`Evaluator`] resolves each `name(key)` against an [`Environment`].
//! [`query_segments`] runs one expression over many segments in parallel.

pub mod ast;
pub mod eval;
pub mod parser;

use std::path::Path;

use rayon::prelude::*;

pub use ast::{Expr, QueryMethod, SetOp};
pub use eval::{Environment, Evaluator};
pub use parser::parse;

use crate::error::Result;
use crate::index::file::IndexSet;
use crate::index::resultset::ResultSet;

/// Parse and evaluate `query` against `env`.
pub fn evaluate(env: &Environment<'_>, query: &str) -> Result<ResultSet> {
    let expr = parse(query)?;
    Evaluator::new(env).eval(&expr)
}

/// Evaluate `expr` against every listed segment of `prefix` under `dir`.
///
/// Segments are opened and queried in parallel; results come back in
/// `seqs` order. Segments with no index files yield detached empty sets.
pub fn query_segments(dir: &Path, prefix: &str, seqs: &[u32], expr: &Expr) -> Result<Vec<(u32, ResultSet)>> {
    seqs.par_iter()
        .map(|&seq| {
            let set = IndexSet::open(dir, prefix, seq)?;
            let env = set.environment()?;
            let result = Evaluator::new(&env).eval(expr)?;
            Ok((seq, result))
        })
        .collect()
}
