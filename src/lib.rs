//! Intra-procedural optimizations for a typed three-address IR.
//!
//! [`ir`] defines the data model; [`serialize`] is the only module that
//! turns untyped JSON into it. [`cfg`] builds control-flow graphs,
//! dominance, and natural loops over a function's instruction stream;
//! [`ssa`] converts to static single assignment form over that graph;
//! [`dataflow`] is the generic worklist solver plus the concrete analyses
//! (liveness, constant propagation, may-alias) built on it; [`opt`] is the
//! optimization passes themselves (LVN, the DCE family, DSE, LICM).
//! [`pipeline`] sequences passes per function, and [`config`] loads named
//! pipelines from disk for the [`cli`] binary entry point.

pub mod cfg;
pub mod cli;
pub mod config;
pub mod dataflow;
pub mod error;
pub mod ir;
pub mod opt;
pub mod pipeline;
pub mod serialize;
pub mod ssa;

pub use error::{Error, Result};
