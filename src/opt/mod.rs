//! Intra-procedural optimization passes (§4.8, §4.9, §4.10).
//!
//! Each submodule is independent of the others except through the IR and
//! the shared [`crate::dataflow`] and [`crate::cfg`] infrastructure; the
//! order they run in is a [`crate::pipeline`] concern, not this module's.

pub mod dce;
pub mod dse;
pub mod licm;
pub mod lvn;
