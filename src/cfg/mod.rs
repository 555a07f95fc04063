//! Control-flow graphs, dominance, and natural loops (§4.1, §4.2, §4.10).
//!
//! Everything here is addressed through [`BlockId`] indices into a
//! [`BasicBlock`] vector rather than through pointers or `Rc` cycles, so a
//! [`Cfg`] (and the [`Dominance`] computed over it) can be cloned, sent
//! across a `rayon` fan-out, or thrown away and rebuilt cheaply whenever a
//! pass changes the block structure.

mod block;
mod builder;
mod dominance;
mod graph;
mod loops;

pub use block::{flatten, split_into_blocks, BasicBlock, BlockId};
pub use builder::build_cfg;
pub use dominance::{compute as compute_dominance, Dominance};
pub use graph::Cfg;
pub use loops::{find_loops, normalize as normalize_loops, NaturalLoop};

use indexmap::IndexMap;

use crate::error::Result;
use crate::ir::Function;

/// Split `function`'s body and build its control-flow graph in one step.
pub fn build(function: &Function) -> Result<(Vec<BasicBlock>, IndexMap<String, BlockId>, Cfg)> {
    let (blocks, label_index) = split_into_blocks(&function.instrs);
    let cfg = build_cfg(&function.name, blocks.clone(), &label_index)?;
    Ok((blocks, label_index, cfg))
}
