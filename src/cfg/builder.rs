//! Building a [`Cfg`] from split blocks (§4.2).

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::error::{MalformedIr, Result};
use crate::ir::Opcode;

use super::block::{BasicBlock, BlockId};
use super::graph::Cfg;

/// Derive successor/predecessor edges from each block's terminator and
/// assemble the [`Cfg`].
///
/// A block with no terminator falls through to the next block in split
/// order; the last block with no terminator has no successors, matching a
/// function that ends without an explicit `ret`.
pub fn build_cfg(function: &str, blocks: Vec<BasicBlock>, label_index: &IndexMap<String, BlockId>) -> Result<Cfg> {
    let mut successors: BTreeMap<BlockId, Vec<BlockId>> = BTreeMap::new();
    let mut predecessors: BTreeMap<BlockId, Vec<BlockId>> = BTreeMap::new();

    for block in &blocks {
        predecessors.entry(block.id).or_default();
    }

    for (index, block) in blocks.iter().enumerate() {
        let targets = match block.terminator().and_then(|i| i.opcode()) {
            Some(Opcode::Jmp) => {
                vec![resolve(function, block, label_index, &block.instrs.last().unwrap().labels()[0])?]
            }
            Some(Opcode::Br) => {
                let labels = block.instrs.last().unwrap().labels();
                vec![
                    resolve(function, block, label_index, &labels[0])?,
                    resolve(function, block, label_index, &labels[1])?,
                ]
            }
            Some(Opcode::Ret) => Vec::new(),
            Some(_) | None => {
                if index + 1 < blocks.len() {
                    vec![BlockId(index + 1)]
                } else {
                    Vec::new()
                }
            }
        };

        for &target in &targets {
            predecessors.entry(target).or_default().push(block.id);
        }
        successors.insert(block.id, targets);
    }

    Ok(Cfg::new(blocks, successors, predecessors))
}

fn resolve(
    function: &str,
    block: &BasicBlock,
    label_index: &IndexMap<String, BlockId>,
    label: &str,
) -> Result<BlockId> {
    label_index.get(label).copied().ok_or_else(|| {
        MalformedIr::UndefinedLabel {
            function: function.to_string(),
            index: block.id.index(),
            label: label.to_string(),
        }
        .into()
    })
}
