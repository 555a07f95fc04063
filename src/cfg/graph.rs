//! The control-flow graph proper (§4.2): blocks plus successor/predecessor
//! edges, addressed by [`BlockId`] and stored in `BTreeMap`s rather than
//! pointers.

use std::collections::BTreeMap;

use super::block::{BasicBlock, BlockId};

/// A function's control-flow graph.
///
/// Edges are precomputed in both directions at construction time so that
/// dominance, loop discovery, and dataflow can all do O(1) neighbor lookups
/// instead of re-deriving them from terminators on every pass.
#[derive(Debug, Clone)]
pub struct Cfg {
    pub(crate) blocks: Vec<BasicBlock>,
    pub(crate) successors: BTreeMap<BlockId, Vec<BlockId>>,
    pub(crate) predecessors: BTreeMap<BlockId, Vec<BlockId>>,
    entry: BlockId,
}

impl Cfg {
    pub(super) fn new(
        blocks: Vec<BasicBlock>,
        successors: BTreeMap<BlockId, Vec<BlockId>>,
        predecessors: BTreeMap<BlockId, Vec<BlockId>>,
    ) -> Self {
        Cfg { blocks, successors, predecessors, entry: BlockId::ENTRY }
    }

    /// The function's single entry block.
    #[must_use]
    pub const fn entry(&self) -> BlockId {
        self.entry
    }

    /// The number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True if the graph has no blocks (an empty function body).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Every block id, in the order blocks were split.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len()).map(BlockId)
    }

    /// Look up a block by id.
    #[must_use]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    /// Mutable access to a block, for in-place rewriting passes.
    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    /// All blocks, in split order.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// The blocks `id` can transfer control to.
    #[must_use]
    pub fn successors(&self, id: BlockId) -> &[BlockId] {
        self.successors.get(&id).map_or(&[], Vec::as_slice)
    }

    /// The blocks that can transfer control to `id`.
    #[must_use]
    pub fn predecessors(&self, id: BlockId) -> &[BlockId] {
        self.predecessors.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Consume the graph, handing back its blocks in order. Used once a
    /// pass is done rewriting and the function body needs to be flattened.
    #[must_use]
    pub fn into_blocks(self) -> Vec<BasicBlock> {
        self.blocks
    }

    /// A reverse post-order traversal starting at the entry block. Blocks
    /// unreachable from entry are omitted, matching every analysis's
    /// assumption that dead blocks carry no information.
    #[must_use]
    pub fn reverse_post_order(&self) -> Vec<BlockId> {
        let mut visited = vec![false; self.blocks.len()];
        let mut post_order = Vec::with_capacity(self.blocks.len());
        let mut stack = vec![(self.entry, 0usize)];
        visited[self.entry.index()] = true;

        while let Some((node, next_child)) = stack.pop() {
            let succs = self.successors(node);
            if next_child < succs.len() {
                let child = succs[next_child];
                stack.push((node, next_child + 1));
                if !visited[child.index()] {
                    visited[child.index()] = true;
                    stack.push((child, 0));
                }
            } else {
                post_order.push(node);
            }
        }

        post_order.reverse();
        post_order
    }
}
