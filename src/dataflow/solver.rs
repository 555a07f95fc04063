//! A direction-generic worklist dataflow solver (§4.6).
//!
//! Concrete analyses (§4.7: liveness, constant propagation, may-alias) are
//! thin adapters over [`Analysis`]; none of them re-implements the
//! worklist loop, the merge/transfer iteration, or the convergence check.

use std::collections::{BTreeMap, VecDeque};

use crate::cfg::{BasicBlock, BlockId, Cfg};

/// A lattice element an analysis computes per block.
///
/// `bottom()` is the initial value before any information has propagated;
/// every instance provided by this crate has finite height, so the solver
/// is guaranteed to reach a fixed point.
pub trait DataflowFact: Clone + PartialEq {
    /// The lattice's least element.
    fn bottom() -> Self;
}

/// Which way facts flow through the control-flow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Facts flow from predecessors to successors (e.g. constant propagation).
    Forward,
    /// Facts flow from successors to predecessors (e.g. liveness).
    Backward,
}

/// One dataflow analysis: a lattice, a merge operator, and a per-block
/// transfer function.
pub trait Analysis {
    /// The fact lattice this analysis computes over.
    type Fact: DataflowFact;

    /// Forward or backward propagation.
    fn direction(&self) -> Direction;

    /// Combine facts flowing in from multiple neighbors.
    fn merge(&self, incoming: Vec<&Self::Fact>) -> Self::Fact;

    /// Compute the fact leaving `block` given the fact entering it.
    fn transfer(&self, inbound: &Self::Fact, block: &BasicBlock) -> Self::Fact;
}

/// The converged per-block facts: `in_facts[b]` is the merge of `b`'s
/// incoming neighbors (predecessors if forward, successors if backward);
/// `out_facts[b]` is `transfer(in_facts[b], b)`.
#[derive(Debug, Clone)]
pub struct Facts<F> {
    /// Fact merged in from `block`'s neighbors, before its own transfer.
    pub in_facts: BTreeMap<BlockId, F>,
    /// Fact produced by `block`'s transfer function.
    pub out_facts: BTreeMap<BlockId, F>,
}

impl<F: DataflowFact> Facts<F> {
    fn new(ids: impl Iterator<Item = BlockId>) -> Self {
        let ids: Vec<_> = ids.collect();
        Facts {
            in_facts: ids.iter().map(|&b| (b, F::bottom())).collect(),
            out_facts: ids.into_iter().map(|b| (b, F::bottom())).collect(),
        }
    }

    /// The entering fact for `block`, falling back to `bottom()` for blocks
    /// the solver never saw (none, in practice).
    #[must_use]
    pub fn entering(&self, block: BlockId) -> F {
        self.in_facts.get(&block).cloned().unwrap_or_else(F::bottom)
    }

    /// The leaving fact for `block`.
    #[must_use]
    pub fn leaving(&self, block: BlockId) -> F {
        self.out_facts.get(&block).cloned().unwrap_or_else(F::bottom)
    }
}

fn neighbors(cfg: &Cfg, direction: Direction, block: BlockId) -> (&[BlockId], &[BlockId]) {
    match direction {
        Direction::Forward => (cfg.predecessors(block), cfg.successors(block)),
        Direction::Backward => (cfg.successors(block), cfg.predecessors(block)),
    }
}

/// Run `analysis` over `blocks` to a fixed point. Pure: never touches the
/// instruction stream.
#[must_use]
pub fn solve<A: Analysis>(analysis: &A, cfg: &Cfg, blocks: &[BasicBlock]) -> Facts<A::Fact> {
    let mut facts = Facts::new(cfg.block_ids());
    let direction = analysis.direction();

    let mut worklist: VecDeque<BlockId> = cfg.block_ids().collect();

    while let Some(current) = match direction {
        Direction::Forward => worklist.pop_front(),
        Direction::Backward => worklist.pop_back(),
    } {
        let (incoming, outgoing) = neighbors(cfg, direction, current);
        let merged = analysis.merge(incoming.iter().map(|n| &facts.out_facts[n]).collect());
        facts.in_facts.insert(current, merged.clone());

        let new_out = analysis.transfer(&merged, &blocks[current.index()]);
        if facts.out_facts.get(&current) != Some(&new_out) {
            facts.out_facts.insert(current, new_out);
            for &n in outgoing {
                worklist.push_back(n);
            }
        }
    }

    facts
}

/// When a rewriting pass applies converged facts to the instruction stream:
/// deferred waits for the whole-function fixed point (safe for every
/// analysis, mandatory for ones where early rewriting under an
/// unconverged fact would be unsound, e.g. liveness across a back edge);
/// eager rewrites every time a block is revisited, before convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyTiming {
    /// Rewrite once per block, after the fixed point (the "optimistic" mode
    /// of the original tooling: apply assumes the best available
    /// information and is proven safe only because it runs last).
    Deferred,
    /// Rewrite during the worklist loop itself, on every visit (the
    /// "pessimistic" mode: safe for analyses that only ever sharpen
    /// monotonically from bottom, unsound for ones that need the full
    /// fixed point before any single fact can be trusted).
    Eager,
}

/// Solve `analysis` and let `apply` rewrite each block using the converged
/// (or, in [`ApplyTiming::Eager`] mode, in-progress) entering fact.
pub fn solve_and_rewrite<A, F>(
    analysis: &A,
    cfg: &Cfg,
    blocks: &mut [BasicBlock],
    timing: ApplyTiming,
    mut apply: F,
) -> Facts<A::Fact>
where
    A: Analysis,
    F: FnMut(&A::Fact, &mut BasicBlock),
{
    match timing {
        ApplyTiming::Deferred => {
            let facts = solve(analysis, cfg, blocks);
            for id in cfg.block_ids() {
                let inbound = facts.entering(id);
                apply(&inbound, &mut blocks[id.index()]);
            }
            facts
        }
        ApplyTiming::Eager => {
            let mut facts = Facts::new(cfg.block_ids());
            let direction = analysis.direction();
            let mut worklist: VecDeque<BlockId> = cfg.block_ids().collect();

            while let Some(current) = match direction {
                Direction::Forward => worklist.pop_front(),
                Direction::Backward => worklist.pop_back(),
            } {
                let (incoming, outgoing) = neighbors(cfg, direction, current);
                let merged = analysis.merge(incoming.iter().map(|n| &facts.out_facts[n]).collect());
                facts.in_facts.insert(current, merged.clone());

                let new_out = analysis.transfer(&merged, &blocks[current.index()]);
                apply(&merged, &mut blocks[current.index()]);

                if facts.out_facts.get(&current) != Some(&new_out) {
                    facts.out_facts.insert(current, new_out);
                    for &n in outgoing {
                        worklist.push_back(n);
                    }
                }
            }

            facts
        }
    }
}
