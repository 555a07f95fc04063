//! Dominator computation, following the iterative engineered algorithm of
//! Cooper, Harvey, and Kennedy ("A Simple, Fast Dominance Algorithm").
//!
//! Reverse post-order numbering lets the fixed point converge in a handful
//! of passes on typical control flow without ever materializing the
//! dominator relation as an explicit bitset per node.

use std::collections::{BTreeMap, BTreeSet};

use super::block::BlockId;
use super::graph::Cfg;

/// Dominance facts for one function: immediate dominators, the dominator
/// tree's children relation, and dominance frontiers.
#[derive(Debug, Clone)]
pub struct Dominance {
    idom: BTreeMap<BlockId, BlockId>,
    children: BTreeMap<BlockId, Vec<BlockId>>,
    frontier: BTreeMap<BlockId, BTreeSet<BlockId>>,
}

impl Dominance {
    /// The immediate dominator of `block`, or `None` for the entry block.
    #[must_use]
    pub fn idom(&self, block: BlockId) -> Option<BlockId> {
        self.idom.get(&block).copied().filter(|&d| d != block)
    }

    /// True if `a` dominates `b` (every path from entry to `b` passes
    /// through `a`), including the reflexive case `a == b`.
    #[must_use]
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        let mut cur = b;
        loop {
            if cur == a {
                return true;
            }
            match self.idom(cur) {
                Some(next) => cur = next,
                None => return a == cur,
            }
        }
    }

    /// This block's children in the dominator tree.
    #[must_use]
    pub fn children(&self, block: BlockId) -> &[BlockId] {
        self.children.get(&block).map_or(&[], Vec::as_slice)
    }

    /// The dominance frontier of `block`: nodes `block` dominates some
    /// predecessor of, but does not strictly dominate itself.
    #[must_use]
    pub fn frontier(&self, block: BlockId) -> &BTreeSet<BlockId> {
        static EMPTY: BTreeSet<BlockId> = BTreeSet::new();
        self.frontier.get(&block).unwrap_or(&EMPTY)
    }

    /// Pre-order walk of the dominator tree rooted at `entry`, used by SSA
    /// renaming so a variable's definition is always visited before its
    /// dominated uses.
    #[must_use]
    pub fn preorder(&self, entry: BlockId) -> Vec<BlockId> {
        let mut order = Vec::new();
        let mut stack = vec![entry];
        while let Some(node) = stack.pop() {
            order.push(node);
            // Push in reverse so the first child is visited first.
            for &child in self.children(node).iter().rev() {
                stack.push(child);
            }
        }
        order
    }
}

/// Compute dominance information for `cfg`.
#[must_use]
pub fn compute(cfg: &Cfg) -> Dominance {
    let entry = cfg.entry();
    let rpo = cfg.reverse_post_order();
    let rpo_index: BTreeMap<BlockId, usize> =
        rpo.iter().enumerate().map(|(i, &b)| (b, i)).collect();

    let mut idom: BTreeMap<BlockId, BlockId> = BTreeMap::new();
    idom.insert(entry, entry);

    let mut changed = true;
    while changed {
        changed = false;
        for &b in &rpo {
            if b == entry {
                continue;
            }
            let mut preds = cfg.predecessors(b).iter().filter(|p| idom.contains_key(p));
            let Some(&first) = preds.next() else { continue };
            let mut new_idom = first;
            for &p in preds {
                new_idom = intersect(new_idom, p, &idom, &rpo_index);
            }
            if idom.get(&b) != Some(&new_idom) {
                idom.insert(b, new_idom);
                changed = true;
            }
        }
    }

    let mut children: BTreeMap<BlockId, Vec<BlockId>> = BTreeMap::new();
    for (&node, &dom) in &idom {
        if node != dom {
            children.entry(dom).or_default().push(node);
        }
    }

    let mut frontier: BTreeMap<BlockId, BTreeSet<BlockId>> = BTreeMap::new();
    for b in cfg.block_ids() {
        let preds = cfg.predecessors(b);
        if preds.len() < 2 {
            continue;
        }
        let Some(&dom_b) = idom.get(&b) else { continue };
        for &p in preds {
            if !idom.contains_key(&p) {
                continue;
            }
            let mut runner = p;
            while runner != dom_b {
                frontier.entry(runner).or_default().insert(b);
                match idom.get(&runner) {
                    Some(&next) if next != runner => runner = next,
                    _ => break,
                }
            }
        }
    }

    Dominance { idom, children, frontier }
}

fn intersect(
    mut a: BlockId,
    mut b: BlockId,
    idom: &BTreeMap<BlockId, BlockId>,
    rpo_index: &BTreeMap<BlockId, usize>,
) -> BlockId {
    while a != b {
        while rpo_index[&a] > rpo_index[&b] {
            a = idom[&a];
        }
        while rpo_index[&b] > rpo_index[&a] {
            b = idom[&b];
        }
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::block::split_into_blocks;
    use super::super::builder::build_cfg;
    use crate::ir::{EffectInstr, Instr, Literal, Opcode};

    fn diamond() -> Vec<Instr> {
        vec![
            Instr::Label { name: "entry".into() },
            Instr::Effect(EffectInstr {
                op: Opcode::Br,
                args: vec!["c".into()],
                labels: vec!["left".into(), "right".into()],
                funcs: vec![],
                extra: Default::default(),
            }),
            Instr::Label { name: "left".into() },
            Instr::constant("x", Literal::Int(1)),
            Instr::Effect(EffectInstr { op: Opcode::Jmp, args: vec![], labels: vec!["join".into()], funcs: vec![], extra: Default::default() }),
            Instr::Label { name: "right".into() },
            Instr::constant("x", Literal::Int(2)),
            Instr::Label { name: "join".into() },
            Instr::Effect(EffectInstr { op: Opcode::Ret, args: vec![], labels: vec![], funcs: vec![], extra: Default::default() }),
        ]
    }

    #[test]
    fn join_block_is_dominated_only_by_entry() {
        let (blocks, labels) = split_into_blocks(&diamond());
        let cfg = build_cfg("f", blocks, &labels).unwrap();
        let dom = compute(&cfg);

        let join = labels["join"];
        assert_eq!(dom.idom(join), Some(cfg.entry()));
        assert!(dom.dominates(cfg.entry(), join));
        assert!(!dom.dominates(labels["left"], join));
    }

    #[test]
    fn branch_arms_are_in_entrys_dominance_frontier_complement() {
        let (blocks, labels) = split_into_blocks(&diamond());
        let cfg = build_cfg("f", blocks, &labels).unwrap();
        let dom = compute(&cfg);

        let join = labels["join"];
        assert!(dom.frontier(labels["left"]).contains(&join));
        assert!(dom.frontier(labels["right"]).contains(&join));
        assert!(dom.frontier(cfg.entry()).is_empty());
    }

    #[test]
    fn preorder_visits_parent_before_children() {
        let (blocks, labels) = split_into_blocks(&diamond());
        let cfg = build_cfg("f", blocks, &labels).unwrap();
        let dom = compute(&cfg);
        let order = dom.preorder(cfg.entry());
        assert_eq!(order[0], cfg.entry());
        assert_eq!(order.len(), cfg.len());
    }
}
