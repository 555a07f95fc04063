//! Live-variable analysis (§4.7): a backward may-analysis over a bit-set
//! lattice indexed by a per-function variable table, so set operations are
//! word-sized instead of hashing a string on every transfer.

use std::collections::BTreeMap;

use bitvec::vec::BitVec;

use crate::cfg::BasicBlock;

use super::solver::{Analysis, DataflowFact, Direction};

/// Assigns every variable name mentioned in a function a stable bit
/// position, built once before running liveness.
#[derive(Debug, Clone)]
pub struct VarIndex {
    index: BTreeMap<String, usize>,
    names: Vec<String>,
}

impl VarIndex {
    /// Collect every `dest` and argument name across `blocks`, in first
    /// occurrence order.
    #[must_use]
    pub fn build(blocks: &[BasicBlock]) -> Self {
        let mut index = BTreeMap::new();
        let mut names = Vec::new();
        let mut see = |name: &str, index: &mut BTreeMap<String, usize>, names: &mut Vec<String>| {
            if !index.contains_key(name) {
                index.insert(name.to_string(), names.len());
                names.push(name.to_string());
            }
        };
        for block in blocks {
            for instr in &block.instrs {
                if let Some(dest) = instr.dest() {
                    see(dest, &mut index, &mut names);
                }
                for arg in instr.args() {
                    see(arg, &mut index, &mut names);
                }
            }
        }
        VarIndex { index, names }
    }

    /// Bit position of `name`, if it is mentioned anywhere in the function.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Number of distinct variable names tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if no variable has been indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The name at a given bit position.
    #[must_use]
    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }
}

/// A set of live variable names, as a bit-set over a [`VarIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LiveSet(BitVec);

impl DataflowFact for LiveSet {
    fn bottom() -> Self {
        LiveSet(BitVec::new())
    }
}

impl LiveSet {
    fn resized(&self, len: usize) -> BitVec {
        let mut v = self.0.clone();
        if v.len() < len {
            v.resize(len, false);
        }
        v
    }

    /// True if `index` is live.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.0.get(index).is_some_and(|b| *b)
    }

    /// Names of every live variable, per `vars`.
    pub fn names<'a>(&'a self, vars: &'a VarIndex) -> impl Iterator<Item = &'a str> + 'a {
        (0..self.0.len()).filter(move |&i| self.contains(i)).map(move |i| vars.name(i))
    }
}

/// Live-variable analysis over a function's full variable universe.
pub struct Liveness<'a> {
    /// Variable table this analysis's bit positions are indexed against.
    pub vars: &'a VarIndex,
}

impl Analysis for Liveness<'_> {
    type Fact = LiveSet;

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn merge(&self, incoming: Vec<&LiveSet>) -> LiveSet {
        let len = self.vars.len();
        let mut acc = BitVec::repeat(false, len);
        for fact in incoming {
            let resized = fact.resized(len);
            for i in 0..len {
                if resized[i] {
                    acc.set(i, true);
                }
            }
        }
        LiveSet(acc)
    }

    fn transfer(&self, inbound: &LiveSet, block: &BasicBlock) -> LiveSet {
        let len = self.vars.len();
        let mut live = inbound.resized(len);
        for instr in block.instrs.iter().rev() {
            if let Some(dest) = instr.dest() {
                if let Some(i) = self.vars.index_of(dest) {
                    live.set(i, false);
                }
            }
            for arg in instr.args() {
                if let Some(i) = self.vars.index_of(arg) {
                    live.set(i, true);
                }
            }
        }
        LiveSet(live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{build_cfg, split_into_blocks};
    use crate::dataflow::solver::solve;
    use crate::ir::{EffectInstr, Instr, Literal, Opcode};

    fn program() -> Vec<Instr> {
        // a = 1; b = 2; print a; (b is dead after its definition)
        vec![
            Instr::constant("a", Literal::Int(1)),
            Instr::constant("b", Literal::Int(2)),
            Instr::Effect(EffectInstr { op: Opcode::Print, args: vec!["a".into()], labels: vec![], funcs: vec![], extra: Default::default() }),
            Instr::Effect(EffectInstr { op: Opcode::Ret, args: vec![], labels: vec![], funcs: vec![], extra: Default::default() }),
        ]
    }

    #[test]
    fn dead_assignment_is_not_live_at_block_entry() {
        let instrs = program();
        let (blocks, labels) = split_into_blocks(&instrs);
        let cfg = build_cfg("f", blocks.clone(), &labels).unwrap();
        let vars = VarIndex::build(&blocks);
        let facts = solve(&Liveness { vars: &vars }, &cfg, &blocks);

        let entry_in = facts.entering(cfg.entry());
        assert!(!entry_in.contains(vars.index_of("b").unwrap()));
    }

    #[test]
    fn variable_used_later_is_live_across_the_block_it_is_not_touched_in() {
        let instrs = vec![
            Instr::Label { name: "entry".into() },
            Instr::constant("x", Literal::Int(1)),
            Instr::Effect(EffectInstr { op: Opcode::Jmp, args: vec![], labels: vec!["mid".into()], funcs: vec![], extra: Default::default() }),
            Instr::Label { name: "mid".into() },
            Instr::constant("unrelated", Literal::Int(9)),
            Instr::Effect(EffectInstr { op: Opcode::Jmp, args: vec![], labels: vec!["end".into()], funcs: vec![], extra: Default::default() }),
            Instr::Label { name: "end".into() },
            Instr::Effect(EffectInstr { op: Opcode::Print, args: vec!["x".into()], labels: vec![], funcs: vec![], extra: Default::default() }),
            Instr::Effect(EffectInstr { op: Opcode::Ret, args: vec![], labels: vec![], funcs: vec![], extra: Default::default() }),
        ];
        let (blocks, labels) = split_into_blocks(&instrs);
        let cfg = build_cfg("f", blocks.clone(), &labels).unwrap();
        let vars = VarIndex::build(&blocks);
        let facts = solve(&Liveness { vars: &vars }, &cfg, &blocks);

        let mid_out = facts.leaving(labels["mid"]);
        assert!(mid_out.contains(vars.index_of("x").unwrap()));
    }
}
