//! May-alias analysis (§4.7): a forward analysis over a location-set
//! lattice, used by dead-store elimination to tell whether a later store
//! could be observed through a different pointer than the one it shadows.
//!
//! Pointers are tracked by allocation site: each `alloc` introduces a fresh
//! abstract location named after its own destination variable. A pointer
//! whose provenance this analysis loses track of (a function parameter, the
//! result of a call, anything not reachable through `id`/`ptradd`/`phi`
//! from a tracked `alloc`) is conservatively `Any` -- may alias anything.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::cfg::BasicBlock;
use crate::ir::{Instr, Opcode};

use super::solver::{Analysis, DataflowFact, Direction};

/// The set of abstract locations a pointer may refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerSet {
    /// Exactly one of these allocation sites, no others.
    Locations(BTreeSet<String>),
    /// Provenance lost; may point anywhere.
    Any,
}

impl PointerSet {
    fn union(&self, other: &PointerSet) -> PointerSet {
        match (self, other) {
            (PointerSet::Any, _) | (_, PointerSet::Any) => PointerSet::Any,
            (PointerSet::Locations(a), PointerSet::Locations(b)) => {
                PointerSet::Locations(a.union(b).cloned().collect())
            }
        }
    }

    /// True if the two sets could share a location.
    #[must_use]
    pub fn may_overlap(&self, other: &PointerSet) -> bool {
        match (self, other) {
            (PointerSet::Any, _) | (_, PointerSet::Any) => true,
            (PointerSet::Locations(a), PointerSet::Locations(b)) => a.intersection(b).next().is_some(),
        }
    }
}

/// Per-variable pointer provenance at one program point. Missing entries
/// read as `Any`: a pointer this analysis has no record of is conservatively
/// assumed to alias anything, not assumed to alias nothing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AliasFact(BTreeMap<String, PointerSet>);

impl DataflowFact for AliasFact {
    fn bottom() -> Self {
        AliasFact(BTreeMap::new())
    }
}

impl AliasFact {
    fn get(&self, name: &str) -> PointerSet {
        self.0.get(name).cloned().unwrap_or(PointerSet::Any)
    }

    /// The pointer set a variable is known to hold, conservatively `Any` if
    /// this analysis never traced its provenance.
    #[must_use]
    pub fn locations(&self, name: &str) -> PointerSet {
        self.get(name)
    }

    /// True if two pointer-valued variables might refer to the same
    /// location.
    #[must_use]
    pub fn may_alias(&self, a: &str, b: &str) -> bool {
        self.get(a).may_overlap(&self.get(b))
    }
}

/// Forward may-alias analysis.
pub struct MayAlias;

impl Analysis for MayAlias {
    type Fact = AliasFact;

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn merge(&self, incoming: Vec<&AliasFact>) -> AliasFact {
        let mut names: BTreeSet<&str> = BTreeSet::new();
        for fact in &incoming {
            names.extend(fact.0.keys().map(String::as_str));
        }
        let mut merged = BTreeMap::new();
        for name in names {
            let mut acc: Option<PointerSet> = None;
            for fact in &incoming {
                let here = fact.get(name);
                acc = Some(match acc {
                    Some(prior) => prior.union(&here),
                    None => here,
                });
            }
            if let Some(v) = acc {
                merged.insert(name.to_string(), v);
            }
        }
        AliasFact(merged)
    }

    fn transfer(&self, inbound: &AliasFact, block: &BasicBlock) -> AliasFact {
        let mut local = inbound.0.clone();
        let read = |local: &BTreeMap<String, PointerSet>, name: &str| {
            local.get(name).cloned().unwrap_or(PointerSet::Any)
        };

        for instr in &block.instrs {
            let Instr::Value(v) = instr else { continue };
            if !v.ty.is_ptr() {
                continue;
            }
            let set = match v.op {
                Opcode::Alloc => PointerSet::Locations(BTreeSet::from([v.dest.clone()])),
                Opcode::Ptradd | Opcode::Id => {
                    v.args.first().map_or(PointerSet::Any, |base| read(&local, base))
                }
                Opcode::Phi => {
                    let mut acc: Option<PointerSet> = None;
                    for arg in &v.args {
                        let here = read(&local, arg);
                        acc = Some(match acc {
                            Some(prior) => prior.union(&here),
                            None => here,
                        });
                    }
                    acc.unwrap_or(PointerSet::Any)
                }
                _ => PointerSet::Any,
            };
            local.insert(v.dest.clone(), set);
        }
        AliasFact(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{build_cfg, split_into_blocks};
    use crate::dataflow::solver::solve;
    use crate::ir::{EffectInstr, Type, ValueInstr};

    fn alloc(dest: &str, size_arg: &str) -> Instr {
        Instr::Value(ValueInstr {
            op: Opcode::Alloc,
            dest: dest.into(),
            ty: Type::int().ptr_to(),
            args: vec![size_arg.into()],
            labels: vec![],
            funcs: vec![],
            value: None,
            extra: Default::default(),
        })
    }

    #[test]
    fn two_distinct_allocations_never_alias() {
        let instrs = vec![
            Instr::constant("n", crate::ir::Literal::Int(1)),
            alloc("p", "n"),
            alloc("q", "n"),
            Instr::Effect(EffectInstr { op: Opcode::Ret, args: vec![], labels: vec![], funcs: vec![], extra: Default::default() }),
        ];
        let (blocks, labels) = split_into_blocks(&instrs);
        let cfg = build_cfg("f", blocks.clone(), &labels).unwrap();
        let facts = solve(&MayAlias, &cfg, &blocks);
        let out = facts.leaving(cfg.entry());
        assert!(!out.may_alias("p", "q"));
    }

    #[test]
    fn a_pointer_copied_through_id_aliases_its_source() {
        let instrs = vec![
            Instr::constant("n", crate::ir::Literal::Int(1)),
            alloc("p", "n"),
            Instr::Value(ValueInstr {
                op: Opcode::Id,
                dest: "q".into(),
                ty: Type::int().ptr_to(),
                args: vec!["p".into()],
                labels: vec![],
                funcs: vec![],
                value: None,
                extra: Default::default(),
            }),
            Instr::Effect(EffectInstr { op: Opcode::Ret, args: vec![], labels: vec![], funcs: vec![], extra: Default::default() }),
        ];
        let (blocks, labels) = split_into_blocks(&instrs);
        let cfg = build_cfg("f", blocks.clone(), &labels).unwrap();
        let facts = solve(&MayAlias, &cfg, &blocks);
        let out = facts.leaving(cfg.entry());
        assert!(out.may_alias("p", "q"));
    }

    #[test]
    fn an_untracked_pointer_is_conservatively_assumed_to_alias_anything() {
        let fact = AliasFact::bottom();
        assert!(fact.may_alias("param", "anything"));
    }
}
