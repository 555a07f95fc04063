//! Dead-store elimination (§4.9): drop a `store p, v` overwritten before any
//! possibly-aliasing load, using may-alias to tell whether two pointers
//! could name the same memory.

use std::collections::BTreeSet;

use crate::cfg::Cfg;
use crate::cfg::BasicBlock;
use crate::dataflow::{solve, AliasFact, MayAlias};
use crate::ir::{Instr, Opcode};

/// Remove stores through `p` made dead by a later store through a pointer
/// that may-aliases `p`, on every path to the next possibly-aliasing load.
///
/// Conservative by construction: a store survives whenever the ordering of
/// interleaved may-aliased stores is ambiguous, rather than risk dropping
/// one an aliased read still depends on.
pub fn run(cfg: &Cfg, blocks: &mut [BasicBlock]) {
    let facts = solve(&MayAlias, cfg, blocks);
    for id in cfg.block_ids() {
        let alias = facts.leaving(id);
        sweep_block(&alias, &mut blocks[id.index()]);
    }
}

fn sweep_block(alias: &AliasFact, block: &mut BasicBlock) {
    // `stored`: pointer-variable names already unconditionally overwritten
    // by a later store on this backward walk, with no intervening load that
    // could observe the earlier value.
    let mut stored: BTreeSet<String> = BTreeSet::new();
    let mut keep = vec![true; block.instrs.len()];

    for (idx, instr) in block.instrs.iter().enumerate().rev() {
        match instr {
            Instr::Effect(e) if e.op == Opcode::Store => {
                let ptr = &e.args[0];
                let covered = stored.iter().any(|s| alias.may_alias(s, ptr));
                let shadowed = covered && !ambiguous(alias, &stored, ptr);
                if shadowed {
                    keep[idx] = false;
                } else {
                    stored.insert(ptr.clone());
                }
            }
            Instr::Effect(e) if e.op == Opcode::Load || e.op == Opcode::Free => {
                if let Some(ptr) = e.args.first() {
                    stored.retain(|s| !alias.may_alias(s, ptr));
                }
            }
            Instr::Value(v) if v.op == Opcode::Load => {
                if let Some(ptr) = v.args.first() {
                    stored.retain(|s| !alias.may_alias(s, ptr));
                }
            }
            _ => {
                // Any other instruction that could read memory indirectly
                // (a call) invalidates every tracked store conservatively.
                if instr.opcode() == Some(Opcode::Call) {
                    stored.clear();
                }
            }
        }
    }

    let mut idx = 0;
    block.instrs.retain(|_| {
        let k = keep[idx];
        idx += 1;
        k
    });
}

/// True when more than one already-shadowing store's relative order with
/// respect to `ptr` cannot be determined precisely (they may-alias each
/// other as well as `ptr`), per the conservative-retain resolution of the
/// `STORED` marker's ambiguity.
fn ambiguous(alias: &AliasFact, stored: &BTreeSet<String>, ptr: &str) -> bool {
    let aliasing: Vec<&String> = stored.iter().filter(|s| alias.may_alias(s, ptr)).collect();
    aliasing.len() > 1 && aliasing.windows(2).any(|w| alias.may_alias(w[0], w[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{build_cfg, split_into_blocks};
    use crate::ir::{EffectInstr, Literal, Type, ValueInstr};

    fn alloc(dest: &str) -> Instr {
        Instr::Value(ValueInstr {
            op: Opcode::Alloc,
            dest: dest.into(),
            ty: Type::int().ptr_to(),
            args: vec!["n".into()],
            labels: vec![],
            funcs: vec![],
            value: None,
            extra: Default::default(),
        })
    }

    fn store(ptr: &str, val: &str) -> Instr {
        Instr::Effect(EffectInstr { op: Opcode::Store, args: vec![ptr.into(), val.into()], labels: vec![], funcs: vec![], extra: Default::default() })
    }

    #[test]
    fn a_store_overwritten_before_any_load_is_removed() {
        let instrs = vec![
            Instr::constant("n", Literal::Int(1)),
            alloc("p"),
            Instr::constant("a", Literal::Int(1)),
            Instr::constant("b", Literal::Int(2)),
            store("p", "a"),
            store("p", "b"),
            Instr::Effect(EffectInstr { op: Opcode::Ret, args: vec![], labels: vec![], funcs: vec![], extra: Default::default() }),
        ];
        let (mut blocks, labels) = split_into_blocks(&instrs);
        let cfg = build_cfg("f", blocks.clone(), &labels).unwrap();
        run(&cfg, &mut blocks);
        let stores = blocks[0].instrs.iter().filter(|i| i.opcode() == Some(Opcode::Store)).count();
        assert_eq!(stores, 1);
    }

    #[test]
    fn a_store_read_by_an_intervening_load_survives() {
        let instrs = vec![
            Instr::constant("n", Literal::Int(1)),
            alloc("p"),
            Instr::constant("a", Literal::Int(1)),
            Instr::constant("b", Literal::Int(2)),
            store("p", "a"),
            Instr::Value(ValueInstr { op: Opcode::Load, dest: "r".into(), ty: Type::int(), args: vec!["p".into()], labels: vec![], funcs: vec![], value: None, extra: Default::default() }),
            store("p", "b"),
            Instr::Effect(EffectInstr { op: Opcode::Ret, args: vec![], labels: vec![], funcs: vec![], extra: Default::default() }),
        ];
        let (mut blocks, labels) = split_into_blocks(&instrs);
        let cfg = build_cfg("f", blocks.clone(), &labels).unwrap();
        run(&cfg, &mut blocks);
        let stores = blocks[0].instrs.iter().filter(|i| i.opcode() == Some(Opcode::Store)).count();
        assert_eq!(stores, 2);
    }

    #[test]
    fn stores_through_unrelated_allocations_never_shadow_each_other() {
        let instrs = vec![
            Instr::constant("n", Literal::Int(1)),
            alloc("p"),
            alloc("q"),
            Instr::constant("a", Literal::Int(1)),
            store("p", "a"),
            store("q", "a"),
            Instr::Effect(EffectInstr { op: Opcode::Ret, args: vec![], labels: vec![], funcs: vec![], extra: Default::default() }),
        ];
        let (mut blocks, labels) = split_into_blocks(&instrs);
        let cfg = build_cfg("f", blocks.clone(), &labels).unwrap();
        run(&cfg, &mut blocks);
        let stores = blocks[0].instrs.iter().filter(|i| i.opcode() == Some(Opcode::Store)).count();
        assert_eq!(stores, 2);
    }
}
