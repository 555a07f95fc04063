//! Dead code elimination (§4.9): three variants of increasing precision,
//! from a whole-function used-name scan up to a liveness-driven sweep that
//! reuses the generic dataflow solver's deferred-apply mode.

use std::collections::BTreeSet;

use crate::cfg::Cfg;
use crate::cfg::BasicBlock;
use crate::dataflow::{solve_and_rewrite, ApplyTiming, Liveness, VarIndex};
use crate::ir::Instr;

fn has_side_effect(instr: &Instr) -> bool {
    match instr {
        Instr::Label { .. } => true,
        Instr::Effect(_) => true,
        Instr::Value(v) => v.op == crate::ir::Opcode::Call,
    }
}

/// Whole-function trivial DCE: repeatedly drop any value instruction whose
/// destination is never read anywhere in the function, until a pass removes
/// nothing.
pub fn trivial(blocks: &mut Vec<BasicBlock>) {
    loop {
        let used: BTreeSet<String> = blocks
            .iter()
            .flat_map(|b| b.instrs.iter())
            .flat_map(|i| i.args().iter().cloned())
            .collect();

        let mut removed_any = false;
        for block in blocks.iter_mut() {
            let before = block.instrs.len();
            block.instrs.retain(|instr| {
                if has_side_effect(instr) {
                    return true;
                }
                match instr.dest() {
                    Some(dest) => used.contains(dest),
                    None => true,
                }
            });
            removed_any |= block.instrs.len() != before;
        }

        if !removed_any {
            break;
        }
    }
}

/// Per-block local DCE: a definition immediately followed (within the same
/// block, with no intervening read) by a redefinition of the same variable
/// is dead; repeats to a fixed point.
pub fn local(blocks: &mut [BasicBlock]) {
    for block in blocks {
        loop {
            let mut pending: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
            let mut to_delete: BTreeSet<usize> = BTreeSet::new();

            for (idx, instr) in block.instrs.iter().enumerate() {
                for arg in instr.args() {
                    pending.remove(arg.as_str());
                }
                if has_side_effect(instr) {
                    continue;
                }
                if let Some(dest) = instr.dest() {
                    if let Some(&earlier) = pending.get(dest) {
                        to_delete.insert(earlier);
                    }
                    pending.insert(dest, idx);
                }
            }

            if to_delete.is_empty() {
                break;
            }
            let mut idx = 0;
            block.instrs.retain(|_| {
                let keep = !to_delete.contains(&idx);
                idx += 1;
                keep
            });
        }
    }
}

/// Liveness-driven DCE: for each block, walk in reverse from its converged
/// live-out set, dropping any side-effect-free instruction whose
/// destination is not in the working set. Runs as the solver's `apply` hook
/// in [`ApplyTiming::Deferred`] mode -- running the same sweep eagerly
/// (before the whole function reaches its fixed point) can delete a
/// definition a back edge still needs; see the regression test below.
pub fn liveness_driven(cfg: &Cfg, blocks: &mut [BasicBlock]) {
    let vars = VarIndex::build(blocks);
    let analysis = Liveness { vars: &vars };

    solve_and_rewrite(&analysis, cfg, blocks, ApplyTiming::Deferred, |out_live, block| {
        sweep(out_live, &vars, block);
    });
}

/// Delete every side-effect-free instruction whose destination is outside
/// `out_live`, walking `block` in reverse and updating the working set by
/// each instruction's own gen/kill as it goes.
///
/// `out_live` must be the block's *converged* live-out fact. Called with an
/// unconverged approximation (e.g. bottom, before information has had a
/// chance to flow back across a loop's back edge) this can delete a
/// definition a later iteration still reads -- the hazard [`ApplyTiming::Eager`]
/// exists to warn against; see the regression test below.
fn sweep(out_live: &crate::dataflow::LiveSet, vars: &VarIndex, block: &mut BasicBlock) {
    let mut working: BTreeSet<String> = out_live.names(vars).map(str::to_string).collect();
    let mut keep = vec![true; block.instrs.len()];

    for (idx, instr) in block.instrs.iter().enumerate().rev() {
        let dest_dead = !has_side_effect(instr) && instr.dest().is_some_and(|d| !working.contains(d));
        if dest_dead {
            keep[idx] = false;
            continue;
        }
        if let Some(dest) = instr.dest() {
            working.remove(dest);
        }
        for arg in instr.args() {
            working.insert(arg.clone());
        }
    }

    let mut idx = 0;
    block.instrs.retain(|_| {
        let k = keep[idx];
        idx += 1;
        k
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{build_cfg, split_into_blocks};
    use crate::dataflow::DataflowFact;
    use crate::ir::{EffectInstr, Literal, Opcode, Type, ValueInstr};

    fn add(dest: &str, a: &str, b: &str) -> Instr {
        Instr::Value(ValueInstr {
            op: Opcode::Add,
            dest: dest.into(),
            ty: Type::int(),
            args: vec![a.into(), b.into()],
            labels: vec![],
            funcs: vec![],
            value: None,
            extra: Default::default(),
        })
    }

    #[test]
    fn trivial_dce_drops_a_pure_unused_computation() {
        let instrs = vec![
            Instr::constant("a", Literal::Int(1)),
            Instr::constant("b", Literal::Int(2)),
            add("unused", "a", "b"),
            Instr::Effect(EffectInstr { op: Opcode::Print, args: vec!["a".into()], labels: vec![], funcs: vec![], extra: Default::default() }),
            Instr::Effect(EffectInstr { op: Opcode::Ret, args: vec![], labels: vec![], funcs: vec![], extra: Default::default() }),
        ];
        let (mut blocks, _) = split_into_blocks(&instrs);
        trivial(&mut blocks);
        assert!(!blocks[0].instrs.iter().any(|i| i.dest() == Some("unused")));
    }

    #[test]
    fn local_dce_drops_a_definition_overwritten_before_any_read() {
        let instrs = vec![
            Instr::constant("x", Literal::Int(1)),
            Instr::constant("x", Literal::Int(2)),
            Instr::Effect(EffectInstr { op: Opcode::Print, args: vec!["x".into()], labels: vec![], funcs: vec![], extra: Default::default() }),
            Instr::Effect(EffectInstr { op: Opcode::Ret, args: vec![], labels: vec![], funcs: vec![], extra: Default::default() }),
        ];
        let (mut blocks, _) = split_into_blocks(&instrs);
        local(&mut blocks);
        let consts = blocks[0].instrs.iter().filter(|i| i.dest() == Some("x")).count();
        assert_eq!(consts, 1);
    }

    #[test]
    fn liveness_dce_keeps_a_definition_live_across_a_loop_back_edge() {
        let instrs = vec![
            Instr::Label { name: "entry".into() },
            Instr::constant("acc", Literal::Int(0)),
            Instr::Label { name: "head".into() },
            Instr::Effect(EffectInstr {
                op: Opcode::Br,
                args: vec!["cond".into()],
                labels: vec!["body".into(), "exit".into()],
                funcs: vec![],
                extra: Default::default(),
            }),
            Instr::Label { name: "body".into() },
            add("acc2", "acc", "acc"),
            Instr::Effect(EffectInstr { op: Opcode::Jmp, args: vec![], labels: vec!["head".into()], funcs: vec![], extra: Default::default() }),
            Instr::Label { name: "exit".into() },
            Instr::Effect(EffectInstr { op: Opcode::Print, args: vec!["acc".into()], labels: vec![], funcs: vec![], extra: Default::default() }),
            Instr::Effect(EffectInstr { op: Opcode::Ret, args: vec![], labels: vec![], funcs: vec![], extra: Default::default() }),
        ];
        let (mut blocks, labels) = split_into_blocks(&instrs);
        let cfg = build_cfg("f", blocks.clone(), &labels).unwrap();
        liveness_driven(&cfg, &mut blocks);
        assert!(blocks[labels["entry"].index()].instrs.iter().any(|i| i.dest() == Some("acc")));
    }

    #[test]
    fn liveness_dce_drops_an_assignment_never_read_on_any_path() {
        let instrs = vec![
            Instr::constant("a", Literal::Int(1)),
            Instr::constant("dead", Literal::Int(2)),
            Instr::Effect(EffectInstr { op: Opcode::Print, args: vec!["a".into()], labels: vec![], funcs: vec![], extra: Default::default() }),
            Instr::Effect(EffectInstr { op: Opcode::Ret, args: vec![], labels: vec![], funcs: vec![], extra: Default::default() }),
        ];
        let (mut blocks, labels) = split_into_blocks(&instrs);
        let cfg = build_cfg("f", blocks.clone(), &labels).unwrap();
        liveness_driven(&cfg, &mut blocks);
        assert!(!blocks[0].instrs.iter().any(|i| i.dest() == Some("dead")));
    }

    /// Regression test for the hazard [`ApplyTiming::Eager`] documents:
    /// applying the sweep with an unconverged live-out (bottom, as if a loop
    /// body were swept before its header's facts had propagated back across
    /// the back edge) deletes a redefinition a later iteration still reads,
    /// even though the same sweep over the converged fact correctly keeps
    /// it.
    #[test]
    fn sweeping_with_an_unconverged_fact_wrongly_deletes_a_loop_carried_definition() {
        let instrs = vec![
            Instr::Label { name: "entry".into() },
            Instr::constant("acc", Literal::Int(0)),
            Instr::Label { name: "head".into() },
            Instr::Effect(EffectInstr {
                op: Opcode::Br,
                args: vec!["cond".into()],
                labels: vec!["body".into(), "exit".into()],
                funcs: vec![],
                extra: Default::default(),
            }),
            Instr::Label { name: "body".into() },
            Instr::constant("one", Literal::Int(1)),
            add("acc", "acc", "one"),
            Instr::Effect(EffectInstr { op: Opcode::Jmp, args: vec![], labels: vec!["head".into()], funcs: vec![], extra: Default::default() }),
            Instr::Label { name: "exit".into() },
            Instr::Effect(EffectInstr { op: Opcode::Print, args: vec!["acc".into()], labels: vec![], funcs: vec![], extra: Default::default() }),
            Instr::Effect(EffectInstr { op: Opcode::Ret, args: vec![], labels: vec![], funcs: vec![], extra: Default::default() }),
        ];
        let (blocks, labels) = split_into_blocks(&instrs);
        let cfg = build_cfg("f", blocks.clone(), &labels).unwrap();
        let vars = VarIndex::build(&blocks);
        let analysis = Liveness { vars: &vars };

        // The converged fact: sweeping with it keeps the redefinition.
        let facts = crate::dataflow::solve(&analysis, &cfg, &blocks);
        let mut converged_body = blocks[labels["body"].index()].clone();
        sweep(&facts.entering(labels["body"]), &vars, &mut converged_body);
        assert!(converged_body.instrs.iter().any(|i| i.dest() == Some("acc")));

        // An unconverged (bottom) fact -- what an eager apply would hand the
        // sweep on its first visit to this block, before `head`'s facts have
        // ever been computed -- wrongly deletes it.
        let mut premature_body = blocks[labels["body"].index()].clone();
        sweep(&crate::dataflow::LiveSet::bottom(), &vars, &mut premature_body);
        assert!(!premature_body.instrs.iter().any(|i| i.dest() == Some("acc")));
    }
}
