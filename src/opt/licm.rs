//! Loop-invariant code motion (§4.10): hoist computations whose operands are
//! all available before a loop runs into its pre-header, so they execute
//! once per call instead of once per iteration.
//!
//! Assumes at most one static definition per variable name (the pipeline
//! runs this after SSA construction), so "defined outside the loop" is a
//! simple membership test against the loop body's own definitions rather
//! than a reaching-definitions query.

use std::collections::BTreeSet;

use crate::cfg::{BasicBlock, BlockId, Cfg, NaturalLoop};
use crate::ir::{Instr, Opcode};

/// Hoist loop-invariant instructions out of every loop in `loops` into its
/// pre-header, preserving their original relative order.
///
/// Each loop's header must already have exactly one predecessor outside its
/// own body -- true after [`crate::cfg::normalize_loops`] -- for there to be
/// a single unconditional place to hoist into. A loop without one is left
/// untouched.
pub fn run(cfg: &Cfg, blocks: &mut [BasicBlock], params: &BTreeSet<String>, loops: &[NaturalLoop]) {
    // Innermost loops first: something hoisted out of an inner loop may
    // turn out to be invariant in an enclosing one too.
    let mut ordered: Vec<&NaturalLoop> = loops.iter().collect();
    ordered.sort_by_key(|lp| lp.body.len());

    for lp in ordered {
        if let Some(preheader) = find_preheader(cfg, lp) {
            hoist_loop(blocks, params, lp, preheader);
        }
    }
}

fn find_preheader(cfg: &Cfg, lp: &NaturalLoop) -> Option<BlockId> {
    let mut outside = cfg.predecessors(lp.header).iter().copied().filter(|p| !lp.contains(*p));
    let only = outside.next()?;
    outside.next().is_none().then_some(only)
}

fn is_hoistable(op: Opcode, ty: &crate::ir::Type) -> bool {
    op.is_pure_arith()
        || op == Opcode::Const
        || op == Opcode::Alloc
        || (op == Opcode::Id && !ty.is_ptr())
}

fn hoist_loop(blocks: &mut [BasicBlock], params: &BTreeSet<String>, lp: &NaturalLoop, preheader: BlockId) {
    let defined_in_loop: BTreeSet<String> = lp
        .body
        .iter()
        .flat_map(|&id| blocks[id.index()].instrs.iter())
        .filter_map(Instr::dest)
        .map(str::to_string)
        .collect();

    let mut available: BTreeSet<String> = params.clone();
    let mut hoisted: Vec<Instr> = Vec::new();

    // Repeat to a fixed point: hoisting one instruction can make a later
    // one (that used to depend on it) invariant too.
    loop {
        let mut moved_any = false;
        for &id in &lp.body {
            let block = &mut blocks[id.index()];
            let mut keep = vec![true; block.instrs.len()];

            for (idx, instr) in block.instrs.iter().enumerate() {
                let Instr::Value(v) = instr else { continue };
                if !is_hoistable(v.op, &v.ty) || available.contains(&v.dest) {
                    continue;
                }
                let invariant =
                    v.args.iter().all(|a| !defined_in_loop.contains(a) || available.contains(a));
                if invariant {
                    hoisted.push(instr.clone());
                    available.insert(v.dest.clone());
                    keep[idx] = false;
                    moved_any = true;
                }
            }

            let mut idx = 0;
            block.instrs.retain(|_| {
                let k = keep[idx];
                idx += 1;
                k
            });
        }
        if !moved_any {
            break;
        }
    }

    if hoisted.is_empty() {
        return;
    }

    let ph = &mut blocks[preheader.index()];
    let insert_at = ph.instrs.iter().position(Instr::is_terminator).unwrap_or(ph.instrs.len());
    for (offset, instr) in hoisted.into_iter().enumerate() {
        ph.instrs.insert(insert_at + offset, instr);
    }
}
