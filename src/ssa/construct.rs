//! SSA construction: φ placement via dominance frontiers, then renaming by
//! a pre-order walk of the dominator tree (§4.5).
//!
//! φ-nodes are ordinary `phi` instructions at the head of a block (after its
//! label), not a separate representation layered on top of the IR — the
//! wire format already has an opcode for them, so SSA form is just IR that
//! happens to satisfy the single-assignment property.

use std::collections::{BTreeMap, BTreeSet};

use crate::cfg::{BasicBlock, BlockId, Cfg, Dominance};
use crate::ir::{Instr, Param, Type, ValueInstr};

const UNDEFINED: &str = "__undefined";

/// Convert a function body already split into blocks into SSA form.
///
/// `blocks` must be post loop-normalization; SSA construction itself does
/// not care about loops, but callers running LICM afterward need the
/// pre-headers in place before φ-nodes are threaded through them.
#[must_use]
pub fn convert(params: &[Param], mut blocks: Vec<BasicBlock>, cfg: &Cfg, dom: &Dominance) -> Vec<BasicBlock> {
    let var_types = collect_types(params, &blocks);
    let phi_origin = place_phis(&blocks, dom, &var_types);

    for (&block, origins) in &phi_origin {
        let ty_of = |name: &str| var_types.get(name).cloned().unwrap_or_else(Type::int);
        let header: Vec<Instr> = origins
            .iter()
            .map(|name| {
                Instr::Value(ValueInstr {
                    op: crate::ir::Opcode::Phi,
                    dest: name.clone(),
                    ty: ty_of(name),
                    args: Vec::new(),
                    labels: Vec::new(),
                    funcs: Vec::new(),
                    value: None,
                    extra: Default::default(),
                })
            })
            .collect();
        let b = &mut blocks[block.index()];
        let insert_at = usize::from(b.instrs.first().is_some_and(Instr::is_label));
        for (offset, instr) in header.into_iter().enumerate() {
            b.instrs.insert(insert_at + offset, instr);
        }
    }

    let mut renamer = Renamer {
        stacks: params.iter().map(|p| (p.name.clone(), vec![p.name.clone()])).collect(),
        counters: BTreeMap::new(),
        phi_origin,
        cfg,
        blocks: &mut blocks,
    };
    renamer.visit(dom, dom.preorder(cfg.entry())[0]);
    drop(renamer);

    blocks
}

fn collect_types(params: &[Param], blocks: &[BasicBlock]) -> BTreeMap<String, Type> {
    let mut types = BTreeMap::new();
    for p in params {
        types.insert(p.name.clone(), p.ty.clone());
    }
    for block in blocks {
        for instr in &block.instrs {
            if let Instr::Value(v) = instr {
                types.entry(v.dest.clone()).or_insert_with(|| v.ty.clone());
            }
        }
    }
    types
}

/// Iterated-dominance-frontier φ placement.
///
/// Returns, per block, the original variable names that need a φ there, in
/// the (deterministic) order they were first placed.
fn place_phis(
    blocks: &[BasicBlock],
    dom: &Dominance,
    var_types: &BTreeMap<String, Type>,
) -> BTreeMap<BlockId, Vec<String>> {
    let mut defs: BTreeMap<String, BTreeSet<BlockId>> = BTreeMap::new();
    for block in blocks {
        for instr in &block.instrs {
            if let Some(dest) = instr.dest() {
                defs.entry(dest.to_string()).or_default().insert(block.id);
            }
        }
    }

    let mut placed: BTreeMap<BlockId, Vec<String>> = BTreeMap::new();
    let mut has_phi: BTreeSet<(String, BlockId)> = BTreeSet::new();

    for var in var_types.keys() {
        let Some(def_blocks) = defs.get(var) else { continue };
        let mut seen: BTreeSet<BlockId> = def_blocks.clone();
        let mut worklist: Vec<BlockId> = def_blocks.iter().copied().collect();

        while let Some(d) = worklist.pop() {
            for &f in dom.frontier(d) {
                if has_phi.insert((var.clone(), f)) {
                    placed.entry(f).or_default().push(var.clone());
                    if seen.insert(f) {
                        worklist.push(f);
                    }
                }
            }
        }
    }

    placed
}

struct Renamer<'a> {
    stacks: BTreeMap<String, Vec<String>>,
    counters: BTreeMap<String, usize>,
    phi_origin: BTreeMap<BlockId, Vec<String>>,
    cfg: &'a Cfg,
    blocks: &'a mut [BasicBlock],
}

impl<'a> Renamer<'a> {
    fn current(&self, name: &str) -> String {
        self.stacks
            .get(name)
            .and_then(|s| s.last())
            .cloned()
            .unwrap_or_else(|| UNDEFINED.to_string())
    }

    fn push_fresh(&mut self, orig: &str) -> String {
        let k = self.counters.entry(orig.to_string()).or_insert(0);
        *k += 1;
        let fresh = format!("{orig}.{k}");
        self.stacks.entry(orig.to_string()).or_default().push(fresh.clone());
        fresh
    }

    fn visit(&mut self, dom: &Dominance, block: BlockId) {
        let mut pushed: Vec<String> = Vec::new();
        let label = self.blocks[block.index()].label.clone();

        let phi_count = self.phi_origin.get(&block).map_or(0, Vec::len);
        let label_offset = usize::from(self.blocks[block.index()].instrs.first().is_some_and(Instr::is_label));

        for i in 0..phi_count {
            let orig = self.phi_origin[&block][i].clone();
            let fresh = self.push_fresh(&orig);
            pushed.push(orig);
            if let Instr::Value(v) = &mut self.blocks[block.index()].instrs[label_offset + i] {
                v.dest = fresh;
            }
        }

        let body_len = self.blocks[block.index()].instrs.len();
        for idx in (label_offset + phi_count)..body_len {
            let old_args = self.blocks[block.index()].instrs[idx].args().to_vec();
            let new_args: Vec<String> = old_args.iter().map(|a| self.current(a)).collect();
            if let Some(args) = self.blocks[block.index()].instrs[idx].args_mut() {
                *args = new_args;
            }

            let orig_dest = self.blocks[block.index()].instrs[idx].dest().map(str::to_string);
            if let Some(orig_dest) = orig_dest {
                let fresh = self.push_fresh(&orig_dest);
                pushed.push(orig_dest);
                if let Instr::Value(v) = &mut self.blocks[block.index()].instrs[idx] {
                    v.dest = fresh;
                }
            }
        }

        for &succ in self.cfg.successors(block) {
            let Some(origins) = self.phi_origin.get(&succ).cloned() else { continue };
            let succ_label_offset = usize::from(self.blocks[succ.index()].instrs.first().is_some_and(Instr::is_label));
            for (i, orig) in origins.iter().enumerate() {
                let value = self.current(orig);
                if let Instr::Value(v) = &mut self.blocks[succ.index()].instrs[succ_label_offset + i] {
                    v.args.push(value);
                    v.labels.push(label.clone());
                }
            }
        }

        for &child in dom.children(block) {
            self.visit(dom, child);
        }

        for orig in pushed.iter().rev() {
            if let Some(stack) = self.stacks.get_mut(orig) {
                stack.pop();
            }
        }
    }
}
