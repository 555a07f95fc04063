//! Natural loop discovery and pre-header normalization (§4.2, §4.10).
//!
//! LICM needs a single, unconditional entry point into each loop to hoist
//! instructions into. Source programs rarely have one (a loop header
//! typically has several predecessors: the initial fall-in plus every
//! back edge), so before LICM runs we insert a synthetic pre-header block
//! for every loop header reached by more than one non-back-edge
//! predecessor.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

use crate::error::Result;
use crate::ir::{EffectInstr, Instr, Opcode};

use super::block::{BasicBlock, BlockId};
use super::builder::build_cfg;
use super::dominance::Dominance;
use super::graph::Cfg;

/// A natural loop: one header plus every block that can reach a back edge
/// into it without first leaving through the header.
#[derive(Debug, Clone)]
pub struct NaturalLoop {
    /// The loop header: the sole entry point, dominating every other
    /// member.
    pub header: BlockId,
    /// Blocks with a back edge into `header`.
    pub latches: Vec<BlockId>,
    /// Every block in the loop, including `header`.
    pub body: BTreeSet<BlockId>,
}

impl NaturalLoop {
    /// True if `block` is part of this loop.
    #[must_use]
    pub fn contains(&self, block: BlockId) -> bool {
        self.body.contains(&block)
    }
}

/// Find every natural loop in `cfg` using `dom` for back-edge detection.
///
/// An edge `n -> h` is a back edge when `h` dominates `n`. Loops sharing a
/// header (common with `continue`-like control flow compiled to multiple
/// latches) are merged into a single [`NaturalLoop`].
#[must_use]
pub fn find_loops(cfg: &Cfg, dom: &Dominance) -> Vec<NaturalLoop> {
    let mut by_header: BTreeMap<BlockId, Vec<BlockId>> = BTreeMap::new();

    for n in cfg.block_ids() {
        for &h in cfg.successors(n) {
            if dom.dominates(h, n) {
                by_header.entry(h).or_default().push(n);
            }
        }
    }

    by_header
        .into_iter()
        .map(|(header, latches)| {
            let mut body = BTreeSet::new();
            body.insert(header);
            let mut stack: Vec<BlockId> = latches.iter().copied().filter(|&l| l != header).collect();
            while let Some(m) = stack.pop() {
                if body.insert(m) {
                    for &p in cfg.predecessors(m) {
                        stack.push(p);
                    }
                }
            }
            NaturalLoop { header, latches, body }
        })
        .collect()
}

/// Insert a pre-header before every loop header with more than one
/// predecessor outside its own loop body, and redirect those predecessors
/// to jump there instead.
///
/// Returns the rebuilt block list, label index, and CFG; block ids shift
/// whenever a pre-header is inserted, so callers must discard any
/// [`BlockId`]s computed before calling this and recompute dominance and
/// loops afterward if needed.
pub fn normalize(
    function: &str,
    mut blocks: Vec<BasicBlock>,
    label_index: &IndexMap<String, BlockId>,
    cfg: &Cfg,
    loops: &[NaturalLoop],
) -> Result<(Vec<BasicBlock>, IndexMap<String, BlockId>, Cfg)> {
    let mut existing_labels: BTreeSet<String> = label_index.keys().cloned().collect();
    // header block index -> pre-header label to insert just before it.
    let mut preheader_before: BTreeMap<BlockId, String> = BTreeMap::new();
    let mut next_preheader = 1usize;

    for lp in loops {
        let outside_preds: Vec<BlockId> = cfg
            .predecessors(lp.header)
            .iter()
            .copied()
            .filter(|p| !lp.contains(*p))
            .collect();
        if outside_preds.len() == 1 {
            continue;
        }

        let header_label = blocks[lp.header.index()].label.clone();
        let ph_label = unique_preheader_label(&mut next_preheader, &mut existing_labels);

        let outside_labels: BTreeSet<String> =
            outside_preds.iter().map(|&p| blocks[p.index()].label.clone()).collect();

        for pred in &outside_preds {
            redirect_terminator(blocks[pred.index()].instrs.last_mut(), &header_label, &ph_label);
        }
        retarget_phi_incoming(&mut blocks[lp.header.index()], &outside_labels, &ph_label);

        preheader_before.insert(lp.header, ph_label);
    }

    if preheader_before.is_empty() {
        return Ok((blocks, label_index.clone(), cfg.clone()));
    }

    let mut rebuilt: Vec<BasicBlock> = Vec::with_capacity(blocks.len() + preheader_before.len());
    for (index, block) in blocks.drain(..).enumerate() {
        if let Some(ph_label) = preheader_before.get(&BlockId(index)) {
            let header_label = block.label.clone();
            rebuilt.push(BasicBlock {
                id: BlockId(rebuilt.len()),
                label: ph_label.clone(),
                synthetic_label: true,
                instrs: vec![
                    Instr::Label { name: ph_label.clone() },
                    Instr::Effect(EffectInstr {
                        op: Opcode::Jmp,
                        args: vec![],
                        labels: vec![header_label],
                        funcs: vec![],
                        extra: Default::default(),
                    }),
                ],
            });
        }
        rebuilt.push(BasicBlock { id: BlockId(rebuilt.len()), ..block });
    }

    let mut new_label_index = IndexMap::new();
    for block in &rebuilt {
        new_label_index.insert(block.label.clone(), block.id);
    }

    let new_cfg = build_cfg(function, rebuilt.clone(), &new_label_index)?;
    Ok((rebuilt, new_label_index, new_cfg))
}

fn retarget_phi_incoming(header: &mut BasicBlock, outside_labels: &BTreeSet<String>, ph_label: &str) {
    for instr in &mut header.instrs {
        if instr.opcode() != Some(Opcode::Phi) {
            continue;
        }
        if let Some(labels) = instr.labels_mut() {
            for l in labels.iter_mut() {
                if outside_labels.contains(l) {
                    *l = ph_label.to_string();
                }
            }
        }
    }
}

fn redirect_terminator(term: Option<&mut Instr>, from_label: &str, to_label: &str) {
    if let Some(instr) = term {
        if let Some(labels) = instr.labels_mut() {
            for l in labels.iter_mut() {
                if l == from_label {
                    *l = to_label.to_string();
                }
            }
        }
    }
}

/// The k-th synthesized pre-header label for this function (§6's
/// `preheader_k` naming convention).
fn unique_preheader_label(next: &mut usize, existing: &mut BTreeSet<String>) -> String {
    loop {
        let candidate = format!("preheader_{next}");
        *next += 1;
        if existing.insert(candidate.clone()) {
            return candidate;
        }
    }
}
