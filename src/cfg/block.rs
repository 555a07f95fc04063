//! Basic blocks and the instruction-stream splitter of §4.1.

use indexmap::IndexMap;

use crate::ir::Instr;

/// Identifies a basic block by its position in a function's block vector.
///
/// All graph-shaped data in this crate (CFG edges, dominator sets, loop
/// membership) is expressed as these indices plus side tables, never as
/// pointers, so nothing here can form a reference cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub usize);

impl BlockId {
    /// The entry block is always index 0 after splitting.
    pub const ENTRY: BlockId = BlockId(0);

    /// The raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// A maximal straight-line run of instructions with a single entry label and
/// a single terminator (or implicit fall-through).
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    /// This block's index.
    pub id: BlockId,
    /// The label this block begins with (synthesized if the source had none).
    pub label: String,
    /// True if `label` was synthesized by the splitter rather than present
    /// in the source instruction stream.
    pub synthetic_label: bool,
    /// The instructions in this block, including the leading label.
    pub instrs: Vec<Instr>,
}

impl BasicBlock {
    /// The non-label instructions, in order.
    pub fn body(&self) -> impl Iterator<Item = &Instr> {
        self.instrs.iter().filter(|i| !i.is_label())
    }

    /// The terminator instruction, if the block ends in `jmp`/`br`/`ret`.
    #[must_use]
    pub fn terminator(&self) -> Option<&Instr> {
        self.instrs.last().filter(|i| i.is_terminator())
    }
}

/// Split an instruction stream into basic blocks (§4.1).
///
/// A label starts a new block (flushing the previous one if non-empty); a
/// terminator ends the current block. Leading instructions with no label
/// form block 0 under a synthesized `entry_0` pseudo-label.
#[must_use]
pub fn split_into_blocks(instrs: &[Instr]) -> (Vec<BasicBlock>, IndexMap<String, BlockId>) {
    let mut blocks = Vec::new();
    let mut label_index = IndexMap::new();
    let mut current: Vec<Instr> = Vec::new();
    let mut current_label: Option<(String, bool)> = None;
    let mut pseudo_count = 0usize;

    let mut flush = |blocks: &mut Vec<BasicBlock>,
                      label_index: &mut IndexMap<String, BlockId>,
                      current: &mut Vec<Instr>,
                      current_label: &mut Option<(String, bool)>,
                      pseudo_count: &mut usize| {
        if current.is_empty() {
            return;
        }
        let (label, synthetic_label) = current_label.take().unwrap_or_else(|| {
            let name = format!("entry_{pseudo_count}");
            *pseudo_count += 1;
            (name, true)
        });
        let id = BlockId(blocks.len());
        label_index.insert(label.clone(), id);
        blocks.push(BasicBlock {
            id,
            label,
            synthetic_label,
            instrs: std::mem::take(current),
        });
    };

    for instr in instrs {
        if let Instr::Label { name } = instr {
            flush(
                &mut blocks,
                &mut label_index,
                &mut current,
                &mut current_label,
                &mut pseudo_count,
            );
            current_label = Some((name.clone(), false));
            current.push(instr.clone());
            continue;
        }

        current.push(instr.clone());

        if instr.is_terminator() {
            flush(
                &mut blocks,
                &mut label_index,
                &mut current,
                &mut current_label,
                &mut pseudo_count,
            );
        }
    }

    flush(
        &mut blocks,
        &mut label_index,
        &mut current,
        &mut current_label,
        &mut pseudo_count,
    );

    (blocks, label_index)
}

/// Flatten blocks back into a single instruction stream, in block order.
#[must_use]
pub fn flatten(blocks: &[BasicBlock]) -> Vec<Instr> {
    blocks.iter().flat_map(|b| b.instrs.iter().cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{EffectInstr, Opcode, ValueInstr, Type};

    fn lbl(name: &str) -> Instr {
        Instr::Label { name: name.into() }
    }

    fn jmp(target: &str) -> Instr {
        Instr::Effect(EffectInstr {
            op: Opcode::Jmp,
            args: vec![],
            labels: vec![target.into()],
            funcs: vec![],
            extra: Default::default(),
        })
    }

    fn constant(dest: &str) -> Instr {
        Instr::constant(dest, crate::ir::Literal::Int(1))
    }

    fn ret() -> Instr {
        Instr::Effect(EffectInstr { op: Opcode::Ret, args: vec![], labels: vec![], funcs: vec![], extra: Default::default() })
    }

    #[test]
    fn leading_unlabeled_instructions_form_synthetic_entry_block() {
        let instrs = vec![constant("a"), ret()];
        let (blocks, labels) = split_into_blocks(&instrs);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].synthetic_label);
        assert_eq!(blocks[0].label, "entry_0");
        assert_eq!(labels["entry_0"], BlockId(0));
    }

    #[test]
    fn label_starts_a_new_block_and_terminator_ends_one() {
        let instrs = vec![
            constant("a"),
            jmp("L"),
            lbl("L"),
            constant("b"),
            ret(),
        ];
        let (blocks, labels) = split_into_blocks(&instrs);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].instrs.len(), 2); // const a; jmp L
        assert_eq!(blocks[1].label, "L");
        assert!(!blocks[1].synthetic_label);
        assert_eq!(labels["L"], BlockId(1));
    }

    #[test]
    fn fallthrough_block_has_no_explicit_terminator() {
        let instrs = vec![lbl("A"), constant("x"), lbl("B"), ret()];
        let (blocks, _) = split_into_blocks(&instrs);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].terminator().is_none());
        assert!(blocks[1].terminator().is_some());
    }

    #[test]
    fn flatten_inverts_split_for_well_formed_input() {
        let instrs = vec![lbl("A"), constant("x"), jmp("A")];
        let (blocks, _) = split_into_blocks(&instrs);
        assert_eq!(flatten(&blocks), instrs);
    }

    #[test]
    fn at_most_one_terminator_per_block_and_only_at_the_end() {
        let instrs = vec![lbl("A"), constant("x"), jmp("A"), lbl("B"), ret()];
        let (blocks, _) = split_into_blocks(&instrs);
        for block in &blocks {
            let terminators = block.instrs.iter().filter(|i| i.is_terminator()).count();
            assert!(terminators <= 1);
            if terminators == 1 {
                assert!(block.instrs.last().unwrap().is_terminator());
            }
        }
        let _ = ValueInstr { op: Opcode::Id, dest: "y".into(), ty: Type::int(), args: vec![], labels: vec![], funcs: vec![], value: None, extra: Default::default() };
    }
}
