//! Tagged-variant instruction records.
//!
//! The wire format (§6) is an open, field-optional JSON shape; this module
//! is where that polymorphism gets pinned down to a sum type with explicit
//! tags, so every later pass matches on a closed set of shapes instead of
//! probing an open map of strings.

use indexmap::IndexMap;

use super::{Literal, Opcode, Type};

/// JSON fields neither this crate's passes nor the wire contract interpret,
/// kept so that parsing then serializing a document is the identity on
/// content the core does not understand (§6, §8).
pub type ExtraFields = IndexMap<String, serde_json::Value>;

/// A single IR instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// Begins a basic block.
    Label {
        /// The label name.
        name: String,
    },
    /// An operation that produces a value bound to `dest`.
    Value(ValueInstr),
    /// An operation with no destination, kept for its side effect or because
    /// it transfers control.
    Effect(EffectInstr),
}

/// A value-producing instruction: `dest = op args...`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueInstr {
    /// The opcode.
    pub op: Opcode,
    /// The variable this instruction defines.
    pub dest: String,
    /// The static type of `dest`.
    pub ty: Type,
    /// Argument variable names, in order.
    pub args: Vec<String>,
    /// Label operands (only `phi` uses these among value ops).
    pub labels: Vec<String>,
    /// Function-name operands (`call`).
    pub funcs: Vec<String>,
    /// The literal payload of a `const` instruction.
    pub value: Option<Literal>,
    /// Unrecognized JSON fields carried for round-trip fidelity.
    pub extra: ExtraFields,
}

/// A side-effecting or control-transferring instruction with no destination.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectInstr {
    /// The opcode.
    pub op: Opcode,
    /// Argument variable names, in order.
    pub args: Vec<String>,
    /// Label operands (`jmp`, `br`).
    pub labels: Vec<String>,
    /// Function-name operands (`call`).
    pub funcs: Vec<String>,
    /// Unrecognized JSON fields carried for round-trip fidelity.
    pub extra: ExtraFields,
}

impl Instr {
    /// Construct a `const` instruction.
    #[must_use]
    pub fn constant(dest: impl Into<String>, value: Literal) -> Self {
        Instr::Value(ValueInstr {
            op: Opcode::Const,
            dest: dest.into(),
            ty: value.type_of(),
            args: Vec::new(),
            labels: Vec::new(),
            funcs: Vec::new(),
            value: Some(value),
            extra: ExtraFields::new(),
        })
    }

    /// True if this instruction is a block-starting label.
    #[must_use]
    pub const fn is_label(&self) -> bool {
        matches!(self, Instr::Label { .. })
    }

    /// True if this instruction ends a basic block (`jmp`, `br`, `ret`).
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        match self {
            Instr::Effect(e) => e.op.is_control_transfer(),
            _ => false,
        }
    }

    /// The opcode, if this is a value or effect instruction.
    #[must_use]
    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            Instr::Label { .. } => None,
            Instr::Value(v) => Some(v.op),
            Instr::Effect(e) => Some(e.op),
        }
    }

    /// The destination variable, if this instruction defines one.
    #[must_use]
    pub fn dest(&self) -> Option<&str> {
        match self {
            Instr::Value(v) => Some(&v.dest),
            _ => None,
        }
    }

    /// The argument variable names read by this instruction.
    #[must_use]
    pub fn args(&self) -> &[String] {
        match self {
            Instr::Label { .. } => &[],
            Instr::Value(v) => &v.args,
            Instr::Effect(e) => &e.args,
        }
    }

    /// Mutable access to the argument variable names.
    pub fn args_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            Instr::Label { .. } => None,
            Instr::Value(v) => Some(&mut v.args),
            Instr::Effect(e) => Some(&mut e.args),
        }
    }

    /// The label operands (targets of `jmp`/`br`, or `phi` sources).
    #[must_use]
    pub fn labels(&self) -> &[String] {
        match self {
            Instr::Label { .. } => &[],
            Instr::Value(v) => &v.labels,
            Instr::Effect(e) => &e.labels,
        }
    }

    /// Mutable access to the label operands.
    pub fn labels_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            Instr::Label { .. } => None,
            Instr::Value(v) => Some(&mut v.labels),
            Instr::Effect(e) => Some(&mut e.labels),
        }
    }

    /// Rewrite every argument name equal to `from` to `to`. Used throughout
    /// SSA renaming and LVN to patch uses after a destination is renamed.
    pub fn rename_args(&mut self, from: &str, to: &str) {
        if let Some(args) = self.args_mut() {
            for a in args.iter_mut() {
                if a == from {
                    *a = to.to_string();
                }
            }
        }
    }
}

impl ValueInstr {
    /// True if every argument is syntactically present in `known`.
    #[must_use]
    pub fn args_known<'a>(&'a self, mut known: impl FnMut(&'a str) -> bool) -> bool {
        self.args.iter().all(|a| known(a.as_str()))
    }
}
