//! The opcode vocabulary understood by the core.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An instruction opcode.
///
/// Grouped informally per §3 of the design: pure arithmetic/logic, the
/// `const` literal opcode, the `id` move, control transfer, memory
/// operations, `call`, the `phi` SSA merge opcode, and `print`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
    Not,
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
    Const,
    Id,
    Jmp,
    Br,
    Ret,
    Alloc,
    Load,
    Store,
    Ptradd,
    Free,
    Call,
    Phi,
    Print,
}

impl Opcode {
    /// Opcodes from the pure arithmetic/logic family: deterministic, total
    /// except for `div`-by-zero, and safe to re-execute or drop if their
    /// result is unused.
    #[must_use]
    pub const fn is_pure_arith(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::And
                | Opcode::Or
                | Opcode::Xor
                | Opcode::Not
                | Opcode::Eq
                | Opcode::Lt
                | Opcode::Gt
                | Opcode::Le
                | Opcode::Ge
        )
    }

    /// Commutative binary opcodes: argument order does not affect the
    /// result, so LVN may canonicalize by sorting the operand value numbers.
    #[must_use]
    pub const fn is_commutative(self) -> bool {
        matches!(self, Opcode::Add | Opcode::Mul | Opcode::And | Opcode::Or | Opcode::Xor)
    }

    /// True for `jmp`, `br`, and `ret`: the only opcodes that end a block.
    #[must_use]
    pub const fn is_control_transfer(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Br | Opcode::Ret)
    }

    /// True for memory opcodes excluded from loop-invariant hoisting and
    /// from the pure-arithmetic constant-folding family.
    #[must_use]
    pub const fn is_memory(self) -> bool {
        matches!(
            self,
            Opcode::Alloc | Opcode::Load | Opcode::Store | Opcode::Ptradd | Opcode::Free
        )
    }

    /// Opcodes that never carry a destination, regardless of the instruction
    /// shape chosen by the parser (§3: effect ops).
    #[must_use]
    pub const fn is_always_effect(self) -> bool {
        matches!(self, Opcode::Store | Opcode::Print | Opcode::Ret | Opcode::Jmp | Opcode::Br | Opcode::Free)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_arith_excludes_memory_and_control() {
        assert!(Opcode::Add.is_pure_arith());
        assert!(!Opcode::Load.is_pure_arith());
        assert!(!Opcode::Jmp.is_pure_arith());
    }

    #[test]
    fn commutative_is_a_strict_subset_of_pure_arith() {
        for op in [Opcode::Add, Opcode::Mul, Opcode::And, Opcode::Or, Opcode::Xor] {
            assert!(op.is_commutative());
            assert!(op.is_pure_arith());
        }
        assert!(!Opcode::Sub.is_commutative());
        assert!(!Opcode::Div.is_commutative());
    }

    #[test]
    fn display_uses_wire_spelling() {
        assert_eq!(Opcode::Ptradd.to_string(), "ptradd");
        assert_eq!(Opcode::Br.to_string(), "br");
    }
}
