//! Literal constant values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A literal value produced by a `const` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// An integer literal.
    Int(i64),
    /// A boolean literal.
    Bool(bool),
}

impl Literal {
    /// The [`crate::ir::Type`] a `const` carrying this literal must declare.
    #[must_use]
    pub const fn type_of(&self) -> super::Type {
        match self {
            Literal::Int(_) => super::Type::int(),
            Literal::Bool(_) => super::Type::bool(),
        }
    }

    /// View this literal as an integer, if it is one.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(v) => Some(*v),
            Literal::Bool(_) => None,
        }
    }

    /// View this literal as a bool, if it is one.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(v) => Some(*v),
            Literal::Int(_) => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_of_matches_variant() {
        assert_eq!(Literal::Int(4).type_of(), super::super::Type::int());
        assert_eq!(Literal::Bool(true).type_of(), super::super::Type::bool());
    }

    #[test]
    fn json_roundtrip() {
        let lit = Literal::Int(-7);
        let json = serde_json::to_string(&lit).unwrap();
        assert_eq!(json, "-7");
        assert_eq!(serde_json::from_str::<Literal>(&json).unwrap(), lit);

        let lit = Literal::Bool(false);
        let json = serde_json::to_string(&lit).unwrap();
        assert_eq!(json, "false");
        assert_eq!(serde_json::from_str::<Literal>(&json).unwrap(), lit);
    }
}
