//! Primitive and pointer types carried by IR values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A value type: either a primitive or a pointer to another type.
///
/// Mirrors the wire format of §6: a bare string (`"int"`, `"bool"`) or a
/// single-field record (`{"ptr": T}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Type {
    /// A primitive scalar type.
    Primitive(Primitive),
    /// A pointer to another type, including another pointer.
    Ptr {
        /// The pointee type.
        ptr: Box<Type>,
    },
}

/// Primitive scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    /// 64-bit signed integer.
    Int,
    /// Boolean.
    Bool,
}

impl Type {
    /// Shorthand for the `int` primitive type.
    #[must_use]
    pub const fn int() -> Self {
        Type::Primitive(Primitive::Int)
    }

    /// Shorthand for the `bool` primitive type.
    #[must_use]
    pub const fn bool() -> Self {
        Type::Primitive(Primitive::Bool)
    }

    /// Wrap this type in a pointer.
    #[must_use]
    pub fn ptr_to(self) -> Self {
        Type::Ptr {
            ptr: Box::new(self),
        }
    }

    /// True if this is some depth of pointer.
    #[must_use]
    pub const fn is_ptr(&self) -> bool {
        matches!(self, Type::Ptr { .. })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(Primitive::Int) => write!(f, "int"),
            Type::Primitive(Primitive::Bool) => write!(f, "bool"),
            Type::Ptr { ptr } => write!(f, "ptr<{ptr}>"),
        }
    }
}
