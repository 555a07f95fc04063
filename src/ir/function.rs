//! Function and program containers.

use super::{Instr, Type};

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Parameter type.
    pub ty: Type,
}

/// One function: a name, parameters, an optional return type, and an
/// ordered instruction stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Function name.
    pub name: String,
    /// Formal parameters, in declaration order.
    pub args: Vec<Param>,
    /// Return type, if any.
    pub ret_type: Option<Type>,
    /// The instruction stream, not yet split into blocks.
    pub instrs: Vec<Instr>,
}

impl Function {
    /// Create an empty function with no parameters or return type.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            ret_type: None,
            instrs: Vec::new(),
        }
    }

    /// Names of the formal parameters, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(|p| p.name.as_str())
    }
}

/// A whole program: an ordered collection of functions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    /// The functions making up the program.
    pub functions: Vec<Function>,
}

impl Program {
    /// Create an empty program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
