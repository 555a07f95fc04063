//! Error types returned by the library.
//!
//! Most public APIs return [`crate::Result`], which uses [`Error`] as the
//! error type. The variants provide access to more specific error
//! categories when needed, matching §7's taxonomy: malformed IR is never
//! repaired, I/O and config failures are reported as-is.

use std::io;

use thiserror::Error;

/// Convenient result alias for the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top level error surfaced by the library APIs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The IR document violated §6's wire contract.
    #[error(transparent)]
    Malformed(#[from] MalformedIr),

    /// I/O failure while reading or writing a program document or config file.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The JSON document was not valid JSON, independent of IR shape.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// The pass-pipeline configuration was unreadable or semantically invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Defects in an IR document that the parser refuses to repair.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum MalformedIr {
    /// An instruction object had neither `label` nor `op`.
    #[error("function {function:?}, instruction {index}: neither a label nor an op")]
    MissingOpAndLabel {
        /// The enclosing function's name.
        function: String,
        /// Index of the offending instruction within the function.
        index: usize,
    },

    /// The `op` field named an opcode outside the vocabulary of §3.
    #[error("function {function:?}, instruction {index}: unknown opcode {op:?}")]
    UnknownOpcode {
        /// The enclosing function's name.
        function: String,
        /// Index of the offending instruction within the function.
        index: usize,
        /// The unrecognized opcode string.
        op: String,
    },

    /// A `const` instruction was missing its `value` or `type` field.
    #[error("function {function:?}, instruction {index}: const is missing `{field}`")]
    ConstMissingField {
        /// The enclosing function's name.
        function: String,
        /// Index of the offending instruction within the function.
        index: usize,
        /// Which field was absent.
        field: &'static str,
    },

    /// A value-producing opcode was missing its required `dest`/`type`.
    #[error("function {function:?}, instruction {index}: {op} requires `{field}`")]
    ValueMissingField {
        /// The enclosing function's name.
        function: String,
        /// Index of the offending instruction within the function.
        index: usize,
        /// The opcode that required the field.
        op: String,
        /// Which field was absent.
        field: &'static str,
    },

    /// A `jmp`/`br` referenced a label absent from the function.
    #[error("function {function:?}: instruction {index} references undefined label {label:?}")]
    UndefinedLabel {
        /// The enclosing function's name.
        function: String,
        /// Index of the offending instruction within the function.
        index: usize,
        /// The missing label.
        label: String,
    },

    /// A `const`'s `value` field did not match its declared `type`.
    #[error("function {function:?}, instruction {index}: const value does not match declared type {ty}")]
    ConstValueTypeMismatch {
        /// The enclosing function's name.
        function: String,
        /// Index of the offending instruction within the function.
        index: usize,
        /// The declared type string.
        ty: String,
    },
}

/// Failures loading or interpreting the pass-pipeline configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The configuration named a pass that does not exist.
    #[error("unknown pass {0:?} in pipeline configuration")]
    UnknownPass(String),

    /// The configuration's pipeline list was empty.
    #[error("pipeline configuration names no passes")]
    EmptyPipeline,
}
