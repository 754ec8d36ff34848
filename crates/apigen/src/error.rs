//! Generation errors
//!
//! Every variant is fatal: the run aborts before any file is written.

use std::fmt;
use thiserror::Error;

use crate::model::SchemaError;
use crate::types::Dialect;

/// Result type for generation steps
pub type GenerateResult<T> = Result<T, GenerateError>;

/// Errors raised while generating
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The type shape cannot be expressed in a dialect
    #[error("{dialect} dialect does not implement {feature} (type '{type_name}')")]
    UnsupportedType {
        /// Dialect that rejected the type
        dialect: Dialect,
        /// Name of the missing feature
        feature: &'static str,
        /// Type as written in the schema
        type_name: String,
    },

    /// A member refers to a type missing from the schema
    #[error("Unknown type '{type_name}' referenced from {context}")]
    UnknownType {
        /// The missing name
        type_name: String,
        /// Where it was referenced
        context: String,
    },

    /// Two export table entries of one type share a C symbol
    #[error("Duplicate exported symbol {symbol} in {type_name}")]
    DuplicateSymbol {
        /// Owning type
        type_name: String,
        /// The colliding symbol
        symbol: String,
    },

    /// Two trampoline slots of one type share a name
    #[error("Duplicate trampoline slot {slot} in {type_name}")]
    DuplicateSlot {
        /// Owning type
        type_name: String,
        /// Slot name
        slot: String,
    },

    /// The C-ABI shim and the binding declarations disagree
    #[error("Symbol parity mismatch in {type_name}: C ABI exports {cabi:?}, bindings declare {binding:?}")]
    SymbolParityMismatch {
        /// Owning type
        type_name: String,
        /// Symbols (name/arity) emitted into the C-ABI shim
        cabi: Vec<String>,
        /// Symbols (name/arity) declared by the binding class
        binding: Vec<String>,
    },

    /// Two emitted trampoline enumerations disagree with the slot table
    #[error("Trampoline order mismatch in {type_name} ({artifact}): expected {expected:?}, emitted {emitted:?}")]
    TrampolineOrderMismatch {
        /// Owning type
        type_name: String,
        /// Which emitted artifact diverged
        artifact: &'static str,
        /// Slot table order
        expected: Vec<String>,
        /// Order found in the artifact
        emitted: Vec<String>,
    },

    /// Schema could not be loaded
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Writing output failed
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Formatting into the in-memory buffer failed
    #[error("Formatting error")]
    Format(#[from] fmt::Error),
}

impl GenerateError {
    pub(crate) fn unsupported(dialect: Dialect, feature: &'static str, type_name: impl ToString) -> Self {
        GenerateError::UnsupportedType {
            dialect,
            feature,
            type_name: type_name.to_string(),
        }
    }
}
