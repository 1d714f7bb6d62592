//! Construction-time errors.
//!
//! Every error is fatal to the declaration that raised it. Once one is
//! returned the module build is poisoned and [`crate::Esential::compile`]
//! refuses to encode it.

use thiserror::Error;

pub type Result<T, E = BuildError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("unknown variable `{name}`")]
    UnknownVariable { name: String },

    #[error("expression #{id} has no type information")]
    UnknownExpression { id: u32 },

    #[error("could not find field `{field}` in record")]
    UnknownField { field: String },

    #[error("cannot index a primitive value")]
    CannotIndexPrimitive,

    /// `max` is `None` for an empty tuple.
    #[error("tuple index {index} out of range, {}", max_index(.max))]
    TupleIndexOutOfRange { index: usize, max: Option<usize> },

    #[error("wrong assignment type for `{name}`: expected {expected}, got {actual}")]
    AssignmentTypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("wrong return type: expected {expected}, got {actual}")]
    ReturnTypeMismatch { expected: String, actual: String },

    #[error("result requires at least one expression")]
    EmptyResult,

    #[error("block requires at least one expression")]
    EmptyBlock,

    #[error("literals can only have primitive types, not {ty}")]
    UnsupportedLiteralType { ty: String },

    #[error("module validation failed: {message}")]
    ValidationError { message: String },

    #[error("{ty} has no single primitive representation")]
    NotPrimitive { ty: String },

    #[error("operands of `{op}` disagree: {lhs} vs {rhs}")]
    OperandTypeMismatch {
        op: String,
        lhs: String,
        rhs: String,
    },

    #[error("`{op}` is not defined for {ty}")]
    UnsupportedOperation { op: String, ty: String },

    #[error("`{id}` takes {expected} argument(s), got {actual}")]
    ArgumentCountMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },

    #[error("callable #{index} was not declared in this module")]
    UnknownCallable { index: u32 },

    #[error("function id `{id}` is already declared")]
    DuplicateFunctionId { id: String },

    #[error("function `{id}` is already in the indirect table")]
    DuplicateIndirectEntry { id: String },

    #[error("module build aborted by an earlier error and cannot be compiled")]
    BuildPoisoned,
}

fn max_index(max: &Option<usize>) -> String {
    match max {
        Some(max) => format!("max index is {max}"),
        None => "tuple is empty".to_string(),
    }
}
