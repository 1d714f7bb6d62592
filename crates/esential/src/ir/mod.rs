//! Intermediate representation for builder output.
//!
//! Expressions form a tree over an [`ExprArena`]; composite values are kept
//! as multi-value nodes ([`ExprKind::TupleMake`], [`ExprKind::TupleExtract`])
//! until encoding flattens them into primitive stack slots.

mod expr;
pub use expr::*;

pub mod ops;
pub use ops::{BinOp, BinaryKind, UnOp, UnaryKind};
