//! Primitive operations and tag-driven variant selection.
//!
//! Callers write `add(a, b)`; the concrete instruction (`i32.add`,
//! `f64.add`, ...) is chosen from the operands' primitive type.

use crate::types::{Literal, Primitive};
use std::fmt;

/// Operation as written by the caller, before a primitive type is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
    Add,
    Sub,
    Mul,
    Div,
    DivU,
    Rem,
    RemU,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    ShrU,
    Eq,
    Ne,
    Lt,
    LtU,
    Le,
    LeU,
    Gt,
    GtU,
    Ge,
    GeU,
    Min,
    Max,
}

impl fmt::Display for BinaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = format!("{self:?}").to_lowercase();
        write!(f, "{s}")
    }
}

/// Unary operation as written by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryKind {
    Eqz,
    Neg,
    Abs,
    Sqrt,
    /// i64 → i32
    Wrap,
    /// i32 → i64 (signed)
    Extend,
    /// i32 → i64 (unsigned)
    ExtendU,
    /// integer → float of the given width
    Convert(Primitive),
    /// float → integer of the given width (signed, trapping)
    Trunc(Primitive),
    /// f32 → f64
    Promote,
    /// f64 → f32
    Demote,
}

impl fmt::Display for UnaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryKind::Convert(to) => write!(f, "convert to {to}"),
            UnaryKind::Trunc(to) => write!(f, "trunc to {to}"),
            other => {
                let s = format!("{other:?}").to_lowercase();
                write!(f, "{s}")
            }
        }
    }
}

/// Binary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // i32 operations
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,
    // i32 comparisons
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,

    // i64 operations
    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64DivU,
    I64RemS,
    I64RemU,
    I64And,
    I64Or,
    I64Xor,
    I64Shl,
    I64ShrS,
    I64ShrU,
    // i64 comparisons
    I64Eq,
    I64Ne,
    I64LtS,
    I64LtU,
    I64GtS,
    I64GtU,
    I64LeS,
    I64LeU,
    I64GeS,
    I64GeU,

    // f32 operations
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
    F32Min,
    F32Max,
    // f32 comparisons
    F32Eq,
    F32Ne,
    F32Lt,
    F32Gt,
    F32Le,
    F32Ge,

    // f64 operations
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,
    F64Min,
    F64Max,
    // f64 comparisons
    F64Eq,
    F64Ne,
    F64Lt,
    F64Gt,
    F64Le,
    F64Ge,
}

impl BinOp {
    /// Pick the concrete instruction for `kind` on operands of type `ty`.
    pub fn select(kind: BinaryKind, ty: Primitive) -> Option<BinOp> {
        use BinOp::*;
        use BinaryKind as K;
        let op = match (ty, kind) {
            (Primitive::I32, K::Add) => I32Add,
            (Primitive::I32, K::Sub) => I32Sub,
            (Primitive::I32, K::Mul) => I32Mul,
            (Primitive::I32, K::Div) => I32DivS,
            (Primitive::I32, K::DivU) => I32DivU,
            (Primitive::I32, K::Rem) => I32RemS,
            (Primitive::I32, K::RemU) => I32RemU,
            (Primitive::I32, K::And) => I32And,
            (Primitive::I32, K::Or) => I32Or,
            (Primitive::I32, K::Xor) => I32Xor,
            (Primitive::I32, K::Shl) => I32Shl,
            (Primitive::I32, K::Shr) => I32ShrS,
            (Primitive::I32, K::ShrU) => I32ShrU,
            (Primitive::I32, K::Eq) => I32Eq,
            (Primitive::I32, K::Ne) => I32Ne,
            (Primitive::I32, K::Lt) => I32LtS,
            (Primitive::I32, K::LtU) => I32LtU,
            (Primitive::I32, K::Gt) => I32GtS,
            (Primitive::I32, K::GtU) => I32GtU,
            (Primitive::I32, K::Le) => I32LeS,
            (Primitive::I32, K::LeU) => I32LeU,
            (Primitive::I32, K::Ge) => I32GeS,
            (Primitive::I32, K::GeU) => I32GeU,

            (Primitive::I64, K::Add) => I64Add,
            (Primitive::I64, K::Sub) => I64Sub,
            (Primitive::I64, K::Mul) => I64Mul,
            (Primitive::I64, K::Div) => I64DivS,
            (Primitive::I64, K::DivU) => I64DivU,
            (Primitive::I64, K::Rem) => I64RemS,
            (Primitive::I64, K::RemU) => I64RemU,
            (Primitive::I64, K::And) => I64And,
            (Primitive::I64, K::Or) => I64Or,
            (Primitive::I64, K::Xor) => I64Xor,
            (Primitive::I64, K::Shl) => I64Shl,
            (Primitive::I64, K::Shr) => I64ShrS,
            (Primitive::I64, K::ShrU) => I64ShrU,
            (Primitive::I64, K::Eq) => I64Eq,
            (Primitive::I64, K::Ne) => I64Ne,
            (Primitive::I64, K::Lt) => I64LtS,
            (Primitive::I64, K::LtU) => I64LtU,
            (Primitive::I64, K::Gt) => I64GtS,
            (Primitive::I64, K::GtU) => I64GtU,
            (Primitive::I64, K::Le) => I64LeS,
            (Primitive::I64, K::LeU) => I64LeU,
            (Primitive::I64, K::Ge) => I64GeS,
            (Primitive::I64, K::GeU) => I64GeU,

            (Primitive::F32, K::Add) => F32Add,
            (Primitive::F32, K::Sub) => F32Sub,
            (Primitive::F32, K::Mul) => F32Mul,
            (Primitive::F32, K::Div) => F32Div,
            (Primitive::F32, K::Min) => F32Min,
            (Primitive::F32, K::Max) => F32Max,
            (Primitive::F32, K::Eq) => F32Eq,
            (Primitive::F32, K::Ne) => F32Ne,
            (Primitive::F32, K::Lt) => F32Lt,
            (Primitive::F32, K::Gt) => F32Gt,
            (Primitive::F32, K::Le) => F32Le,
            (Primitive::F32, K::Ge) => F32Ge,

            (Primitive::F64, K::Add) => F64Add,
            (Primitive::F64, K::Sub) => F64Sub,
            (Primitive::F64, K::Mul) => F64Mul,
            (Primitive::F64, K::Div) => F64Div,
            (Primitive::F64, K::Min) => F64Min,
            (Primitive::F64, K::Max) => F64Max,
            (Primitive::F64, K::Eq) => F64Eq,
            (Primitive::F64, K::Ne) => F64Ne,
            (Primitive::F64, K::Lt) => F64Lt,
            (Primitive::F64, K::Gt) => F64Gt,
            (Primitive::F64, K::Le) => F64Le,
            (Primitive::F64, K::Ge) => F64Ge,

            _ => return None,
        };
        Some(op)
    }

    /// Whether the operation is a comparison (always produces i32 0/1).
    pub fn is_comparison(&self) -> bool {
        use BinOp::*;
        matches!(
            self,
            I32Eq
                | I32Ne
                | I32LtS
                | I32LtU
                | I32GtS
                | I32GtU
                | I32LeS
                | I32LeU
                | I32GeS
                | I32GeU
                | I64Eq
                | I64Ne
                | I64LtS
                | I64LtU
                | I64GtS
                | I64GtU
                | I64LeS
                | I64LeU
                | I64GeS
                | I64GeU
                | F32Eq
                | F32Ne
                | F32Lt
                | F32Gt
                | F32Le
                | F32Ge
                | F64Eq
                | F64Ne
                | F64Lt
                | F64Gt
                | F64Le
                | F64Ge
        )
    }

    /// Type of both operands.
    pub fn operand_type(&self) -> Primitive {
        use BinOp::*;
        match self {
            I32Add | I32Sub | I32Mul | I32DivS | I32DivU | I32RemS | I32RemU | I32And | I32Or
            | I32Xor | I32Shl | I32ShrS | I32ShrU | I32Eq | I32Ne | I32LtS | I32LtU | I32GtS
            | I32GtU | I32LeS | I32LeU | I32GeS | I32GeU => Primitive::I32,
            I64Add | I64Sub | I64Mul | I64DivS | I64DivU | I64RemS | I64RemU | I64And | I64Or
            | I64Xor | I64Shl | I64ShrS | I64ShrU | I64Eq | I64Ne | I64LtS | I64LtU | I64GtS
            | I64GtU | I64LeS | I64LeU | I64GeS | I64GeU => Primitive::I64,
            F32Add | F32Sub | F32Mul | F32Div | F32Min | F32Max | F32Eq | F32Ne | F32Lt
            | F32Gt | F32Le | F32Ge => Primitive::F32,
            F64Add | F64Sub | F64Mul | F64Div | F64Min | F64Max | F64Eq | F64Ne | F64Lt
            | F64Gt | F64Le | F64Ge => Primitive::F64,
        }
    }

    /// Returns the type of the result produced by this operation.
    ///
    /// Note: all comparison operations return i32 (0 or 1), even for i64/f32/f64 operands.
    pub fn result_type(&self) -> Primitive {
        if self.is_comparison() {
            Primitive::I32
        } else {
            self.operand_type()
        }
    }

    /// Evaluate on constant operands. Returns `None` when folding would change
    /// behaviour (trapping division) or the operands do not match.
    pub fn fold(&self, lhs: Literal, rhs: Literal) -> Option<Literal> {
        use BinOp::*;
        let b = |v: bool| Literal::I32(v as i32);
        let folded = match (self, lhs, rhs) {
            (I32Add, Literal::I32(a), Literal::I32(c)) => Literal::I32(a.wrapping_add(c)),
            (I32Sub, Literal::I32(a), Literal::I32(c)) => Literal::I32(a.wrapping_sub(c)),
            (I32Mul, Literal::I32(a), Literal::I32(c)) => Literal::I32(a.wrapping_mul(c)),
            (I32And, Literal::I32(a), Literal::I32(c)) => Literal::I32(a & c),
            (I32Or, Literal::I32(a), Literal::I32(c)) => Literal::I32(a | c),
            (I32Xor, Literal::I32(a), Literal::I32(c)) => Literal::I32(a ^ c),
            (I32Shl, Literal::I32(a), Literal::I32(c)) => Literal::I32(a.wrapping_shl(c as u32)),
            (I32ShrS, Literal::I32(a), Literal::I32(c)) => Literal::I32(a.wrapping_shr(c as u32)),
            (I32ShrU, Literal::I32(a), Literal::I32(c)) => {
                Literal::I32((a as u32).wrapping_shr(c as u32) as i32)
            }
            (I32Eq, Literal::I32(a), Literal::I32(c)) => b(a == c),
            (I32Ne, Literal::I32(a), Literal::I32(c)) => b(a != c),
            (I32LtS, Literal::I32(a), Literal::I32(c)) => b(a < c),
            (I32GtS, Literal::I32(a), Literal::I32(c)) => b(a > c),
            (I32LeS, Literal::I32(a), Literal::I32(c)) => b(a <= c),
            (I32GeS, Literal::I32(a), Literal::I32(c)) => b(a >= c),

            (I64Add, Literal::I64(a), Literal::I64(c)) => Literal::I64(a.wrapping_add(c)),
            (I64Sub, Literal::I64(a), Literal::I64(c)) => Literal::I64(a.wrapping_sub(c)),
            (I64Mul, Literal::I64(a), Literal::I64(c)) => Literal::I64(a.wrapping_mul(c)),
            (I64And, Literal::I64(a), Literal::I64(c)) => Literal::I64(a & c),
            (I64Or, Literal::I64(a), Literal::I64(c)) => Literal::I64(a | c),
            (I64Xor, Literal::I64(a), Literal::I64(c)) => Literal::I64(a ^ c),
            (I64Eq, Literal::I64(a), Literal::I64(c)) => b(a == c),
            (I64Ne, Literal::I64(a), Literal::I64(c)) => b(a != c),

            (F32Add, Literal::F32(a), Literal::F32(c)) => Literal::F32(a + c),
            (F32Sub, Literal::F32(a), Literal::F32(c)) => Literal::F32(a - c),
            (F32Mul, Literal::F32(a), Literal::F32(c)) => Literal::F32(a * c),
            (F64Add, Literal::F64(a), Literal::F64(c)) => Literal::F64(a + c),
            (F64Sub, Literal::F64(a), Literal::F64(c)) => Literal::F64(a - c),
            (F64Mul, Literal::F64(a), Literal::F64(c)) => Literal::F64(a * c),
            _ => return None,
        };
        Some(folded)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::I32Add => "i32.add",
            BinOp::I32Sub => "i32.sub",
            BinOp::I32Mul => "i32.mul",
            BinOp::I64Add => "i64.add",
            BinOp::I64Sub => "i64.sub",
            BinOp::I64Mul => "i64.mul",
            BinOp::F32Add => "f32.add",
            BinOp::F32Sub => "f32.sub",
            BinOp::F32Mul => "f32.mul",
            BinOp::F64Add => "f64.add",
            BinOp::F64Sub => "f64.sub",
            BinOp::F64Mul => "f64.mul",
            _ => return fmt::Debug::fmt(self, f),
        };
        write!(f, "{}", s)
    }
}

/// Unary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    I32Eqz,
    I64Eqz,

    F32Neg,
    F32Abs,
    F32Sqrt,
    F64Neg,
    F64Abs,
    F64Sqrt,

    // Conversions: integer width
    I32WrapI64,
    I64ExtendI32S,
    I64ExtendI32U,

    // Conversions: integer → float
    F32ConvertI32S,
    F32ConvertI64S,
    F64ConvertI32S,
    F64ConvertI64S,

    // Conversions: float → integer (trapping on NaN/overflow)
    I32TruncF32S,
    I32TruncF64S,
    I64TruncF32S,
    I64TruncF64S,

    // Conversions: float precision
    F32DemoteF64,
    F64PromoteF32,
}

impl UnOp {
    pub fn select(kind: UnaryKind, ty: Primitive) -> Option<UnOp> {
        use Primitive as P;
        use UnOp::*;
        use UnaryKind as K;
        let op = match (kind, ty) {
            (K::Eqz, P::I32) => I32Eqz,
            (K::Eqz, P::I64) => I64Eqz,
            (K::Neg, P::F32) => F32Neg,
            (K::Neg, P::F64) => F64Neg,
            (K::Abs, P::F32) => F32Abs,
            (K::Abs, P::F64) => F64Abs,
            (K::Sqrt, P::F32) => F32Sqrt,
            (K::Sqrt, P::F64) => F64Sqrt,
            (K::Wrap, P::I64) => I32WrapI64,
            (K::Extend, P::I32) => I64ExtendI32S,
            (K::ExtendU, P::I32) => I64ExtendI32U,
            (K::Convert(P::F32), P::I32) => F32ConvertI32S,
            (K::Convert(P::F32), P::I64) => F32ConvertI64S,
            (K::Convert(P::F64), P::I32) => F64ConvertI32S,
            (K::Convert(P::F64), P::I64) => F64ConvertI64S,
            (K::Trunc(P::I32), P::F32) => I32TruncF32S,
            (K::Trunc(P::I32), P::F64) => I32TruncF64S,
            (K::Trunc(P::I64), P::F32) => I64TruncF32S,
            (K::Trunc(P::I64), P::F64) => I64TruncF64S,
            (K::Promote, P::F32) => F64PromoteF32,
            (K::Demote, P::F64) => F32DemoteF64,
            _ => return None,
        };
        Some(op)
    }

    /// Returns the type of the result produced by this operation.
    ///
    /// Note: `I64Eqz` returns i32 (0 or 1), not i64.
    pub fn result_type(&self) -> Primitive {
        use UnOp::*;
        match self {
            I32Eqz | I64Eqz | I32WrapI64 | I32TruncF32S | I32TruncF64S => Primitive::I32,
            I64ExtendI32S | I64ExtendI32U | I64TruncF32S | I64TruncF64S => Primitive::I64,
            F32Neg | F32Abs | F32Sqrt | F32ConvertI32S | F32ConvertI64S | F32DemoteF64 => {
                Primitive::F32
            }
            F64Neg | F64Abs | F64Sqrt | F64ConvertI32S | F64ConvertI64S | F64PromoteF32 => {
                Primitive::F64
            }
        }
    }
}
