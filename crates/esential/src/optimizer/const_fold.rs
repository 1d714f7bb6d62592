//! Constant folding.
//!
//! Children are always allocated before their parents, so one forward sweep
//! over the arena folds whole constant subtrees bottom-up. A folded node keeps
//! its id and its tag; only its kind becomes `Const`.
//!
//! Operations that may trap at runtime (division, remainder, float to int
//! truncation) are never folded.

use crate::error::Result;
use crate::ir::{ExprArena, ExprId, ExprKind, UnOp};
use crate::types::Literal;

/// Fold every constant operation in the arena. Returns the number folded.
pub fn fold(exprs: &mut ExprArena) -> Result<usize> {
    let mut folded = 0;
    for index in 0..exprs.len() {
        let id = ExprId(index as u32);
        let value = match exprs.kind(id)? {
            ExprKind::Binary { op, lhs, rhs } => match (constant(exprs, *lhs), constant(exprs, *rhs)) {
                (Some(l), Some(r)) => op.fold(l, r),
                _ => None,
            },
            ExprKind::Unary { op, operand } => {
                constant(exprs, *operand).and_then(|v| eval_unop(*op, v))
            }
            _ => None,
        };
        if let Some(value) = value {
            tracing::trace!(%id, %value, "folded");
            exprs.replace(id, ExprKind::Const(value))?;
            folded += 1;
        }
    }
    Ok(folded)
}

fn constant(exprs: &ExprArena, id: ExprId) -> Option<Literal> {
    match exprs.kind(id) {
        Ok(ExprKind::Const(lit)) => Some(*lit),
        _ => None,
    }
}

fn eval_unop(op: UnOp, value: Literal) -> Option<Literal> {
    use Literal as L;
    let out = match (op, value) {
        (UnOp::I32Eqz, L::I32(v)) => L::I32((v == 0) as i32),
        (UnOp::I64Eqz, L::I64(v)) => L::I32((v == 0) as i32),
        (UnOp::F32Neg, L::F32(v)) => L::F32(-v),
        (UnOp::F64Neg, L::F64(v)) => L::F64(-v),
        (UnOp::F32Abs, L::F32(v)) => L::F32(v.abs()),
        (UnOp::F64Abs, L::F64(v)) => L::F64(v.abs()),
        (UnOp::I32WrapI64, L::I64(v)) => L::I32(v as i32),
        (UnOp::I64ExtendI32S, L::I32(v)) => L::I64(v as i64),
        (UnOp::I64ExtendI32U, L::I32(v)) => L::I64(v as u32 as i64),
        (UnOp::F32ConvertI32S, L::I32(v)) => L::F32(v as f32),
        (UnOp::F64ConvertI32S, L::I32(v)) => L::F64(v as f64),
        (UnOp::F32ConvertI64S, L::I64(v)) => L::F32(v as f32),
        (UnOp::F64ConvertI64S, L::I64(v)) => L::F64(v as f64),
        (UnOp::F64PromoteF32, L::F32(v)) => L::F64(v as f64),
        (UnOp::F32DemoteF64, L::F64(v)) => L::F32(v as f32),
        _ => return None,
    };
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BinOp;

    #[test]
    fn folds_nested_arithmetic() {
        let mut arena = ExprArena::new();
        let a = arena.alloc(ExprKind::Const(Literal::I32(6)));
        let b = arena.alloc(ExprKind::Const(Literal::I32(7)));
        let mul = arena.alloc(ExprKind::Binary {
            op: BinOp::I32Mul,
            lhs: a,
            rhs: b,
        });
        let ext = arena.alloc(ExprKind::Unary {
            op: UnOp::I64ExtendI32S,
            operand: mul,
        });
        assert_eq!(fold(&mut arena).unwrap(), 2);
        assert_eq!(
            arena.kind(ext).unwrap(),
            &ExprKind::Const(Literal::I64(42))
        );
    }

    #[test]
    fn division_is_left_alone() {
        let mut arena = ExprArena::new();
        let a = arena.alloc(ExprKind::Const(Literal::I32(1)));
        let b = arena.alloc(ExprKind::Const(Literal::I32(0)));
        let div = arena.alloc(ExprKind::Binary {
            op: BinOp::I32DivS,
            lhs: a,
            rhs: b,
        });
        assert_eq!(fold(&mut arena).unwrap(), 0);
        assert!(matches!(arena.kind(div).unwrap(), ExprKind::Binary { .. }));
    }

    #[test]
    fn non_constant_operands_block_folding() {
        let mut arena = ExprArena::new();
        let a = arena.alloc(ExprKind::MemorySize);
        let b = arena.alloc(ExprKind::Const(Literal::I32(1)));
        arena.alloc(ExprKind::Binary {
            op: BinOp::I32Add,
            lhs: a,
            rhs: b,
        });
        assert_eq!(fold(&mut arena).unwrap(), 0);
    }
}
