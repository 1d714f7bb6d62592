//! Expression arena and type tagging.
//!
//! Every expression built during a module build lives in one [`ExprArena`];
//! callers hold [`ExprId`] handles into it. The arena doubles as the tagging
//! side table: each record carries the optional [`TypeDef`] stamped on it, so
//! composite shapes survive even though the lowered instructions only know
//! about primitives.

use super::ops::{BinOp, UnOp};
use crate::error::{BuildError, Result};
use crate::types::{Literal, Primitive, TypeDef};
use std::fmt;

/// Handle to an expression in the [`ExprArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub(crate) u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a declared function (defined or imported) in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncIdx(pub u32);

/// Flattened wasm signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    pub params: Vec<Primitive>,
    pub results: Vec<Primitive>,
}

/// A single expression node.
///
/// Slot and global numbers refer to the builder's symbolic slots, not to wasm
/// local indices; a composite slot expands to several wasm locals at encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Const(Literal),

    LocalGet {
        slot: u32,
        ty: TypeDef,
    },
    LocalSet {
        slot: u32,
        ty: TypeDef,
        value: ExprId,
    },
    GlobalGet {
        global: u32,
        ty: TypeDef,
    },
    GlobalSet {
        global: u32,
        ty: TypeDef,
        value: ExprId,
    },

    Binary {
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Unary {
        op: UnOp,
        operand: ExprId,
    },

    /// Direct call by function index.
    Call {
        func: FuncIdx,
        args: Vec<ExprId>,
        signature: Signature,
    },
    /// Call through the function table; `index` is a constant slot operand.
    CallIndirect {
        index: ExprId,
        args: Vec<ExprId>,
        signature: Signature,
    },

    /// Statement sequence. With `ty == Auto` the block takes the type of its
    /// last item.
    Block {
        items: Vec<ExprId>,
        ty: TypeDef,
    },
    /// Multi-value grouping of its items, in order.
    TupleMake(Vec<ExprId>),
    /// Positional field `index` of a composite, occupying the flattened slot
    /// range `offset..offset + width`.
    TupleExtract {
        tuple: ExprId,
        index: usize,
        offset: usize,
        width: usize,
    },

    If {
        cond: ExprId,
        then: Vec<ExprId>,
        otherwise: Vec<ExprId>,
        ty: TypeDef,
    },
    /// `init; while cond { body; step }`
    For {
        init: Vec<ExprId>,
        cond: ExprId,
        step: Vec<ExprId>,
        body: Vec<ExprId>,
    },
    Return(Option<ExprId>),

    Load {
        ty: Primitive,
        addr: ExprId,
        offset: u32,
    },
    Store {
        ty: Primitive,
        addr: ExprId,
        value: ExprId,
        offset: u32,
    },
    MemorySize,
    MemoryGrow {
        delta: ExprId,
    },

    Nop,
}

impl ExprKind {
    /// Direct children, in evaluation order.
    pub fn children(&self) -> Vec<ExprId> {
        match self {
            ExprKind::Const(_)
            | ExprKind::LocalGet { .. }
            | ExprKind::GlobalGet { .. }
            | ExprKind::MemorySize
            | ExprKind::Nop => Vec::new(),
            ExprKind::LocalSet { value, .. } | ExprKind::GlobalSet { value, .. } => vec![*value],
            ExprKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            ExprKind::Unary { operand, .. } => vec![*operand],
            ExprKind::Call { args, .. } => args.clone(),
            ExprKind::CallIndirect { index, args, .. } => {
                let mut out = args.clone();
                out.push(*index);
                out
            }
            ExprKind::Block { items, .. } | ExprKind::TupleMake(items) => items.clone(),
            ExprKind::TupleExtract { tuple, .. } => vec![*tuple],
            ExprKind::If {
                cond,
                then,
                otherwise,
                ..
            } => {
                let mut out = vec![*cond];
                out.extend(then);
                out.extend(otherwise);
                out
            }
            ExprKind::For {
                init,
                cond,
                step,
                body,
            } => {
                let mut out = init.clone();
                out.push(*cond);
                out.extend(body);
                out.extend(step);
                out
            }
            ExprKind::Return(value) => value.iter().copied().collect(),
            ExprKind::Load { addr, .. } => vec![*addr],
            ExprKind::Store { addr, value, .. } => vec![*addr, *value],
            ExprKind::MemoryGrow { delta } => vec![*delta],
        }
    }
}

/// An arena record: the node plus its type tag.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    tag: Option<TypeDef>,
}

impl Expr {
    pub fn tag(&self) -> Option<&TypeDef> {
        self.tag.as_ref()
    }
}

/// All expressions of one module build.
#[derive(Debug, Default)]
pub struct ExprArena {
    exprs: Vec<Expr>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Add an untagged expression.
    pub fn alloc(&mut self, kind: ExprKind) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(Expr { kind, tag: None });
        id
    }

    /// Add an expression and tag it in one step.
    pub fn alloc_tagged(&mut self, kind: ExprKind, ty: TypeDef) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        tracing::trace!(%id, %ty, "tag");
        self.exprs.push(Expr {
            kind,
            tag: Some(ty),
        });
        id
    }

    pub fn get(&self, id: ExprId) -> Result<&Expr> {
        self.exprs
            .get(id.index())
            .ok_or(BuildError::UnknownExpression { id: id.0 })
    }

    pub fn kind(&self, id: ExprId) -> Result<&ExprKind> {
        self.get(id).map(|e| &e.kind)
    }

    /// Swap the node behind `id`, keeping its tag. Used by optimisation passes.
    pub fn replace(&mut self, id: ExprId, kind: ExprKind) -> Result<()> {
        let expr = self
            .exprs
            .get_mut(id.index())
            .ok_or(BuildError::UnknownExpression { id: id.0 })?;
        expr.kind = kind;
        Ok(())
    }

    /// Record `ty` for `id`, overwriting any earlier tag.
    pub fn tag(&mut self, id: ExprId, ty: TypeDef) -> Result<()> {
        let expr = self
            .exprs
            .get_mut(id.index())
            .ok_or(BuildError::UnknownExpression { id: id.0 })?;
        tracing::trace!(%id, %ty, "tag");
        expr.tag = Some(ty);
        Ok(())
    }

    /// The tag of `id`; untagged or unknown handles fail with `UnknownExpression`.
    pub fn untag(&self, id: ExprId) -> Result<&TypeDef> {
        self.get(id)?
            .tag
            .as_ref()
            .ok_or(BuildError::UnknownExpression { id: id.0 })
    }

    /// Permissive lookup: a missing tag reads as [`TypeDef::None`].
    pub fn untag_or_none(&self, id: ExprId) -> TypeDef {
        self.exprs
            .get(id.index())
            .and_then(|e| e.tag.clone())
            .unwrap_or(TypeDef::None)
    }

    /// Descriptor of `id`: its tag, or for untagged nodes whose type is
    /// intrinsic (constants, primitive operations), that primitive.
    pub fn infer(&self, id: ExprId) -> Result<TypeDef> {
        let expr = self.get(id)?;
        if let Some(tag) = &expr.tag {
            return Ok(tag.clone());
        }
        match &expr.kind {
            ExprKind::Const(lit) => Ok(lit.primitive().into()),
            ExprKind::Binary { op, .. } => Ok(op.result_type().into()),
            ExprKind::Unary { op, .. } => Ok(op.result_type().into()),
            ExprKind::Load { ty, .. } => Ok((*ty).into()),
            _ => Err(BuildError::UnknownExpression { id: id.0 }),
        }
    }

    /// The primitive values `id` leaves on the wasm stack, in order.
    pub fn result_types(&self, id: ExprId) -> Result<Vec<Primitive>> {
        let types = match self.kind(id)? {
            ExprKind::Const(lit) => vec![lit.primitive()],
            ExprKind::LocalGet { ty, .. } | ExprKind::GlobalGet { ty, .. } => ty.flatten(),
            ExprKind::LocalSet { .. }
            | ExprKind::GlobalSet { .. }
            | ExprKind::Store { .. }
            | ExprKind::For { .. }
            | ExprKind::Return(_)
            | ExprKind::Nop => Vec::new(),
            ExprKind::Binary { op, .. } => vec![op.result_type()],
            ExprKind::Unary { op, .. } => vec![op.result_type()],
            ExprKind::Call { signature, .. } | ExprKind::CallIndirect { signature, .. } => {
                signature.results.clone()
            }
            ExprKind::Block { items, ty } => match ty {
                TypeDef::Auto => match items.last() {
                    Some(last) => self.result_types(*last)?,
                    None => Vec::new(),
                },
                other => other.flatten(),
            },
            ExprKind::TupleMake(items) => {
                let mut out = Vec::new();
                for item in items {
                    out.extend(self.result_types(*item)?);
                }
                out
            }
            ExprKind::TupleExtract {
                tuple,
                offset,
                width,
                ..
            } => {
                let all = self.result_types(*tuple)?;
                all.get(*offset..offset + width)
                    .map(<[Primitive]>::to_vec)
                    .ok_or(BuildError::UnknownExpression { id: id.0 })?
            }
            ExprKind::If { then, ty, .. } => match ty {
                TypeDef::Auto => match then.last() {
                    Some(last) => self.result_types(*last)?,
                    None => Vec::new(),
                },
                other => other.flatten(),
            },
            ExprKind::Load { ty, .. } => vec![*ty],
            ExprKind::MemorySize | ExprKind::MemoryGrow { .. } => vec![Primitive::I32],
        };
        Ok(types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_overwrites_previous_tag() {
        let mut arena = ExprArena::new();
        let e = arena.alloc(ExprKind::Const(Literal::I32(1)));
        arena.tag(e, TypeDef::I32).unwrap();
        arena.tag(e, TypeDef::tuple([TypeDef::I32])).unwrap();
        assert_eq!(arena.untag(e).unwrap(), &TypeDef::tuple([TypeDef::I32]));
    }

    #[test]
    fn untag_fails_on_missing_tag_and_unknown_handle() {
        let mut arena = ExprArena::new();
        let e = arena.alloc(ExprKind::MemorySize);
        assert_eq!(arena.untag(e), Err(BuildError::UnknownExpression { id: 0 }));
        assert_eq!(
            arena.untag(ExprId(99)),
            Err(BuildError::UnknownExpression { id: 99 })
        );
        assert_eq!(arena.untag_or_none(e), TypeDef::None);
        assert_eq!(arena.untag_or_none(ExprId(99)), TypeDef::None);
    }

    #[test]
    fn infer_classifies_untagged_constants_and_ops() {
        let mut arena = ExprArena::new();
        let a = arena.alloc(ExprKind::Const(Literal::F64(1.5)));
        let b = arena.alloc(ExprKind::Const(Literal::F64(2.0)));
        let cmp = arena.alloc(ExprKind::Binary {
            op: BinOp::F64Lt,
            lhs: a,
            rhs: b,
        });
        assert_eq!(arena.infer(a).unwrap(), TypeDef::F64);
        assert_eq!(arena.infer(cmp).unwrap(), TypeDef::I32);

        let size = arena.alloc(ExprKind::MemorySize);
        assert!(arena.infer(size).is_err());
    }

    #[test]
    fn result_types_follow_tuple_structure() {
        let mut arena = ExprArena::new();
        let a = arena.alloc(ExprKind::Const(Literal::I32(1)));
        let b = arena.alloc(ExprKind::Const(Literal::F64(2.0)));
        let c = arena.alloc(ExprKind::Const(Literal::I64(3)));
        let tuple = arena.alloc(ExprKind::TupleMake(vec![a, b, c]));
        assert_eq!(
            arena.result_types(tuple).unwrap(),
            vec![Primitive::I32, Primitive::F64, Primitive::I64]
        );
        let field = arena.alloc(ExprKind::TupleExtract {
            tuple,
            index: 1,
            offset: 1,
            width: 2,
        });
        assert_eq!(
            arena.result_types(field).unwrap(),
            vec![Primitive::F64, Primitive::I64]
        );

        let set = arena.alloc(ExprKind::LocalSet {
            slot: 0,
            ty: TypeDef::I32,
            value: a,
        });
        let block = arena.alloc(ExprKind::Block {
            items: vec![set, b],
            ty: TypeDef::Auto,
        });
        assert_eq!(arena.result_types(block).unwrap(), vec![Primitive::F64]);
    }
}
