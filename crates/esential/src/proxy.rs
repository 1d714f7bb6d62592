//! Composite value proxy.
//!
//! Reading a tuple- or record-typed slot yields a [`Value::Composite`]: the
//! raw expression plus its descriptor, with field access lowering to a
//! positional extract. Anywhere a plain handle is wanted, [`Value::as_raw_handle`]
//! (or [`unwrap`]) gives back the original expression unchanged.

use crate::error::{BuildError, Result};
use crate::ir::{ExprArena, ExprId, ExprKind};
use crate::types::TypeDef;
use std::fmt;

/// Field selector: position for tuples, name for records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKey {
    Index(usize),
    Name(String),
}

impl From<usize> for FieldKey {
    fn from(index: usize) -> Self {
        FieldKey::Index(index)
    }
}

impl From<&str> for FieldKey {
    fn from(name: &str) -> Self {
        FieldKey::Name(name.to_string())
    }
}

impl From<String> for FieldKey {
    fn from(name: String) -> Self {
        FieldKey::Name(name)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Index(i) => write!(f, "{i}"),
            FieldKey::Name(name) => write!(f, "{name}"),
        }
    }
}

/// A composite-typed expression exposing its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Proxy {
    expr: ExprId,
    ty: TypeDef,
}

impl Proxy {
    pub fn wrap(expr: ExprId, ty: TypeDef) -> Self {
        Self { expr, ty }
    }

    pub fn as_raw_handle(&self) -> ExprId {
        self.expr
    }

    pub fn type_def(&self) -> &TypeDef {
        &self.ty
    }

    /// Resolve `key` to `(position, field descriptor)`.
    pub fn position(&self, key: &FieldKey) -> Result<(usize, &TypeDef)> {
        match (&self.ty, key) {
            (TypeDef::Tuple(fields), FieldKey::Index(index)) => match fields.get(*index) {
                Some(field) => Ok((*index, field)),
                None => Err(BuildError::TupleIndexOutOfRange {
                    index: *index,
                    max: fields.len().checked_sub(1),
                }),
            },
            (TypeDef::Record(fields), FieldKey::Name(name)) => fields
                .iter()
                .position(|(field, _)| field == name)
                .map(|pos| (pos, &fields[pos].1))
                .ok_or_else(|| BuildError::UnknownField {
                    field: name.clone(),
                }),
            (TypeDef::Tuple(_) | TypeDef::Record(_), key) => Err(BuildError::UnknownField {
                field: key.to_string(),
            }),
            _ => Err(BuildError::CannotIndexPrimitive),
        }
    }

    /// Lower `self[key]` to an extract of the field's position.
    pub fn get_field(&self, exprs: &mut ExprArena, key: impl Into<FieldKey>) -> Result<Value> {
        let key = key.into();
        let (index, field) = self.position(&key)?;
        let field = field.clone();
        let offset = self.ty.field_offset(index);
        let extract = exprs.alloc_tagged(
            ExprKind::TupleExtract {
                tuple: self.expr,
                index,
                offset,
                width: field.width(),
            },
            field.clone(),
        );
        Ok(Value::from_tagged(extract, &field))
    }
}

/// What builder operations hand back: either a plain handle or a proxy.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Raw(ExprId),
    Composite(Proxy),
}

impl Value {
    /// Wrap `expr` in a proxy when `ty` is composite, otherwise keep it raw.
    pub fn from_tagged(expr: ExprId, ty: &TypeDef) -> Self {
        if ty.is_composite() {
            Value::Composite(Proxy::wrap(expr, ty.clone()))
        } else {
            Value::Raw(expr)
        }
    }

    pub fn as_raw_handle(&self) -> ExprId {
        match self {
            Value::Raw(expr) => *expr,
            Value::Composite(proxy) => proxy.as_raw_handle(),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Composite(_))
    }

    /// Field access. A raw handle whose tag is composite is treated as a proxy.
    pub fn get_field(&self, exprs: &mut ExprArena, key: impl Into<FieldKey>) -> Result<Value> {
        match self {
            Value::Composite(proxy) => proxy.get_field(exprs, key),
            Value::Raw(expr) => {
                let ty = exprs.untag(*expr)?.clone();
                Proxy::wrap(*expr, ty).get_field(exprs, key)
            }
        }
    }
}

impl From<ExprId> for Value {
    fn from(expr: ExprId) -> Self {
        Value::Raw(expr)
    }
}

impl From<Proxy> for Value {
    fn from(proxy: Proxy) -> Self {
        Value::Composite(proxy)
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

impl From<&ExprId> for Value {
    fn from(expr: &ExprId) -> Self {
        Value::Raw(*expr)
    }
}

/// The raw handle behind `value`; a no-op on raw handles.
pub fn unwrap(value: impl Into<Value>) -> ExprId {
    value.into().as_raw_handle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Literal;

    fn record_abc(arena: &mut ExprArena) -> Proxy {
        let ty = TypeDef::record([("a", TypeDef::I32), ("b", TypeDef::F64), ("c", TypeDef::I64)]);
        let expr = arena.alloc_tagged(ExprKind::Nop, ty.clone());
        Proxy::wrap(expr, ty)
    }

    fn extract_index(arena: &ExprArena, value: &Value) -> usize {
        match arena.kind(value.as_raw_handle()).unwrap() {
            ExprKind::TupleExtract { index, .. } => *index,
            other => panic!("expected extract, got {other:?}"),
        }
    }

    #[test]
    fn unwrap_is_idempotent() {
        let mut arena = ExprArena::new();
        let proxy = record_abc(&mut arena);
        let raw = proxy.as_raw_handle();
        let once = unwrap(proxy.clone());
        assert_eq!(once, raw);
        assert_eq!(unwrap(unwrap(proxy)), once);
        assert_eq!(unwrap(raw), raw);
    }

    #[test]
    fn record_field_position_is_declaration_order() {
        let mut arena = ExprArena::new();
        let proxy = record_abc(&mut arena);
        let c = proxy.get_field(&mut arena, "c").unwrap();
        let b = proxy.get_field(&mut arena, "b").unwrap();
        let a = proxy.get_field(&mut arena, "a").unwrap();
        assert_eq!(extract_index(&arena, &b), 1);
        assert_eq!(extract_index(&arena, &c), 2);
        assert_eq!(extract_index(&arena, &a), 0);
        assert_eq!(arena.untag(b.as_raw_handle()).unwrap(), &TypeDef::F64);
    }

    #[test]
    fn unknown_record_field() {
        let mut arena = ExprArena::new();
        let proxy = record_abc(&mut arena);
        assert_eq!(
            proxy.get_field(&mut arena, "z"),
            Err(BuildError::UnknownField { field: "z".into() })
        );
    }

    #[test]
    fn tuple_index_out_of_range_names_max() {
        let mut arena = ExprArena::new();
        let ty = TypeDef::tuple([TypeDef::I32, TypeDef::I32]);
        let expr = arena.alloc_tagged(ExprKind::Nop, ty.clone());
        let proxy = Proxy::wrap(expr, ty);
        assert!(proxy.get_field(&mut arena, 1usize).is_ok());
        assert_eq!(
            proxy.get_field(&mut arena, 2usize),
            Err(BuildError::TupleIndexOutOfRange {
                index: 2,
                max: Some(1)
            })
        );
    }

    #[test]
    fn empty_tuple_has_no_max_index() {
        let mut arena = ExprArena::new();
        let ty = TypeDef::tuple(Vec::new());
        let expr = arena.alloc_tagged(ExprKind::Nop, ty.clone());
        let proxy = Proxy::wrap(expr, ty);
        assert_eq!(
            proxy.get_field(&mut arena, 0usize),
            Err(BuildError::TupleIndexOutOfRange {
                index: 0,
                max: None
            })
        );
    }

    #[test]
    fn indexing_primitive_fails() {
        let mut arena = ExprArena::new();
        let expr = arena.alloc_tagged(ExprKind::Const(Literal::I32(1)), TypeDef::I32);
        let proxy = Proxy::wrap(expr, TypeDef::I32);
        assert_eq!(
            proxy.get_field(&mut arena, 0usize),
            Err(BuildError::CannotIndexPrimitive)
        );
        assert_eq!(
            Value::Raw(expr).get_field(&mut arena, 0usize),
            Err(BuildError::CannotIndexPrimitive)
        );
    }

    #[test]
    fn nested_composite_field_stays_proxied() {
        let mut arena = ExprArena::new();
        let inner = TypeDef::tuple([TypeDef::I32, TypeDef::I32]);
        let ty = TypeDef::tuple([TypeDef::F32, inner.clone()]);
        let expr = arena.alloc_tagged(ExprKind::Nop, ty.clone());
        let field = Proxy::wrap(expr, ty).get_field(&mut arena, 1usize).unwrap();
        assert!(field.is_composite());
        match arena.kind(field.as_raw_handle()).unwrap() {
            ExprKind::TupleExtract { offset, width, .. } => {
                assert_eq!((*offset, *width), (1, 2));
            }
            other => panic!("expected extract, got {other:?}"),
        }
        let leaf = field.get_field(&mut arena, 0usize).unwrap();
        assert!(!leaf.is_composite());
    }
}
