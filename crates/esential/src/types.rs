//! Type descriptors.
//!
//! A [`TypeDef`] is the canonical shape of a value: a single machine
//! [`Primitive`], a positional tuple, or a named record. Composite descriptors
//! have no single wasm value type; they are lowered by flattening every field
//! into consecutive primitive slots (see [`TypeDef::flatten`]).

use crate::error::{BuildError, Result};
use std::fmt;

/// WebAssembly value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    I32,
    I64,
    F32,
    F64,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::I32 => write!(f, "i32"),
            Primitive::I64 => write!(f, "i64"),
            Primitive::F32 => write!(f, "f32"),
            Primitive::F64 => write!(f, "f64"),
        }
    }
}

impl Primitive {
    pub fn to_val_type(self) -> wasm_encoder::ValType {
        match self {
            Primitive::I32 => wasm_encoder::ValType::I32,
            Primitive::I64 => wasm_encoder::ValType::I64,
            Primitive::F32 => wasm_encoder::ValType::F32,
            Primitive::F64 => wasm_encoder::ValType::F64,
        }
    }

    /// The matching host-side value type used when wiring imports.
    pub fn to_runtime(self) -> esential_runtime::ValType {
        match self {
            Primitive::I32 => esential_runtime::ValType::I32,
            Primitive::I64 => esential_runtime::ValType::I64,
            Primitive::F32 => esential_runtime::ValType::F32,
            Primitive::F64 => esential_runtime::ValType::F64,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64)
    }

    /// Natural alignment (log2 of the byte width) for memory access.
    pub fn align_log2(self) -> u32 {
        match self {
            Primitive::I32 | Primitive::F32 => 2,
            Primitive::I64 | Primitive::F64 => 3,
        }
    }
}

/// Shape of a value.
///
/// `Record` keeps fields in declaration order; that order is the positional
/// index used when a field is extracted, so it must never be re-sorted.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    /// Produces no value.
    None,
    /// Not fixed yet; resolved from the first value that flows into it.
    Auto,
    Primitive(Primitive),
    Tuple(Vec<TypeDef>),
    Record(Vec<(String, TypeDef)>),
}

impl TypeDef {
    pub const I32: TypeDef = TypeDef::Primitive(Primitive::I32);
    pub const I64: TypeDef = TypeDef::Primitive(Primitive::I64);
    pub const F32: TypeDef = TypeDef::Primitive(Primitive::F32);
    pub const F64: TypeDef = TypeDef::Primitive(Primitive::F64);

    pub fn tuple(fields: impl IntoIterator<Item = TypeDef>) -> Self {
        TypeDef::Tuple(fields.into_iter().collect())
    }

    pub fn record<S: Into<String>>(fields: impl IntoIterator<Item = (S, TypeDef)>) -> Self {
        TypeDef::Record(
            fields
                .into_iter()
                .map(|(name, ty)| (name.into(), ty))
                .collect(),
        )
    }

    /// The single wasm value type of a primitive descriptor.
    ///
    /// Composite descriptors fail with [`BuildError::NotPrimitive`]; lower
    /// them field by field through [`TypeDef::flatten`] instead.
    pub fn as_primitive(&self) -> Result<Primitive> {
        match self {
            TypeDef::Primitive(p) => Ok(*p),
            other => Err(BuildError::NotPrimitive {
                ty: other.to_string(),
            }),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeDef::Primitive(_))
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, TypeDef::Tuple(_) | TypeDef::Record(_))
    }

    /// Primitive slots this descriptor occupies, in positional order.
    pub fn flatten(&self) -> Vec<Primitive> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<Primitive>) {
        match self {
            TypeDef::None | TypeDef::Auto => {}
            TypeDef::Primitive(p) => out.push(*p),
            TypeDef::Tuple(fields) => fields.iter().for_each(|f| f.flatten_into(out)),
            TypeDef::Record(fields) => fields.iter().for_each(|(_, f)| f.flatten_into(out)),
        }
    }

    /// Number of primitive slots.
    pub fn width(&self) -> usize {
        match self {
            TypeDef::None | TypeDef::Auto => 0,
            TypeDef::Primitive(_) => 1,
            TypeDef::Tuple(fields) => fields.iter().map(TypeDef::width).sum(),
            TypeDef::Record(fields) => fields.iter().map(|(_, f)| f.width()).sum(),
        }
    }

    /// Descriptors of the positional fields (empty for non-composites).
    pub fn fields(&self) -> Vec<&TypeDef> {
        match self {
            TypeDef::Tuple(fields) => fields.iter().collect(),
            TypeDef::Record(fields) => fields.iter().map(|(_, f)| f).collect(),
            _ => Vec::new(),
        }
    }

    /// Flattened slot offset of positional field `index`.
    pub fn field_offset(&self, index: usize) -> usize {
        self.fields().iter().take(index).map(|f| f.width()).sum()
    }

    /// Two descriptors are interchangeable when they lower to the same slots.
    /// A tuple `(i32, i32)` and a record `{x: i32, y: i32}` are compatible.
    pub fn lowers_like(&self, other: &TypeDef) -> bool {
        self.flatten() == other.flatten()
    }
}

impl From<Primitive> for TypeDef {
    fn from(p: Primitive) -> Self {
        TypeDef::Primitive(p)
    }
}

impl fmt::Display for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDef::None => write!(f, "none"),
            TypeDef::Auto => write!(f, "auto"),
            TypeDef::Primitive(p) => write!(f, "{p}"),
            TypeDef::Tuple(fields) => {
                write!(f, "(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, ")")
            }
            TypeDef::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, field)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {name}: {field}")?;
                }
                write!(f, " }}")
            }
        }
    }
}

/// Constant value of a primitive type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Literal {
    pub fn primitive(&self) -> Primitive {
        match self {
            Literal::I32(_) => Primitive::I32,
            Literal::I64(_) => Primitive::I64,
            Literal::F32(_) => Primitive::F32,
            Literal::F64(_) => Primitive::F64,
        }
    }

    /// Convert a host number to a constant of `ty`. Out-of-range values wrap
    /// the way an `as` cast does.
    pub fn from_number(value: Number, ty: Primitive) -> Self {
        match (value, ty) {
            (Number::Int(v), Primitive::I32) => Literal::I32(v as i32),
            (Number::Int(v), Primitive::I64) => Literal::I64(v),
            (Number::Int(v), Primitive::F32) => Literal::F32(v as f32),
            (Number::Int(v), Primitive::F64) => Literal::F64(v as f64),
            (Number::Float(v), Primitive::I32) => Literal::I32(v as i32),
            (Number::Float(v), Primitive::I64) => Literal::I64(v as i64),
            (Number::Float(v), Primitive::F32) => Literal::F32(v as f32),
            (Number::Float(v), Primitive::F64) => Literal::F64(v),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::I32(v) => write!(f, "{v}i32"),
            Literal::I64(v) => write!(f, "{v}i64"),
            Literal::F32(v) => write!(f, "{v}f32"),
            Literal::F64(v) => write!(f, "{v}f64"),
        }
    }
}

/// A host number handed to [`crate::Esential::literal`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

macro_rules! number_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Number {
            fn from(v: $t) -> Self {
                Number::Int(v as i64)
            }
        })*
    };
}

number_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Number {
    fn from(v: f32) -> Self {
        Number::Float(v as f64)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Float(v)
    }
}
