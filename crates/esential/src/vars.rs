//! Variable binding.
//!
//! Names resolve to slots of a [`VarScope`]. A function body sees its own
//! scope (parameters first, then locals) layered over the module's global
//! scope; local names shadow globals. Within one scope a repeated name
//! resolves to its last declaration.
//!
//! A slot declared without a type (`TypeDef::Auto`) takes the type of the
//! first value written to it and keeps it for the rest of the build.

use crate::error::{BuildError, Result};
use crate::ir::{ExprArena, ExprId, ExprKind};
use crate::proxy::{unwrap, Value};
use crate::types::TypeDef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Param,
    Local,
    Global,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: String,
    pub ty: TypeDef,
    pub class: StorageClass,
}

/// Ordered slot table. Positions are declaration order and never change.
#[derive(Debug, Clone, Default)]
pub struct VarScope {
    slots: Vec<Slot>,
}

impl VarScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slot; returns its position.
    pub fn declare(&mut self, name: impl Into<String>, ty: TypeDef, class: StorageClass) -> u32 {
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            name: name.into(),
            ty,
            class,
        });
        index
    }

    /// Last slot declared under `name`.
    pub fn lookup(&self, name: &str) -> Option<(u32, &Slot)> {
        self.slots
            .iter()
            .rposition(|slot| slot.name == name)
            .map(|index| (index as u32, &self.slots[index]))
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn fix_type(&mut self, index: u32, ty: TypeDef) {
        if let Some(slot) = self.slots.get_mut(index as usize) {
            tracing::trace!(name = %slot.name, %ty, "slot typed");
            slot.ty = ty;
        }
    }
}

/// The scopes a body can see, and where names first bound by a write live.
pub(crate) struct Bindings<'a> {
    pub exprs: &'a mut ExprArena,
    pub locals: &'a mut VarScope,
    pub globals: &'a mut VarScope,
    /// `Local` inside a function body, `Global` in the globals initializer.
    pub fresh: StorageClass,
}

impl Bindings<'_> {
    /// Read `name`, producing a proxy when its slot is composite.
    pub fn read(&mut self, name: &str) -> Result<Value> {
        let (kind, ty) = if let Some((slot, var)) = self.locals.lookup(name) {
            let ty = var.ty.clone();
            (ExprKind::LocalGet { slot, ty: ty.clone() }, ty)
        } else if let Some((global, var)) = self.globals.lookup(name) {
            let ty = var.ty.clone();
            (ExprKind::GlobalGet { global, ty: ty.clone() }, ty)
        } else {
            return Err(BuildError::UnknownVariable {
                name: name.to_string(),
            });
        };
        if ty == TypeDef::Auto {
            // declared but never assigned: there is nothing to read yet
            return Err(BuildError::UnknownVariable {
                name: name.to_string(),
            });
        }
        let expr = self.exprs.alloc_tagged(kind, ty.clone());
        Ok(Value::from_tagged(expr, &ty))
    }

    /// Store `value` into `name`, typing the slot on first assignment.
    pub fn write(&mut self, name: &str, value: impl Into<Value>) -> Result<ExprId> {
        let value = unwrap(value);
        let target = match self.locals.lookup(name) {
            Some((index, slot)) => Some((StorageClass::Local, index, slot.ty.clone())),
            None => self
                .globals
                .lookup(name)
                .map(|(index, slot)| (StorageClass::Global, index, slot.ty.clone())),
        };

        let (class, index, ty) = match target {
            Some((class, index, TypeDef::Auto)) => {
                let ty = settled_type(self.exprs, value)?;
                self.scope(class).fix_type(index, ty.clone());
                (class, index, ty)
            }
            Some((class, index, declared)) => {
                self.exprs.get(value)?;
                let incoming = self
                    .exprs
                    .infer(value)
                    .unwrap_or_else(|_| self.exprs.untag_or_none(value));
                let compatible = matches!(incoming, TypeDef::None | TypeDef::Auto)
                    || incoming.lowers_like(&declared);
                if !compatible {
                    return Err(BuildError::AssignmentTypeMismatch {
                        name: name.to_string(),
                        expected: declared.to_string(),
                        actual: incoming.to_string(),
                    });
                }
                (class, index, declared)
            }
            None => {
                let ty = settled_type(self.exprs, value)?;
                let class = self.fresh;
                let index = self.scope(class).declare(name, ty.clone(), class);
                tracing::trace!(name, %ty, ?class, "slot declared by assignment");
                (class, index, ty)
            }
        };

        let kind = match class {
            StorageClass::Global => ExprKind::GlobalSet {
                global: index,
                ty,
                value,
            },
            StorageClass::Param | StorageClass::Local => ExprKind::LocalSet {
                slot: index,
                ty,
                value,
            },
        };
        Ok(self.exprs.alloc_tagged(kind, TypeDef::None))
    }

    /// Lower every `(name, value)` pair in order and group the stores in one
    /// block whose type is left open.
    pub fn assign<N, V>(&mut self, pairs: impl IntoIterator<Item = (N, V)>) -> Result<ExprId>
    where
        N: AsRef<str>,
        V: Into<Value>,
    {
        let mut items = Vec::new();
        for (name, value) in pairs {
            items.push(self.write(name.as_ref(), value)?);
        }
        Ok(self.exprs.alloc_tagged(
            ExprKind::Block {
                items,
                ty: TypeDef::Auto,
            },
            TypeDef::Auto,
        ))
    }

    fn scope(&mut self, class: StorageClass) -> &mut VarScope {
        match class {
            StorageClass::Global => &mut *self.globals,
            StorageClass::Param | StorageClass::Local => &mut *self.locals,
        }
    }
}

/// Type of a value flowing into an untyped slot or result. Open-typed
/// groupings resolve to the primitives they actually leave on the stack.
pub(crate) fn settled_type(exprs: &ExprArena, value: ExprId) -> Result<TypeDef> {
    match exprs.infer(value)? {
        TypeDef::Auto => {
            let mut prims = exprs.result_types(value)?;
            Ok(match prims.len() {
                0 => TypeDef::None,
                1 => TypeDef::Primitive(prims.remove(0)),
                _ => TypeDef::tuple(prims.into_iter().map(TypeDef::from)),
            })
        }
        ty => Ok(ty),
    }
}
