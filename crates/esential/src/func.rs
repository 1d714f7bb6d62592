//! Function declarations and the body-construction context.
//!
//! [`crate::Esential::func`] hands the initializer a [`FuncCtx`]: variable
//! access, the `result`/`exec`/`block` helpers, and constructors for every
//! expression form. The context owns the body being accumulated and the
//! in-progress result type; nothing else mutates them.

use crate::error::{BuildError, Result};
use crate::ir::{BinOp, BinaryKind, ExprArena, ExprId, ExprKind, FuncIdx, Signature, UnOp, UnaryKind};
use crate::proxy::{unwrap, FieldKey, Value};
use crate::types::{Literal, Number, Primitive, TypeDef};
use crate::vars::{settled_type, Bindings, StorageClass, VarScope};

/// Declaration options for a defined (direct or indirect) function.
///
/// Defaults: auto-generated id, no params, no locals, result inferred from
/// the first `result` call, exported.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub id: Option<String>,
    pub params: Vec<(String, TypeDef)>,
    pub result: TypeDef,
    pub locals: Vec<(String, TypeDef)>,
    pub export: bool,
}

impl Default for FuncDef {
    fn default() -> Self {
        Self {
            id: None,
            params: Vec::new(),
            result: TypeDef::Auto,
            locals: Vec::new(),
            export: true,
        }
    }
}

impl FuncDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, ty: impl Into<TypeDef>) -> Self {
        self.params.push((name.into(), ty.into()));
        self
    }

    pub fn local(mut self, name: impl Into<String>, ty: impl Into<TypeDef>) -> Self {
        self.locals.push((name.into(), ty.into()));
        self
    }

    pub fn result(mut self, ty: impl Into<TypeDef>) -> Self {
        self.result = ty.into();
        self
    }

    pub fn export(mut self, export: bool) -> Self {
        self.export = export;
        self
    }
}

/// Declaration options for a host-imported function.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalDef {
    pub namespace: String,
    pub name: String,
    pub id: Option<String>,
    pub params: Vec<(String, TypeDef)>,
    pub result: TypeDef,
}

impl Default for ExternalDef {
    fn default() -> Self {
        Self {
            namespace: "namespace".to_string(),
            name: "name".to_string(),
            id: None,
            params: Vec::new(),
            result: TypeDef::None,
        }
    }
}

impl ExternalDef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, ty: impl Into<TypeDef>) -> Self {
        self.params.push((name.into(), ty.into()));
        self
    }

    pub fn result(mut self, ty: impl Into<TypeDef>) -> Self {
        self.result = ty.into();
        self
    }
}

/// Handle to a declared function, valid within the build that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Callable(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Direct,
    /// Called through the function table at this slot.
    Indirect(u32),
    External,
}

/// Side-table record joining a [`Callable`] to its function.
#[derive(Debug, Clone, PartialEq)]
pub struct CallableInfo {
    pub id: String,
    pub func: FuncIdx,
    pub kind: CallableKind,
    pub params: Vec<(String, TypeDef)>,
    pub result: TypeDef,
}

impl CallableInfo {
    pub fn signature(&self) -> Signature {
        signature_of(&self.params, &self.result)
    }
}

pub(crate) fn signature_of(params: &[(String, TypeDef)], result: &TypeDef) -> Signature {
    Signature {
        params: params.iter().flat_map(|(_, ty)| ty.flatten()).collect(),
        results: result.flatten(),
    }
}

/// What a finished body hands back to the module.
pub(crate) struct FuncParts {
    pub vars: VarScope,
    pub body: Vec<ExprId>,
    pub result: TypeDef,
}

/// Body-construction context passed to initializers.
pub struct FuncCtx<'m> {
    exprs: &'m mut ExprArena,
    globals: &'m mut VarScope,
    callables: &'m [CallableInfo],
    vars: VarScope,
    fresh: StorageClass,
    body: Vec<ExprId>,
    result: TypeDef,
}

impl<'m> FuncCtx<'m> {
    pub(crate) fn new(
        exprs: &'m mut ExprArena,
        globals: &'m mut VarScope,
        callables: &'m [CallableInfo],
        vars: VarScope,
        fresh: StorageClass,
        result: TypeDef,
    ) -> Self {
        Self {
            exprs,
            globals,
            callables,
            vars,
            fresh,
            body: Vec::new(),
            result,
        }
    }

    /// A result type still open after the body was built means none.
    pub(crate) fn finish(self) -> FuncParts {
        let result = match self.result {
            TypeDef::Auto => TypeDef::None,
            ty => ty,
        };
        FuncParts {
            vars: self.vars,
            body: self.body,
            result,
        }
    }

    fn bindings(&mut self) -> Bindings<'_> {
        Bindings {
            exprs: &mut *self.exprs,
            locals: &mut self.vars,
            globals: &mut *self.globals,
            fresh: self.fresh,
        }
    }

    /// The arena backing this build, for lower-level construction.
    pub fn exprs(&mut self) -> &mut ExprArena {
        &mut *self.exprs
    }

    /// Result type as known so far (`Auto` until the first `result`).
    pub fn result_type(&self) -> &TypeDef {
        &self.result
    }

    // ── Variables ──

    pub fn get(&mut self, name: &str) -> Result<Value> {
        self.bindings().read(name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<ExprId> {
        self.bindings().write(name, value)
    }

    /// Several stores grouped into one open-typed block, in the given order.
    pub fn assign<N, V>(&mut self, pairs: impl IntoIterator<Item = (N, V)>) -> Result<ExprId>
    where
        N: AsRef<str>,
        V: Into<Value>,
    {
        self.bindings().assign(pairs)
    }

    /// `value.key` / `value[key]`.
    pub fn field(&mut self, value: &Value, key: impl Into<FieldKey>) -> Result<Value> {
        value.get_field(&mut *self.exprs, key)
    }

    // ── Body helpers ──

    /// Emit all but the last value as statements and return the last one.
    ///
    /// With an `Auto` result the first call fixes the function's result
    /// type; later calls must agree with it.
    pub fn result<V: Into<Value>>(&mut self, values: impl IntoIterator<Item = V>) -> Result<()> {
        let mut items: Vec<ExprId> = values.into_iter().map(unwrap).collect();
        let last = items.pop().ok_or(BuildError::EmptyResult)?;
        let actual = settled_type(self.exprs, last)?;
        if self.result == TypeDef::Auto {
            tracing::trace!(ty = %actual, "result type inferred");
            self.exprs.tag(last, actual.clone())?;
            self.result = actual;
        } else if !actual.lowers_like(&self.result) {
            return Err(BuildError::ReturnTypeMismatch {
                expected: self.result.to_string(),
                actual: actual.to_string(),
            });
        }
        self.body.extend(items);
        let ret = self.exprs.alloc_tagged(ExprKind::Return(Some(last)), TypeDef::None);
        self.body.push(ret);
        Ok(())
    }

    /// Append side-effecting statements to the body.
    pub fn exec<V: Into<Value>>(&mut self, values: impl IntoIterator<Item = V>) -> Result<()> {
        let items: Vec<ExprId> = values.into_iter().map(unwrap).collect();
        if items.is_empty() {
            return Err(BuildError::EmptyBlock);
        }
        self.body.extend(items);
        Ok(())
    }

    /// A value-producing sequence typed by its last item.
    pub fn block<V: Into<Value>>(&mut self, values: impl IntoIterator<Item = V>) -> Result<Value> {
        let items: Vec<ExprId> = values.into_iter().map(unwrap).collect();
        let last = *items.last().ok_or(BuildError::EmptyBlock)?;
        let ty = settled_type(self.exprs, last)?;
        let block = self.exprs.alloc_tagged(
            ExprKind::Block {
                items,
                ty: ty.clone(),
            },
            ty.clone(),
        );
        Ok(Value::from_tagged(block, &ty))
    }

    /// Invoke a previously declared function. Indirect functions are called
    /// through the table at their slot; everything else by index.
    pub fn call<V: Into<Value>>(
        &mut self,
        callable: Callable,
        args: impl IntoIterator<Item = V>,
    ) -> Result<Value> {
        let callables = self.callables;
        let info = callables
            .get(callable.0 as usize)
            .ok_or(BuildError::UnknownCallable { index: callable.0 })?;
        let args: Vec<ExprId> = args.into_iter().map(unwrap).collect();
        if args.len() != info.params.len() {
            return Err(BuildError::ArgumentCountMismatch {
                id: info.id.clone(),
                expected: info.params.len(),
                actual: args.len(),
            });
        }
        let signature = info.signature();
        let result = info.result.clone();
        let kind = match info.kind {
            CallableKind::Indirect(slot) => {
                let index = self.literal(slot, Primitive::I32);
                ExprKind::CallIndirect {
                    index,
                    args,
                    signature,
                }
            }
            CallableKind::Direct | CallableKind::External => ExprKind::Call {
                func: info.func,
                args,
                signature,
            },
        };
        let expr = self.exprs.alloc_tagged(kind, result.clone());
        Ok(Value::from_tagged(expr, &result))
    }

    // ── Constants and composites ──

    pub fn literal(&mut self, value: impl Into<Number>, ty: Primitive) -> ExprId {
        let lit = Literal::from_number(value.into(), ty);
        self.exprs.alloc_tagged(ExprKind::Const(lit), ty.into())
    }

    pub fn i32(&mut self, value: i32) -> ExprId {
        self.literal(value, Primitive::I32)
    }

    pub fn i64(&mut self, value: i64) -> ExprId {
        self.literal(value, Primitive::I64)
    }

    pub fn f32(&mut self, value: f32) -> ExprId {
        self.literal(value, Primitive::F32)
    }

    pub fn f64(&mut self, value: f64) -> ExprId {
        self.literal(value, Primitive::F64)
    }

    /// Group values into a tuple typed by its members.
    pub fn tuple<V: Into<Value>>(&mut self, values: impl IntoIterator<Item = V>) -> Result<Value> {
        let items: Vec<ExprId> = values.into_iter().map(unwrap).collect();
        let fields = items
            .iter()
            .map(|item| settled_type(self.exprs, *item))
            .collect::<Result<Vec<_>>>()?;
        let ty = TypeDef::Tuple(fields);
        let expr = self.exprs.alloc_tagged(ExprKind::TupleMake(items), ty.clone());
        Ok(Value::from_tagged(expr, &ty))
    }

    /// Group named values into a record; field order is the given order.
    pub fn record<N, V>(&mut self, fields: impl IntoIterator<Item = (N, V)>) -> Result<Value>
    where
        N: Into<String>,
        V: Into<Value>,
    {
        let mut items = Vec::new();
        let mut types = Vec::new();
        for (name, value) in fields {
            let item = unwrap(value);
            types.push((name.into(), settled_type(self.exprs, item)?));
            items.push(item);
        }
        let ty = TypeDef::Record(types);
        let expr = self.exprs.alloc_tagged(ExprKind::TupleMake(items), ty.clone());
        Ok(Value::from_tagged(expr, &ty))
    }

    // ── Operations ──

    fn primitive_of(&self, expr: ExprId) -> Result<Primitive> {
        self.exprs.infer(expr)?.as_primitive()
    }

    /// `lhs <kind> rhs`, choosing the instruction from the operand type.
    pub fn binary(
        &mut self,
        kind: BinaryKind,
        lhs: impl Into<Value>,
        rhs: impl Into<Value>,
    ) -> Result<ExprId> {
        let (lhs, rhs) = (unwrap(lhs), unwrap(rhs));
        let (lt, rt) = (self.primitive_of(lhs)?, self.primitive_of(rhs)?);
        if lt != rt {
            return Err(BuildError::OperandTypeMismatch {
                op: kind.to_string(),
                lhs: lt.to_string(),
                rhs: rt.to_string(),
            });
        }
        let op = BinOp::select(kind, lt).ok_or_else(|| BuildError::UnsupportedOperation {
            op: kind.to_string(),
            ty: lt.to_string(),
        })?;
        Ok(self
            .exprs
            .alloc_tagged(ExprKind::Binary { op, lhs, rhs }, op.result_type().into()))
    }

    pub fn unary(&mut self, kind: UnaryKind, operand: impl Into<Value>) -> Result<ExprId> {
        let operand = unwrap(operand);
        let ty = self.primitive_of(operand)?;
        let op = UnOp::select(kind, ty).ok_or_else(|| BuildError::UnsupportedOperation {
            op: kind.to_string(),
            ty: ty.to_string(),
        })?;
        Ok(self
            .exprs
            .alloc_tagged(ExprKind::Unary { op, operand }, op.result_type().into()))
    }

    // ── Control flow ──

    /// `if cond { then } else { otherwise }`, typed by the then-arm's last item.
    pub fn if_else<T, E>(
        &mut self,
        cond: impl Into<Value>,
        then: impl IntoIterator<Item = T>,
        otherwise: impl IntoIterator<Item = E>,
    ) -> Result<Value>
    where
        T: Into<Value>,
        E: Into<Value>,
    {
        self.if_else_typed(TypeDef::Auto, cond, then, otherwise)
    }

    /// [`FuncCtx::if_else`] with a declared result type.
    pub fn if_else_typed<T, E>(
        &mut self,
        ty: TypeDef,
        cond: impl Into<Value>,
        then: impl IntoIterator<Item = T>,
        otherwise: impl IntoIterator<Item = E>,
    ) -> Result<Value>
    where
        T: Into<Value>,
        E: Into<Value>,
    {
        let cond = unwrap(cond);
        let then: Vec<ExprId> = then.into_iter().map(unwrap).collect();
        let otherwise: Vec<ExprId> = otherwise.into_iter().map(unwrap).collect();
        let ty = match ty {
            TypeDef::Auto => match then.last() {
                Some(last) => settled_type(self.exprs, *last)?,
                None => TypeDef::None,
            },
            ty => ty,
        };
        let expr = self.exprs.alloc_tagged(
            ExprKind::If {
                cond,
                then,
                otherwise,
                ty: ty.clone(),
            },
            ty.clone(),
        );
        Ok(Value::from_tagged(expr, &ty))
    }

    /// `init; while cond { body; step }`.
    pub fn for_loop<I, S, B>(
        &mut self,
        init: impl IntoIterator<Item = I>,
        cond: impl Into<Value>,
        step: impl IntoIterator<Item = S>,
        body: impl IntoIterator<Item = B>,
    ) -> ExprId
    where
        I: Into<Value>,
        S: Into<Value>,
        B: Into<Value>,
    {
        let kind = ExprKind::For {
            init: init.into_iter().map(unwrap).collect(),
            cond: unwrap(cond),
            step: step.into_iter().map(unwrap).collect(),
            body: body.into_iter().map(unwrap).collect(),
        };
        self.exprs.alloc_tagged(kind, TypeDef::None)
    }

    /// Raw expression escape hatch, tagged as given.
    pub fn raw(&mut self, kind: ExprKind, ty: TypeDef) -> Value {
        let expr = self.exprs.alloc_tagged(kind, ty.clone());
        Value::from_tagged(expr, &ty)
    }

    // ── Linear memory ──

    pub fn load(&mut self, ty: Primitive, addr: impl Into<Value>, offset: u32) -> ExprId {
        let addr = unwrap(addr);
        self.exprs
            .alloc_tagged(ExprKind::Load { ty, addr, offset }, ty.into())
    }

    pub fn store(
        &mut self,
        ty: Primitive,
        addr: impl Into<Value>,
        value: impl Into<Value>,
        offset: u32,
    ) -> Result<ExprId> {
        let (addr, value) = (unwrap(addr), unwrap(value));
        let actual = self.primitive_of(value)?;
        if actual != ty {
            return Err(BuildError::OperandTypeMismatch {
                op: "store".to_string(),
                lhs: ty.to_string(),
                rhs: actual.to_string(),
            });
        }
        Ok(self.exprs.alloc_tagged(
            ExprKind::Store {
                ty,
                addr,
                value,
                offset,
            },
            TypeDef::None,
        ))
    }

    pub fn memory_size(&mut self) -> ExprId {
        self.exprs.alloc_tagged(ExprKind::MemorySize, TypeDef::I32)
    }

    pub fn memory_grow(&mut self, delta: impl Into<Value>) -> ExprId {
        let delta = unwrap(delta);
        self.exprs
            .alloc_tagged(ExprKind::MemoryGrow { delta }, TypeDef::I32)
    }
}

macro_rules! binary_ops {
    ($($name:ident => $kind:ident),* $(,)?) => {
        impl FuncCtx<'_> {
            $(
                pub fn $name(&mut self, lhs: impl Into<Value>, rhs: impl Into<Value>) -> Result<ExprId> {
                    self.binary(BinaryKind::$kind, lhs, rhs)
                }
            )*
        }
    };
}

binary_ops! {
    add => Add, sub => Sub, mul => Mul, div => Div, div_u => DivU,
    rem => Rem, rem_u => RemU, and => And, or => Or, xor => Xor,
    shl => Shl, shr => Shr, shr_u => ShrU,
    eq => Eq, ne => Ne, lt => Lt, lt_u => LtU, le => Le, le_u => LeU,
    gt => Gt, gt_u => GtU, ge => Ge, ge_u => GeU,
    min => Min, max => Max,
}

macro_rules! unary_ops {
    ($($name:ident => $kind:ident),* $(,)?) => {
        impl FuncCtx<'_> {
            $(
                pub fn $name(&mut self, operand: impl Into<Value>) -> Result<ExprId> {
                    self.unary(UnaryKind::$kind, operand)
                }
            )*
        }
    };
}

unary_ops! {
    eqz => Eqz, neg => Neg, abs => Abs, sqrt => Sqrt,
    wrap => Wrap, extend => Extend, extend_u => ExtendU,
    promote => Promote, demote => Demote,
}

impl FuncCtx<'_> {
    /// Integer to float of width `to`.
    pub fn convert(&mut self, to: Primitive, operand: impl Into<Value>) -> Result<ExprId> {
        self.unary(UnaryKind::Convert(to), operand)
    }

    /// Float to integer of width `to`; traps on NaN or overflow.
    pub fn trunc(&mut self, to: Primitive, operand: impl Into<Value>) -> Result<ExprId> {
        self.unary(UnaryKind::Trunc(to), operand)
    }
}
