//! Module builder.
//!
//! [`Esential`] is one module build: it owns the expression arena, the
//! declared functions, the global scope, the indirect table, and the host
//! imports the finished binary will need. Declarations happen in call order,
//! and that order fixes function indices, table slots and export order.

use crate::emit;
use crate::error::{BuildError, Result};
use crate::func::{
    signature_of, Callable, CallableInfo, CallableKind, ExternalDef, FuncCtx, FuncDef,
};
use crate::ir::{ExprArena, ExprId, ExprKind, FuncIdx};
use crate::optimizer;
use crate::table::{IndirectInfo, IndirectTable};
use crate::types::{Literal, Number, TypeDef};
use crate::validate;
use crate::vars::{StorageClass, VarScope};
use esential_runtime::{HostFunc, Imports, Instance, Val};
use heck::ToSnakeCase;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};

/// Imported linear memory. Sizes are in 64 KiB pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDef {
    pub namespace: String,
    pub name: String,
    pub initial: u32,
    pub maximum: u32,
}

impl Default for MemoryDef {
    fn default() -> Self {
        Self {
            namespace: "namespace".to_string(),
            name: "name".to_string(),
            initial: 10,
            maximum: 100,
        }
    }
}

/// Exports the function table under `export`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub export: String,
}

/// Knobs for [`Esential::compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub optimize: bool,
    pub validate: bool,
    pub memory: Option<MemoryDef>,
    pub table: Option<TableDef>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            validate: true,
            memory: None,
            table: None,
        }
    }
}

/// A function body or import, in declaration order.
#[derive(Debug, Clone)]
pub(crate) struct FuncEntry {
    pub id: String,
    pub params: Vec<TypeDef>,
    pub result: TypeDef,
    pub kind: FuncKind,
}

#[derive(Debug, Clone)]
pub(crate) enum FuncKind {
    Defined {
        /// Params first, then locals, including names bound by assignment.
        vars: VarScope,
        body: Vec<ExprId>,
    },
    Imported {
        namespace: String,
        name: String,
    },
}

/// Extra arguments passed to [`Library::build`].
pub type LibArgs = HashMap<String, Number>;

/// Named callables produced by a library, in the library's order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lib {
    entries: Vec<(String, Callable)>,
}

impl Lib {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, callable: Callable) -> Self {
        self.entries.push((name.into(), callable));
        self
    }

    pub fn get(&self, name: &str) -> Option<Callable> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, callable)| *callable)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Callable)> {
        self.entries.iter().map(|(name, c)| (name.as_str(), *c))
    }
}

/// A reusable group of functions mounted into a build.
pub trait Library: Any {
    fn build(&self, esen: &mut Esential, args: &LibArgs) -> Result<Lib>;

    /// Display name; the type name in snake case unless overridden.
    fn name(&self) -> String {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full).to_snake_case()
    }
}

/// A module build.
#[derive(Default)]
pub struct Esential {
    pub(crate) exprs: ExprArena,
    pub(crate) funcs: Vec<FuncEntry>,
    pub(crate) callables: Vec<CallableInfo>,
    pub(crate) globals: VarScope,
    pub(crate) start_body: Vec<ExprId>,
    pub(crate) table: IndirectTable,
    pub(crate) exports: Vec<(String, FuncIdx)>,
    pub(crate) memory: Option<MemoryDef>,
    pending_exports: HashSet<Callable>,
    imports: Imports,
    libs: HashMap<TypeId, Lib>,
    poisoned: bool,
}

impl Esential {
    pub fn new() -> Self {
        Self::default()
    }

    fn poison<T>(&mut self, out: Result<T>) -> Result<T> {
        if let Err(err) = &out {
            tracing::debug!(%err, "build poisoned");
            self.poisoned = true;
        }
        out
    }

    fn fresh_id(&self, id: Option<String>, prefix: &str) -> Result<String> {
        let taken = |id: &str| self.funcs.iter().any(|f| f.id == id);
        match id {
            Some(id) if taken(&id) => Err(BuildError::DuplicateFunctionId { id }),
            Some(id) => Ok(id),
            None => {
                let mut n = self.callables.len();
                while taken(&format!("{prefix}{n}")) {
                    n += 1;
                }
                Ok(format!("{prefix}{n}"))
            }
        }
    }

    /// Declare a function called by index.
    pub fn func<F>(&mut self, def: FuncDef, init: F) -> Result<Callable>
    where
        F: FnOnce(&mut FuncCtx<'_>) -> Result<()>,
    {
        let out = self.define(def, init, false);
        self.poison(out)
    }

    /// Declare a function called through the function table.
    pub fn indirect<F>(&mut self, def: FuncDef, init: F) -> Result<Callable>
    where
        F: FnOnce(&mut FuncCtx<'_>) -> Result<()>,
    {
        let out = self.define(def, init, true);
        self.poison(out)
    }

    fn define<F>(&mut self, def: FuncDef, init: F, indirect: bool) -> Result<Callable>
    where
        F: FnOnce(&mut FuncCtx<'_>) -> Result<()>,
    {
        let prefix = if indirect { "indirect" } else { "func" };
        let id = self.fresh_id(def.id.clone(), prefix)?;

        let mut vars = VarScope::new();
        for (name, ty) in &def.params {
            vars.declare(name, ty.clone(), StorageClass::Param);
        }
        for (name, ty) in &def.locals {
            vars.declare(name, ty.clone(), StorageClass::Local);
        }

        let mut ctx = FuncCtx::new(
            &mut self.exprs,
            &mut self.globals,
            &self.callables,
            vars,
            StorageClass::Local,
            def.result.clone(),
        );
        init(&mut ctx)?;
        let parts = ctx.finish();

        let func = FuncIdx(self.funcs.len() as u32);
        let kind = if indirect {
            let slot = self
                .table
                .append(func, &id, def.params.clone(), parts.result.clone())?;
            CallableKind::Indirect(slot)
        } else {
            CallableKind::Direct
        };
        tracing::debug!(%id, result = %parts.result, ?kind, "function declared");

        self.funcs.push(FuncEntry {
            id: id.clone(),
            params: def.params.iter().map(|(_, ty)| ty.clone()).collect(),
            result: parts.result.clone(),
            kind: FuncKind::Defined {
                vars: parts.vars,
                body: parts.body,
            },
        });
        let callable = Callable(self.callables.len() as u32);
        self.callables.push(CallableInfo {
            id,
            func,
            kind,
            params: def.params,
            result: parts.result,
        });
        if def.export {
            self.pending_exports.insert(callable);
        }
        Ok(callable)
    }

    /// Declare a host function supplied at load time as `namespace.name`.
    pub fn external<F>(&mut self, def: ExternalDef, host: F) -> Result<Callable>
    where
        F: Fn(&[Val], &mut [Val]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let out = self.import(def, host);
        self.poison(out)
    }

    fn import<F>(&mut self, def: ExternalDef, host: F) -> Result<Callable>
    where
        F: Fn(&[Val], &mut [Val]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.fresh_id(def.id.clone(), "external")?;
        let signature = signature_of(&def.params, &def.result);
        self.imports.func(
            &def.namespace,
            &def.name,
            HostFunc::new(
                signature.params.iter().map(|p| p.to_runtime()).collect(),
                signature.results.iter().map(|p| p.to_runtime()).collect(),
                host,
            ),
        );
        tracing::debug!(%id, namespace = %def.namespace, name = %def.name, "external declared");

        let func = FuncIdx(self.funcs.len() as u32);
        self.funcs.push(FuncEntry {
            id: id.clone(),
            params: def.params.iter().map(|(_, ty)| ty.clone()).collect(),
            result: def.result.clone(),
            kind: FuncKind::Imported {
                namespace: def.namespace,
                name: def.name,
            },
        });
        let callable = Callable(self.callables.len() as u32);
        self.callables.push(CallableInfo {
            id,
            func,
            kind: CallableKind::External,
            params: def.params,
            result: def.result,
        });
        Ok(callable)
    }

    /// Declare module globals and initialise them.
    ///
    /// `defs` may leave a type as `Auto`; such globals, and any name first
    /// assigned inside `init`, take the type of their first assignment. The
    /// initializer's statements run from the module's start function.
    pub fn globals<N, F>(&mut self, defs: impl IntoIterator<Item = (N, TypeDef)>, init: F) -> Result<()>
    where
        N: Into<String>,
        F: FnOnce(&mut FuncCtx<'_>) -> Result<()>,
    {
        let out = self.declare_globals(defs, init);
        self.poison(out)
    }

    fn declare_globals<N, F>(&mut self, defs: impl IntoIterator<Item = (N, TypeDef)>, init: F) -> Result<()>
    where
        N: Into<String>,
        F: FnOnce(&mut FuncCtx<'_>) -> Result<()>,
    {
        for (name, ty) in defs {
            let name = name.into();
            tracing::debug!(%name, %ty, "global declared");
            self.globals.declare(name, ty, StorageClass::Global);
        }
        let mut ctx = FuncCtx::new(
            &mut self.exprs,
            &mut self.globals,
            &self.callables,
            VarScope::new(),
            StorageClass::Global,
            TypeDef::None,
        );
        init(&mut ctx)?;
        let parts = ctx.finish();
        self.start_body.extend(parts.body);
        Ok(())
    }

    /// Mount `library` once per library type and export its pending callables.
    pub fn lib<L: Library>(&mut self, library: L, args: &LibArgs) -> Result<Lib> {
        let key = TypeId::of::<L>();
        if let Some(lib) = self.libs.get(&key) {
            return Ok(lib.clone());
        }
        tracing::debug!(name = %library.name(), "mounting library");
        let out = library.build(self, args);
        let lib = self.poison(out)?;
        for (name, callable) in lib.iter() {
            self.export(name, callable);
        }
        self.libs.insert(key, lib.clone());
        Ok(lib)
    }

    /// Export `callable` as `name` if it was declared exported and has not
    /// been exposed yet. Returns whether an export was added.
    pub fn export(&mut self, name: &str, callable: Callable) -> bool {
        if !self.pending_exports.remove(&callable) {
            return false;
        }
        let Some(info) = self.callables.get(callable.0 as usize) else {
            return false;
        };
        tracing::debug!(name, id = %info.id, "export");
        self.exports.push((name.to_string(), info.func));
        true
    }

    /// Import linear memory as `namespace.name`.
    pub fn memory(&mut self, def: MemoryDef) {
        tracing::debug!(namespace = %def.namespace, name = %def.name, initial = def.initial, maximum = def.maximum, "memory");
        self.imports.memory(
            &def.namespace,
            &def.name,
            esential_runtime::MemoryDef {
                initial: def.initial,
                maximum: Some(def.maximum),
            },
        );
        self.memory = Some(def);
    }

    /// A constant of primitive type `ty`.
    pub fn literal(&mut self, value: impl Into<Number>, ty: TypeDef) -> Result<ExprId> {
        let prim = match &ty {
            TypeDef::Primitive(p) => *p,
            other => {
                return Err(BuildError::UnsupportedLiteralType {
                    ty: other.to_string(),
                })
            }
        };
        let lit = Literal::from_number(value.into(), prim);
        Ok(self.exprs.alloc_tagged(ExprKind::Const(lit), ty))
    }

    // ── Introspection ──

    pub fn indirect_info(&self, callable: Callable) -> Option<&IndirectInfo> {
        match self.callables.get(callable.0 as usize)?.kind {
            CallableKind::Indirect(slot) => self.table.info(slot),
            CallableKind::Direct | CallableKind::External => None,
        }
    }

    pub fn callable_id(&self, callable: Callable) -> Option<&str> {
        self.callables
            .get(callable.0 as usize)
            .map(|info| info.id.as_str())
    }

    pub fn callable_info(&self, callable: Callable) -> Option<&CallableInfo> {
        self.callables.get(callable.0 as usize)
    }

    pub fn memory_def(&self) -> Option<&MemoryDef> {
        self.memory.as_ref()
    }

    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Host items the module expects at load time.
    pub fn imports(&self) -> &Imports {
        &self.imports
    }

    pub fn exprs(&self) -> &ExprArena {
        &self.exprs
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    // ── Output ──

    /// Finalise the table, optionally optimise and validate, and encode.
    pub fn compile(&mut self, options: &CompileOptions) -> Result<Vec<u8>> {
        if self.poisoned {
            return Err(BuildError::BuildPoisoned);
        }
        if let Some(def) = &options.memory {
            if self.memory.as_ref() != Some(def) {
                self.memory(def.clone());
            }
        }
        if options.optimize {
            let stats = optimizer::optimize(self)?;
            tracing::debug!(?stats, "optimized");
        }
        let binary = emit::encode(self, options)?;
        tracing::debug!(bytes = binary.len(), funcs = self.funcs.len(), "encoded");
        if options.validate {
            validate::validate(&binary)?;
        }
        Ok(binary)
    }

    /// Instantiate `binary` with the imports this build registered.
    pub fn load(&self, binary: &[u8]) -> anyhow::Result<Instance> {
        esential_runtime::load(binary, &self.imports)
    }

    /// Like [`Esential::load`], with `extra` layered over the registered
    /// imports. Entries of `extra` replace same-named ones.
    pub fn load_with(&self, binary: &[u8], extra: &Imports) -> anyhow::Result<Instance> {
        let mut imports = self.imports.clone();
        imports.merge(extra);
        esential_runtime::load(binary, &imports)
    }

    /// `compile` then `load`.
    pub fn start(&mut self, options: &CompileOptions) -> anyhow::Result<Instance> {
        let binary = self.compile(options)?;
        self.load(&binary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_defaults() {
        let opts = CompileOptions::default();
        assert!(opts.optimize && opts.validate);
        assert!(opts.memory.is_none() && opts.table.is_none());
        let mem = MemoryDef::default();
        assert_eq!((mem.initial, mem.maximum), (10, 100));
        assert_eq!((mem.namespace.as_str(), mem.name.as_str()), ("namespace", "name"));
    }

    #[test]
    fn literal_rejects_composites() {
        let mut esen = Esential::new();
        assert!(esen.literal(3, TypeDef::I64).is_ok());
        assert_eq!(
            esen.literal(3, TypeDef::tuple([TypeDef::I32])),
            Err(BuildError::UnsupportedLiteralType {
                ty: "(i32)".into()
            })
        );
    }

    #[test]
    fn auto_ids_count_callables() {
        let mut esen = Esential::new();
        let a = esen.func(FuncDef::new(), |_| Ok(())).unwrap();
        let b = esen.indirect(FuncDef::new(), |_| Ok(())).unwrap();
        let c = esen
            .external(ExternalDef::default(), |_, _| Ok(()))
            .unwrap();
        assert_eq!(esen.callable_id(a), Some("func0"));
        assert_eq!(esen.callable_id(b), Some("indirect1"));
        assert_eq!(esen.callable_id(c), Some("external2"));
    }

    #[test]
    fn auto_id_skips_explicitly_taken_ids() {
        let mut esen = Esential::new();
        let named = esen.func(FuncDef::new().id("func1"), |_| Ok(())).unwrap();
        let auto = esen.func(FuncDef::new(), |_| Ok(())).unwrap();
        assert_eq!(esen.callable_id(named), Some("func1"));
        assert_eq!(esen.callable_id(auto), Some("func2"));
        assert!(!esen.is_poisoned());
    }

    #[test]
    fn duplicate_ids_poison_the_build() {
        let mut esen = Esential::new();
        esen.func(FuncDef::new().id("f"), |_| Ok(())).unwrap();
        let err = esen.func(FuncDef::new().id("f"), |_| Ok(())).unwrap_err();
        assert_eq!(err, BuildError::DuplicateFunctionId { id: "f".into() });
        assert!(esen.is_poisoned());
        assert_eq!(
            esen.compile(&CompileOptions::default()),
            Err(BuildError::BuildPoisoned)
        );
    }

    #[test]
    fn initializer_error_poisons_the_build() {
        let mut esen = Esential::new();
        let err = esen
            .func(FuncDef::new(), |f| {
                f.get("missing")?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, BuildError::UnknownVariable { .. }));
        assert!(esen.is_poisoned());
    }

    #[test]
    fn indirect_slots_are_monotonic() {
        let mut esen = Esential::new();
        let direct = esen.func(FuncDef::new(), |_| Ok(())).unwrap();
        let slots: Vec<u32> = (0..4)
            .map(|n| {
                let c = esen
                    .indirect(FuncDef::new().id(format!("i{n}")), |_| Ok(()))
                    .unwrap();
                esen.indirect_info(c).unwrap().index
            })
            .collect();
        assert_eq!(slots, [0, 1, 2, 3]);
        assert_eq!(esen.table_len(), 4);
        assert!(esen.indirect_info(direct).is_none());
        let ids: Vec<_> = esen
            .table
            .funcs()
            .map(|f| esen.funcs[f.0 as usize].id.clone())
            .collect();
        assert_eq!(ids, ["i0", "i1", "i2", "i3"]);
    }

    #[test]
    fn export_happens_once_and_only_for_exported() {
        let mut esen = Esential::new();
        let public = esen.func(FuncDef::new(), |_| Ok(())).unwrap();
        let private = esen.func(FuncDef::new().export(false), |_| Ok(())).unwrap();
        assert!(esen.export("a", public));
        assert!(!esen.export("b", public));
        assert!(!esen.export("c", private));
        let names: Vec<_> = esen.exports.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["a"]);
    }

    struct Pair;

    impl Library for Pair {
        fn build(&self, esen: &mut Esential, _args: &LibArgs) -> Result<Lib> {
            let one = esen.func(FuncDef::new(), |f| {
                let v = f.i32(1);
                f.result([v])
            })?;
            Ok(Lib::new().with("one", one))
        }
    }

    #[test]
    fn library_is_mounted_once() {
        let mut esen = Esential::new();
        let first = esen.lib(Pair, &LibArgs::new()).unwrap();
        let second = esen.lib(Pair, &LibArgs::new()).unwrap();
        assert_eq!(first, second);
        assert_eq!(esen.funcs.len(), 1);
        assert_eq!(esen.exports.len(), 1);
        assert_eq!(Pair.name(), "pair");
    }

    #[test]
    fn globals_infer_from_first_assignment() {
        let mut esen = Esential::new();
        esen.globals([("declared", TypeDef::F64), ("later", TypeDef::Auto)], |g| {
            let a = g.f64(1.5);
            let b = g.i64(2);
            let c = g.i32(3);
            let stores = g.assign([("declared", a), ("later", b), ("fresh", c)])?;
            g.exec([stores])
        })
        .unwrap();
        let types: Vec<_> = esen.globals.slots().iter().map(|s| s.ty.clone()).collect();
        assert_eq!(types, [TypeDef::F64, TypeDef::I64, TypeDef::I32]);
        assert_eq!(esen.start_body.len(), 1);
        assert!(esen.funcs.is_empty());
    }
}
