//! Instantiation and export calls.

use crate::imports::{ImportItem, Imports};
use anyhow::{anyhow, Context, Result};
use wasmtime::{
    Caller, Engine, Func, FuncType, Linker, Memory, MemoryType, Module, Store, Val, WasmParams,
    WasmResults,
};

/// An instantiated module together with the store that owns its state.
pub struct Instance {
    store: Store<()>,
    instance: wasmtime::Instance,
    /// Imported memories created at instantiation, by `(namespace, name)`.
    memories: Vec<(String, String, Memory)>,
}

/// Compile `binary` and instantiate it, resolving every import from `imports`.
pub fn load(binary: &[u8], imports: &Imports) -> Result<Instance> {
    let engine = Engine::default();
    let module = Module::new(&engine, binary).context("failed to compile WebAssembly binary")?;
    let mut store = Store::new(&engine, ());
    let mut linker: Linker<()> = Linker::new(&engine);
    let mut memories = Vec::new();

    for (namespace, name, item) in imports.iter() {
        match item {
            ImportItem::Func(host) => {
                let ty = FuncType::new(&engine, host.params.clone(), host.results.clone());
                let body = host.func.clone();
                let func = Func::new(
                    &mut store,
                    ty,
                    move |_caller: Caller<'_, ()>, params: &[Val], results: &mut [Val]| {
                        body(params, results)
                    },
                );
                linker
                    .define(&store, namespace, name, func)
                    .with_context(|| format!("failed to define host function {namespace}.{name}"))?;
            }
            ImportItem::Memory(def) => {
                let memory = Memory::new(&mut store, MemoryType::new(def.initial, def.maximum))
                    .with_context(|| format!("failed to create memory {namespace}.{name}"))?;
                linker
                    .define(&store, namespace, name, memory)
                    .with_context(|| format!("failed to define memory {namespace}.{name}"))?;
                memories.push((namespace.to_string(), name.to_string(), memory));
            }
        }
        tracing::debug!(namespace, name, "import defined");
    }

    let instance = linker
        .instantiate(&mut store, &module)
        .context("failed to instantiate module")?;
    Ok(Instance {
        store,
        instance,
        memories,
    })
}

impl Instance {
    /// Names of every export, in module order.
    pub fn exports(&mut self) -> Vec<String> {
        self.instance
            .exports(&mut self.store)
            .map(|export| export.name().to_string())
            .collect()
    }

    /// Call an exported function with dynamically typed arguments.
    pub fn call(&mut self, name: &str, args: &[Val]) -> Result<Vec<Val>> {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| anyhow!("no exported function named `{name}`"))?;
        let result_count = func.ty(&self.store).results().len();
        let mut results = vec![Val::I32(0); result_count];
        func.call(&mut self.store, args, &mut results)
            .with_context(|| format!("call to `{name}` trapped"))?;
        Ok(results)
    }

    /// Call an exported function through its statically known signature.
    pub fn call_typed<P, R>(&mut self, name: &str, params: P) -> Result<R>
    where
        P: WasmParams,
        R: WasmResults,
    {
        let func = self
            .instance
            .get_typed_func::<P, R>(&mut self.store, name)
            .with_context(|| format!("export `{name}` has an unexpected signature"))?;
        func.call(&mut self.store, params)
            .with_context(|| format!("call to `{name}` trapped"))
    }

    /// A memory that was supplied through [`Imports`].
    pub fn memory(&self, namespace: &str, name: &str) -> Option<Memory> {
        self.memories
            .iter()
            .find(|(ns, n, _)| ns == namespace && n == name)
            .map(|(_, _, memory)| *memory)
    }

    pub fn read_memory(&self, memory: Memory, offset: usize, buf: &mut [u8]) -> Result<()> {
        memory
            .read(&self.store, offset, buf)
            .with_context(|| format!("memory read of {} bytes at {offset}", buf.len()))
    }

    pub fn write_memory(&mut self, memory: Memory, offset: usize, data: &[u8]) -> Result<()> {
        memory
            .write(&mut self.store, offset, data)
            .with_context(|| format!("memory write of {} bytes at {offset}", data.len()))
    }

    pub fn memory_size(&self, memory: Memory) -> usize {
        memory.data_size(&self.store)
    }
}
