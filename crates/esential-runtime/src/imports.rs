//! Host import registry.
//!
//! A module built with esential names the host items it needs by
//! `(namespace, name)`. [`Imports`] collects the matching host functions and
//! memory definitions so [`crate::load`] can wire them into a linker.
//! Registering the same `(namespace, name)` twice replaces the earlier item.

use std::fmt;
use std::sync::Arc;
use wasmtime::{Val, ValType};

/// Host function body: reads `params`, writes every slot of `results`.
pub type HostFn = Arc<dyn Fn(&[Val], &mut [Val]) -> anyhow::Result<()> + Send + Sync>;

/// A host function together with the flattened signature the module imports it with.
#[derive(Clone)]
pub struct HostFunc {
    pub params: Vec<ValType>,
    pub results: Vec<ValType>,
    pub func: HostFn,
}

impl HostFunc {
    pub fn new<F>(params: Vec<ValType>, results: Vec<ValType>, func: F) -> Self
    where
        F: Fn(&[Val], &mut [Val]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            params,
            results,
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for HostFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunc")
            .field("params", &self.params)
            .field("results", &self.results)
            .finish_non_exhaustive()
    }
}

/// Linear memory limits, in 64 KiB pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryDef {
    pub initial: u32,
    pub maximum: Option<u32>,
}

/// A single host-provided import.
#[derive(Debug, Clone)]
pub enum ImportItem {
    Func(HostFunc),
    /// Created fresh in the store at instantiation time.
    Memory(MemoryDef),
}

impl ImportItem {
    pub fn kind(&self) -> &'static str {
        match self {
            ImportItem::Func(_) => "func",
            ImportItem::Memory(_) => "memory",
        }
    }
}

/// Ordered `(namespace, name) → item` registry.
#[derive(Debug, Clone, Default)]
pub struct Imports {
    entries: Vec<(String, String, ImportItem)>,
}

impl Imports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an import, returning the item it replaced.
    pub fn insert(&mut self, namespace: &str, name: &str, item: ImportItem) -> Option<ImportItem> {
        match self
            .entries
            .iter_mut()
            .find(|(ns, n, _)| ns == namespace && n == name)
        {
            Some(entry) => {
                if std::mem::discriminant(&entry.2) != std::mem::discriminant(&item) {
                    tracing::warn!(
                        namespace,
                        name,
                        replaced = entry.2.kind(),
                        by = item.kind(),
                        "import replaced by a different kind"
                    );
                }
                Some(std::mem::replace(&mut entry.2, item))
            }
            None => {
                self.entries
                    .push((namespace.to_string(), name.to_string(), item));
                None
            }
        }
    }

    pub fn func(&mut self, namespace: &str, name: &str, func: HostFunc) {
        self.insert(namespace, name, ImportItem::Func(func));
    }

    pub fn memory(&mut self, namespace: &str, name: &str, def: MemoryDef) {
        self.insert(namespace, name, ImportItem::Memory(def));
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<&ImportItem> {
        self.entries
            .iter()
            .find(|(ns, n, _)| ns == namespace && n == name)
            .map(|(_, _, item)| item)
    }

    /// Copy every entry of `other` into `self`; `other` wins on conflicts.
    pub fn merge(&mut self, other: &Imports) {
        for (ns, name, item) in &other.entries {
            self.insert(ns, name, item.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &ImportItem)> {
        self.entries
            .iter()
            .map(|(ns, name, item)| (ns.as_str(), name.as_str(), item))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> HostFunc {
        HostFunc::new(vec![], vec![], |_, _| Ok(()))
    }

    #[test]
    fn insert_replaces_same_key() {
        let mut imports = Imports::new();
        imports.func("env", "log", noop());
        imports.memory(
            "env",
            "log",
            MemoryDef {
                initial: 1,
                maximum: None,
            },
        );
        assert_eq!(imports.len(), 1);
        assert!(matches!(
            imports.get("env", "log"),
            Some(ImportItem::Memory(_))
        ));
    }

    #[test]
    fn insert_hands_back_the_replaced_item() {
        let mut imports = Imports::new();
        let limits = MemoryDef {
            initial: 1,
            maximum: None,
        };
        assert!(imports
            .insert("namespace", "name", ImportItem::Func(noop()))
            .is_none());
        let replaced = imports.insert("namespace", "name", ImportItem::Memory(limits));
        assert_eq!(replaced.map(|item| item.kind()), Some("func"));
        assert_eq!(imports.get("namespace", "name").map(ImportItem::kind), Some("memory"));
    }

    #[test]
    fn keys_are_namespaced() {
        let mut imports = Imports::new();
        imports.func("a", "f", noop());
        imports.func("b", "f", noop());
        assert_eq!(imports.len(), 2);
        assert!(imports.get("a", "f").is_some());
        assert!(imports.get("c", "f").is_none());
    }

    #[test]
    fn merge_keeps_order_and_overrides() {
        let mut base = Imports::new();
        base.func("env", "a", noop());
        base.func("env", "b", noop());

        let mut extra = Imports::new();
        extra.memory(
            "env",
            "a",
            MemoryDef {
                initial: 2,
                maximum: Some(4),
            },
        );
        extra.func("env", "c", noop());

        base.merge(&extra);
        let names: Vec<&str> = base.iter().map(|(_, name, _)| name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(matches!(
            base.get("env", "a"),
            Some(ImportItem::Memory(MemoryDef { initial: 2, .. }))
        ));
    }
}
