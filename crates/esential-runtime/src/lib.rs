//! `esential-runtime`: host side of an esential module build.
//!
//! This crate provides:
//! - [`Imports`]: the registry of host functions and memories a module expects,
//!   keyed by `(namespace, name)`
//! - [`load`]: compile an encoded binary and instantiate it against [`Imports`]
//! - [`Instance`]: call exports and access imported memories after instantiation

mod imports;
pub use imports::{HostFn, HostFunc, ImportItem, Imports, MemoryDef};

mod instance;
pub use instance::{load, Instance};

pub use wasmtime;
pub use wasmtime::{Val, ValType};

/// WebAssembly page size: 64 KiB per the Wasm specification.
pub const PAGE_SIZE: usize = 65536;
