//! esential: a typed builder DSL for WebAssembly modules.
//!
//! Functions are assembled from expressions held in an arena. Values may be
//! tuples or records; they lower to runs of primitive wasm values and are
//! accessed by position or field name through [`Proxy`] handles. A finished
//! build compiles to a validated binary and loads through
//! [`esential_runtime`].
//!
//! # Example
//! ```no_run
//! use esential::{CompileOptions, Esential, FuncDef, TypeDef};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut esen = Esential::new();
//! let add = esen.func(
//!     FuncDef::new()
//!         .param("a", TypeDef::I64)
//!         .param("b", TypeDef::I64)
//!         .result(TypeDef::I64),
//!     |f| {
//!         let (a, b) = (f.get("a")?, f.get("b")?);
//!         let sum = f.add(a, b)?;
//!         f.result([sum])
//!     },
//! )?;
//! esen.export("addTwo", add);
//! let mut instance = esen.start(&CompileOptions::default())?;
//! let sum: i64 = instance.call_typed::<(i64, i64), i64>("addTwo", (40, 2))?;
//! assert_eq!(sum, 42);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod func;
pub mod ir;
pub mod module;
pub mod optimizer;
pub mod proxy;
pub mod table;
pub mod types;
pub mod vars;

pub(crate) mod emit;
mod validate;

pub use error::{BuildError, Result};
pub use func::{Callable, CallableInfo, ExternalDef, FuncCtx, FuncDef};
pub use ir::{BinaryKind, ExprId, UnaryKind};
pub use module::{CompileOptions, Esential, Lib, LibArgs, Library, MemoryDef, TableDef};
pub use proxy::{unwrap, FieldKey, Proxy, Value};
pub use table::IndirectInfo;
pub use types::{Literal, Number, Primitive, TypeDef};

pub use anyhow;
pub use esential_runtime;
