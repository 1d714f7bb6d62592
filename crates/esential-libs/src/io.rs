//! Host function calls.

use anyhow::{anyhow, Context};
use esential_runtime::Val;
use esential::{Esential, ExternalDef, FuncDef, Lib, LibArgs, Library, Result, TypeDef};
use std::sync::{Arc, Mutex};

/// Imports `env.log(i32)` and calls it from `logSum`.
///
/// Every logged value lands in the shared sink as well as the trace log.
#[derive(Debug, Default, Clone)]
pub struct Io {
    sink: Arc<Mutex<Vec<i32>>>,
}

impl Io {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values passed to `env.log` so far.
    pub fn sink(&self) -> Arc<Mutex<Vec<i32>>> {
        Arc::clone(&self.sink)
    }
}

impl Library for Io {
    fn build(&self, esen: &mut Esential, _args: &LibArgs) -> Result<Lib> {
        let sink = self.sink();
        let log = esen.external(
            ExternalDef::new("env", "log")
                .id("log")
                .param("value", TypeDef::I32),
            move |params, _results| {
                let value = params
                    .first()
                    .and_then(Val::i32)
                    .context("env.log expects one i32")?;
                tracing::info!(value, "env.log");
                sink.lock()
                    .map_err(|_| anyhow!("log sink poisoned"))?
                    .push(value);
                Ok(())
            },
        )?;

        let log_sum = esen.func(
            FuncDef::new()
                .id("logSum")
                .param("a", TypeDef::I32)
                .param("b", TypeDef::I32)
                .result(TypeDef::I32),
            |f| {
                let (a, b) = (f.get("a")?, f.get("b")?);
                let sum = f.add(a, b)?;
                let keep = f.set("sum", sum)?;
                f.exec([keep])?;
                let sum = f.get("sum")?;
                let logged = f.call(log, [sum])?;
                f.exec([logged])?;
                let sum = f.get("sum")?;
                f.result([sum])
            },
        )?;

        Ok(Lib::new().with("log", log).with("logSum", log_sum))
    }
}
