//! Linear memory access.

use crate::arg;
use esential::{
    Esential, FuncDef, Lib, LibArgs, Library, MemoryDef, Primitive, Result, TypeDef,
};

/// Loads, stores and memory growth against an imported memory.
///
/// Registers `MemoryDef::default()` sized by the `pages` argument (1 when
/// absent) unless the build already imports a memory.
pub struct Memory;

impl Library for Memory {
    fn build(&self, esen: &mut Esential, args: &LibArgs) -> Result<Lib> {
        if esen.memory_def().is_none() {
            let pages = arg(args, "pages", 1) as u32;
            esen.memory(MemoryDef {
                initial: pages,
                maximum: pages.max(MemoryDef::default().maximum),
                ..MemoryDef::default()
            });
        }

        let store_load = esen.func(
            FuncDef::new()
                .id("storeLoad")
                .param("addr", TypeDef::I32)
                .param("value", TypeDef::I64),
            |f| {
                let (addr, value) = (f.get("addr")?, f.get("value")?);
                let store = f.store(Primitive::I64, addr, value, 0)?;
                f.exec([store])?;
                let addr = f.get("addr")?;
                let loaded = f.load(Primitive::I64, addr, 0);
                f.result([loaded])
            },
        )?;

        let sum_words = esen.func(
            FuncDef::new()
                .id("sumWords")
                .param("addr", TypeDef::I32)
                .param("count", TypeDef::I32)
                .result(TypeDef::I32),
            |f| {
                let zero = f.i32(0);
                let init_i = f.set("i", zero)?;
                let zero = f.i32(0);
                let init_acc = f.set("acc", zero)?;

                let (i, count) = (f.get("i")?, f.get("count")?);
                let cond = f.lt(i, count)?;

                let (addr, i) = (f.get("addr")?, f.get("i")?);
                let four = f.i32(4);
                let scaled = f.mul(i, four)?;
                let at = f.add(addr, scaled)?;
                let word = f.load(Primitive::I32, at, 0);
                let acc = f.get("acc")?;
                let total = f.add(acc, word)?;
                let body = f.set("acc", total)?;

                let (i, one) = (f.get("i")?, f.i32(1));
                let next = f.add(i, one)?;
                let step = f.set("i", next)?;

                let sum = f.for_loop([init_i, init_acc], cond, [step], [body]);
                f.exec([sum])?;
                let acc = f.get("acc")?;
                f.result([acc])
            },
        )?;

        let pages = esen.func(FuncDef::new().result(TypeDef::I32), |f| {
            let size = f.memory_size();
            f.result([size])
        })?;

        let grow = esen.func(
            FuncDef::new()
                .param("delta", TypeDef::I32)
                .result(TypeDef::I32),
            |f| {
                let delta = f.get("delta")?;
                let before = f.memory_grow(delta);
                f.result([before])
            },
        )?;

        Ok(Lib::new()
            .with("storeLoad", store_load)
            .with("sumWords", sum_words)
            .with("pages", pages)
            .with("grow", grow))
    }
}
