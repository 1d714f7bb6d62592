//! Tuple and record values: building them, passing them across calls, and
//! reading their fields.

use esential::{Esential, FuncCtx, FuncDef, Lib, LibArgs, Library, Result, TypeDef, Value};

/// Multi-value results and positional field access.
pub struct Tuple;

impl Library for Tuple {
    fn build(&self, esen: &mut Esential, _args: &LibArgs) -> Result<Lib> {
        let swap = esen.func(
            FuncDef::new()
                .id("swap")
                .param("a", TypeDef::I32)
                .param("b", TypeDef::I64),
            |f| {
                let (a, b) = (f.get("a")?, f.get("b")?);
                let swapped = f.tuple([b, a])?;
                f.result([swapped])
            },
        )?;

        // Reads fields straight off the call result.
        let first = esen.func(
            FuncDef::new()
                .param("a", TypeDef::I32)
                .param("b", TypeDef::I64)
                .result(TypeDef::I64),
            |f| {
                let (a, b) = (f.get("a")?, f.get("b")?);
                let pair = f.call(swap, [a, b])?;
                let head = f.field(&pair, 0usize)?;
                f.result([head])
            },
        )?;

        // Same call, kept in a local so both fields come from one evaluation.
        let mixed = esen.func(
            FuncDef::new()
                .param("a", TypeDef::I32)
                .param("b", TypeDef::I64),
            |f| {
                let (a, b) = (f.get("a")?, f.get("b")?);
                let pair = f.call(swap, [a, b])?;
                let keep = f.set("pair", pair)?;
                f.exec([keep])?;
                let pair = f.get("pair")?;
                let wide = f.field(&pair, 0usize)?;
                let narrow = f.field(&pair, 1usize)?;
                let widened = f.extend(narrow)?;
                let sum = f.add(wide, widened)?;
                f.result([sum])
            },
        )?;

        Ok(Lib::new()
            .with("swap", swap)
            .with("first", first)
            .with("mixed", mixed))
    }
}

/// Named fields over the same lowering as tuples.
pub struct Record;

fn point() -> TypeDef {
    TypeDef::record([("x", TypeDef::I32), ("y", TypeDef::I32)])
}

impl Library for Record {
    fn build(&self, esen: &mut Esential, _args: &LibArgs) -> Result<Lib> {
        let pair_y = esen.func(
            FuncDef::new().id("pairY").local("pair", point()),
            |f| {
                let (x, y) = (f.i32(3), f.i32(4));
                let value = f.record([("x", x), ("y", y)])?;
                let store = f.set("pair", value)?;
                let pair = f.get("pair")?;
                let y = f.field(&pair, "y")?;
                f.result([Value::from(store), y])
            },
        )?;

        let make_point = esen.func(
            FuncDef::new()
                .param("x", TypeDef::I32)
                .param("y", TypeDef::I32)
                .result(point()),
            |f| {
                let (x, y) = (f.get("x")?, f.get("y")?);
                let value = f.record([("x", x), ("y", y)])?;
                f.result([value])
            },
        )?;

        let manhattan = esen.func(
            FuncDef::new()
                .param("x", TypeDef::I32)
                .param("y", TypeDef::I32)
                .result(TypeDef::I32),
            |f| {
                let (x, y) = (f.get("x")?, f.get("y")?);
                let p = f.call(make_point, [x, y])?;
                let bind = f.assign([("p", p)])?;
                f.exec([bind])?;
                let p = f.get("p")?;
                let (px, py) = (f.field(&p, "x")?, f.field(&p, "y")?);
                let (ax, ay) = (abs_i32(f, px)?, abs_i32(f, py)?);
                let sum = f.add(ax, ay)?;
                f.result([sum])
            },
        )?;

        Ok(Lib::new()
            .with("pairY", pair_y)
            .with("makePoint", make_point)
            .with("manhattan", manhattan))
    }
}

/// Integer absolute value in terms of the builder's primitives.
fn abs_i32(f: &mut FuncCtx<'_>, value: Value) -> Result<Value> {
    let zero = f.i32(0);
    let negative = f.lt(&value, zero)?;
    let zero = f.i32(0);
    let flipped = f.sub(zero, &value)?;
    f.if_else(negative, [flipped], [value.as_raw_handle()])
}
