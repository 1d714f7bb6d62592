use esential::{Esential, FuncDef, Lib, LibArgs, Library, Result, TypeDef, Value};

/// Counting loops.
pub struct Loop;

impl Library for Loop {
    fn build(&self, esen: &mut Esential, _args: &LibArgs) -> Result<Lib> {
        // 0 + 1 + ... + (n - 1)
        let sum_to = esen.func(
            FuncDef::new()
                .id("sumTo")
                .param("n", TypeDef::I32)
                .result(TypeDef::I32),
            |f| {
                let (zero_i, zero_acc) = (f.i32(0), f.i32(0));
                let init = f.assign([("i", zero_i), ("acc", zero_acc)])?;

                let (i, n) = (f.get("i")?, f.get("n")?);
                let cond = f.lt(i, n)?;

                let (acc, i) = (f.get("acc")?, f.get("i")?);
                let total = f.add(acc, i)?;
                let body = f.set("acc", total)?;

                let (i, one) = (f.get("i")?, f.i32(1));
                let next = f.add(i, one)?;
                let step = f.set("i", next)?;

                let looped = f.for_loop([init], cond, [step], [body]);
                let acc = f.get("acc")?;
                f.result([Value::from(looped), acc])
            },
        )?;

        let factorial = esen.func(
            FuncDef::new()
                .id("factorial")
                .param("n", TypeDef::I64)
                .result(TypeDef::I64),
            |f| {
                let one = f.i64(1);
                let init = f.set("acc", one)?;

                let (n, one) = (f.get("n")?, f.i64(1));
                let cond = f.gt(n, one)?;

                let (acc, n) = (f.get("acc")?, f.get("n")?);
                let product = f.mul(acc, n)?;
                let body = f.set("acc", product)?;

                let (n, one) = (f.get("n")?, f.i64(1));
                let next = f.sub(n, one)?;
                let step = f.set("n", next)?;

                let looped = f.for_loop([init], cond, [step], [body]);
                f.exec([looped])?;
                let acc = f.get("acc")?;
                f.result([acc])
            },
        )?;

        Ok(Lib::new()
            .with("sumTo", sum_to)
            .with("factorial", factorial))
    }
}
