use esential::{Esential, FuncDef, Lib, LibArgs, Library, Result, TypeDef};

/// Integer and float addition, plus a direct call between two of them.
///
/// `addTwo` leaves its result type open; it is fixed by the body.
pub struct Add;

impl Library for Add {
    fn build(&self, esen: &mut Esential, _args: &LibArgs) -> Result<Lib> {
        let add_two = esen.func(
            FuncDef::new()
                .id("addTwo")
                .param("a", TypeDef::I32)
                .param("b", TypeDef::I32),
            |f| {
                let (a, b) = (f.get("a")?, f.get("b")?);
                let sum = f.add(a, b)?;
                f.result([sum])
            },
        )?;

        let add_i64 = esen.func(
            FuncDef::new()
                .param("a", TypeDef::I64)
                .param("b", TypeDef::I64)
                .result(TypeDef::I64),
            |f| {
                let (a, b) = (f.get("a")?, f.get("b")?);
                let sum = f.add(a, b)?;
                f.result([sum])
            },
        )?;

        let add_f64 = esen.func(
            FuncDef::new()
                .param("a", TypeDef::F64)
                .param("b", TypeDef::F64)
                .result(TypeDef::F64),
            |f| {
                let (a, b) = (f.get("a")?, f.get("b")?);
                let sum = f.add(a, b)?;
                f.result([sum])
            },
        )?;

        let twice = esen.func(FuncDef::new().param("x", TypeDef::I32), |f| {
            let (x, y) = (f.get("x")?, f.get("x")?);
            let doubled = f.call(add_two, [x, y])?;
            f.result([doubled])
        })?;

        Ok(Lib::new()
            .with("addTwo", add_two)
            .with("addI64", add_i64)
            .with("addF64", add_f64)
            .with("twice", twice))
    }
}
