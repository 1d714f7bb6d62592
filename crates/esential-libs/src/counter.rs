use crate::arg;
use esential::{Esential, FuncDef, Lib, LibArgs, Library, Primitive, Result, TypeDef};

/// Module globals set up by the start function.
///
/// `count` is declared up front and starts at the `start` argument (0 when
/// absent). `stride` is only assigned in the initializer and takes its type
/// from that assignment.
pub struct Counter;

impl Library for Counter {
    fn build(&self, esen: &mut Esential, args: &LibArgs) -> Result<Lib> {
        let start = arg(args, "start", 0);
        esen.globals([("count", TypeDef::I32)], |g| {
            let first = g.literal(start, Primitive::I32);
            let count = g.set("count", first)?;
            let one = g.i32(1);
            let stride = g.set("stride", one)?;
            g.exec([count, stride])
        })?;

        let next = esen.func(FuncDef::new().id("next"), |f| {
            let (count, stride) = (f.get("count")?, f.get("stride")?);
            let bumped = f.add(count, stride)?;
            let store = f.set("count", bumped)?;
            f.exec([store])?;
            let count = f.get("count")?;
            f.result([count])
        })?;

        let reset = esen.func(
            FuncDef::new()
                .id("reset")
                .param("to", TypeDef::I32)
                .result(TypeDef::None),
            |f| {
                let to = f.get("to")?;
                let store = f.set("count", to)?;
                f.exec([store])
            },
        )?;

        Ok(Lib::new().with("next", next).with("reset", reset))
    }
}
