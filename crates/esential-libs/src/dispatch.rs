//! Functions reached through the function table.

use esential::ir::{ExprKind, Signature};
use esential::{unwrap, Esential, FuncDef, Lib, LibArgs, Library, Primitive, Result, TypeDef};

/// Three binary operators in table slots 0, 1 and 2, a dispatcher picking a
/// slot at runtime, and a fixed call through the table.
pub struct Indirect;

fn binop(name: &str) -> FuncDef {
    FuncDef::new()
        .id(name)
        .param("a", TypeDef::I32)
        .param("b", TypeDef::I32)
        .result(TypeDef::I32)
}

impl Library for Indirect {
    fn build(&self, esen: &mut Esential, _args: &LibArgs) -> Result<Lib> {
        let add = esen.indirect(binop("add"), |f| {
            let (a, b) = (f.get("a")?, f.get("b")?);
            let out = f.add(a, b)?;
            f.result([out])
        })?;
        let sub = esen.indirect(binop("sub"), |f| {
            let (a, b) = (f.get("a")?, f.get("b")?);
            let out = f.sub(a, b)?;
            f.result([out])
        })?;
        let mul = esen.indirect(binop("mul"), |f| {
            let (a, b) = (f.get("a")?, f.get("b")?);
            let out = f.mul(a, b)?;
            f.result([out])
        })?;

        let signature = Signature {
            params: vec![Primitive::I32; 2],
            results: vec![Primitive::I32],
        };
        let dispatch = esen.func(binop("dispatch").param("op", TypeDef::I32), |f| {
            let args = vec![unwrap(f.get("a")?), unwrap(f.get("b")?)];
            let index = unwrap(f.get("op")?);
            let call = f.raw(
                ExprKind::CallIndirect {
                    index,
                    args,
                    signature,
                },
                TypeDef::I32,
            );
            f.result([call])
        })?;

        let sub_via_table = esen.func(binop("subViaTable"), |f| {
            let (a, b) = (f.get("a")?, f.get("b")?);
            let out = f.call(sub, [a, b])?;
            f.result([out])
        })?;

        Ok(Lib::new()
            .with("add", add)
            .with("sub", sub)
            .with("mul", mul)
            .with("dispatch", dispatch)
            .with("subViaTable", sub_via_table))
    }
}
