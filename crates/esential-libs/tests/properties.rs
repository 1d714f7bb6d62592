//! Builder guarantees observed through whole builds.

use anyhow::Result;
use esential::{
    unwrap, BuildError, CompileOptions, Esential, FuncDef, TableDef, TypeDef, Value,
};

#[test]
fn shadowing_resolves_to_last_declaration() -> Result<()> {
    let mut esen = Esential::new();
    // The local `x` hides the parameter `x`, so reads see the zeroed local.
    let hidden = esen.func(
        FuncDef::new()
            .param("x", TypeDef::I32)
            .local("x", TypeDef::I32)
            .result(TypeDef::I32),
        |f| {
            let x = f.get("x")?;
            f.result([x])
        },
    )?;
    let written = esen.func(
        FuncDef::new()
            .param("x", TypeDef::I32)
            .local("x", TypeDef::I32)
            .result(TypeDef::I32),
        |f| {
            let five = f.i32(5);
            let store = f.set("x", five)?;
            let x = f.get("x")?;
            f.result([Value::from(store), x])
        },
    )?;
    esen.export("hidden", hidden);
    esen.export("written", written);

    let mut instance = esen.start(&CompileOptions::default())?;
    assert_eq!(instance.call_typed::<i32, i32>("hidden", 7)?, 0);
    assert_eq!(instance.call_typed::<i32, i32>("written", 7)?, 5);
    Ok(())
}

#[test]
fn inferred_variable_type_is_fixed_by_first_assignment() -> Result<()> {
    let mut esen = Esential::new();
    esen.func(FuncDef::new(), |f| {
        let a = f.i32(5);
        let first = f.set("x", a)?;
        let b = f.i32(5);
        let second = f.set("x", b)?;
        f.exec([first, second])
    })?;

    let err = esen
        .func(FuncDef::new(), |f| {
            let a = f.i32(5);
            f.set("x", a)?;
            let b = f.f32(1.0);
            f.set("x", b)?;
            Ok(())
        })
        .unwrap_err();
    assert!(
        matches!(err, BuildError::AssignmentTypeMismatch { ref name, .. } if name == "x"),
        "{err}"
    );
    Ok(())
}

#[test]
fn indirect_slots_follow_declaration_order() -> Result<()> {
    let n = 4;
    let mut esen = Esential::new();
    let mut declared = Vec::new();
    for k in 0..n {
        let callable = esen.indirect(FuncDef::new().result(TypeDef::I32), |f| {
            let value = f.i32(k);
            f.result([value])
        })?;
        declared.push(callable);
    }
    for (slot, callable) in declared.iter().enumerate() {
        let info = esen.indirect_info(*callable).expect("indirect callable");
        assert_eq!(info.index as usize, slot);
    }
    assert_eq!(esen.table_len(), n as usize);

    let options = CompileOptions {
        table: Some(TableDef {
            export: "table".into(),
        }),
        ..CompileOptions::default()
    };
    let binary = esen.compile(&options)?;
    let mut limits = Vec::new();
    for payload in wasmparser::Parser::new(0).parse_all(&binary) {
        if let wasmparser::Payload::TableSection(reader) = payload? {
            for table in reader {
                let table = table?;
                limits.push((table.ty.initial, table.ty.maximum));
            }
        }
    }
    assert_eq!(limits, vec![(n as u64, Some(n as u64))]);
    Ok(())
}

#[test]
fn tuple_index_past_the_end_reports_max() -> Result<()> {
    let mut esen = Esential::new();
    let err = esen
        .func(FuncDef::new(), |f| {
            let (a, b) = (f.i32(1), f.i64(2));
            let pair = f.tuple([a, b])?;
            f.field(&pair, 2usize)?;
            Ok(())
        })
        .unwrap_err();
    assert_eq!(err, BuildError::TupleIndexOutOfRange {
            index: 2,
            max: Some(1)
        });
    Ok(())
}

#[test]
fn unwrap_is_idempotent_for_raw_and_composite() -> Result<()> {
    let mut esen = Esential::new();
    esen.func(FuncDef::new(), |f| {
        let raw = f.i32(3);
        assert_eq!(unwrap(unwrap(raw)), unwrap(raw));
        let b = f.i32(4);
        let pair = f.tuple([raw, b])?;
        assert_eq!(unwrap(unwrap(&pair)), unwrap(&pair));
        Ok(())
    })?;
    Ok(())
}

#[test]
fn failed_declaration_blocks_compile() -> Result<()> {
    let mut esen = Esential::new();
    let err = esen.func(FuncDef::new(), |f| f.get("missing").map(|_| ()));
    assert!(matches!(err, Err(BuildError::UnknownVariable { .. })));
    assert_eq!(
        esen.compile(&CompileOptions::default()),
        Err(BuildError::BuildPoisoned)
    );
    Ok(())
}

#[test]
fn invalid_module_fails_validation_only_when_asked() -> Result<()> {
    let mut esen = Esential::new();
    // Declares an i32 result but leaves nothing on the stack.
    esen.func(FuncDef::new().result(TypeDef::I32), |f| {
        let value = f.i32(1);
        f.exec([value])
    })?;

    let unchecked = CompileOptions {
        validate: false,
        ..CompileOptions::default()
    };
    assert!(esen.compile(&unchecked).is_ok());
    let err = esen.compile(&CompileOptions::default()).unwrap_err();
    assert!(matches!(err, BuildError::ValidationError { .. }), "{err}");
    Ok(())
}

#[test]
fn literal_rejects_composite_types() {
    let mut esen = Esential::new();
    let err = esen
        .literal(1, TypeDef::tuple([TypeDef::I32]))
        .unwrap_err();
    assert!(matches!(err, BuildError::UnsupportedLiteralType { .. }));
}
