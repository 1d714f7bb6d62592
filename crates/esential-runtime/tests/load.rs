//! Instantiation tests against hand-written reference modules.

use anyhow::{Context, Result};
use esential_runtime::{load, HostFunc, Imports, MemoryDef, Val, ValType, PAGE_SIZE};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

fn wasm(source: &str) -> Result<Vec<u8>> {
    wat::parse_str(source).context("failed to parse WAT")
}

#[test]
fn calls_export_dynamically_and_typed() -> Result<()> {
    let binary = wasm(
        r#"
        (module
            (func (export "addTwo") (param i32 i32) (result i32)
                local.get 0
                local.get 1
                i32.add))
        "#,
    )?;
    let mut instance = load(&binary, &Imports::new())?;

    let results = instance.call("addTwo", &[Val::I32(40), Val::I32(2)])?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].i32(), Some(42));

    let sum: i32 = instance.call_typed("addTwo", (1, 2))?;
    assert_eq!(sum, 3);
    assert_eq!(instance.exports(), vec!["addTwo".to_string()]);
    Ok(())
}

#[test]
fn multi_value_results_are_returned_in_order() -> Result<()> {
    let binary = wasm(
        r#"
        (module
            (func (export "pair") (result i32 i64)
                i32.const 3
                i64.const 4))
        "#,
    )?;
    let mut instance = load(&binary, &Imports::new())?;
    let results = instance.call("pair", &[])?;
    assert_eq!(results[0].i32(), Some(3));
    assert_eq!(results[1].i64(), Some(4));
    Ok(())
}

#[test]
fn host_function_is_wired_by_namespace_and_name() -> Result<()> {
    let binary = wasm(
        r#"
        (module
            (import "io" "log" (func $log (param i32)))
            (func (export "run")
                i32.const 7
                call $log))
        "#,
    )?;
    let seen = Arc::new(AtomicI32::new(0));
    let sink = seen.clone();
    let mut imports = Imports::new();
    imports.func(
        "io",
        "log",
        HostFunc::new(vec![ValType::I32], vec![], move |params, _| {
            if let Some(v) = params[0].i32() {
                sink.store(v, Ordering::SeqCst);
            }
            Ok(())
        }),
    );

    let mut instance = load(&binary, &imports)?;
    instance.call("run", &[])?;
    assert_eq!(seen.load(Ordering::SeqCst), 7);
    Ok(())
}

#[test]
fn imported_memory_is_shared_with_host() -> Result<()> {
    let binary = wasm(
        r#"
        (module
            (import "env" "mem" (memory 1 2))
            (func (export "poke") (param i32 i32)
                local.get 0
                local.get 1
                i32.store))
        "#,
    )?;
    let mut imports = Imports::new();
    imports.memory(
        "env",
        "mem",
        MemoryDef {
            initial: 1,
            maximum: Some(2),
        },
    );
    let mut instance = load(&binary, &imports)?;
    instance.call("poke", &[Val::I32(8), Val::I32(0x0102_0304)])?;

    let memory = instance.memory("env", "mem").context("memory missing")?;
    assert_eq!(instance.memory_size(memory), PAGE_SIZE);
    let mut buf = [0u8; 4];
    instance.read_memory(memory, 8, &mut buf)?;
    assert_eq!(i32::from_le_bytes(buf), 0x0102_0304);
    Ok(())
}

#[test]
fn missing_import_fails_to_instantiate() -> Result<()> {
    let binary = wasm(
        r#"
        (module
            (import "io" "log" (func (param i32))))
        "#,
    )?;
    assert!(load(&binary, &Imports::new()).is_err());
    Ok(())
}

#[test]
fn unknown_export_is_an_error() -> Result<()> {
    let binary = wasm("(module)")?;
    let mut instance = load(&binary, &Imports::new())?;
    assert!(instance.call("nothing", &[]).is_err());
    Ok(())
}
