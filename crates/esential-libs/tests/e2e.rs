//! End-to-end tests: build each demo library, compile it, load it and call
//! its exports.

use anyhow::{Context, Result};
use esential_runtime::{Instance, Val};
use esential::{CompileOptions, Esential, LibArgs, Number, TableDef};
use esential_libs::{mount, Io, LIBRARIES};

fn start(name: &str, args: &LibArgs, options: &CompileOptions) -> Result<Instance> {
    let mut esen = Esential::new();
    mount(&mut esen, name, args)?.with_context(|| format!("no library named {name}"))?;
    esen.start(options)
}

fn start_default(name: &str) -> Result<Instance> {
    start(name, &LibArgs::new(), &CompileOptions::default())
}

#[test]
fn every_library_compiles_with_and_without_optimization() -> Result<()> {
    for name in LIBRARIES {
        for optimize in [true, false] {
            let options = CompileOptions {
                optimize,
                ..CompileOptions::default()
            };
            start(name, &LibArgs::new(), &options)
                .with_context(|| format!("library {name}, optimize={optimize}"))?;
        }
    }
    Ok(())
}

#[test]
fn add_two() -> Result<()> {
    let mut instance = start_default("add")?;
    assert_eq!(instance.call_typed::<(i32, i32), i32>("addTwo", (40, 2))?, 42);
    assert_eq!(
        instance.call_typed::<(i64, i64), i64>("addI64", (1 << 40, 1))?,
        (1 << 40) + 1
    );
    assert_eq!(
        instance.call_typed::<(f64, f64), f64>("addF64", (1.5, 2.25))?,
        3.75
    );
    assert_eq!(instance.call_typed::<i32, i32>("twice", 21)?, 42);
    Ok(())
}

#[test]
fn tuples_cross_calls() -> Result<()> {
    let mut instance = start_default("tuple")?;
    let swapped = instance.call("swap", &[Val::I32(1), Val::I64(2)])?;
    assert_eq!(swapped.len(), 2);
    assert_eq!(swapped[0].i64(), Some(2));
    assert_eq!(swapped[1].i32(), Some(1));

    assert_eq!(instance.call_typed::<(i32, i64), i64>("first", (1, 9))?, 9);
    assert_eq!(instance.call_typed::<(i32, i64), i64>("mixed", (3, 4))?, 7);
    Ok(())
}

#[test]
fn record_round_trip() -> Result<()> {
    let mut instance = start_default("record")?;
    assert_eq!(instance.call_typed::<(), i32>("pairY", ())?, 4);

    let point = instance.call("makePoint", &[Val::I32(1), Val::I32(2)])?;
    assert_eq!(point.iter().map(|v| v.i32()).collect::<Vec<_>>(), vec![Some(1), Some(2)]);
    assert_eq!(instance.call_typed::<(i32, i32), i32>("manhattan", (-3, 4))?, 7);
    Ok(())
}

#[test]
fn indirect_dispatch() -> Result<()> {
    let options = CompileOptions {
        table: Some(TableDef {
            export: "table".into(),
        }),
        ..CompileOptions::default()
    };
    let mut instance = start("indirect", &LibArgs::new(), &options)?;
    for (op, expected) in [(0, 13), (1, 7), (2, 30)] {
        assert_eq!(
            instance.call_typed::<(i32, i32, i32), i32>("dispatch", (10, 3, op))?,
            expected,
            "slot {op}"
        );
    }
    assert_eq!(instance.call_typed::<(i32, i32), i32>("subViaTable", (10, 3))?, 7);
    assert!(instance.call_typed::<(i32, i32, i32), i32>("dispatch", (1, 1, 3)).is_err());
    assert!(instance.exports().contains(&"table".to_string()));
    Ok(())
}

#[test]
fn memory_loads_and_stores() -> Result<()> {
    let mut args = LibArgs::new();
    args.insert("pages".into(), Number::Int(2));
    let mut instance = start("memory", &args, &CompileOptions::default())?;

    assert_eq!(
        instance.call_typed::<(i32, i64), i64>("storeLoad", (16, -5))?,
        -5
    );
    assert_eq!(instance.call_typed::<(), i32>("pages", ())?, 2);

    let memory = instance
        .memory("namespace", "name")
        .context("memory was not imported")?;
    let words: Vec<u8> = [1i32, 2, 3, 4].iter().flat_map(|w| w.to_le_bytes()).collect();
    instance.write_memory(memory, 64, &words)?;
    assert_eq!(instance.call_typed::<(i32, i32), i32>("sumWords", (64, 4))?, 10);

    assert_eq!(instance.call_typed::<i32, i32>("grow", 1)?, 2);
    assert_eq!(instance.call_typed::<(), i32>("pages", ())?, 3);
    Ok(())
}

#[test]
fn host_function_receives_values() -> Result<()> {
    let io = Io::new();
    let sink = io.sink();
    let mut esen = Esential::new();
    esen.lib(io, &LibArgs::new())?;
    let mut instance = esen.start(&CompileOptions::default())?;

    assert_eq!(instance.call_typed::<(i32, i32), i32>("logSum", (2, 3))?, 5);
    assert_eq!(instance.call_typed::<(i32, i32), i32>("logSum", (-1, 1))?, 0);
    let logged = sink.lock().map_err(|_| anyhow::anyhow!("sink poisoned"))?;
    assert_eq!(*logged, vec![5, 0]);
    Ok(())
}

#[test]
fn loops() -> Result<()> {
    let mut instance = start_default("loop")?;
    assert_eq!(instance.call_typed::<i32, i32>("sumTo", 5)?, 10);
    assert_eq!(instance.call_typed::<i32, i32>("sumTo", 0)?, 0);
    assert_eq!(instance.call_typed::<i64, i64>("factorial", 10)?, 3_628_800);
    Ok(())
}

#[test]
fn globals_start_from_argument() -> Result<()> {
    let mut args = LibArgs::new();
    args.insert("start".into(), Number::Int(10));
    let mut instance = start("counter", &args, &CompileOptions::default())?;

    assert_eq!(instance.call_typed::<(), i32>("next", ())?, 11);
    assert_eq!(instance.call_typed::<(), i32>("next", ())?, 12);
    instance.call_typed::<i32, ()>("reset", 0)?;
    assert_eq!(instance.call_typed::<(), i32>("next", ())?, 1);
    Ok(())
}
