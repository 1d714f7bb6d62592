use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use esential_runtime::Val;
use esential::{CompileOptions, Esential, Lib, LibArgs, Number, Primitive};
use esential_libs::{mount, LIBRARIES};
use heck::ToSnakeCase;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// esential: build and run WebAssembly modules from the demo libraries.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a library to a .wasm file
    Build {
        /// Library name
        lib: String,

        /// Output file (defaults to <lib>.wasm)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Skip the IR passes
        #[arg(long)]
        no_optimize: bool,

        /// Skip binary validation
        #[arg(long)]
        no_validate: bool,

        /// Library argument, `name=number`
        #[arg(long = "arg", value_parser = parse_lib_arg)]
        args: Vec<(String, Number)>,
    },
    /// Compile a library, load it and call one export
    Run {
        /// Library name
        lib: String,

        /// Export to call
        export: String,

        /// Arguments, parsed by the export's parameter types
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,

        /// Library argument, `name=number`
        #[arg(long = "arg", value_parser = parse_lib_arg)]
        lib_args: Vec<(String, Number)>,
    },
}

fn parse_lib_arg(raw: &str) -> Result<(String, Number)> {
    let (name, value) = raw
        .split_once('=')
        .with_context(|| format!("expected name=number, got `{raw}`"))?;
    let number = match value.parse::<i64>() {
        Ok(v) => Number::Int(v),
        Err(_) => Number::Float(
            value
                .parse::<f64>()
                .with_context(|| format!("`{value}` is not a number"))?,
        ),
    };
    Ok((name.to_string(), number))
}

fn parse_value(raw: &str, ty: Primitive) -> Result<Val> {
    let value = match ty {
        Primitive::I32 => Val::I32(raw.parse()?),
        Primitive::I64 => Val::I64(raw.parse()?),
        Primitive::F32 => Val::F32(raw.parse::<f32>()?.to_bits()),
        Primitive::F64 => Val::F64(raw.parse::<f64>()?.to_bits()),
    };
    Ok(value)
}

fn format_value(value: &Val) -> String {
    match value {
        Val::I32(v) => v.to_string(),
        Val::I64(v) => v.to_string(),
        Val::F32(bits) => f32::from_bits(*bits).to_string(),
        Val::F64(bits) => f64::from_bits(*bits).to_string(),
        other => format!("{other:?}"),
    }
}

fn mount_named(esen: &mut Esential, name: &str, args: Vec<(String, Number)>) -> Result<Lib> {
    let name = name.to_snake_case();
    let args: LibArgs = args.into_iter().collect();
    match mount(esen, &name, &args)? {
        Some(lib) => Ok(lib),
        None => bail!(
            "unknown library `{name}`, expected one of: {}",
            LIBRARIES.join(", ")
        ),
    }
}

fn build(
    lib: &str,
    output: Option<PathBuf>,
    options: &CompileOptions,
    args: Vec<(String, Number)>,
) -> Result<()> {
    let mut esen = Esential::new();
    mount_named(&mut esen, lib, args)?;
    let binary = esen
        .compile(options)
        .with_context(|| format!("failed to compile `{lib}`"))?;
    let output = output.unwrap_or_else(|| PathBuf::from(format!("{}.wasm", lib.to_snake_case())));
    fs::write(&output, &binary)
        .with_context(|| format!("failed to write {}", output.display()))?;
    tracing::info!(path = %output.display(), bytes = binary.len(), "wrote module");
    Ok(())
}

fn run(lib: &str, export: &str, raw: &[String], args: Vec<(String, Number)>) -> Result<()> {
    let mut esen = Esential::new();
    let mounted = mount_named(&mut esen, lib, args)?;
    let callable = mounted
        .get(export)
        .with_context(|| format!("`{lib}` has no export `{export}`"))?;
    let params = esen
        .callable_info(callable)
        .map(|info| info.signature().params)
        .with_context(|| format!("`{export}` is not declared"))?;
    if params.len() != raw.len() {
        bail!(
            "`{export}` takes {} argument(s), got {}",
            params.len(),
            raw.len()
        );
    }
    let values = raw
        .iter()
        .zip(&params)
        .map(|(arg, ty)| parse_value(arg, *ty).with_context(|| format!("`{arg}` is not a valid {ty}")))
        .collect::<Result<Vec<_>>>()?;

    let mut instance = esen.start(&CompileOptions::default())?;
    let results = instance.call(export, &values)?;
    let printed: Vec<String> = results.iter().map(format_value).collect();
    println!("{}", printed.join(" "));
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("ESENTIAL_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Build {
            lib,
            output,
            no_optimize,
            no_validate,
            args,
        } => {
            let options = CompileOptions {
                optimize: !no_optimize,
                validate: !no_validate,
                ..CompileOptions::default()
            };
            build(&lib, output, &options, args)
        }
        Command::Run {
            lib,
            export,
            args,
            lib_args,
        } => run(&lib, &export, &args, lib_args),
    }
}
