//! Demo libraries built with esential.
//!
//! Each library is a [`Library`] that declares a handful of functions and
//! names the ones it exports. [`mount`] selects one by its display name, which
//! is how the CLI and the benchmarks reach them.

mod add;
mod composite;
mod counter;
mod dispatch;
mod io;
mod looping;
mod memory;

pub use add::Add;
pub use composite::{Record, Tuple};
pub use counter::Counter;
pub use dispatch::Indirect;
pub use io::Io;
pub use looping::Loop;
pub use memory::Memory;

use esential::{Esential, Lib, LibArgs, Library, Number, Result};

/// Display names of every demo library, in the order `mount` knows them.
pub const LIBRARIES: &[&str] = &[
    "add", "tuple", "record", "indirect", "memory", "io", "loop", "counter",
];

/// Mount the library called `name`, or return `None` when no demo has that
/// name.
pub fn mount(esen: &mut Esential, name: &str, args: &LibArgs) -> Result<Option<Lib>> {
    let lib = match name {
        "add" => esen.lib(Add, args)?,
        "tuple" => esen.lib(Tuple, args)?,
        "record" => esen.lib(Record, args)?,
        "indirect" => esen.lib(Indirect, args)?,
        "memory" => esen.lib(Memory, args)?,
        "io" => esen.lib(Io::new(), args)?,
        "loop" => esen.lib(Loop, args)?,
        "counter" => esen.lib(Counter, args)?,
        _ => return Ok(None),
    };
    Ok(Some(lib))
}

/// Integer argument `name`, truncating floats.
pub(crate) fn arg(args: &LibArgs, name: &str, default: i64) -> i64 {
    match args.get(name) {
        Some(Number::Int(v)) => *v,
        Some(Number::Float(v)) => *v as i64,
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_match_registry() {
        let names = [
            Add.name(),
            Tuple.name(),
            Record.name(),
            Indirect.name(),
            Memory.name(),
            Io::new().name(),
            Loop.name(),
            Counter.name(),
        ];
        assert_eq!(names.as_slice(), LIBRARIES);
    }

    #[test]
    fn unknown_name_mounts_nothing() {
        let mut esen = Esential::new();
        assert_eq!(mount(&mut esen, "nope", &LibArgs::new()).unwrap(), None);
        assert!(!esen.is_poisoned());
    }
}
