//! Binary encoding.
//!
//! Function index space: imports first, in declaration order, then defined
//! functions, then the synthesized start function when globals have
//! initializer statements. Each composite global expands to one mutable wasm
//! global per flattened primitive.

mod function;
mod instruction;

use crate::error::{BuildError, Result};
use crate::ir::Signature;
use crate::module::{CompileOptions, Esential, FuncKind};
use crate::types::{Primitive, TypeDef};
use crate::vars::VarScope;
use function::{slot_bases, FunctionEncoder, ModuleLayout};
use std::borrow::Cow;
use std::collections::HashMap;
use wasm_encoder::{
    CodeSection, ConstExpr, ElementSection, Elements, EntityType, ExportKind, ExportSection,
    FunctionSection, GlobalSection, GlobalType, ImportSection, MemoryType, Module,
    RefType, StartSection, TableSection, TableType, TypeSection,
};

/// Deduplicated function types, in first-use order.
#[derive(Debug, Default)]
pub struct TypeInterner {
    types: Vec<Signature>,
    index: HashMap<Signature, u32>,
}

impl TypeInterner {
    pub fn intern(&mut self, params: &[Primitive], results: &[Primitive]) -> u32 {
        let sig = Signature {
            params: params.to_vec(),
            results: results.to_vec(),
        };
        if let Some(index) = self.index.get(&sig) {
            return *index;
        }
        let index = self.types.len() as u32;
        self.types.push(sig.clone());
        self.index.insert(sig, index);
        index
    }

    fn section(&self) -> TypeSection {
        let mut section = TypeSection::new();
        for sig in &self.types {
            section.ty().function(
                sig.params.iter().map(|p| p.to_val_type()),
                sig.results.iter().map(|p| p.to_val_type()),
            );
        }
        section
    }
}

fn flatten_all(types: &[TypeDef]) -> Vec<Primitive> {
    types.iter().flat_map(TypeDef::flatten).collect()
}

/// Encode the build into a wasm binary.
pub fn encode(esen: &Esential, options: &CompileOptions) -> Result<Vec<u8>> {
    let mut types = TypeInterner::default();

    // Index space.
    let imported = esen
        .funcs
        .iter()
        .filter(|f| matches!(f.kind, FuncKind::Imported { .. }))
        .count() as u32;
    let mut func_index = Vec::with_capacity(esen.funcs.len());
    let (mut next_import, mut next_defined) = (0u32, imported);
    for entry in &esen.funcs {
        match entry.kind {
            FuncKind::Imported { .. } => {
                func_index.push(next_import);
                next_import += 1;
            }
            FuncKind::Defined { .. } => {
                func_index.push(next_defined);
                next_defined += 1;
            }
        }
    }
    let start_index = (!esen.start_body.is_empty()).then_some(next_defined);

    let global_base = slot_bases(esen.globals.slots());
    let layout = ModuleLayout {
        func_index: &func_index,
        global_base: &global_base,
    };

    // Signatures and bodies first, so every block and indirect call type is
    // interned before the type section is written.
    let mut imports = ImportSection::new();
    let mut functions = FunctionSection::new();
    let mut code = CodeSection::new();
    for entry in &esen.funcs {
        let params = flatten_all(&entry.params);
        let type_index = types.intern(&params, &entry.result.flatten());
        match &entry.kind {
            FuncKind::Imported { namespace, name } => {
                imports.import(namespace, name, EntityType::Function(type_index));
            }
            FuncKind::Defined { vars, body } => {
                functions.function(type_index);
                let encoder = FunctionEncoder::new(&esen.exprs, &layout, &mut types, vars);
                code.function(&encoder.finish(vars, params.len(), body)?);
                tracing::trace!(id = %entry.id, type_index, "function encoded");
            }
        }
    }
    if start_index.is_some() {
        let type_index = types.intern(&[], &[]);
        functions.function(type_index);
        let vars = VarScope::new();
        let encoder = FunctionEncoder::new(&esen.exprs, &layout, &mut types, &vars);
        code.function(&encoder.finish(&vars, 0, &esen.start_body)?);
    }

    if let Some(memory) = &esen.memory {
        if memory.maximum < memory.initial {
            return Err(BuildError::ValidationError {
                message: format!(
                    "memory maximum {} is below its initial size {}",
                    memory.maximum, memory.initial
                ),
            });
        }
        imports.import(
            &memory.namespace,
            &memory.name,
            EntityType::Memory(MemoryType {
                minimum: memory.initial as u64,
                maximum: Some(memory.maximum as u64),
                memory64: false,
                shared: false,
                page_size_log2: None,
            }),
        );
    }

    let table_len = esen.table.len() as u64;
    let has_table = table_len > 0 || options.table.is_some();
    let mut tables = TableSection::new();
    let mut elements = ElementSection::new();
    if has_table {
        tables.table(TableType {
            element_type: RefType::FUNCREF,
            table64: false,
            minimum: table_len,
            maximum: Some(table_len),
            shared: false,
        });
        let ids = esen
            .table
            .funcs()
            .map(|func| {
                func_index
                    .get(func.0 as usize)
                    .copied()
                    .ok_or(BuildError::UnknownCallable { index: func.0 })
            })
            .collect::<Result<Vec<u32>>>()?;
        if !ids.is_empty() {
            elements.active(
                Some(0),
                &ConstExpr::i32_const(0),
                Elements::Functions(Cow::Borrowed(&ids)),
            );
        }
    }

    let mut globals = GlobalSection::new();
    for slot in esen.globals.slots() {
        for prim in slot.ty.flatten() {
            globals.global(
                GlobalType {
                    val_type: prim.to_val_type(),
                    mutable: true,
                    shared: false,
                },
                &instruction::zero(prim),
            );
        }
    }

    let mut exports = ExportSection::new();
    for (name, func) in &esen.exports {
        let index = func_index
            .get(func.0 as usize)
            .copied()
            .ok_or(BuildError::UnknownCallable { index: func.0 })?;
        exports.export(name, ExportKind::Func, index);
    }
    if let Some(table) = &options.table {
        exports.export(&table.export, ExportKind::Table, 0);
    }

    let mut module = Module::new();
    module.section(&types.section());
    if !imports.is_empty() {
        module.section(&imports);
    }
    module.section(&functions);
    if has_table {
        module.section(&tables);
    }
    if !globals.is_empty() {
        module.section(&globals);
    }
    module.section(&exports);
    if let Some(function_index) = start_index {
        module.section(&StartSection { function_index });
    }
    if !elements.is_empty() {
        module.section(&elements);
    }
    module.section(&code);

    Ok(module.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::func::{ExternalDef, FuncDef};
    use crate::module::TableDef;

    fn parse_exports(binary: &[u8]) -> Vec<(String, u32)> {
        let mut out = Vec::new();
        for payload in wasmparser::Parser::new(0).parse_all(binary) {
            if let Ok(wasmparser::Payload::ExportSection(reader)) = payload {
                for export in reader {
                    let export = export.unwrap();
                    out.push((export.name.to_string(), export.index));
                }
            }
        }
        out
    }

    #[test]
    fn interner_deduplicates() {
        let mut types = TypeInterner::default();
        let a = types.intern(&[Primitive::I32], &[]);
        let b = types.intern(&[Primitive::I64], &[Primitive::I64]);
        let c = types.intern(&[Primitive::I32], &[]);
        assert_eq!((a, b, c), (0, 1, 0));
    }

    #[test]
    fn imports_come_before_defined_functions() {
        let mut esen = Esential::new();
        let local = esen
            .func(FuncDef::new().id("local").result(TypeDef::I32), |f| {
                let one = f.i32(1);
                f.result([one])
            })
            .unwrap();
        esen.external(ExternalDef::new("env", "log").param("x", TypeDef::I32), |_, _| Ok(()))
            .unwrap();
        esen.export("local", local);

        let binary = encode(&esen, &CompileOptions::default()).unwrap();
        assert_eq!(parse_exports(&binary), vec![("local".to_string(), 1)]);
    }

    #[test]
    fn table_export_without_entries_is_empty_table() {
        let esen = Esential::new();
        let options = CompileOptions {
            table: Some(TableDef {
                export: "table".into(),
            }),
            ..CompileOptions::default()
        };
        let binary = encode(&esen, &options).unwrap();
        assert_eq!(parse_exports(&binary), vec![("table".to_string(), 0)]);
        assert!(wasmparser::Validator::new().validate_all(&binary).is_ok());
    }
}
