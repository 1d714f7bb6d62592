//! Indirect call table.

use crate::error::{BuildError, Result};
use crate::ir::FuncIdx;
use crate::types::TypeDef;

/// What the builder knows about one table entry.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectInfo {
    pub index: u32,
    pub id: String,
    pub params: Vec<(String, TypeDef)>,
    pub result: TypeDef,
}

/// Functions callable through the module's single function table, in the
/// order they were declared. Slots are never reused or reordered.
#[derive(Debug, Default)]
pub struct IndirectTable {
    entries: Vec<(FuncIdx, IndirectInfo)>,
}

impl IndirectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `func`; its slot is the table length before the append.
    pub fn append(
        &mut self,
        func: FuncIdx,
        id: &str,
        params: Vec<(String, TypeDef)>,
        result: TypeDef,
    ) -> Result<u32> {
        if self.entries.iter().any(|(f, _)| *f == func) {
            return Err(BuildError::DuplicateIndirectEntry { id: id.to_string() });
        }
        let index = self.entries.len() as u32;
        tracing::debug!(id, index, "indirect table slot");
        self.entries.push((
            func,
            IndirectInfo {
                index,
                id: id.to_string(),
                params,
                result,
            },
        ));
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn info(&self, index: u32) -> Option<&IndirectInfo> {
        self.entries.get(index as usize).map(|(_, info)| info)
    }

    /// Table contents, slot order.
    pub fn funcs(&self) -> impl Iterator<Item = FuncIdx> + '_ {
        self.entries.iter().map(|(func, _)| *func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_follow_declaration_order() {
        let mut table = IndirectTable::new();
        for (n, func) in [4, 1, 7].into_iter().enumerate() {
            let slot = table
                .append(FuncIdx(func), &format!("f{func}"), vec![], TypeDef::I32)
                .unwrap();
            assert_eq!(slot, n as u32);
        }
        assert_eq!(table.len(), 3);
        let order: Vec<_> = table.funcs().map(|f| f.0).collect();
        assert_eq!(order, [4, 1, 7]);
        assert_eq!(table.info(2).unwrap().id, "f7");
    }

    #[test]
    fn registering_a_function_twice_is_rejected() {
        let mut table = IndirectTable::new();
        table.append(FuncIdx(0), "f", vec![], TypeDef::None).unwrap();
        assert_eq!(
            table.append(FuncIdx(0), "f", vec![], TypeDef::None),
            Err(BuildError::DuplicateIndirectEntry { id: "f".into() })
        );
        assert_eq!(table.len(), 1);
    }
}
