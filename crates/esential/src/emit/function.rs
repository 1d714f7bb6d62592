//! Function body encoding.
//!
//! Every symbolic slot expands to `width` consecutive wasm locals (or
//! globals), so a composite value is a run of primitives on the stack.
//! Field extraction from anything other than a plain variable read spills
//! the whole run into scratch locals and reloads the selected range.
//! Statement values are dropped.

use super::instruction;
use super::TypeInterner;
use crate::error::{BuildError, Result};
use crate::ir::{ExprArena, ExprId, ExprKind, FuncIdx};
use crate::types::Primitive;
use crate::vars::{Slot, VarScope};
use wasm_encoder::{BlockType, Function, Instruction};

/// Module-level facts a body needs while encoding.
pub struct ModuleLayout<'a> {
    /// Declaration index to wasm function index.
    pub func_index: &'a [u32],
    /// First wasm global of each symbolic global.
    pub global_base: &'a [u32],
}

/// First wasm index of each slot, given the slots' widths.
pub fn slot_bases(slots: &[Slot]) -> Vec<u32> {
    let mut next = 0u32;
    slots
        .iter()
        .map(|slot| {
            let base = next;
            next += slot.ty.width() as u32;
            base
        })
        .collect()
}

/// Scratch locals, reused once released.
struct Scratch {
    first: u32,
    types: Vec<Primitive>,
    busy: Vec<bool>,
}

impl Scratch {
    fn acquire(&mut self, ty: Primitive) -> u32 {
        let free = self
            .types
            .iter()
            .zip(&self.busy)
            .position(|(t, busy)| *t == ty && !busy);
        let index = match free {
            Some(index) => index,
            None => {
                self.types.push(ty);
                self.busy.push(false);
                self.types.len() - 1
            }
        };
        self.busy[index] = true;
        self.first + index as u32
    }

    fn release(&mut self, local: u32) {
        if let Some(busy) = self.busy.get_mut((local - self.first) as usize) {
            *busy = false;
        }
    }
}

pub struct FunctionEncoder<'a> {
    exprs: &'a ExprArena,
    layout: &'a ModuleLayout<'a>,
    types: &'a mut TypeInterner,
    local_base: Vec<u32>,
    scratch: Scratch,
    instrs: Vec<Instruction<'static>>,
}

impl<'a> FunctionEncoder<'a> {
    /// `vars` lists params first.
    pub fn new(
        exprs: &'a ExprArena,
        layout: &'a ModuleLayout<'a>,
        types: &'a mut TypeInterner,
        vars: &VarScope,
    ) -> Self {
        let local_base = slot_bases(vars.slots());
        let total: usize = vars.slots().iter().map(|s| s.ty.width()).sum();
        Self {
            exprs,
            layout,
            types,
            local_base,
            scratch: Scratch {
                first: total as u32,
                types: Vec::new(),
                busy: Vec::new(),
            },
            instrs: Vec::new(),
        }
    }

    /// Encode `body` as statements and assemble the function, declaring
    /// every var past the first `param_width` wasm locals plus the scratch
    /// locals.
    pub fn finish(mut self, vars: &VarScope, param_width: usize, body: &[ExprId]) -> Result<Function> {
        for stmt in body {
            self.statement(*stmt)?;
        }
        self.instrs.push(Instruction::End);

        let mut locals: Vec<wasm_encoder::ValType> = vars
            .slots()
            .iter()
            .flat_map(|slot| slot.ty.flatten())
            .skip(param_width)
            .map(Primitive::to_val_type)
            .collect();
        locals.extend(self.scratch.types.iter().map(|p| p.to_val_type()));

        let mut func = Function::new_with_locals_types(locals);
        for instr in &self.instrs {
            func.instruction(instr);
        }
        Ok(func)
    }

    fn push(&mut self, instr: Instruction<'static>) {
        self.instrs.push(instr);
    }

    fn local(&self, slot: u32) -> Result<u32> {
        self.local_base
            .get(slot as usize)
            .copied()
            .ok_or(BuildError::UnknownVariable {
                name: format!("local slot {slot}"),
            })
    }

    fn global(&self, global: u32) -> Result<u32> {
        self.layout
            .global_base
            .get(global as usize)
            .copied()
            .ok_or(BuildError::UnknownVariable {
                name: format!("global slot {global}"),
            })
    }

    fn func(&self, func: FuncIdx) -> Result<u32> {
        self.layout
            .func_index
            .get(func.0 as usize)
            .copied()
            .ok_or(BuildError::UnknownCallable { index: func.0 })
    }

    fn block_type(&mut self, results: &[Primitive]) -> BlockType {
        match results {
            [] => BlockType::Empty,
            [single] => BlockType::Result(single.to_val_type()),
            many => BlockType::FunctionType(self.types.intern(&[], many)),
        }
    }

    /// Emit `id` and drop whatever it leaves on the stack.
    fn statement(&mut self, id: ExprId) -> Result<()> {
        self.expr(id)?;
        for _ in self.exprs.result_types(id)? {
            self.push(Instruction::Drop);
        }
        Ok(())
    }

    /// Emit a statement list whose last item, when `value` is set, stays on
    /// the stack.
    fn sequence(&mut self, items: &[ExprId], value: bool) -> Result<()> {
        match items.split_last() {
            Some((last, init)) if value => {
                for item in init {
                    self.statement(*item)?;
                }
                self.expr(*last)
            }
            _ => items.iter().try_for_each(|item| self.statement(*item)),
        }
    }

    fn expr(&mut self, id: ExprId) -> Result<()> {
        let exprs = self.exprs;
        let kind = exprs.kind(id)?;
        match kind {
            ExprKind::Const(lit) => self.push(instruction::constant(*lit)),
            ExprKind::LocalGet { slot, ty } => {
                let base = self.local(*slot)?;
                for i in 0..ty.width() as u32 {
                    self.push(Instruction::LocalGet(base + i));
                }
            }
            ExprKind::LocalSet { slot, ty, value } => {
                let base = self.local(*slot)?;
                self.expr(*value)?;
                for i in (0..ty.width() as u32).rev() {
                    self.push(Instruction::LocalSet(base + i));
                }
            }
            ExprKind::GlobalGet { global, ty } => {
                let base = self.global(*global)?;
                for i in 0..ty.width() as u32 {
                    self.push(Instruction::GlobalGet(base + i));
                }
            }
            ExprKind::GlobalSet { global, ty, value } => {
                let base = self.global(*global)?;
                self.expr(*value)?;
                for i in (0..ty.width() as u32).rev() {
                    self.push(Instruction::GlobalSet(base + i));
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.expr(*lhs)?;
                self.expr(*rhs)?;
                self.push(instruction::binary(*op));
            }
            ExprKind::Unary { op, operand } => {
                self.expr(*operand)?;
                self.push(instruction::unary(*op));
            }
            ExprKind::Call { func, args, .. } => {
                for arg in args {
                    self.expr(*arg)?;
                }
                let index = self.func(*func)?;
                self.push(Instruction::Call(index));
            }
            ExprKind::CallIndirect {
                index,
                args,
                signature,
            } => {
                for arg in args {
                    self.expr(*arg)?;
                }
                self.expr(*index)?;
                let type_index = self.types.intern(&signature.params, &signature.results);
                self.push(Instruction::CallIndirect {
                    type_index,
                    table_index: 0,
                });
            }
            ExprKind::Block { items, .. } => {
                let value = !self.exprs.result_types(id)?.is_empty();
                self.sequence(items, value)?;
            }
            ExprKind::TupleMake(items) => {
                for item in items {
                    self.expr(*item)?;
                }
            }
            ExprKind::TupleExtract {
                tuple,
                offset,
                width,
                ..
            } => self.extract(*tuple, *offset, *width)?,
            ExprKind::If {
                cond,
                then,
                otherwise,
                ..
            } => {
                let results = self.exprs.result_types(id)?;
                let value = !results.is_empty();
                self.expr(*cond)?;
                let bt = self.block_type(&results);
                self.push(Instruction::If(bt));
                self.sequence(then, value)?;
                if value || !otherwise.is_empty() {
                    self.push(Instruction::Else);
                    self.sequence(otherwise, value)?;
                }
                self.push(Instruction::End);
            }
            ExprKind::For {
                init,
                cond,
                step,
                body,
            } => {
                self.sequence(init, false)?;
                self.push(Instruction::Block(BlockType::Empty));
                self.push(Instruction::Loop(BlockType::Empty));
                self.expr(*cond)?;
                self.push(Instruction::I32Eqz);
                self.push(Instruction::BrIf(1));
                self.sequence(body, false)?;
                self.sequence(step, false)?;
                self.push(Instruction::Br(0));
                self.push(Instruction::End);
                self.push(Instruction::End);
            }
            ExprKind::Return(value) => {
                if let Some(value) = value {
                    self.expr(*value)?;
                }
                self.push(Instruction::Return);
            }
            ExprKind::Load { ty, addr, offset } => {
                self.expr(*addr)?;
                self.push(instruction::load(*ty, *offset));
            }
            ExprKind::Store {
                ty,
                addr,
                value,
                offset,
            } => {
                self.expr(*addr)?;
                self.expr(*value)?;
                self.push(instruction::store(*ty, *offset));
            }
            ExprKind::MemorySize => self.push(Instruction::MemorySize(0)),
            ExprKind::MemoryGrow { delta } => {
                self.expr(*delta)?;
                self.push(Instruction::MemoryGrow(0));
            }
            ExprKind::Nop => {}
        }
        Ok(())
    }

    /// Leave slots `offset..offset + width` of `tuple` on the stack.
    fn extract(&mut self, tuple: ExprId, offset: usize, width: usize) -> Result<()> {
        let range = offset as u32..(offset + width) as u32;
        let exprs = self.exprs;
        match exprs.kind(tuple)? {
            ExprKind::LocalGet { slot, .. } => {
                let base = self.local(*slot)?;
                for i in range {
                    self.push(Instruction::LocalGet(base + i));
                }
                return Ok(());
            }
            ExprKind::GlobalGet { global, .. } => {
                let base = self.global(*global)?;
                for i in range {
                    self.push(Instruction::GlobalGet(base + i));
                }
                return Ok(());
            }
            _ => {}
        }

        let all = self.exprs.result_types(tuple)?;
        if all.get(offset..offset + width).is_none() {
            return Err(BuildError::UnknownExpression { id: tuple.0 });
        }
        self.expr(tuple)?;
        let spilled: Vec<u32> = all.iter().map(|ty| self.scratch.acquire(*ty)).collect();
        for local in spilled.iter().rev() {
            self.push(Instruction::LocalSet(*local));
        }
        for local in spilled.iter().skip(offset).take(width) {
            self.push(Instruction::LocalGet(*local));
        }
        for local in spilled {
            self.scratch.release(local);
        }
        Ok(())
    }
}
