//! Mapping from IR operations to wasm instructions.

use crate::ir::{BinOp, UnOp};
use crate::types::{Literal, Primitive};
use wasm_encoder::{Instruction, MemArg};

pub fn constant(lit: Literal) -> Instruction<'static> {
    match lit {
        Literal::I32(v) => Instruction::I32Const(v),
        Literal::I64(v) => Instruction::I64Const(v),
        Literal::F32(v) => Instruction::F32Const(v.into()),
        Literal::F64(v) => Instruction::F64Const(v.into()),
    }
}

pub fn binary(op: BinOp) -> Instruction<'static> {
    use BinOp as B;
    use Instruction as I;
    match op {
        B::I32Add => I::I32Add,
        B::I32Sub => I::I32Sub,
        B::I32Mul => I::I32Mul,
        B::I32DivS => I::I32DivS,
        B::I32DivU => I::I32DivU,
        B::I32RemS => I::I32RemS,
        B::I32RemU => I::I32RemU,
        B::I32And => I::I32And,
        B::I32Or => I::I32Or,
        B::I32Xor => I::I32Xor,
        B::I32Shl => I::I32Shl,
        B::I32ShrS => I::I32ShrS,
        B::I32ShrU => I::I32ShrU,
        B::I32Eq => I::I32Eq,
        B::I32Ne => I::I32Ne,
        B::I32LtS => I::I32LtS,
        B::I32LtU => I::I32LtU,
        B::I32GtS => I::I32GtS,
        B::I32GtU => I::I32GtU,
        B::I32LeS => I::I32LeS,
        B::I32LeU => I::I32LeU,
        B::I32GeS => I::I32GeS,
        B::I32GeU => I::I32GeU,

        B::I64Add => I::I64Add,
        B::I64Sub => I::I64Sub,
        B::I64Mul => I::I64Mul,
        B::I64DivS => I::I64DivS,
        B::I64DivU => I::I64DivU,
        B::I64RemS => I::I64RemS,
        B::I64RemU => I::I64RemU,
        B::I64And => I::I64And,
        B::I64Or => I::I64Or,
        B::I64Xor => I::I64Xor,
        B::I64Shl => I::I64Shl,
        B::I64ShrS => I::I64ShrS,
        B::I64ShrU => I::I64ShrU,
        B::I64Eq => I::I64Eq,
        B::I64Ne => I::I64Ne,
        B::I64LtS => I::I64LtS,
        B::I64LtU => I::I64LtU,
        B::I64GtS => I::I64GtS,
        B::I64GtU => I::I64GtU,
        B::I64LeS => I::I64LeS,
        B::I64LeU => I::I64LeU,
        B::I64GeS => I::I64GeS,
        B::I64GeU => I::I64GeU,

        B::F32Add => I::F32Add,
        B::F32Sub => I::F32Sub,
        B::F32Mul => I::F32Mul,
        B::F32Div => I::F32Div,
        B::F32Min => I::F32Min,
        B::F32Max => I::F32Max,
        B::F32Eq => I::F32Eq,
        B::F32Ne => I::F32Ne,
        B::F32Lt => I::F32Lt,
        B::F32Gt => I::F32Gt,
        B::F32Le => I::F32Le,
        B::F32Ge => I::F32Ge,

        B::F64Add => I::F64Add,
        B::F64Sub => I::F64Sub,
        B::F64Mul => I::F64Mul,
        B::F64Div => I::F64Div,
        B::F64Min => I::F64Min,
        B::F64Max => I::F64Max,
        B::F64Eq => I::F64Eq,
        B::F64Ne => I::F64Ne,
        B::F64Lt => I::F64Lt,
        B::F64Gt => I::F64Gt,
        B::F64Le => I::F64Le,
        B::F64Ge => I::F64Ge,
    }
}

pub fn unary(op: UnOp) -> Instruction<'static> {
    use Instruction as I;
    use UnOp as U;
    match op {
        U::I32Eqz => I::I32Eqz,
        U::I64Eqz => I::I64Eqz,
        U::F32Neg => I::F32Neg,
        U::F32Abs => I::F32Abs,
        U::F32Sqrt => I::F32Sqrt,
        U::F64Neg => I::F64Neg,
        U::F64Abs => I::F64Abs,
        U::F64Sqrt => I::F64Sqrt,
        U::I32WrapI64 => I::I32WrapI64,
        U::I64ExtendI32S => I::I64ExtendI32S,
        U::I64ExtendI32U => I::I64ExtendI32U,
        U::F32ConvertI32S => I::F32ConvertI32S,
        U::F32ConvertI64S => I::F32ConvertI64S,
        U::F64ConvertI32S => I::F64ConvertI32S,
        U::F64ConvertI64S => I::F64ConvertI64S,
        U::I32TruncF32S => I::I32TruncF32S,
        U::I32TruncF64S => I::I32TruncF64S,
        U::I64TruncF32S => I::I64TruncF32S,
        U::I64TruncF64S => I::I64TruncF64S,
        U::F32DemoteF64 => I::F32DemoteF64,
        U::F64PromoteF32 => I::F64PromoteF32,
    }
}

fn memarg(ty: Primitive, offset: u32) -> MemArg {
    MemArg {
        offset: offset as u64,
        align: ty.align_log2(),
        memory_index: 0,
    }
}

pub fn load(ty: Primitive, offset: u32) -> Instruction<'static> {
    let arg = memarg(ty, offset);
    match ty {
        Primitive::I32 => Instruction::I32Load(arg),
        Primitive::I64 => Instruction::I64Load(arg),
        Primitive::F32 => Instruction::F32Load(arg),
        Primitive::F64 => Instruction::F64Load(arg),
    }
}

pub fn store(ty: Primitive, offset: u32) -> Instruction<'static> {
    let arg = memarg(ty, offset);
    match ty {
        Primitive::I32 => Instruction::I32Store(arg),
        Primitive::I64 => Instruction::I64Store(arg),
        Primitive::F32 => Instruction::F32Store(arg),
        Primitive::F64 => Instruction::F64Store(arg),
    }
}

/// Zero of `ty`, as a global initializer.
pub fn zero(ty: Primitive) -> wasm_encoder::ConstExpr {
    match ty {
        Primitive::I32 => wasm_encoder::ConstExpr::i32_const(0),
        Primitive::I64 => wasm_encoder::ConstExpr::i64_const(0),
        Primitive::F32 => wasm_encoder::ConstExpr::f32_const(0.0f32.into()),
        Primitive::F64 => wasm_encoder::ConstExpr::f64_const(0.0f64.into()),
    }
}
