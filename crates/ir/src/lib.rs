//! The register-based instruction encoding produced by the translator and
//! consumed by the interpreter.
//!
//! Everything here is a frozen, post-translation representation: block
//! structure, operand-stack bookkeeping, and relative jump offsets are all
//! translator-only concerns that have already been resolved away by the time
//! an [`Instruction`] exists.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod index;
mod instr;
mod register;

pub use index::{DataIdx, ElemIdx, FuncIdx, GlobalIdx, InstrIdx, LocalIdx, MemIdx, TableIdx, TypeIdx};
pub use instr::{
    BinInstr, CallIndirectParams, Instruction, JumpTable, LoadInstr, StoreInstr, UnaryInstr,
};
pub use register::{Register, FUNCTION_CALL_OFFSET};
