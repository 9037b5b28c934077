//! Shared value representation, trap taxonomy, and numeric semantics for the
//! wasmbox interpreter.
//!
//! This crate has no knowledge of Wasm binary encoding or of the register IR;
//! it only defines the untyped value cell every other crate operates on and
//! the pure functions that give Wasm opcodes their numeric behavior.

#![cfg_attr(not(feature = "std"), no_std)]

mod ops;
mod trap;
mod units;
mod value;

pub use ops::*;
pub use trap::{Trap, TrapCode};
pub use units::{Pages, WASM_PAGE_SIZE};
pub use value::{FuncType, UntypedValue, ValueType};
