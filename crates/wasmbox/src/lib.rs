//! A WebAssembly MVP interpreter that lowers stack-machine bytecode into a
//! register-based instruction stream before execution.
//!
//! [`ModuleLoader::load`] parses and translates a `.wasm` binary into a
//! [`Module`]; [`eval_module`] instantiates it, locates `_start`, and runs it
//! to completion or trap.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod config;
mod engine;
mod error;
mod leb128;
mod module;
mod stream;

pub use config::Config;
pub use engine::{eval_function, eval_module, eval_module_with_args, Instance, Memory, Table};
pub use error::{Error, ModuleError};
pub use module::{ExportDesc, Module, ModuleLoader};
pub use wasmbox_core::{FuncType, Trap, TrapCode, UntypedValue, ValueType};
pub use wasmbox_ir::FuncIdx;
