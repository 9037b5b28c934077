//! Instantiation and execution: the runtime half of the interpreter.
//!
//! [`Module`] (see [`crate::module`]) is the frozen, binary-format-free
//! output of loading; [`Instance`] is what a module needs to actually run —
//! its linear memory, its tables, and its globals' evaluated values. Running
//! a function walks [`Executor::run`], a `while(true) switch(opcode)` loop —
//! the "switch mode" dispatch strategy.

mod executor;
mod memory;
mod stack;
mod table;

pub use memory::Memory;
pub use table::Table;

use alloc::{boxed::Box, vec::Vec};
use wasmbox_core::{Trap, TrapCode, UntypedValue};
use wasmbox_ir::{FuncIdx, GlobalIdx, Register};

use crate::config::Config;
use crate::error::Error;
use crate::module::{ConstEvalContext, ExportDesc, Function, Module};
use executor::Executor;
use stack::ValueStack;

/// The mutable runtime state instantiated from a [`Module`]: its linear
/// memory, tables, and evaluated global values.
///
/// Split from [`Module`] the way Wasm itself separates a module (static,
/// shareable, re-instantiable) from an instance (the live state one run of
/// it owns) — here collapsed to exactly what this interpreter needs, since
/// nothing in scope re-instantiates the same module twice.
#[derive(Debug)]
pub struct Instance {
    pub memory: Option<Memory>,
    pub tables: Vec<Table>,
    pub globals: Vec<UntypedValue>,
}

struct GlobalsCtx<'a> {
    globals: &'a [UntypedValue],
}

impl ConstEvalContext for GlobalsCtx<'_> {
    fn global_value(&self, index: GlobalIdx) -> UntypedValue {
        self.globals[index.to_u32() as usize]
    }
}

impl Instance {
    /// Builds the runtime state for `module`: allocates its memory and
    /// tables at their declared minimum size, evaluates every global
    /// initializer in declaration order, then applies element and data
    /// segments.
    ///
    /// [`ConstExpr::eval`] is a pure function of the globals evaluated so
    /// far, so this calls it directly rather than compiling each initializer
    /// into a throwaway function and round-tripping it through the
    /// instruction dispatch loop for the same result.
    pub fn new(module: &Module) -> Result<Self, Trap> {
        let memory = module.memories.as_slice().first().map(Memory::new);
        let mut tables: Vec<Table> = module.tables.as_slice().iter().map(Table::new).collect();

        let mut globals = Vec::with_capacity(module.globals.len());
        for (_, global) in module.globals.iter() {
            let ctx = GlobalsCtx { globals: &globals };
            globals.push(global.init.eval(&ctx));
        }

        let mut instance = Self { memory, tables, globals };

        for element in &module.elements {
            // Passive/declarative segments (`offset: None`) are only ever
            // copied in by a `table.init`, which this interpreter doesn't
            // implement; they're parsed and kept but never applied here.
            let Some(offset) = &element.offset else { continue };
            let ctx = GlobalsCtx { globals: &instance.globals };
            let offset = offset.eval(&ctx).to_u32();
            let table = instance
                .tables
                .get_mut(element.table.to_u32() as usize)
                .ok_or(Trap::new(TrapCode::TableOutOfBounds))?;
            table.init_elements(offset, &element.func_indices)?;
        }

        for data in &module.data {
            let Some(offset) = &data.offset else { continue };
            let ctx = GlobalsCtx { globals: &instance.globals };
            let offset = offset.eval(&ctx).to_u32();
            let memory = instance.memory.as_mut().ok_or(Trap::new(TrapCode::MemoryOutOfBounds))?;
            memory.init_data(offset, &data.bytes)?;
        }

        Ok(instance)
    }
}

/// Executes `func` with `args` already laid out as its argument values,
/// returning its results in declaration order (empty if it declares none).
///
/// A function's `n`th declared result lives in [`Register::result`]`(num_results - 1 - n)`
/// once it returns — the translator's calling convention numbers result
/// slots from the last declared result backward, so this reverses them back
/// into declaration order for the caller.
pub fn eval_function(
    module: &Module,
    instance: &mut Instance,
    config: &Config,
    func: FuncIdx,
    args: &[UntypedValue],
) -> Result<Box<[UntypedValue]>, Trap> {
    let local = match &module.funcs[func] {
        Function::Local(f) => f,
        Function::Imported { .. } => return Err(Trap::new(TrapCode::UnresolvedImport)),
    };
    let num_results = module.func_type(func).len_results();

    let mut values = ValueStack::new(config.max_stack_values);
    let fp0 = num_results as usize;
    values.ensure_frame(fp0, local.frame_size as usize)?;
    for (i, &arg) in args.iter().enumerate() {
        values.set(fp0, Register::argument(i as u16), arg);
    }

    let mut executor = Executor::new(module, instance, config, &mut values);
    executor.run(func, fp0)?;

    let mut results: Vec<UntypedValue> =
        (0..num_results).map(|n| values.get(fp0, Register::result(n))).collect();
    results.reverse();
    Ok(results.into_boxed_slice())
}

/// Locates the exported `_start` function and runs it with no arguments.
pub fn eval_module(module: &Module, config: &Config) -> Result<Box<[UntypedValue]>, Error> {
    eval_module_with_args(module, config, &[])
}

/// As [`eval_module`], but with caller-supplied arguments to `_start`.
pub fn eval_module_with_args(
    module: &Module,
    config: &Config,
    args: &[UntypedValue],
) -> Result<Box<[UntypedValue]>, Error> {
    let export = module.export("_start").ok_or(Error::NoStartFunction)?;
    let ExportDesc::Func(func) = export.desc else {
        return Err(Error::NoStartFunction);
    };
    let mut instance = Instance::new(module)?;
    Ok(eval_function(module, &mut instance, config, func, args)?)
}
