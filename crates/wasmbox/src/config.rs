/// Knobs that vary the interpreter's behavior without changing the binary
/// format it accepts.
///
/// This interpreter has no fuel metering, no SIMD, and no alternative
/// dispatch strategies, so the only thing left to make configurable is a
/// cheap safety check some embedders may want to skip once a module is known
/// to be trusted.
#[derive(Debug, Copy, Clone)]
pub struct Config {
    /// Check a `call_indirect`'s callee against its declared type before
    /// dispatching, trapping with [`TrapCode::IndirectCallTypeMismatch`] on a
    /// mismatch.
    ///
    /// [`TrapCode::IndirectCallTypeMismatch`]: wasmbox_core::TrapCode::IndirectCallTypeMismatch
    pub check_call_indirect_type: bool,
    /// The maximum number of value-stack slots a single [`eval_function`]
    /// invocation may allocate across all of its frames, combined. Exceeding
    /// this traps with `StackOverflow` rather than exhausting host memory on
    /// unbounded Wasm recursion.
    ///
    /// [`eval_function`]: crate::eval_function
    pub max_stack_values: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_call_indirect_type: true,
            max_stack_values: 1 << 20,
        }
    }
}
