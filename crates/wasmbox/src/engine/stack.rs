use alloc::vec::Vec;
use wasmbox_core::{Trap, TrapCode, UntypedValue};
use wasmbox_ir::{FuncIdx, InstrIdx, Register};

/// The link information for one still-active call, pushed by [`ValueStack`]'s
/// owner on every call and popped on every `return`.
///
/// This is the safe, index-based stand-in for the raw link words the ported
/// design stores inside the value slab itself (see `DESIGN.md`): the
/// continuation is an [`InstrIdx`] into the caller's own code, resolved
/// through `Module.funcs` rather than a bare code pointer.
#[derive(Debug, Copy, Clone)]
pub struct CallFrame {
    pub caller: FuncIdx,
    pub caller_fp: usize,
    pub return_ip: InstrIdx,
}

/// The flat register file every active call frame is a window into.
///
/// A unified operand stack: locals, arguments, link
/// bookkeeping and operand-stack temporaries of every frame on the call
/// stack share one growable array, addressed by a frame pointer plus a
/// signed [`Register`] offset. [`Config::max_stack_values`] bounds its growth
/// so unbounded Wasm recursion traps instead of exhausting host memory.
///
/// [`Config::max_stack_values`]: crate::Config::max_stack_values
#[derive(Debug)]
pub struct ValueStack {
    values: Vec<UntypedValue>,
    limit: usize,
}

impl ValueStack {
    pub fn new(limit: usize) -> Self {
        Self { values: Vec::new(), limit }
    }

    /// Ensures slots `[fp, fp + frame_size)` exist and are zeroed, growing the
    /// backing array if needed. Called once per call, with `frame_size` the
    /// callee's [`LocalFunction::frame_size`](crate::module::LocalFunction).
    pub fn ensure_frame(&mut self, fp: usize, frame_size: usize) -> Result<(), Trap> {
        let needed = fp.checked_add(frame_size).ok_or(Trap::new(TrapCode::StackOverflow))?;
        if needed > self.limit {
            return Err(Trap::new(TrapCode::StackOverflow));
        }
        if needed > self.values.len() {
            self.values.resize(needed, UntypedValue::ZERO);
        }
        Ok(())
    }

    fn slot(fp: usize, r: Register) -> usize {
        (fp as isize + r.to_usize_offset()) as usize
    }

    pub fn get(&self, fp: usize, r: Register) -> UntypedValue {
        self.values[Self::slot(fp, r)]
    }

    pub fn set(&mut self, fp: usize, r: Register, value: UntypedValue) {
        self.values[Self::slot(fp, r)] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmbox_ir::FuncIdx;

    #[test]
    fn ensure_frame_zero_fills_new_slots() {
        let mut stack = ValueStack::new(64);
        stack.ensure_frame(0, 4).unwrap();
        assert_eq!(stack.get(0, Register::from_i16(2)).to_i32(), 0);
    }

    #[test]
    fn get_set_round_trips_through_frame_pointer() {
        let mut stack = ValueStack::new(64);
        stack.ensure_frame(2, 4).unwrap();
        stack.set(2, Register::argument(0), UntypedValue::from(42i32));
        assert_eq!(stack.get(2, Register::argument(0)).to_i32(), 42);
    }

    #[test]
    fn negative_offsets_address_the_caller_side_of_the_frame_pointer() {
        let mut stack = ValueStack::new(64);
        stack.ensure_frame(0, 1).unwrap();
        stack.ensure_frame(1, 4).unwrap();
        stack.set(1, Register::result(0), UntypedValue::from(7i32));
        assert_eq!(stack.get(1, Register::result(0)).to_i32(), 7);
    }

    #[test]
    fn exceeding_the_limit_traps() {
        let mut stack = ValueStack::new(8);
        assert_eq!(
            stack.ensure_frame(0, 9).unwrap_err().code(),
            TrapCode::StackOverflow
        );
    }

    #[test]
    fn call_frame_records_the_resume_point() {
        let frame = CallFrame { caller: FuncIdx::new(0), caller_fp: 2, return_ip: InstrIdx::new(5) };
        assert_eq!(frame.return_ip, InstrIdx::new(5));
    }
}
