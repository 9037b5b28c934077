//! Lowers one function body from Wasm's stack-machine bytecode into the
//! flat register-based [`Instruction`] stream the engine executes.
//!
//! The translator walks the bytecode once, maintaining an explicit operand
//! stack of [`Register`]s (mirroring the Wasm value stack) and a stack of
//! [`ControlFrame`]s (mirroring the `block`/`loop`/`if` nesting). Every
//! Wasm value producer allocates a brand-new register — `stack_top` only
//! ever grows during a function's translation, so there is no register
//! reuse and no liveness analysis to get wrong.
//!
//! Branch targets are resolved as translation reaches them: a `loop`'s
//! label is known the moment it is entered (`Direction::Head`), while a
//! `block`/`if`'s label is only known at its matching `end`
//! (`Direction::Tail`) — until then, branches to it are emitted with a
//! placeholder target and recorded as a fixup in the frame, patched in
//! place once the frame's tail position is known.

use alloc::{boxed::Box, vec::Vec};

use wasmbox_collections::Arena;
use wasmbox_core::{FuncType, UntypedValue, ValueType};
use wasmbox_ir::{
    BinInstr, CallIndirectParams, FuncIdx, GlobalIdx, InstrIdx, Instruction, JumpTable, LoadInstr,
    Register, StoreInstr, TableIdx, TypeIdx, UnaryInstr, FUNCTION_CALL_OFFSET,
};

use super::block::{ControlFrame, Direction, FrameKind};
use crate::error::ModuleError;
use crate::leb128::{read_i32, read_i64, read_u32};
use crate::stream::InputStream;

/// A function body's translated form, ready to embed in a [`LocalFunction`](super::LocalFunction).
pub struct Translated {
    pub code: Box<[Instruction]>,
    pub frame_size: u16,
}

/// A blocktype as read from the bytecode: either no result, or a single
/// value-typed result. Multi-value (type-index) blocktypes are not part of
/// the MVP grammar this translator targets.
enum BlockType {
    Empty,
    Value(ValueType),
}

fn parse_blocktype(stream: &mut InputStream<'_>) -> Result<BlockType, ModuleError> {
    let byte = stream.read_u8()?;
    Ok(match byte {
        0x40 => BlockType::Empty,
        0x7F => BlockType::Value(ValueType::I32),
        0x7E => BlockType::Value(ValueType::I64),
        0x7D => BlockType::Value(ValueType::F32),
        0x7C => BlockType::Value(ValueType::F64),
        other => return Err(ModuleError::UnsupportedOpcode(other)),
    })
}

fn parse_memarg(stream: &mut InputStream<'_>) -> Result<u32, ModuleError> {
    let _align = read_u32(stream)?;
    let offset = read_u32(stream)?;
    Ok(offset)
}

struct FuncTranslator<'a> {
    types: &'a Arena<TypeIdx, FuncType>,
    func_types: &'a [TypeIdx],
    num_result: u16,
    value_stack: Vec<Register>,
    stack_top: i16,
    max_stack_top: i16,
    code: Vec<Instruction>,
    control_stack: Vec<ControlFrame>,
    /// Mirrors `ControlFrame::unreachable` for code outside of any open
    /// block — set once the function body itself falls into a dead
    /// fallthrough (an `unreachable`/`br`/`br_table`/`return` with no
    /// enclosing block left to pop).
    top_unreachable: bool,
}

impl<'a> FuncTranslator<'a> {
    fn new(
        types: &'a Arena<TypeIdx, FuncType>,
        func_types: &'a [TypeIdx],
        num_locals: u16,
        num_result: u16,
    ) -> Self {
        let start = FUNCTION_CALL_OFFSET + num_locals as i16;
        Self {
            types,
            func_types,
            num_result,
            value_stack: Vec::new(),
            stack_top: start,
            max_stack_top: start,
            code: Vec::new(),
            control_stack: Vec::new(),
            top_unreachable: false,
        }
    }

    /// `true` if the code at the current translation position is dead —
    /// the innermost open block's fallthrough is unreachable, or (with no
    /// blocks open) the function body itself has already returned/trapped
    /// unconditionally. Pop/peek consult this to tolerate an empty operand
    /// stack instead of reporting underflow.
    fn is_unreachable(&self) -> bool {
        self.control_stack.last().map_or(self.top_unreachable, |frame| frame.unreachable)
    }

    /// Marks the current position as dead, following an
    /// `unreachable`/unconditional `br`/`br_table`/`return`.
    fn mark_unreachable(&mut self) {
        match self.control_stack.last_mut() {
            Some(frame) => frame.unreachable = true,
            None => self.top_unreachable = true,
        }
    }

    /// A placeholder register substituted for a genuine operand while
    /// translating dead code. The instruction referencing it never
    /// executes, so its contents are irrelevant.
    fn phantom_register(&self) -> Register {
        Register::from_i16(0)
    }

    fn emit(&mut self, instr: Instruction) {
        self.code.push(instr);
    }

    fn here(&self) -> InstrIdx {
        InstrIdx::new(self.code.len() as u32)
    }

    /// Allocates a fresh register without pushing it onto the operand
    /// stack, for slots (a block's result register) that are reserved
    /// ahead of being produced.
    fn reserve_register(&mut self) -> Register {
        let r = Register::from_i16(self.stack_top);
        self.stack_top += 1;
        self.max_stack_top = self.max_stack_top.max(self.stack_top);
        r
    }

    fn push(&mut self) -> Register {
        let r = self.reserve_register();
        self.value_stack.push(r);
        r
    }

    /// Pushes a register that was already reserved (a block's result slot,
    /// allocated when the block was entered) back onto the operand stack,
    /// without allocating a new one.
    fn push_existing(&mut self, r: Register) {
        self.value_stack.push(r);
    }

    fn pop(&mut self) -> Result<Register, ModuleError> {
        match self.value_stack.pop() {
            Some(r) => Ok(r),
            None if self.is_unreachable() => Ok(self.phantom_register()),
            None => Err(ModuleError::StackUnderflow),
        }
    }

    fn peek(&self) -> Result<Register, ModuleError> {
        match self.value_stack.last().copied() {
            Some(r) => Ok(r),
            None if self.is_unreachable() => Ok(self.phantom_register()),
            None => Err(ModuleError::StackUnderflow),
        }
    }

    fn binary(&mut self, build: fn(BinInstr) -> Instruction) -> Result<(), ModuleError> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        let result = self.push();
        self.emit(build(BinInstr::new(result, lhs, rhs)));
        Ok(())
    }

    fn unary(&mut self, build: fn(UnaryInstr) -> Instruction) -> Result<(), ModuleError> {
        let input = self.pop()?;
        let result = self.push();
        self.emit(build(UnaryInstr::new(result, input)));
        Ok(())
    }

    fn load(&mut self, build: fn(LoadInstr) -> Instruction, stream: &mut InputStream<'_>) -> Result<(), ModuleError> {
        let offset = parse_memarg(stream)?;
        let result = self.push();
        self.emit(build(LoadInstr::new(result, offset)));
        Ok(())
    }

    fn store(&mut self, build: fn(StoreInstr) -> Instruction, stream: &mut InputStream<'_>) -> Result<(), ModuleError> {
        let offset = parse_memarg(stream)?;
        let value = self.pop()?;
        self.emit(build(StoreInstr::new(value, offset)));
        Ok(())
    }

    /// Patches a single `Jump`-class instruction's target in place. `pos`
    /// must have been produced by this translator as a forward-branch
    /// placeholder.
    fn patch_jump(&mut self, pos: usize, target: InstrIdx) {
        match &mut self.code[pos] {
            Instruction::Jump { target: t } => *t = target,
            Instruction::JumpIfNez { target: t, .. } => *t = target,
            Instruction::JumpIfEqz { target: t, .. } => *t = target,
            other => unreachable!("fixup position does not hold a jump instruction: {other:?}"),
        }
    }

    fn patch_table(&mut self, pos: usize, slot: usize, target: InstrIdx) {
        match &mut self.code[pos] {
            Instruction::JumpTable { table, .. } => table.patch(slot, target),
            other => unreachable!("table fixup position does not hold a jump table: {other:?}"),
        }
    }

    /// Resolves control-stack depth `labelidx` (0 = innermost) to an index
    /// into `control_stack`.
    fn frame_index(&self, labelidx: u32) -> Result<usize, ModuleError> {
        let depth = labelidx as usize;
        self.control_stack
            .len()
            .checked_sub(depth + 1)
            .ok_or(ModuleError::InvalidControlFlow {
                message: "branch target deeper than the enclosing block nesting".into(),
            })
    }

    /// Passes the branched-to frame's result value, if it has one, into its
    /// reserved result register. For `br`/the taken path of `br_if` the
    /// value is popped; `br_if`'s un-taken fallthrough leaves it for the
    /// frame's own `end` handling to pick up.
    fn move_result_if_any(&mut self, frame_index: usize, consume: bool) -> Result<(), ModuleError> {
        let frame = &self.control_stack[frame_index];
        if !frame.has_result {
            return Ok(());
        }
        let result_register = frame.result_register;
        let value = if consume { self.pop()? } else { self.peek()? };
        self.emit(Instruction::Copy { result: result_register, input: value });
        Ok(())
    }

    /// Emits the unconditional jump for `br` (or `return`-shaped fallthrough
    /// branches), resolving immediately against a `Head` target or
    /// registering a fixup against a `Tail` one.
    fn branch(&mut self, frame_index: usize) {
        match self.control_stack[frame_index].label_direction() {
            Direction::Head(target) => self.emit(Instruction::Jump { target }),
            Direction::Tail => {
                let pos = self.code.len();
                self.emit(Instruction::Jump { target: InstrIdx::new(u32::MAX) });
                self.control_stack[frame_index].pending_fixups.push(pos);
            }
        }
    }

    fn branch_if_nez(&mut self, frame_index: usize, condition: Register) {
        match self.control_stack[frame_index].label_direction() {
            Direction::Head(target) => self.emit(Instruction::JumpIfNez { condition, target }),
            Direction::Tail => {
                let pos = self.code.len();
                self.emit(Instruction::JumpIfNez { condition, target: InstrIdx::new(u32::MAX) });
                self.control_stack[frame_index].pending_fixups.push(pos);
            }
        }
    }

    fn resolve_call_base(&mut self, num_results: u16) -> (Register, u16) {
        let ret_base = self.stack_top;
        // Reserve the callee's return slots, then its link words + argument
        // slots, all physically in the current frame's register file until
        // the call transfers control.
        for _ in 0..num_results {
            self.reserve_register();
        }
        let frame_offset = ret_base + num_results as i16;
        self.max_stack_top = self.max_stack_top.max(self.stack_top);
        (Register::from_i16(frame_offset), ret_base as u16)
    }

    /// Pushes a callee's results back onto the operand stack, in
    /// declaration order: `ret_base..ret_base + num_results` holds them
    /// bottom-to-top, since [`Self::resolve_call_base`] reserved them in
    /// that order and the callee's `Return` writes its last result
    /// ([`Register::result`]`(0)`) to the highest of them.
    fn push_call_results(&mut self, ret_base: u16, num_results: u16) {
        for i in 0..num_results {
            self.push_existing(Register::from_i16(ret_base as i16 + i as i16));
        }
    }

    fn call(&mut self, callee_type: &FuncType, func: FuncIdx) {
        let num_args = callee_type.len_params();
        let num_results = callee_type.len_results();
        let args: Vec<Register> = (0..num_args).map(|_| self.pop().expect("validated arity")).collect();
        let (frame_offset, ret_base) = self.resolve_call_base(num_results);
        for (i, arg) in args.into_iter().rev().enumerate() {
            let target = Register::from_i16(frame_offset.to_i16() + FUNCTION_CALL_OFFSET + i as i16);
            self.emit(Instruction::Copy { result: target, input: arg });
        }
        self.emit(Instruction::StaticCall { func, frame_offset, num_args });
        self.push_call_results(ret_base, num_results);
    }

    fn call_indirect(&mut self, params: CallIndirectParams, callee_type: &FuncType) -> Result<(), ModuleError> {
        let table_index = self.pop()?;
        let num_args = callee_type.len_params();
        let num_results = callee_type.len_results();
        let args: Vec<Register> = (0..num_args).map(|_| self.pop().expect("validated arity")).collect();
        let (frame_offset, ret_base) = self.resolve_call_base(num_results);
        for (i, arg) in args.into_iter().rev().enumerate() {
            let target = Register::from_i16(frame_offset.to_i16() + FUNCTION_CALL_OFFSET + i as i16);
            self.emit(Instruction::Copy { result: target, input: arg });
        }
        self.emit(Instruction::DynamicCall { table_index, frame_offset, params, num_args });
        self.push_call_results(ret_base, num_results);
        Ok(())
    }

    /// Moves the top `num_result` operand-stack values into this function's
    /// result slots ahead of a `Return`, one `Register::result(n)` per
    /// value: the last popped (the deepest, `results()[0]`) lands in the
    /// highest-numbered slot, mirroring [`Self::push_call_results`] on the
    /// caller side.
    fn emit_return_copies(&mut self) -> Result<(), ModuleError> {
        for n in 0..self.num_result {
            let value = self.pop()?;
            self.emit(Instruction::Copy { result: Register::result(n), input: value });
        }
        Ok(())
    }

    fn callee_type(&self, func: FuncIdx) -> Result<&'a FuncType, ModuleError> {
        let type_idx = *self
            .func_types
            .get(func.to_u32() as usize)
            .ok_or(ModuleError::IndexOutOfBounds { what: "function", index: func.to_u32() })?;
        self.types.get(type_idx).ok_or(ModuleError::IndexOutOfBounds {
            what: "type",
            index: type_idx.to_u32(),
        })
    }
}

/// Translates one function's Wasm bytecode body into register IR.
///
/// `func_types` is every function's signature, indexed by `FuncIdx` order
/// (imports first, then local functions) — the translator needs it to
/// resolve a `call`'s callee arity without the `Module::funcs` arena, which
/// doesn't exist yet while the code section is being processed.
pub fn translate_function(
    ty: &FuncType,
    locals: &[ValueType],
    code: &[u8],
    types: &Arena<TypeIdx, FuncType>,
    func_types: &[TypeIdx],
) -> Result<Translated, ModuleError> {
    let num_params = ty.len_params();
    let num_locals = num_params + locals.len() as u16;
    let num_result = ty.len_results();

    let mut t = FuncTranslator::new(types, func_types, num_locals, num_result);
    let mut stream = InputStream::new(code);

    while !stream.is_empty() {
        let opcode = stream.read_u8()?;
        translate_one(&mut t, opcode, &mut stream)?;
    }

    if !t.control_stack.is_empty() {
        return Err(ModuleError::InvalidControlFlow {
            message: "function body ended with unclosed blocks".into(),
        });
    }

    let frame_size = t.max_stack_top as u16;
    Ok(Translated { code: t.code.into_boxed_slice(), frame_size })
}

fn translate_one(t: &mut FuncTranslator<'_>, opcode: u8, stream: &mut InputStream<'_>) -> Result<(), ModuleError> {
    match opcode {
        0x00 => {
            t.emit(Instruction::Unreachable);
            t.mark_unreachable();
        }
        0x01 => {}

        0x02 | 0x03 => {
            let bt = parse_blocktype(stream)?;
            let has_result = matches!(bt, BlockType::Value(_));
            let result_register = if has_result { t.reserve_register() } else { Register::from_i16(0) };
            let direction = if opcode == 0x03 { Direction::Head(t.here()) } else { Direction::Tail };
            let kind = if opcode == 0x03 { FrameKind::Loop } else { FrameKind::Block };
            let entry_unreachable = t.is_unreachable();
            t.control_stack.push(ControlFrame::new(
                kind,
                direction,
                t.value_stack.len(),
                has_result,
                result_register,
                entry_unreachable,
            ));
        }

        0x04 => {
            let bt = parse_blocktype(stream)?;
            let has_result = matches!(bt, BlockType::Value(_));
            let result_register = if has_result { t.reserve_register() } else { Register::from_i16(0) };
            let condition = t.pop()?;
            let entry_unreachable = t.is_unreachable();
            let pos = t.code.len();
            t.emit(Instruction::JumpIfEqz { condition, target: InstrIdx::new(u32::MAX) });
            t.control_stack.push(ControlFrame::new(
                FrameKind::If { else_fixup: Some(pos) },
                Direction::Tail,
                t.value_stack.len(),
                has_result,
                result_register,
                entry_unreachable,
            ));
        }

        0x05 => {
            let idx = t.control_stack.len() - 1;
            if t.control_stack[idx].has_result {
                t.move_result_if_any(idx, true)?;
            }
            let jump_pos = t.code.len();
            t.emit(Instruction::Jump { target: InstrIdx::new(u32::MAX) });
            t.control_stack[idx].pending_fixups.push(jump_pos);

            let else_start = t.here();
            match &mut t.control_stack[idx].kind {
                FrameKind::If { else_fixup } => {
                    if let Some(pos) = else_fixup.take() {
                        t.patch_jump(pos, else_start);
                    }
                }
                _ => {
                    return Err(ModuleError::InvalidControlFlow { message: "`else` outside of `if`".into() })
                }
            }
            let stack_height = t.control_stack[idx].stack_height;
            t.value_stack.truncate(stack_height);
            // The `else`-branch is a fresh region: a dead `then`-branch
            // doesn't make it reachable, but a live one doesn't either if
            // the whole `if` was itself entered inside dead code.
            t.control_stack[idx].unreachable = t.control_stack[idx].entry_unreachable;
        }

        0x0B => match t.control_stack.pop() {
            Some(frame) => {
                if frame.has_result {
                    let value = match t.value_stack.pop() {
                        Some(r) => r,
                        None if frame.unreachable => t.phantom_register(),
                        None => return Err(ModuleError::StackUnderflow),
                    };
                    t.emit(Instruction::Copy { result: frame.result_register, input: value });
                }
                let cont = t.here();
                if let FrameKind::If { else_fixup: Some(pos) } = frame.kind {
                    t.patch_jump(pos, cont);
                }
                for pos in &frame.pending_fixups {
                    t.patch_jump(*pos, cont);
                }
                for (pos, slot) in &frame.table_fixups {
                    t.patch_table(*pos, *slot, cont);
                }
                t.value_stack.truncate(frame.stack_height);
                if frame.has_result {
                    t.push_existing(frame.result_register);
                }
            }
            // The control stack is only empty for the function body's own
            // closing `end` (every nested `block`/`loop`/`if` popped its own
            // frame above) — falling off the end of a function is the same
            // as an explicit `return`.
            None => {
                t.emit_return_copies()?;
                t.emit(Instruction::Return);
            }
        },

        0x0C => {
            let labelidx = read_u32(stream)?;
            let idx = t.frame_index(labelidx)?;
            t.move_result_if_any(idx, true)?;
            t.branch(idx);
            t.mark_unreachable();
        }

        0x0D => {
            let labelidx = read_u32(stream)?;
            let idx = t.frame_index(labelidx)?;
            // `br_if`'s condition sits above the (optional) value it would
            // carry if taken; pop it first so the value-move below sees
            // the right slot, and peek (not pop) the value itself since the
            // un-taken fallthrough path must still find it on the stack.
            let condition = t.pop()?;
            t.move_result_if_any(idx, false)?;
            t.branch_if_nez(idx, condition);
        }

        0x0E => {
            let n = read_u32(stream)?;
            let mut labels = Vec::with_capacity(n as usize + 1);
            for _ in 0..n {
                labels.push(read_u32(stream)?);
            }
            let default = read_u32(stream)?;
            labels.push(default);

            let index = t.pop()?;
            let table_pos = t.code.len();
            let mut targets = Vec::with_capacity(labels.len());
            let mut deferred = Vec::new();
            for (slot, labelidx) in labels.iter().enumerate() {
                let idx = t.frame_index(*labelidx)?;
                match t.control_stack[idx].label_direction() {
                    Direction::Head(target) => targets.push(target),
                    Direction::Tail => {
                        targets.push(InstrIdx::new(u32::MAX));
                        deferred.push((idx, slot));
                    }
                }
            }
            t.emit(Instruction::JumpTable { index, table: JumpTable::new(targets) });
            for (idx, slot) in deferred {
                t.control_stack[idx].table_fixups.push((table_pos, slot));
            }
            // Every entry (including the default) is a jump; nothing after
            // a `br_table` runs until the next `else`/`end`.
            t.mark_unreachable();
        }

        0x0F => {
            t.emit_return_copies()?;
            t.emit(Instruction::Return);
            t.mark_unreachable();
        }

        0x10 => {
            let funcidx = FuncIdx::from(read_u32(stream)?);
            let callee_type = t.callee_type(funcidx)?;
            t.call(callee_type, funcidx);
        }

        0x11 => {
            let typeidx = TypeIdx::from(read_u32(stream)?);
            let tableidx = TableIdx::from(read_u32(stream)?);
            let callee_type = t
                .types
                .get(typeidx)
                .ok_or(ModuleError::IndexOutOfBounds { what: "type", index: typeidx.to_u32() })?;
            t.call_indirect(CallIndirectParams { table: tableidx, func_type: typeidx }, callee_type)?;
        }

        0x1A => {
            t.pop()?;
        }
        0x1B => {
            // Operand stack order is `(a, b, cond)` with `cond` on top;
            // selects `a` when `cond != 0`, else `b`.
            let condition = t.pop()?;
            let if_false = t.pop()?;
            let if_true = t.pop()?;
            let result = t.push();
            t.emit(Instruction::Select { result, condition, if_true, if_false });
        }

        0x20 => {
            let idx = read_u32(stream)?;
            let result = t.push();
            t.emit(Instruction::Copy { result, input: Register::from_i16(FUNCTION_CALL_OFFSET + idx as i16) });
        }
        0x21 => {
            let idx = read_u32(stream)?;
            let value = t.pop()?;
            t.emit(Instruction::Copy { result: Register::from_i16(FUNCTION_CALL_OFFSET + idx as i16), input: value });
        }
        0x22 => {
            let idx = read_u32(stream)?;
            let value = t.peek()?;
            t.emit(Instruction::Copy { result: Register::from_i16(FUNCTION_CALL_OFFSET + idx as i16), input: value });
        }
        0x23 => {
            let global = GlobalIdx::from(read_u32(stream)?);
            let result = t.push();
            t.emit(Instruction::GlobalGet { result, global });
        }
        0x24 => {
            let global = GlobalIdx::from(read_u32(stream)?);
            let value = t.pop()?;
            t.emit(Instruction::GlobalSet { global, value });
        }

        0x28 => t.load(Instruction::I32Load, stream)?,
        0x29 => t.load(Instruction::I64Load, stream)?,
        0x2A => t.load(Instruction::F32Load, stream)?,
        0x2B => t.load(Instruction::F64Load, stream)?,
        0x2C => t.load(Instruction::I32Load8S, stream)?,
        0x2D => t.load(Instruction::I32Load8U, stream)?,
        0x2E => t.load(Instruction::I32Load16S, stream)?,
        0x2F => t.load(Instruction::I32Load16U, stream)?,
        0x30 => t.load(Instruction::I64Load8S, stream)?,
        0x31 => t.load(Instruction::I64Load8U, stream)?,
        0x32 => t.load(Instruction::I64Load16S, stream)?,
        0x33 => t.load(Instruction::I64Load16U, stream)?,
        0x34 => t.load(Instruction::I64Load32S, stream)?,
        0x35 => t.load(Instruction::I64Load32U, stream)?,

        0x36 => t.store(Instruction::I32Store, stream)?,
        0x37 => t.store(Instruction::I64Store, stream)?,
        0x38 => t.store(Instruction::F32Store, stream)?,
        0x39 => t.store(Instruction::F64Store, stream)?,
        0x3A => t.store(Instruction::I32Store8, stream)?,
        0x3B => t.store(Instruction::I32Store16, stream)?,
        0x3C => t.store(Instruction::I64Store8, stream)?,
        0x3D => t.store(Instruction::I64Store16, stream)?,
        0x3E => t.store(Instruction::I64Store32, stream)?,

        0x3F => {
            if stream.read_u8()? != 0x00 {
                return Err(ModuleError::UnsupportedOpcode(opcode));
            }
            let result = t.push();
            t.emit(Instruction::MemorySize { result });
        }
        0x40 => {
            if stream.read_u8()? != 0x00 {
                return Err(ModuleError::UnsupportedOpcode(opcode));
            }
            let delta = t.pop()?;
            let result = t.push();
            t.emit(Instruction::MemoryGrow { result, delta });
        }

        0x41 => {
            let value = UntypedValue::from(read_i32(stream)?);
            let result = t.push();
            t.emit(Instruction::Const { result, value });
        }
        0x42 => {
            let value = UntypedValue::from(read_i64(stream)?);
            let result = t.push();
            t.emit(Instruction::Const { result, value });
        }
        0x43 => {
            let value = UntypedValue::from(stream.read_f32()?);
            let result = t.push();
            t.emit(Instruction::Const { result, value });
        }
        0x44 => {
            let value = UntypedValue::from(stream.read_f64()?);
            let result = t.push();
            t.emit(Instruction::Const { result, value });
        }

        0x45 => t.unary(Instruction::I32Eqz)?,
        0x46 => t.binary(Instruction::I32Eq)?,
        0x47 => t.binary(Instruction::I32Ne)?,
        0x48 => t.binary(Instruction::I32LtS)?,
        0x49 => t.binary(Instruction::I32LtU)?,
        0x4A => t.binary(Instruction::I32GtS)?,
        0x4B => t.binary(Instruction::I32GtU)?,
        0x4C => t.binary(Instruction::I32LeS)?,
        0x4D => t.binary(Instruction::I32LeU)?,
        0x4E => t.binary(Instruction::I32GeS)?,
        0x4F => t.binary(Instruction::I32GeU)?,

        0x50 => t.unary(Instruction::I64Eqz)?,
        0x51 => t.binary(Instruction::I64Eq)?,
        0x52 => t.binary(Instruction::I64Ne)?,
        0x53 => t.binary(Instruction::I64LtS)?,
        0x54 => t.binary(Instruction::I64LtU)?,
        0x55 => t.binary(Instruction::I64GtS)?,
        0x56 => t.binary(Instruction::I64GtU)?,
        0x57 => t.binary(Instruction::I64LeS)?,
        0x58 => t.binary(Instruction::I64LeU)?,
        0x59 => t.binary(Instruction::I64GeS)?,
        0x5A => t.binary(Instruction::I64GeU)?,

        0x5B => t.binary(Instruction::F32Eq)?,
        0x5C => t.binary(Instruction::F32Ne)?,
        0x5D => t.binary(Instruction::F32Lt)?,
        0x5E => t.binary(Instruction::F32Gt)?,
        0x5F => t.binary(Instruction::F32Le)?,
        0x60 => t.binary(Instruction::F32Ge)?,

        0x61 => t.binary(Instruction::F64Eq)?,
        0x62 => t.binary(Instruction::F64Ne)?,
        0x63 => t.binary(Instruction::F64Lt)?,
        0x64 => t.binary(Instruction::F64Gt)?,
        0x65 => t.binary(Instruction::F64Le)?,
        0x66 => t.binary(Instruction::F64Ge)?,

        0x67 => t.unary(Instruction::I32Clz)?,
        0x68 => t.unary(Instruction::I32Ctz)?,
        0x69 => t.unary(Instruction::I32Popcnt)?,
        0x6A => t.binary(Instruction::I32Add)?,
        0x6B => t.binary(Instruction::I32Sub)?,
        0x6C => t.binary(Instruction::I32Mul)?,
        0x6D => t.binary(Instruction::I32DivS)?,
        0x6E => t.binary(Instruction::I32DivU)?,
        0x6F => t.binary(Instruction::I32RemS)?,
        0x70 => t.binary(Instruction::I32RemU)?,
        0x71 => t.binary(Instruction::I32And)?,
        0x72 => t.binary(Instruction::I32Or)?,
        0x73 => t.binary(Instruction::I32Xor)?,
        0x74 => t.binary(Instruction::I32Shl)?,
        0x75 => t.binary(Instruction::I32ShrS)?,
        0x76 => t.binary(Instruction::I32ShrU)?,
        0x77 => t.binary(Instruction::I32Rotl)?,
        0x78 => t.binary(Instruction::I32Rotr)?,

        0x79 => t.unary(Instruction::I64Clz)?,
        0x7A => t.unary(Instruction::I64Ctz)?,
        0x7B => t.unary(Instruction::I64Popcnt)?,
        0x7C => t.binary(Instruction::I64Add)?,
        0x7D => t.binary(Instruction::I64Sub)?,
        0x7E => t.binary(Instruction::I64Mul)?,
        0x7F => t.binary(Instruction::I64DivS)?,
        0x80 => t.binary(Instruction::I64DivU)?,
        0x81 => t.binary(Instruction::I64RemS)?,
        0x82 => t.binary(Instruction::I64RemU)?,
        0x83 => t.binary(Instruction::I64And)?,
        0x84 => t.binary(Instruction::I64Or)?,
        0x85 => t.binary(Instruction::I64Xor)?,
        0x86 => t.binary(Instruction::I64Shl)?,
        0x87 => t.binary(Instruction::I64ShrS)?,
        0x88 => t.binary(Instruction::I64ShrU)?,
        0x89 => t.binary(Instruction::I64Rotl)?,
        0x8A => t.binary(Instruction::I64Rotr)?,

        0x8B => t.unary(Instruction::F32Abs)?,
        0x8C => t.unary(Instruction::F32Neg)?,
        0x8D => t.unary(Instruction::F32Ceil)?,
        0x8E => t.unary(Instruction::F32Floor)?,
        0x8F => t.unary(Instruction::F32Trunc)?,
        0x90 => t.unary(Instruction::F32Nearest)?,
        0x91 => t.unary(Instruction::F32Sqrt)?,
        0x92 => t.binary(Instruction::F32Add)?,
        0x93 => t.binary(Instruction::F32Sub)?,
        0x94 => t.binary(Instruction::F32Mul)?,
        0x95 => t.binary(Instruction::F32Div)?,
        0x96 => t.binary(Instruction::F32Min)?,
        0x97 => t.binary(Instruction::F32Max)?,
        0x98 => t.binary(Instruction::F32Copysign)?,

        0x99 => t.unary(Instruction::F64Abs)?,
        0x9A => t.unary(Instruction::F64Neg)?,
        0x9B => t.unary(Instruction::F64Ceil)?,
        0x9C => t.unary(Instruction::F64Floor)?,
        0x9D => t.unary(Instruction::F64Trunc)?,
        0x9E => t.unary(Instruction::F64Nearest)?,
        0x9F => t.unary(Instruction::F64Sqrt)?,
        0xA0 => t.binary(Instruction::F64Add)?,
        0xA1 => t.binary(Instruction::F64Sub)?,
        0xA2 => t.binary(Instruction::F64Mul)?,
        0xA3 => t.binary(Instruction::F64Div)?,
        0xA4 => t.binary(Instruction::F64Min)?,
        0xA5 => t.binary(Instruction::F64Max)?,
        0xA6 => t.binary(Instruction::F64Copysign)?,

        0xA7 => t.unary(Instruction::I32WrapI64)?,
        0xA8 => t.unary(Instruction::I32TruncF32S)?,
        0xA9 => t.unary(Instruction::I32TruncF32U)?,
        0xAA => t.unary(Instruction::I32TruncF64S)?,
        0xAB => t.unary(Instruction::I32TruncF64U)?,
        0xAC => t.unary(Instruction::I64ExtendI32S)?,
        0xAD => t.unary(Instruction::I64ExtendI32U)?,
        0xAE => t.unary(Instruction::I64TruncF32S)?,
        0xAF => t.unary(Instruction::I64TruncF32U)?,
        0xB0 => t.unary(Instruction::I64TruncF64S)?,
        0xB1 => t.unary(Instruction::I64TruncF64U)?,
        0xB2 => t.unary(Instruction::F32ConvertI32S)?,
        0xB3 => t.unary(Instruction::F32ConvertI32U)?,
        0xB4 => t.unary(Instruction::F32ConvertI64S)?,
        0xB5 => t.unary(Instruction::F32ConvertI64U)?,
        0xB6 => t.unary(Instruction::F32DemoteF64)?,
        0xB7 => t.unary(Instruction::F64ConvertI32S)?,
        0xB8 => t.unary(Instruction::F64ConvertI32U)?,
        0xB9 => t.unary(Instruction::F64ConvertI64S)?,
        0xBA => t.unary(Instruction::F64ConvertI64U)?,
        0xBB => t.unary(Instruction::F64PromoteF32)?,
        0xBC => t.unary(Instruction::I32ReinterpretF32)?,
        0xBD => t.unary(Instruction::I64ReinterpretF64)?,
        0xBE => t.unary(Instruction::F32ReinterpretI32)?,
        0xBF => t.unary(Instruction::F64ReinterpretI64)?,

        0xC0 => t.unary(Instruction::I32Extend8S)?,
        0xC1 => t.unary(Instruction::I32Extend16S)?,
        0xC2 => t.unary(Instruction::I64Extend8S)?,
        0xC3 => t.unary(Instruction::I64Extend16S)?,
        0xC4 => t.unary(Instruction::I64Extend32S)?,

        0xFC => {
            let sub = read_u32(stream)?;
            match sub {
                0 => t.unary(Instruction::I32TruncSatF32S)?,
                1 => t.unary(Instruction::I32TruncSatF32U)?,
                2 => t.unary(Instruction::I32TruncSatF64S)?,
                3 => t.unary(Instruction::I32TruncSatF64U)?,
                4 => t.unary(Instruction::I64TruncSatF32S)?,
                5 => t.unary(Instruction::I64TruncSatF32U)?,
                6 => t.unary(Instruction::I64TruncSatF64S)?,
                7 => t.unary(Instruction::I64TruncSatF64U)?,
                other => return Err(ModuleError::UnsupportedOpcode(other as u8)),
            }
        }

        other => return Err(ModuleError::UnsupportedOpcode(other)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(params: Vec<ValueType>, results: Vec<ValueType>, locals: &[ValueType], code: &[u8]) -> Translated {
        let ty = FuncType::new(params, results);
        let types: Arena<TypeIdx, FuncType> = Arena::new();
        let func_types: Vec<TypeIdx> = Vec::new();
        translate_function(&ty, locals, code, &types, &func_types).unwrap()
    }

    #[test]
    fn constant_return_moves_into_result_slot() {
        // (func (result i32) i32.const 42)
        let code = [0x41, 42, 0x0B];
        let t = compile(vec![], vec![ValueType::I32], &[], &code);
        assert!(matches!(t.code[0], Instruction::Const { .. }));
        assert!(matches!(t.code.last(), Some(Instruction::Return)));
    }

    #[test]
    fn add_two_locals_pops_in_order() {
        // (func (param i32 i32) (result i32) local.get 0 local.get 1 i32.add)
        let code = [0x20, 0, 0x20, 1, 0x6A, 0x0B];
        let t = compile(vec![ValueType::I32, ValueType::I32], vec![ValueType::I32], &[], &code);
        let add = t.code.iter().find_map(|i| match i {
            Instruction::I32Add(b) => Some(*b),
            _ => None,
        });
        let add = add.expect("emits an I32Add");
        assert_eq!(add.lhs.to_i16(), FUNCTION_CALL_OFFSET);
        assert_eq!(add.rhs.to_i16(), FUNCTION_CALL_OFFSET + 1);
    }

    #[test]
    fn loop_branch_targets_its_own_head() {
        // (func (loop br 0))
        let code = [0x03, 0x40, 0x0C, 0x00, 0x0B, 0x0B];
        let t = compile(vec![], vec![], &[], &code);
        let jump = t.code.iter().find_map(|i| match i {
            Instruction::Jump { target } => Some(*target),
            _ => None,
        });
        assert_eq!(jump, Some(InstrIdx::new(0)));
    }

    #[test]
    fn if_without_else_falls_through_to_end() {
        // (func (param i32) (if (local.get 0) (then)))
        let code = [0x20, 0, 0x04, 0x40, 0x0B, 0x0B];
        let t = compile(vec![ValueType::I32], vec![], &[], &code);
        assert!(matches!(t.code[1], Instruction::JumpIfEqz { target, .. } if target == InstrIdx::new(2)));
    }

    #[test]
    fn unreachable_tail_does_not_underflow_result_slot() {
        // (func (result i32) unreachable)
        let code = [0x00, 0x0B];
        let t = compile(vec![], vec![ValueType::I32], &[], &code);
        assert!(matches!(t.code[0], Instruction::Unreachable));
        assert!(matches!(t.code.last(), Some(Instruction::Return)));
    }

    #[test]
    fn dead_code_after_unreachable_does_not_underflow() {
        // (func (drop (block (result i32) unreachable i32.add)))
        let code = [0x02, 0x7F, 0x00, 0x6A, 0x0B, 0x1A, 0x0B];
        let t = compile(vec![], vec![], &[], &code);
        assert!(matches!(t.code[0], Instruction::Unreachable));
        assert!(t.code.iter().any(|i| matches!(i, Instruction::I32Add(_))));
    }

    #[test]
    fn dead_code_after_unconditional_branch_does_not_underflow() {
        // (func (result i32) (block (result i32) (i32.const 5) (br 0) i32.add))
        let code = [0x02, 0x7F, 0x41, 5, 0x0C, 0x00, 0x6A, 0x0B, 0x0B];
        let t = compile(vec![], vec![ValueType::I32], &[], &code);
        assert!(t.code.iter().any(|i| matches!(i, Instruction::Jump { .. })));
        assert!(t.code.iter().any(|i| matches!(i, Instruction::I32Add(_))));
    }
}
