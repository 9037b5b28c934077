use alloc::vec::Vec;
use wasmbox_ir::{InstrIdx, Register};

/// Which end of a basic block a label resolves to.
///
/// A `loop`'s label is its own head: branching to it re-enters the loop body.
/// A `block`'s or `if`'s label is its tail: branching to it jumps past the
/// matching `end`, which is only known once that `end` is actually reached.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Head(InstrIdx),
    Tail,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameKind {
    Block,
    Loop,
    If { else_fixup: Option<usize> },
}

/// Tracks one nested `block`/`loop`/`if` while translating a function body.
#[derive(Debug)]
pub struct ControlFrame {
    pub kind: FrameKind,
    pub direction: Direction,
    /// The value-stack height (translator's `stack.len()`) when this frame
    /// was entered; branches targeting this frame must not look deeper than
    /// this, and `end`/fallthrough restores the stack to this height plus
    /// the frame's result arity.
    pub stack_height: usize,
    /// `true` if this block yields a value (MVP blocktype is empty or a
    /// single value type; multi-value result types are out of scope).
    pub has_result: bool,
    /// The register every branch to this frame's label must leave its
    /// result in, allocated when the frame is entered. Unused if
    /// `has_result` is `false`.
    pub result_register: Register,
    /// Positions in the function's instruction buffer holding a `Jump`-class
    /// instruction whose target still needs to be patched to this frame's
    /// tail position once `end` is reached.
    pub pending_fixups: Vec<usize>,
    /// `(instruction position, slot index)` pairs identifying a `JumpTable`
    /// entry that targets this frame's tail position, patched the same way
    /// as `pending_fixups` but addressing one slot of a table instead of a
    /// whole instruction.
    pub table_fixups: Vec<(usize, usize)>,
    /// `true` once the code at the current translation position is only
    /// reachable through a dead fallthrough — an `unreachable`/unconditional
    /// `br`/`br_table`/`return` was seen since the last `else`/frame entry.
    /// While set, [`FuncTranslator::pop`]/[`FuncTranslator::peek`] tolerate
    /// an empty operand stack instead of reporting underflow, since the
    /// operand stack is polymorphic in dead code. Translation of a closed
    /// block still needs to pop the frame normally at `end`.
    pub unreachable: bool,
    /// The ambient unreachable state inherited when this frame was pushed.
    /// `else` resets `unreachable` back to this rather than to `false`, so a
    /// `then`-branch going dead doesn't make the sibling `else`-branch look
    /// reachable again, and an `if` entered inside already-dead code keeps
    /// both its branches dead.
    pub entry_unreachable: bool,
}

impl ControlFrame {
    pub fn new(
        kind: FrameKind,
        direction: Direction,
        stack_height: usize,
        has_result: bool,
        result_register: Register,
        entry_unreachable: bool,
    ) -> Self {
        Self {
            kind,
            direction,
            stack_height,
            has_result,
            result_register,
            pending_fixups: Vec::new(),
            table_fixups: Vec::new(),
            unreachable: entry_unreachable,
            entry_unreachable,
        }
    }

    pub fn label_direction(&self) -> Direction {
        self.direction
    }
}
