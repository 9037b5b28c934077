use core::fmt;

#[cfg(feature = "std")]
use std::error::Error as StdError;

/// The reason a [`Trap`] was raised.
///
/// Every variant here is a non-recoverable runtime violation that
/// immediately unwinds the interpreter loop.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrapCode {
    /// Wasm code executed the `unreachable` opcode.
    UnreachableCodeReached,
    /// A load or store addressed memory outside of the linear memory's bounds.
    MemoryOutOfBounds,
    /// A `call_indirect` indexed a table slot outside of the table's bounds.
    TableOutOfBounds,
    /// A `call_indirect` dispatched through a `null` (unpopulated) table slot.
    IndirectCallToNull,
    /// A `call_indirect` dispatched to a function whose type does not match
    /// the call site's declared type.
    IndirectCallTypeMismatch,
    /// Attempted integer division or remainder by zero.
    IntegerDivisionByZero,
    /// Signed division overflowed (`INT_MIN / -1`).
    IntegerOverflow,
    /// Attempted to truncate a `NaN`, infinite, or out-of-range float to an integer.
    BadConversionToInteger,
    /// The caller-provided value stack slab was exhausted.
    StackOverflow,
    /// A `call`/`call_indirect` targeted a function that was only ever
    /// declared as an import: imports are parsed but never bound to a live
    /// host, so reaching one at runtime is rejected here rather than at
    /// load time.
    UnresolvedImport,
}

impl TrapCode {
    /// A short, human-readable description of the trap, used in diagnostics.
    pub fn message(self) -> &'static str {
        match self {
            Self::UnreachableCodeReached => "unreachable instruction executed",
            Self::MemoryOutOfBounds => "out of bounds memory access",
            Self::TableOutOfBounds => "out of bounds table access",
            Self::IndirectCallToNull => "indirect call to a null table entry",
            Self::IndirectCallTypeMismatch => "indirect call type mismatch",
            Self::IntegerDivisionByZero => "integer division by zero",
            Self::IntegerOverflow => "integer overflow",
            Self::BadConversionToInteger => "invalid conversion to integer",
            Self::StackOverflow => "value stack overflow",
            Self::UnresolvedImport => "call to an unresolved imported function",
        }
    }
}

impl fmt::Display for TrapCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(feature = "std")]
impl StdError for TrapCode {}

/// A non-recoverable runtime error raised by the interpreter.
///
/// Traps cannot be handled by the executing Wasm code; they are surfaced to
/// whoever called [`crate`]'s evaluation entry points.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Trap {
    code: TrapCode,
}

impl Trap {
    pub fn new(code: TrapCode) -> Self {
        Self { code }
    }

    pub fn code(self) -> TrapCode {
        self.code
    }
}

impl From<TrapCode> for Trap {
    fn from(code: TrapCode) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.code, f)
    }
}

#[cfg(feature = "std")]
impl StdError for Trap {}
