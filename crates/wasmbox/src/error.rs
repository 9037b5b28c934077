use crate::leb128::Leb128Error;
use crate::stream::ReadError;
use alloc::boxed::Box;
use core::fmt;

#[cfg(feature = "std")]
use std::error::Error as StdError;

/// An error encountered while parsing a Wasm binary's section structure or
/// decoding a function body into the register IR.
#[derive(Debug)]
pub enum ModuleError {
    /// The input stream ran out of bytes, or LEB128 decoding overflowed.
    Read(ReadError),
    Leb128(Leb128Error),
    /// The file does not start with the Wasm magic number and version.
    InvalidHeader,
    /// A section id this loader does not recognize (custom sections are
    /// skipped rather than erroring; this is for genuinely unknown ids).
    InvalidSectionId(u8),
    /// Sections appeared out of the order the binary format mandates.
    SectionOutOfOrder,
    /// An opcode byte (or, for the `0xFC` prefix, a sub-opcode) this loader
    /// does not implement.
    UnsupportedOpcode(u8),
    /// An index (type, function, table, memory, global, local) referenced a
    /// slot past the end of the relevant space.
    IndexOutOfBounds { what: &'static str, index: u32 },
    /// A function or block's implicit/explicit operand-stack height went
    /// negative, which validation should have prevented.
    StackUnderflow,
    /// Control-flow bookkeeping (block/loop/if nesting) was malformed.
    InvalidControlFlow { message: Box<str> },
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(e) => write!(f, "{e}"),
            Self::Leb128(e) => write!(f, "{e}"),
            Self::InvalidHeader => write!(f, "missing or invalid Wasm binary header"),
            Self::InvalidSectionId(id) => write!(f, "unrecognized section id {id}"),
            Self::SectionOutOfOrder => write!(f, "Wasm sections appeared out of order"),
            Self::UnsupportedOpcode(op) => write!(f, "unsupported opcode 0x{op:02X}"),
            Self::IndexOutOfBounds { what, index } => {
                write!(f, "{what} index {index} out of bounds")
            }
            Self::StackUnderflow => write!(f, "operand stack underflow during translation"),
            Self::InvalidControlFlow { message } => write!(f, "invalid control flow: {message}"),
        }
    }
}

impl From<ReadError> for ModuleError {
    fn from(e: ReadError) -> Self {
        Self::Read(e)
    }
}

impl From<Leb128Error> for ModuleError {
    fn from(e: Leb128Error) -> Self {
        Self::Leb128(e)
    }
}

#[cfg(feature = "std")]
impl StdError for ModuleError {}

/// The top-level error returned by this crate's entry points: parsing,
/// instantiation, and execution collapsed into a single type for embedders
/// that just want to know what went wrong.
#[derive(Debug)]
pub enum Error {
    /// Parsing or translating the binary failed.
    Module(ModuleError),
    /// Execution trapped.
    Trap(crate::Trap),
    /// The module does not export a function named `_start`.
    NoStartFunction,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(e) => write!(f, "{e}"),
            Self::Trap(e) => write!(f, "{e}"),
            Self::NoStartFunction => write!(f, "module does not export a function named `_start`"),
        }
    }
}

impl From<ModuleError> for Error {
    fn from(e: ModuleError) -> Self {
        Self::Module(e)
    }
}

impl From<crate::Trap> for Error {
    fn from(e: crate::Trap) -> Self {
        Self::Trap(e)
    }
}

#[cfg(feature = "std")]
impl StdError for Error {}
