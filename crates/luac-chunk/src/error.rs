//! Chunk loading errors

use std::fmt;

use thiserror::Error;

/// Prologue field that failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    /// `"\x1bLua"` signature
    Signature,
    /// Version byte
    Version,
    /// Format byte
    Format,
    /// Six-byte platform marker (catches newline translation)
    PlatformData,
    /// Size of an instruction word
    InstructionSize,
    /// Size of an integer constant
    IntegerSize,
    /// Size of a float constant
    NumberSize,
    /// Sentinel integer (byte order)
    SentinelInteger,
    /// Sentinel float (float format)
    SentinelFloat,
}

impl HeaderField {
    /// Field name as used in error messages
    pub const fn name(self) -> &'static str {
        match self {
            Self::Signature => "signature",
            Self::Version => "version",
            Self::Format => "format",
            Self::PlatformData => "platform data",
            Self::InstructionSize => "instruction size",
            Self::IntegerSize => "integer size",
            Self::NumberSize => "number size",
            Self::SentinelInteger => "sentinel integer",
            Self::SentinelFloat => "sentinel float",
        }
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can occur while decoding a chunk or an instruction
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// Fewer bytes remain than a read requires
    #[error("Unexpected end of input at offset {offset}: need {needed} byte(s), {available} left")]
    UnexpectedEndOfInput {
        /// Cursor position of the failed read
        offset: usize,
        /// Bytes requested
        needed: usize,
        /// Bytes that were left
        available: usize,
    },

    /// Input ended inside a variable-length integer
    #[error("Malformed varint at offset {offset}: input ended before the final byte")]
    MalformedVarint {
        /// Offset of the first byte of the varint
        offset: usize,
    },

    /// Variable-length integer exceeds its limit
    #[error("Integer overflow at offset {offset}: value exceeds {limit}")]
    IntegerOverflow {
        /// Offset of the first byte of the varint
        offset: usize,
        /// Largest accepted value
        limit: u64,
    },

    /// Prologue field does not match the expected constant
    #[error("Header mismatch: bad {field}")]
    HeaderMismatch {
        /// Offending field
        field: HeaderField,
    },

    /// Constant tag outside the known set
    #[error("Unknown constant tag 0x{tag:02x}")]
    UnknownConstantTag {
        /// Tag byte as read
        tag: u8,
    },

    /// Declared main-function upvalue count disagrees with the decoded one
    #[error("Upvalue count mismatch: chunk declares {declared}, main function has {actual}")]
    UpvalueCountMismatch {
        /// Count stored before the main function
        declared: usize,
        /// Upvalues actually decoded
        actual: usize,
    },

    /// Opcode id outside the opcode table
    #[error("Unknown opcode: {0}")]
    UnknownOpcode(u8),

    /// Function prototypes nest deeper than the configured limit
    #[error("Function nesting exceeds {limit} levels")]
    NestingTooDeep {
        /// Configured maximum depth
        limit: usize,
    },

    /// IO error while reading the chunk
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for chunk operations
pub type Result<T> = std::result::Result<T, BytecodeError>;

/// A failed load, with the position in the chunk where it failed
#[derive(Debug, Error)]
#[error("{source} (while reading {field} at depth {depth}, byte {offset})")]
pub struct LoadError {
    /// Underlying error
    pub source: BytecodeError,
    /// Name of the field being decoded
    pub field: &'static str,
    /// Prototype nesting depth; 0 is the main function, header errors also report 0
    pub depth: usize,
    /// Reader position when the error was raised
    pub offset: usize,
}

impl LoadError {
    /// Attach decoding context to an error
    pub fn new(source: BytecodeError, field: &'static str, depth: usize, offset: usize) -> Self {
        Self {
            source,
            field,
            depth,
            offset,
        }
    }

    /// The underlying error kind
    #[inline]
    pub fn kind(&self) -> &BytecodeError {
        &self.source
    }

    /// Consume the context and keep the underlying error
    pub fn into_kind(self) -> BytecodeError {
        self.source
    }
}
