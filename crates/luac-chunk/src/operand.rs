//! Instruction operands

use serde::Serialize;

/// Virtual register (0-255)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(transparent)]
pub struct Register(pub u8);

impl Register {
    /// Create a new register
    #[inline]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Get register index
    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl From<u8> for Register {
    fn from(index: u8) -> Self {
        Self(index)
    }
}

/// Jump offset, relative to the instruction after the jump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(transparent)]
pub struct JumpOffset(pub i32);

impl JumpOffset {
    /// Create a new jump offset
    #[inline]
    pub const fn new(offset: i32) -> Self {
        Self(offset)
    }

    /// Get offset value
    #[inline]
    pub const fn offset(self) -> i32 {
        self.0
    }

    /// Destination of a jump located at `pc`, if it stays non-negative
    #[inline]
    pub fn target(self, pc: usize) -> Option<usize> {
        (pc as i64 + 1 + i64::from(self.0)).try_into().ok()
    }
}

/// Decoded operands of one instruction, shaped by its [`OpMode`](crate::OpMode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operands {
    /// iABC
    Abc {
        /// Register A
        a: Register,
        /// k flag
        k: bool,
        /// Argument B
        b: u8,
        /// Argument C
        c: u8,
    },
    /// iABx
    Abx {
        /// Register A
        a: Register,
        /// Unsigned 17-bit argument
        bx: u32,
    },
    /// iAsBx
    AsBx {
        /// Register A
        a: Register,
        /// Signed 17-bit argument
        sbx: i32,
    },
    /// iAx
    Ax {
        /// Unsigned 25-bit argument
        ax: u32,
    },
    /// isJ
    Sj {
        /// Signed 25-bit jump offset
        sj: JumpOffset,
    },
}

impl Operands {
    /// Register A, for modes that have one
    #[inline]
    pub fn a(&self) -> Option<Register> {
        match *self {
            Self::Abc { a, .. } | Self::Abx { a, .. } | Self::AsBx { a, .. } => Some(a),
            Self::Ax { .. } | Self::Sj { .. } => None,
        }
    }
}
