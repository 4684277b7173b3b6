//! Instruction word decoding
//!
//! ```text
//!        3 3 2 2 2 2 2 2 2 2 2 2 1 1 1 1 1 1 1 1 1 1 0 0 0 0 0 0 0 0 0 0
//!        1 0 9 8 7 6 5 4 3 2 1 0 9 8 7 6 5 4 3 2 1 0 9 8 7 6 5 4 3 2 1 0
//! iABC          C(8)     |      B(8)     |k|     A(8)      |   Op(7)     |
//! iABx                Bx(17)               |     A(8)      |   Op(7)     |
//! iAsBx              sBx (signed)(17)      |     A(8)      |   Op(7)     |
//! iAx                           Ax(25)                     |   Op(7)     |
//! isJ                           sJ(25)                     |   Op(7)     |
//! ```
//!
//! Signed arguments are stored in excess-K: the value is the unsigned field
//! minus half the field's maximum.

use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::opcode::{self, OpMode, Opcode, OpcodeDescriptor};
use crate::operand::{JumpOffset, Operands, Register};

const SIZE_OP: u32 = 7;
const SIZE_A: u32 = 8;
const SIZE_B: u32 = 8;
const SIZE_C: u32 = 8;
const SIZE_BX: u32 = SIZE_C + SIZE_B + 1;
const SIZE_AX: u32 = SIZE_BX + SIZE_A;
const SIZE_SJ: u32 = SIZE_BX + SIZE_A;

const POS_A: u32 = SIZE_OP;
const POS_K: u32 = POS_A + SIZE_A;
const POS_B: u32 = POS_K + 1;
const POS_C: u32 = POS_B + SIZE_B;
const POS_BX: u32 = POS_K;
const POS_AX: u32 = POS_A;
const POS_SJ: u32 = POS_A;

const fn mask(bits: u32) -> u32 {
    (1 << bits) - 1
}

/// Largest unsigned Bx
pub const MAXARG_BX: u32 = mask(SIZE_BX);
/// Largest unsigned Ax
pub const MAXARG_AX: u32 = mask(SIZE_AX);
/// Largest raw sJ
pub const MAXARG_SJ: u32 = mask(SIZE_SJ);
/// Largest unsigned C
pub const MAXARG_C: u32 = mask(SIZE_C);

/// Bias of sBx
pub const OFFSET_SBX: i32 = (MAXARG_BX >> 1) as i32;
/// Bias of sJ
pub const OFFSET_SJ: i32 = (MAXARG_SJ >> 1) as i32;
/// Bias of the signed B/C immediates (`sB`, `sC`)
pub const OFFSET_SC: i32 = (MAXARG_C >> 1) as i32;

/// A packed 32-bit instruction word
///
/// A plain view over the word: every accessor is bit extraction, nothing
/// allocates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(transparent)]
pub struct Instruction(pub u32);

impl Instruction {
    /// Raw opcode id (low 7 bits)
    #[inline]
    pub const fn opcode_id(self) -> u8 {
        (self.0 & mask(SIZE_OP)) as u8
    }

    /// Opcode, if the id is in the table
    #[inline]
    pub fn opcode(self) -> Result<Opcode> {
        Opcode::try_from(self.opcode_id())
    }

    /// Static metadata of this instruction's opcode
    #[inline]
    pub fn descriptor(self) -> Result<&'static OpcodeDescriptor> {
        opcode::descriptor(self.opcode_id())
    }

    /// Register A
    #[inline]
    pub const fn a(self) -> u8 {
        (self.0 >> POS_A) as u8
    }

    /// k flag
    #[inline]
    pub const fn k(self) -> bool {
        (self.0 >> POS_K) & 1 != 0
    }

    /// Argument B
    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 >> POS_B) as u8
    }

    /// Argument C
    #[inline]
    pub const fn c(self) -> u8 {
        (self.0 >> POS_C) as u8
    }

    /// B read as a signed immediate
    #[inline]
    pub const fn sb(self) -> i32 {
        self.b() as i32 - OFFSET_SC
    }

    /// C read as a signed immediate
    #[inline]
    pub const fn sc(self) -> i32 {
        self.c() as i32 - OFFSET_SC
    }

    /// Unsigned Bx
    #[inline]
    pub const fn bx(self) -> u32 {
        self.0 >> POS_BX
    }

    /// Signed Bx
    #[inline]
    pub const fn sbx(self) -> i32 {
        self.bx() as i32 - OFFSET_SBX
    }

    /// Unsigned Ax
    #[inline]
    pub const fn ax(self) -> u32 {
        self.0 >> POS_AX
    }

    /// Signed jump offset
    #[inline]
    pub const fn sj(self) -> i32 {
        (self.0 >> POS_SJ) as i32 - OFFSET_SJ
    }

    /// Decode the operands according to this word's opcode
    ///
    /// Fails only for opcode ids outside the table.
    #[inline]
    pub fn decode(self) -> Result<Operands> {
        decode_with(self.0, self.opcode_id())
    }

    /// Decode the operands for a known layout
    #[inline]
    pub const fn operands(self, mode: OpMode) -> Operands {
        match mode {
            OpMode::Abc => Operands::Abc {
                a: Register(self.a()),
                k: self.k(),
                b: self.b(),
                c: self.c(),
            },
            OpMode::Abx => Operands::Abx {
                a: Register(self.a()),
                bx: self.bx(),
            },
            OpMode::AsBx => Operands::AsBx {
                a: Register(self.a()),
                sbx: self.sbx(),
            },
            OpMode::Ax => Operands::Ax { ax: self.ax() },
            OpMode::Sj => Operands::Sj {
                sj: JumpOffset(self.sj()),
            },
        }
    }
}

/// Decode `word` using the layout of `opcode_id`
///
/// The id is taken as given, which lets an engine that already dispatched on
/// the opcode skip the lookup of the low bits.
#[inline]
pub fn decode_with(word: u32, opcode_id: u8) -> Result<Operands> {
    let mode = opcode::descriptor(opcode_id)?.mode;
    Ok(Instruction(word).operands(mode))
}

impl From<u32> for Instruction {
    fn from(word: u32) -> Self {
        Self(word)
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode() {
            Ok(op) => write!(f, "Instruction({} {:?})", op.name(), self.operands(op.mode())),
            Err(_) => write!(f, "Instruction(0x{:08x})", self.0),
        }
    }
}

/// Listing form: mnemonic and operands, e.g. `ADDI 0 1 -3`
///
/// iABC operands show `k` as a trailing `k`; opcodes with signed immediates
/// show them signed.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(op) = self.opcode() else {
            return write!(f, "?? 0x{:08x}", self.0);
        };
        write!(f, "{:<12}", op.name())?;
        match self.operands(op.mode()) {
            Operands::Abc { a, k, b, c } => {
                let (b, c) = match op {
                    Opcode::AddI | Opcode::ShrI | Opcode::ShlI => (i32::from(b), self.sc()),
                    Opcode::EqI | Opcode::LtI | Opcode::LeI | Opcode::GtI | Opcode::GeI => {
                        (self.sb(), i32::from(c))
                    }
                    Opcode::MMBinI => (self.sb(), i32::from(c)),
                    _ => (i32::from(b), i32::from(c)),
                };
                write!(f, "{} {} {}", a.index(), b, c)?;
                if k {
                    f.write_str("k")?;
                }
                Ok(())
            }
            Operands::Abx { a, bx } => write!(f, "{} {}", a.index(), bx),
            Operands::AsBx { a, sbx } => write!(f, "{} {}", a.index(), sbx),
            Operands::Ax { ax } => write!(f, "{ax}"),
            Operands::Sj { sj } => write!(f, "{}", sj.offset()),
        }
    }
}
