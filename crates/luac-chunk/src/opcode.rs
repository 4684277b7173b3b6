//! Opcodes and their static metadata
//!
//! The table follows the Lua 5.4 opcode order: the numeric id of an opcode
//! is its index in [`OPCODES`].

use std::fmt;

use serde::Serialize;

use crate::error::{BytecodeError, Result};

/// Number of opcodes
pub const NUM_OPCODES: usize = 83;

/// Bit layout of an instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OpMode {
    /// `Op(7) A(8) k(1) B(8) C(8)`
    Abc,
    /// `Op(7) A(8) Bx(17)`
    Abx,
    /// `Op(7) A(8) sBx(17)`, excess-K signed
    AsBx,
    /// `Op(7) Ax(25)`
    Ax,
    /// `Op(7) sJ(25)`, excess-K signed
    Sj,
}

impl OpMode {
    /// Conventional mode name (`iABC`, ...)
    pub const fn name(self) -> &'static str {
        match self {
            Self::Abc => "iABC",
            Self::Abx => "iABx",
            Self::AsBx => "iAsBx",
            Self::Ax => "iAx",
            Self::Sj => "isJ",
        }
    }
}

impl fmt::Display for OpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static description of one opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpcodeDescriptor {
    /// Mnemonic
    pub name: &'static str,
    /// Operand layout
    pub mode: OpMode,
    /// Writes register A
    pub sets_a: bool,
    /// Test: the next instruction must be a jump
    pub is_test: bool,
    /// Uses the open top left by the previous instruction (when B == 0)
    pub uses_top: bool,
    /// Leaves an open top for the next instruction (when C == 0)
    pub sets_top: bool,
    /// Calls a metamethod
    pub is_metamethod: bool,
}

// Argument order follows Lua's `opmode(mm, ot, it, t, a, mode)` macro
const fn op(
    name: &'static str,
    mm: bool,
    ot: bool,
    it: bool,
    t: bool,
    a: bool,
    mode: OpMode,
) -> OpcodeDescriptor {
    OpcodeDescriptor {
        name,
        mode,
        sets_a: a,
        is_test: t,
        uses_top: it,
        sets_top: ot,
        is_metamethod: mm,
    }
}

const F: bool = false;
const T: bool = true;

use OpMode::{Abc, Abx, AsBx, Ax, Sj};

/// Opcode metadata, indexed by opcode id
#[rustfmt::skip]
pub static OPCODES: [OpcodeDescriptor; NUM_OPCODES] = [
    //  name           mm ot it t  a  mode
    op("MOVE",         F, F, F, F, T, Abc),
    op("LOADI",        F, F, F, F, T, AsBx),
    op("LOADF",        F, F, F, F, T, AsBx),
    op("LOADK",        F, F, F, F, T, Abx),
    op("LOADKX",       F, F, F, F, T, Abx),
    op("LOADFALSE",    F, F, F, F, T, Abc),
    op("LFALSESKIP",   F, F, F, F, T, Abc),
    op("LOADTRUE",     F, F, F, F, T, Abc),
    op("LOADNIL",      F, F, F, F, T, Abc),
    op("GETUPVAL",     F, F, F, F, T, Abc),
    op("SETUPVAL",     F, F, F, F, F, Abc),
    op("GETTABUP",     F, F, F, F, T, Abc),
    op("GETTABLE",     F, F, F, F, T, Abc),
    op("GETI",         F, F, F, F, T, Abc),
    op("GETFIELD",     F, F, F, F, T, Abc),
    op("SETTABUP",     F, F, F, F, F, Abc),
    op("SETTABLE",     F, F, F, F, F, Abc),
    op("SETI",         F, F, F, F, F, Abc),
    op("SETFIELD",     F, F, F, F, F, Abc),
    op("NEWTABLE",     F, F, F, F, T, Abc),
    op("SELF",         F, F, F, F, T, Abc),
    op("ADDI",         F, F, F, F, T, Abc),
    op("ADDK",         F, F, F, F, T, Abc),
    op("SUBK",         F, F, F, F, T, Abc),
    op("MULK",         F, F, F, F, T, Abc),
    op("MODK",         F, F, F, F, T, Abc),
    op("POWK",         F, F, F, F, T, Abc),
    op("DIVK",         F, F, F, F, T, Abc),
    op("IDIVK",        F, F, F, F, T, Abc),
    op("BANDK",        F, F, F, F, T, Abc),
    op("BORK",         F, F, F, F, T, Abc),
    op("BXORK",        F, F, F, F, T, Abc),
    op("SHRI",         F, F, F, F, T, Abc),
    op("SHLI",         F, F, F, F, T, Abc),
    op("ADD",          F, F, F, F, T, Abc),
    op("SUB",          F, F, F, F, T, Abc),
    op("MUL",          F, F, F, F, T, Abc),
    op("MOD",          F, F, F, F, T, Abc),
    op("POW",          F, F, F, F, T, Abc),
    op("DIV",          F, F, F, F, T, Abc),
    op("IDIV",         F, F, F, F, T, Abc),
    op("BAND",         F, F, F, F, T, Abc),
    op("BOR",          F, F, F, F, T, Abc),
    op("BXOR",         F, F, F, F, T, Abc),
    op("SHL",          F, F, F, F, T, Abc),
    op("SHR",          F, F, F, F, T, Abc),
    op("MMBIN",        T, F, F, F, F, Abc),
    op("MMBINI",       T, F, F, F, F, Abc),
    op("MMBINK",       T, F, F, F, F, Abc),
    op("UNM",          F, F, F, F, T, Abc),
    op("BNOT",         F, F, F, F, T, Abc),
    op("NOT",          F, F, F, F, T, Abc),
    op("LEN",          F, F, F, F, T, Abc),
    op("CONCAT",       F, F, F, F, T, Abc),
    op("CLOSE",        F, F, F, F, F, Abc),
    op("TBC",          F, F, F, F, F, Abc),
    op("JMP",          F, F, F, F, F, Sj),
    op("EQ",           F, F, F, T, F, Abc),
    op("LT",           F, F, F, T, F, Abc),
    op("LE",           F, F, F, T, F, Abc),
    op("EQK",          F, F, F, T, F, Abc),
    op("EQI",          F, F, F, T, F, Abc),
    op("LTI",          F, F, F, T, F, Abc),
    op("LEI",          F, F, F, T, F, Abc),
    op("GTI",          F, F, F, T, F, Abc),
    op("GEI",          F, F, F, T, F, Abc),
    op("TEST",         F, F, F, T, F, Abc),
    op("TESTSET",      F, F, F, T, T, Abc),
    op("CALL",         F, T, T, F, T, Abc),
    op("TAILCALL",     F, T, T, F, T, Abc),
    op("RETURN",       F, F, T, F, F, Abc),
    op("RETURN0",      F, F, F, F, F, Abc),
    op("RETURN1",      F, F, F, F, F, Abc),
    op("FORLOOP",      F, F, F, F, T, Abx),
    op("FORPREP",      F, F, F, F, T, Abx),
    op("TFORPREP",     F, F, F, F, F, Abx),
    op("TFORCALL",     F, F, F, F, F, Abc),
    op("TFORLOOP",     F, F, F, F, T, Abx),
    op("SETLIST",      F, F, T, F, F, Abc),
    op("CLOSURE",      F, F, F, F, T, Abx),
    op("VARARG",       F, T, F, F, T, Abc),
    op("VARARGPREP",   F, F, T, F, T, Abc),
    op("EXTRAARG",     F, F, F, F, F, Ax),
];

/// Look up the descriptor of an opcode id
#[inline]
pub fn descriptor(id: u8) -> Result<&'static OpcodeDescriptor> {
    OPCODES
        .get(usize::from(id))
        .ok_or(BytecodeError::UnknownOpcode(id))
}

/// Lua 5.4 opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Loads ====================
    /// `R[A] := R[B]`
    Move = 0,
    /// `R[A] := sBx`
    LoadI,
    /// `R[A] := (float)sBx`
    LoadF,
    /// `R[A] := K[Bx]`
    LoadK,
    /// `R[A] := K[extra arg]`
    LoadKX,
    /// `R[A] := false`
    LoadFalse,
    /// `R[A] := false; pc++`
    LFalseSkip,
    /// `R[A] := true`
    LoadTrue,
    /// `R[A], ..., R[A+B] := nil`
    LoadNil,

    // ==================== Upvalues and tables ====================
    /// `R[A] := UpValue[B]`
    GetUpval,
    /// `UpValue[B] := R[A]`
    SetUpval,
    /// `R[A] := UpValue[B][K[C]:string]`
    GetTabUp,
    /// `R[A] := R[B][R[C]]`
    GetTable,
    /// `R[A] := R[B][C]`
    GetI,
    /// `R[A] := R[B][K[C]:string]`
    GetField,
    /// `UpValue[A][K[B]:string] := RK(C)`
    SetTabUp,
    /// `R[A][R[B]] := RK(C)`
    SetTable,
    /// `R[A][B] := RK(C)`
    SetI,
    /// `R[A][K[B]:string] := RK(C)`
    SetField,
    /// `R[A] := {}`
    NewTable,
    /// `R[A+1] := R[B]; R[A] := R[B][RK(C):string]`
    Self_,

    // ==================== Arithmetic with immediates/constants ====================
    /// `R[A] := R[B] + sC`
    AddI,
    /// `R[A] := R[B] + K[C]:number`
    AddK,
    /// `R[A] := R[B] - K[C]:number`
    SubK,
    /// `R[A] := R[B] * K[C]:number`
    MulK,
    /// `R[A] := R[B] % K[C]:number`
    ModK,
    /// `R[A] := R[B] ^ K[C]:number`
    PowK,
    /// `R[A] := R[B] / K[C]:number`
    DivK,
    /// `R[A] := R[B] // K[C]:number`
    IDivK,
    /// `R[A] := R[B] & K[C]:integer`
    BAndK,
    /// `R[A] := R[B] | K[C]:integer`
    BOrK,
    /// `R[A] := R[B] ~ K[C]:integer`
    BXorK,
    /// `R[A] := R[B] >> sC`
    ShrI,
    /// `R[A] := sC << R[B]`
    ShlI,

    // ==================== Arithmetic ====================
    /// `R[A] := R[B] + R[C]`
    Add,
    /// `R[A] := R[B] - R[C]`
    Sub,
    /// `R[A] := R[B] * R[C]`
    Mul,
    /// `R[A] := R[B] % R[C]`
    Mod,
    /// `R[A] := R[B] ^ R[C]`
    Pow,
    /// `R[A] := R[B] / R[C]`
    Div,
    /// `R[A] := R[B] // R[C]`
    IDiv,
    /// `R[A] := R[B] & R[C]`
    BAnd,
    /// `R[A] := R[B] | R[C]`
    BOr,
    /// `R[A] := R[B] ~ R[C]`
    BXor,
    /// `R[A] := R[B] << R[C]`
    Shl,
    /// `R[A] := R[B] >> R[C]`
    Shr,

    // ==================== Metamethod fallbacks ====================
    /// Call C metamethod over `R[A]` and `R[B]`
    MMBin,
    /// Call C metamethod over `R[A]` and `sB`
    MMBinI,
    /// Call C metamethod over `R[A]` and `K[B]`
    MMBinK,

    // ==================== Unary ====================
    /// `R[A] := -R[B]`
    Unm,
    /// `R[A] := ~R[B]`
    BNot,
    /// `R[A] := not R[B]`
    Not,
    /// `R[A] := #R[B]`
    Len,
    /// `R[A] := R[A].. ... ..R[A + B - 1]`
    Concat,

    // ==================== Control flow ====================
    /// Close all upvalues `>= R[A]`
    Close,
    /// Mark variable A "to be closed"
    Tbc,
    /// `pc += sJ`
    Jmp,
    /// `if ((R[A] == R[B]) ~= k) then pc++`
    Eq,
    /// `if ((R[A] < R[B]) ~= k) then pc++`
    Lt,
    /// `if ((R[A] <= R[B]) ~= k) then pc++`
    Le,
    /// `if ((R[A] == K[B]) ~= k) then pc++`
    EqK,
    /// `if ((R[A] == sB) ~= k) then pc++`
    EqI,
    /// `if ((R[A] < sB) ~= k) then pc++`
    LtI,
    /// `if ((R[A] <= sB) ~= k) then pc++`
    LeI,
    /// `if ((R[A] > sB) ~= k) then pc++`
    GtI,
    /// `if ((R[A] >= sB) ~= k) then pc++`
    GeI,
    /// `if (not R[A] == k) then pc++`
    Test,
    /// `if (not R[B] == k) then pc++ else R[A] := R[B]`
    TestSet,

    // ==================== Calls ====================
    /// `R[A], ..., R[A+C-2] := R[A](R[A+1], ..., R[A+B-1])`
    Call,
    /// `return R[A](R[A+1], ..., R[A+B-1])`
    TailCall,
    /// `return R[A], ..., R[A+B-2]`
    Return,
    /// `return`
    Return0,
    /// `return R[A]`
    Return1,

    // ==================== Loops ====================
    /// Update counters; if loop continues then `pc -= Bx`
    ForLoop,
    /// Check values and prepare counters; if not to run then `pc += Bx + 1`
    ForPrep,
    /// Create upvalue for `R[A + 3]`; `pc += Bx`
    TForPrep,
    /// `R[A+4], ..., R[A+3+C] := R[A](R[A+1], R[A+2])`
    TForCall,
    /// `if R[A+2] ~= nil then { R[A] = R[A+2]; pc -= Bx }`
    TForLoop,

    // ==================== Misc ====================
    /// `R[A][C+i] := R[A+i], 1 <= i <= B`
    SetList,
    /// `R[A] := closure(KPROTO[Bx])`
    Closure,
    /// `R[A], ..., R[A+C-2] = vararg`
    VarArg,
    /// Adjust vararg parameters
    VarArgPrep,
    /// Extra (larger) argument for the previous opcode
    ExtraArg,
}

impl Opcode {
    /// Every opcode, in id order
    #[rustfmt::skip]
    pub const ALL: [Opcode; NUM_OPCODES] = [
        Self::Move, Self::LoadI, Self::LoadF, Self::LoadK, Self::LoadKX, Self::LoadFalse,
        Self::LFalseSkip, Self::LoadTrue, Self::LoadNil, Self::GetUpval, Self::SetUpval,
        Self::GetTabUp, Self::GetTable, Self::GetI, Self::GetField, Self::SetTabUp,
        Self::SetTable, Self::SetI, Self::SetField, Self::NewTable, Self::Self_, Self::AddI,
        Self::AddK, Self::SubK, Self::MulK, Self::ModK, Self::PowK, Self::DivK, Self::IDivK,
        Self::BAndK, Self::BOrK, Self::BXorK, Self::ShrI, Self::ShlI, Self::Add, Self::Sub,
        Self::Mul, Self::Mod, Self::Pow, Self::Div, Self::IDiv, Self::BAnd, Self::BOr,
        Self::BXor, Self::Shl, Self::Shr, Self::MMBin, Self::MMBinI, Self::MMBinK, Self::Unm,
        Self::BNot, Self::Not, Self::Len, Self::Concat, Self::Close, Self::Tbc, Self::Jmp,
        Self::Eq, Self::Lt, Self::Le, Self::EqK, Self::EqI, Self::LtI, Self::LeI, Self::GtI,
        Self::GeI, Self::Test, Self::TestSet, Self::Call, Self::TailCall, Self::Return,
        Self::Return0, Self::Return1, Self::ForLoop, Self::ForPrep, Self::TForPrep,
        Self::TForCall, Self::TForLoop, Self::SetList, Self::Closure, Self::VarArg,
        Self::VarArgPrep, Self::ExtraArg,
    ];

    /// Convert from raw opcode id
    #[inline]
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.get(usize::from(byte)).copied()
    }

    /// Convert to raw opcode id
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Static metadata
    #[inline]
    pub fn descriptor(self) -> &'static OpcodeDescriptor {
        &OPCODES[self as usize]
    }

    /// Mnemonic, e.g. `"GETTABUP"`
    #[inline]
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Operand layout
    #[inline]
    pub fn mode(self) -> OpMode {
        self.descriptor().mode
    }
}

impl TryFrom<u8> for Opcode {
    type Error = BytecodeError;

    fn try_from(byte: u8) -> Result<Self> {
        Self::from_byte(byte).ok_or(BytecodeError::UnknownOpcode(byte))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
