//! # Lua 5.4 binary chunk loader
//!
//! Decodes precompiled chunks (the output of `luac`) into an owned tree of
//! function prototypes, and decodes the 32-bit instruction words inside them.
//!
//! ## Layout
//!
//! - **Prologue**: signature, version, format, platform bytes and the
//!   integer/float sentinels that pin down endianness
//! - **Prototypes**: each function stores its code, constants, upvalues,
//!   nested functions and debug tables, in that order
//! - **Instructions**: 7-bit opcode plus one of five operand layouts
//!
//! Loading is a single forward pass over a byte slice and either yields the
//! whole tree or an error naming where decoding stopped.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constant;
pub mod error;
pub mod header;
pub mod instruction;
pub mod listing;
pub mod opcode;
pub mod operand;
pub mod proto;
pub mod reader;
pub mod undump;
pub mod varint;

pub use constant::{Constant, LuaString};
pub use error::{BytecodeError, HeaderField, LoadError, Result};
pub use instruction::{Instruction, decode_with};
pub use listing::ListingOptions;
pub use opcode::{NUM_OPCODES, OPCODES, OpMode, Opcode, OpcodeDescriptor};
pub use operand::{JumpOffset, Operands, Register};
pub use proto::{AbsLineInfo, LocVar, Prototype, UpvalueDesc};
pub use reader::ChunkReader;
pub use undump::{LoaderConfig, read_from, undump, undump_with};
