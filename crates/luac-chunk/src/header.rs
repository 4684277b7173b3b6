//! Chunk prologue validation

use crate::error::{BytecodeError, HeaderField, Result};
use crate::reader::ChunkReader;

/// Signature at the start of every chunk
pub const LUA_SIGNATURE: [u8; 4] = *b"\x1bLua";

/// Format version (5.4)
pub const LUAC_VERSION: u8 = 0x54;

/// Official format id
pub const LUAC_FORMAT: u8 = 0;

/// Bytes that detect text-mode newline conversion
pub const LUAC_DATA: [u8; 6] = *b"\x19\x93\r\n\x1a\n";

/// Size of an instruction word
pub const INSTRUCTION_SIZE: u8 = 4;

/// Size of an integer constant
pub const LUA_INTEGER_SIZE: u8 = 8;

/// Size of a float constant
pub const LUA_NUMBER_SIZE: u8 = 8;

/// Integer sentinel; reads back differently under the wrong byte order
pub const LUAC_INT: i64 = 0x5678;

/// Float sentinel; reads back differently under a foreign float format
pub const LUAC_NUM: f64 = 370.5;

/// Validate the prologue and leave the reader positioned after it
///
/// With `check_type_sizes` the three size bytes that follow the platform
/// marker are expected and checked as well.
pub fn check_header(r: &mut ChunkReader<'_>, check_type_sizes: bool) -> Result<()> {
    expect(r.read_array::<4>()? == LUA_SIGNATURE, HeaderField::Signature)?;
    expect(r.read_byte()? == LUAC_VERSION, HeaderField::Version)?;
    expect(r.read_byte()? == LUAC_FORMAT, HeaderField::Format)?;
    expect(r.read_array::<6>()? == LUAC_DATA, HeaderField::PlatformData)?;

    if check_type_sizes {
        expect(r.read_byte()? == INSTRUCTION_SIZE, HeaderField::InstructionSize)?;
        expect(r.read_byte()? == LUA_INTEGER_SIZE, HeaderField::IntegerSize)?;
        expect(r.read_byte()? == LUA_NUMBER_SIZE, HeaderField::NumberSize)?;
    }

    expect(r.read_i64()? == LUAC_INT, HeaderField::SentinelInteger)?;
    // Bit comparison: exact, and a NaN pattern can never pass
    expect(
        r.read_u64()? == LUAC_NUM.to_bits(),
        HeaderField::SentinelFloat,
    )
}

#[inline]
fn expect(ok: bool, field: HeaderField) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(BytecodeError::HeaderMismatch { field })
    }
}
