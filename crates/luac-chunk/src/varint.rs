//! Variable-length unsigned integers
//!
//! Groups of 7 bits, most significant group first. The byte with the high
//! bit **set** is the last one, the reverse of LEB128.
//!
//! ```text
//! 300 = 0b10_0101100  ->  0x02 0xAC
//! ```

use crate::error::{BytecodeError, Result};
use crate::reader::ChunkReader;

impl ChunkReader<'_> {
    /// Read a varint no greater than `limit`
    ///
    /// Fails with [`BytecodeError::MalformedVarint`] when the input ends
    /// before the final byte and with [`BytecodeError::IntegerOverflow`] as
    /// soon as the value would exceed `limit`.
    pub fn read_unsigned(&mut self, limit: u64) -> Result<u64> {
        let start = self.offset();
        let overflow = BytecodeError::IntegerOverflow {
            offset: start,
            limit,
        };
        let mut acc: u64 = 0;
        loop {
            let b = self
                .read_byte()
                .map_err(|_| BytecodeError::MalformedVarint { offset: start })?;
            if acc > limit >> 7 {
                return Err(overflow);
            }
            acc = (acc << 7) | u64::from(b & 0x7F);
            if acc > limit {
                return Err(overflow);
            }
            if b & 0x80 != 0 {
                return Ok(acc);
            }
        }
    }

    /// Read an element count or string size
    #[inline]
    pub fn read_count(&mut self) -> Result<usize> {
        // usize -> u64 is lossless on every supported target
        self.read_unsigned(usize::MAX as u64).map(|n| n as usize)
    }

    /// Read a line number or program counter from the debug tables
    #[inline]
    pub fn read_line(&mut self) -> Result<u32> {
        self.read_unsigned(u64::from(u32::MAX)).map(|n| n as u32)
    }
}
