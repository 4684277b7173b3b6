//! Constant table entries

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{BytecodeError, Result};
use crate::reader::ChunkReader;

/// Tag of a `nil` constant
pub const TAG_NIL: u8 = 0x00;
/// Tag of a boolean constant (one payload byte)
pub const TAG_BOOLEAN: u8 = 0x01;
/// Tag of a float constant
pub const TAG_FLOAT: u8 = 0x03;
/// Tag of an integer constant
pub const TAG_INTEGER: u8 = 0x13;
/// Tag of a short string constant
pub const TAG_SHORT_STRING: u8 = 0x04;
/// Tag of a long string constant
pub const TAG_LONG_STRING: u8 = 0x14;

/// Byte string as stored in a chunk
///
/// Lua strings are arbitrary bytes, so no encoding is assumed.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct LuaString(Box<[u8]>);

impl LuaString {
    /// Raw bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the string is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// View as UTF-8, replacing invalid sequences
    pub fn to_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<&[u8]> for LuaString {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl From<&str> for LuaString {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().into())
    }
}

impl fmt::Debug for LuaString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_str_lossy())
    }
}

impl fmt::Display for LuaString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str_lossy())
    }
}

impl Serialize for LuaString {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_str_lossy())
    }
}

/// A constant value in a function's constant table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Constant {
    /// `nil`
    Nil,
    /// `true` / `false`
    Boolean(bool),
    /// 64-bit float
    Float(f64),
    /// 64-bit integer
    Integer(i64),
    /// Byte string (short and long strings alike)
    String(LuaString),
}

impl Constant {
    /// Check if this is a number (integer or float)
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }

    /// Check if this is a string
    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Get as integer if this is an integer constant
    #[inline]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float if this is a float constant
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string if this is a string constant
    #[inline]
    pub fn as_string(&self) -> Option<&LuaString> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Renders the way a listing shows constants: strings quoted and escaped
impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(n) => f.write_str(&format_float(*n)),
            Self::String(s) => write_quoted(f, s.as_bytes()),
        }
    }
}

/// Significant digits Lua prints for a float (`%.14g`)
const FLOAT_DIGITS: i32 = 14;

/// `%.14g` with `.0` appended when the result would read as an integer
fn format_float(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    let mut out = format_g(n);
    if out.bytes().all(|b| b == b'-' || b.is_ascii_digit()) {
        out.push_str(".0");
    }
    out
}

fn format_g(n: f64) -> String {
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    // The exponent after rounding to FLOAT_DIGITS picks the notation
    let sci = format!("{:.*e}", (FLOAT_DIGITS - 1) as usize, n);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };
    if exp < -4 || exp >= FLOAT_DIGITS {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    } else {
        let fixed = format!("{:.*}", (FLOAT_DIGITS - 1 - exp) as usize, n);
        trim_fraction(&fixed).to_string()
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("\"")?;
    for chunk in bytes.utf8_chunks() {
        for c in chunk.valid().chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '\t' => f.write_str("\\t")?,
                c if c.is_control() => write!(f, "\\{}", c as u32)?,
                c => write!(f, "{c}")?,
            }
        }
        for b in chunk.invalid() {
            write!(f, "\\{b}")?;
        }
    }
    f.write_str("\"")
}

impl ChunkReader<'_> {
    /// Read a size-prefixed string
    ///
    /// Size 0 is the empty-string sentinel and has no payload; otherwise
    /// `size - 1` bytes follow.
    pub fn read_string(&mut self) -> Result<LuaString> {
        match self.read_count()? {
            0 => Ok(LuaString::default()),
            size => self.read_bytes(size - 1).map(LuaString::from),
        }
    }

    /// Read one tagged constant
    pub fn read_constant(&mut self) -> Result<Constant> {
        let tag = self.read_byte()?;
        let constant = match tag {
            TAG_NIL => Constant::Nil,
            TAG_BOOLEAN => Constant::Boolean(self.read_byte()? != 0),
            TAG_FLOAT => Constant::Float(self.read_f64()?),
            TAG_INTEGER => Constant::Integer(self.read_i64()?),
            TAG_SHORT_STRING | TAG_LONG_STRING => Constant::String(self.read_string()?),
            tag => return Err(BytecodeError::UnknownConstantTag { tag }),
        };
        Ok(constant)
    }
}
