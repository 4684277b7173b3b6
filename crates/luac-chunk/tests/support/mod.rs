//! Test-only chunk encoder
//!
//! Produces the byte layout the loader reads, so tests can start from a
//! `Prototype` value instead of hand-written byte strings.

#![allow(dead_code)]

use luac_chunk::constant::{
    TAG_BOOLEAN, TAG_FLOAT, TAG_INTEGER, TAG_LONG_STRING, TAG_NIL, TAG_SHORT_STRING,
};
use luac_chunk::header::{
    INSTRUCTION_SIZE, LUA_INTEGER_SIZE, LUA_NUMBER_SIZE, LUA_SIGNATURE, LUAC_DATA, LUAC_FORMAT,
    LUAC_INT, LUAC_NUM, LUAC_VERSION,
};
use luac_chunk::{Constant, LuaString, Prototype, UpvalueDesc};

/// Strings longer than this are tagged as long strings
const MAX_SHORT_LEN: usize = 40;

/// Chunk encoder
#[derive(Debug, Default)]
pub struct ChunkBuilder {
    out: Vec<u8>,
    type_sizes: bool,
}

impl ChunkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit the instruction/integer/number size bytes in the prologue
    pub fn with_type_sizes(mut self) -> Self {
        self.type_sizes = true;
        self
    }

    pub fn header(&mut self) -> &mut Self {
        self.out.extend_from_slice(&LUA_SIGNATURE);
        self.out.push(LUAC_VERSION);
        self.out.push(LUAC_FORMAT);
        self.out.extend_from_slice(&LUAC_DATA);
        if self.type_sizes {
            self.out
                .extend_from_slice(&[INSTRUCTION_SIZE, LUA_INTEGER_SIZE, LUA_NUMBER_SIZE]);
        }
        self.out.extend_from_slice(&LUAC_INT.to_le_bytes());
        self.out.extend_from_slice(&LUAC_NUM.to_le_bytes());
        self
    }

    pub fn byte(&mut self, b: u8) -> &mut Self {
        self.out.push(b);
        self
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.out.extend_from_slice(bytes);
        self
    }

    /// Most significant 7-bit group first, high bit set on the last byte
    pub fn varint(&mut self, mut n: u64) -> &mut Self {
        let mut groups = vec![(n & 0x7F) as u8 | 0x80];
        n >>= 7;
        while n != 0 {
            groups.push((n & 0x7F) as u8);
            n >>= 7;
        }
        groups.reverse();
        self.out.extend_from_slice(&groups);
        self
    }

    pub fn string(&mut self, s: &[u8]) -> &mut Self {
        if s.is_empty() {
            return self.varint(0);
        }
        self.varint(s.len() as u64 + 1);
        self.raw(s)
    }

    pub fn constant(&mut self, k: &Constant) -> &mut Self {
        match k {
            Constant::Nil => self.byte(TAG_NIL),
            Constant::Boolean(b) => self.byte(TAG_BOOLEAN).byte(u8::from(*b)),
            Constant::Float(f) => self.byte(TAG_FLOAT).raw(&f.to_le_bytes()),
            Constant::Integer(i) => self.byte(TAG_INTEGER).raw(&i.to_le_bytes()),
            Constant::String(s) => {
                let tag = if s.len() > MAX_SHORT_LEN {
                    TAG_LONG_STRING
                } else {
                    TAG_SHORT_STRING
                };
                self.byte(tag).string(s.as_bytes())
            }
        }
    }

    pub fn function(&mut self, p: &Prototype) -> &mut Self {
        self.string(p.source.as_bytes())
            .varint(u64::from(p.line_defined))
            .varint(u64::from(p.last_line_defined))
            .byte(p.num_params)
            .byte(u8::from(p.is_vararg))
            .byte(p.max_stack_size);

        self.varint(p.code.len() as u64);
        for word in &p.code {
            self.raw(&word.to_le_bytes());
        }
        self.varint(p.constants.len() as u64);
        for k in &p.constants {
            self.constant(k);
        }
        self.varint(p.upvalues.len() as u64);
        for up in &p.upvalues {
            self.byte(u8::from(up.in_stack)).byte(up.index).byte(up.kind);
        }
        self.varint(p.protos.len() as u64);
        for child in &p.protos {
            self.function(child);
        }

        self.varint(p.line_info.len() as u64).raw(&p.line_info);
        self.varint(p.abs_line_info.len() as u64);
        for anchor in &p.abs_line_info {
            self.varint(u64::from(anchor.pc)).varint(u64::from(anchor.line));
        }
        self.varint(p.loc_vars.len() as u64);
        for var in &p.loc_vars {
            self.string(var.name.as_bytes())
                .varint(u64::from(var.start_pc))
                .varint(u64::from(var.end_pc));
        }
        self.varint(p.upvalue_names.len() as u64);
        for name in &p.upvalue_names {
            self.string(name.as_bytes());
        }
        self
    }

    /// Header, declared upvalue count, then `main`
    pub fn chunk(mut self, main: &Prototype) -> Vec<u8> {
        self.header()
            .byte(main.upvalues.len() as u8)
            .function(main);
        self.out
    }

    pub fn finish(self) -> Vec<u8> {
        self.out
    }
}

/// Encode `main` with the default prologue
pub fn chunk(main: &Prototype) -> Vec<u8> {
    ChunkBuilder::new().chunk(main)
}

/// Main function of `return` compiled from `@test.lua`
pub fn main_function() -> Prototype {
    Prototype {
        source: LuaString::from("@test.lua"),
        is_vararg: true,
        max_stack_size: 2,
        // VARARGPREP 0 / RETURN 0 1 1
        code: vec![0x0000_0051, 0x0101_0046],
        upvalues: vec![env_upvalue()],
        line_info: vec![1, 0],
        upvalue_names: vec![LuaString::from("_ENV")],
        ..Prototype::default()
    }
}

/// Nested function defined on `line`, with an empty stored source
pub fn child_function(line: u32) -> Prototype {
    Prototype {
        line_defined: line,
        last_line_defined: line + 1,
        max_stack_size: 2,
        // RETURN0
        code: vec![0x0000_0047],
        line_info: vec![1],
        ..Prototype::default()
    }
}

pub fn env_upvalue() -> UpvalueDesc {
    UpvalueDesc {
        in_stack: true,
        index: 0,
        kind: 0,
    }
}
