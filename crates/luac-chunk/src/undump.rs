//! Chunk loading: prologue, then one recursive pass over the prototype tree

use std::io::Read;

use serde::Deserialize;
use tracing::{debug, trace};

use crate::constant::LuaString;
use crate::error::{BytecodeError, LoadError, Result};
use crate::header::check_header;
use crate::proto::{AbsLineInfo, LocVar, Prototype, UpvalueDesc};
use crate::reader::ChunkReader;

/// Default limit on prototype nesting (Lua's C-call limit)
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Upper bound on the bytes reserved up front for any one table
const MAX_PREALLOC_BYTES: usize = 1 << 20;

/// Smallest encoding of a nested function: one byte per field, every table empty
const MIN_FUNCTION_SIZE: usize = 14;

/// Capacity to reserve for `n` declared elements of at least `min_size` bytes each
///
/// A declared count is untrusted: the reservation never exceeds what the
/// remaining input could encode, nor `MAX_PREALLOC_BYTES` in total.
fn capacity_hint<T>(n: usize, remaining: usize, min_size: usize) -> usize {
    let by_input = remaining / min_size.max(1);
    let by_budget = MAX_PREALLOC_BYTES / std::mem::size_of::<T>().max(1);
    n.min(by_input).min(by_budget)
}

/// Loader settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Expect and check instruction/integer/number size bytes in the prologue
    pub check_type_sizes: bool,
    /// Deepest accepted prototype nesting; the main function is depth 0
    pub max_depth: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            check_type_sizes: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Load a chunk with the default settings
pub fn undump(bytes: &[u8]) -> std::result::Result<Prototype, LoadError> {
    undump_with(bytes, &LoaderConfig::default())
}

/// Load a chunk
///
/// Either the whole tree is returned or nothing is; the error names the
/// field and nesting depth where decoding stopped.
pub fn undump_with(
    bytes: &[u8],
    config: &LoaderConfig,
) -> std::result::Result<Prototype, LoadError> {
    debug!(len = bytes.len(), "loading chunk");
    let mut loader = Loader {
        r: ChunkReader::new(bytes),
        config,
        field: "header",
        depth: 0,
    };
    let main = loader.load_chunk().map_err(|e| loader.error(e))?;
    if !loader.r.is_at_end() {
        debug!(trailing = loader.r.remaining(), "ignoring bytes after chunk");
    }
    debug!(
        functions = main.descendants().count(),
        instructions = main.code.len(),
        "chunk loaded"
    );
    Ok(main)
}

/// Read a chunk from a stream to its end, then load it
pub fn read_from<R: Read>(
    reader: &mut R,
    config: &LoaderConfig,
) -> std::result::Result<Prototype, LoadError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| LoadError::new(BytecodeError::Io(e), "input", 0, 0))?;
    undump_with(&bytes, config)
}

struct Loader<'a, 'c> {
    r: ChunkReader<'a>,
    config: &'c LoaderConfig,
    /// Field being decoded, for error context
    field: &'static str,
    depth: usize,
}

impl<'a> Loader<'a, '_> {
    fn error(&self, source: BytecodeError) -> LoadError {
        LoadError::new(source, self.field, self.depth, self.r.offset())
    }

    #[inline]
    fn at(&mut self, field: &'static str) -> &mut Self {
        self.field = field;
        self
    }

    fn load_chunk(&mut self) -> Result<Prototype> {
        check_header(&mut self.r, self.config.check_type_sizes)?;
        let declared = usize::from(self.at("upvalue count").r.read_byte()?);
        let main = self.load_function(&LuaString::default())?;

        self.field = "upvalue count";
        self.depth = 0;
        if declared != main.upvalues.len() {
            return Err(BytecodeError::UpvalueCountMismatch {
                declared,
                actual: main.upvalues.len(),
            });
        }
        Ok(main)
    }

    fn load_function(&mut self, parent_source: &LuaString) -> Result<Prototype> {
        let mut source = self.at("source").r.read_string()?;
        if source.is_empty() {
            source = parent_source.clone();
        }

        let line_defined = self.at("line defined").r.read_line()?;
        let last_line_defined = self.at("last line defined").r.read_line()?;
        let num_params = self.at("parameter count").r.read_byte()?;
        let is_vararg = self.at("vararg flag").r.read_byte()? != 0;
        let max_stack_size = self.at("stack size").r.read_byte()?;

        let code = self.load_vec("code", 4, |r| r.read_u32())?;
        let constants = self.load_vec("constants", 1, ChunkReader::read_constant)?;
        let upvalues = self.load_vec("upvalues", 3, |r| {
            Ok(UpvalueDesc {
                in_stack: r.read_byte()? != 0,
                index: r.read_byte()?,
                kind: r.read_byte()?,
            })
        })?;
        let protos = self.load_protos(&source)?;

        let line_info = self.load_vec("line info", 1, ChunkReader::read_byte)?;
        let abs_line_info = self.load_vec("absolute line info", 2, |r| {
            Ok(AbsLineInfo {
                pc: r.read_line()?,
                line: r.read_line()?,
            })
        })?;
        let loc_vars = self.load_vec("local variables", 3, |r| {
            Ok(LocVar {
                name: r.read_string()?,
                start_pc: r.read_line()?,
                end_pc: r.read_line()?,
            })
        })?;
        let upvalue_names = self.load_vec("upvalue names", 1, ChunkReader::read_string)?;

        trace!(
            depth = self.depth,
            source = %source,
            line_defined,
            code = code.len(),
            constants = constants.len(),
            protos = protos.len(),
            "function loaded"
        );

        Ok(Prototype {
            source,
            line_defined,
            last_line_defined,
            num_params,
            is_vararg,
            max_stack_size,
            code,
            constants,
            upvalues,
            protos,
            line_info,
            abs_line_info,
            loc_vars,
            upvalue_names,
        })
    }

    fn load_protos(&mut self, source: &LuaString) -> Result<Vec<Prototype>> {
        let n = self.at("nested functions").r.read_count()?;
        if n > 0 && self.depth >= self.config.max_depth {
            return Err(BytecodeError::NestingTooDeep {
                limit: self.config.max_depth,
            });
        }
        let mut protos = Vec::with_capacity(capacity_hint::<Prototype>(
            n,
            self.r.remaining(),
            MIN_FUNCTION_SIZE,
        ));
        self.depth += 1;
        for _ in 0..n {
            protos.push(self.load_function(source)?);
        }
        self.depth -= 1;
        Ok(protos)
    }

    /// Count-prefixed sequence whose elements encode to at least `min_size` bytes
    fn load_vec<T>(
        &mut self,
        field: &'static str,
        min_size: usize,
        mut read: impl FnMut(&mut ChunkReader<'a>) -> Result<T>,
    ) -> Result<Vec<T>> {
        let n = self.at(field).r.read_count()?;
        let mut items = Vec::with_capacity(capacity_hint::<T>(n, self.r.remaining(), min_size));
        for _ in 0..n {
            items.push(read(&mut self.r)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{LUA_SIGNATURE, LUAC_DATA, LUAC_FORMAT, LUAC_INT, LUAC_NUM, LUAC_VERSION};

    fn header() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&LUA_SIGNATURE);
        out.push(LUAC_VERSION);
        out.push(LUAC_FORMAT);
        out.extend_from_slice(&LUAC_DATA);
        out.extend_from_slice(&LUAC_INT.to_le_bytes());
        out.extend_from_slice(&LUAC_NUM.to_le_bytes());
        out
    }

    // source "" / lines 0,0 / params 0 / vararg 1 / stack 2 / every table empty
    const EMPTY_FUNCTION: [u8; 14] = [
        0x80, 0x80, 0x80, 0, 1, 2, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80,
    ];

    #[test]
    fn test_minimal_chunk() {
        let mut bytes = header();
        bytes.push(0);
        bytes.extend_from_slice(&EMPTY_FUNCTION);

        let main = undump(&bytes).unwrap();
        assert!(main.code.is_empty());
        assert!(main.is_vararg);
        assert_eq!(main.max_stack_size, 2);
        assert!(main.source.is_empty());
    }

    #[test]
    fn test_error_context_names_field() {
        let mut bytes = header();
        bytes.push(0);
        bytes.extend_from_slice(&EMPTY_FUNCTION[..6]);
        // code count of 1, then only 2 bytes of the word
        bytes.extend_from_slice(&[0x81, 0x00, 0x00]);

        let err = undump(&bytes).unwrap_err();
        assert_eq!(err.field, "code");
        assert_eq!(err.depth, 0);
        assert!(matches!(
            err.kind(),
            BytecodeError::UnexpectedEndOfInput { needed: 4, .. }
        ));
    }

    #[test]
    fn test_header_error_reports_header_field() {
        let mut bytes = header();
        bytes[4] = 0x53;
        let err = undump(&bytes).unwrap_err();
        assert_eq!(err.field, "header");
    }

    #[test]
    fn test_huge_count_fails_without_allocating() {
        let mut bytes = header();
        bytes.push(0);
        bytes.extend_from_slice(&EMPTY_FUNCTION[..6]);
        // 2^36 constants
        bytes.extend_from_slice(&[0x80]); // code: 0
        bytes.extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x80]);
        let err = undump(&bytes).unwrap_err();
        assert_eq!(err.field, "constants");
    }

    #[test]
    fn test_capacity_hint_is_bounded_by_input_and_budget() {
        // Every element needs 4 bytes: 10 bytes hold at most 2
        assert_eq!(capacity_hint::<u32>(1_000, 10, 4), 2);
        assert_eq!(capacity_hint::<u32>(3, 1_000, 4), 3);
        // A plausible count over a large input still stays within the budget
        let n = capacity_hint::<Prototype>(usize::MAX, 64 << 20, MIN_FUNCTION_SIZE);
        assert!(n * std::mem::size_of::<Prototype>() <= MAX_PREALLOC_BYTES);
        assert_eq!(capacity_hint::<()>(7, 100, 0), 7);
    }

    #[test]
    fn test_large_padded_count_fails_cleanly() {
        let mut bytes = header();
        bytes.push(0);
        // code, constants and upvalues empty, then 4 Mi nested functions
        bytes.extend_from_slice(&EMPTY_FUNCTION[..9]);
        bytes.extend_from_slice(&[0x02, 0x00, 0x00, 0x80]);
        bytes.resize(bytes.len() + (4 << 20), 0);

        let err = undump(&bytes).unwrap_err();
        assert_eq!(err.field, "source");
        assert_eq!(err.depth, 1);
        assert!(matches!(err.kind(), BytecodeError::MalformedVarint { .. }));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_model_and_errors_are_send_sync() {
        assert_send_sync::<Prototype>();
        assert_send_sync::<crate::constant::Constant>();
        assert_send_sync::<BytecodeError>();
        assert_send_sync::<LoadError>();
        assert_send_sync::<LoaderConfig>();
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: LoaderConfig = serde_json::from_str(r#"{"max_depth": 8}"#).unwrap();
        assert_eq!(
            config,
            LoaderConfig {
                check_type_sizes: false,
                max_depth: 8
            }
        );
    }
}
