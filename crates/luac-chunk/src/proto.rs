//! Function prototypes

use serde::Serialize;

use crate::constant::{Constant, LuaString};
use crate::instruction::Instruction;

/// Line delta marking an instruction whose line lives in `abs_line_info`
pub const ABS_LINE_INFO: i8 = -0x80;

/// Upvalue descriptor: where a closure finds a captured variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpvalueDesc {
    /// Captured from the enclosing function's registers (else from its upvalues)
    pub in_stack: bool,
    /// Register or upvalue index in the enclosing function
    pub index: u8,
    /// Variable kind (regular, const, to-be-closed)
    pub kind: u8,
}

/// Absolute line anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AbsLineInfo {
    /// Program counter of the anchored instruction
    pub pc: u32,
    /// Source line of that instruction
    pub line: u32,
}

/// Local variable live range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocVar {
    /// Variable name
    pub name: LuaString,
    /// First instruction where the variable is active
    pub start_pc: u32,
    /// First instruction where the variable is dead
    pub end_pc: u32,
}

/// A compiled function
///
/// Each prototype owns its nested prototypes; the tree has no sharing and no
/// back references.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Prototype {
    /// Chunk name, inherited from the enclosing function when stored empty
    pub source: LuaString,
    /// Line where the definition starts (0 for the main function)
    pub line_defined: u32,
    /// Line where the definition ends
    pub last_line_defined: u32,
    /// Number of fixed parameters
    pub num_params: u8,
    /// Accepts `...`
    pub is_vararg: bool,
    /// Registers needed
    pub max_stack_size: u8,
    /// Instruction words, indexed by program counter
    pub code: Vec<u32>,
    /// Constant table
    pub constants: Vec<Constant>,
    /// Upvalue descriptors
    pub upvalues: Vec<UpvalueDesc>,
    /// Nested functions
    pub protos: Vec<Prototype>,
    /// Per-instruction line deltas (signed bytes), empty when stripped
    pub line_info: Vec<u8>,
    /// Absolute line anchors, ordered by pc
    pub abs_line_info: Vec<AbsLineInfo>,
    /// Local variable ranges
    pub loc_vars: Vec<LocVar>,
    /// Upvalue names, aligned with `upvalues`, empty when stripped
    pub upvalue_names: Vec<LuaString>,
}

impl Prototype {
    /// Check whether this is a chunk's main function
    #[inline]
    pub fn is_main(&self) -> bool {
        self.line_defined == 0
    }

    /// Instruction at `pc`
    #[inline]
    pub fn instruction(&self, pc: usize) -> Option<Instruction> {
        self.code.get(pc).copied().map(Instruction)
    }

    /// Iterate over the code as instructions
    pub fn instructions(&self) -> impl ExactSizeIterator<Item = Instruction> + '_ {
        self.code.iter().copied().map(Instruction)
    }

    /// Name of upvalue `index`, if debug information was kept
    pub fn upvalue_name(&self, index: usize) -> Option<&LuaString> {
        self.upvalue_names.get(index)
    }

    /// Name of the `n`-th (1-based) local variable active at `pc`
    pub fn local_name(&self, n: usize, pc: u32) -> Option<&LuaString> {
        self.loc_vars
            .iter()
            .take_while(|var| var.start_pc <= pc)
            .filter(|var| pc < var.end_pc)
            .nth(n.checked_sub(1)?)
            .map(|var| &var.name)
    }

    /// Source line of the instruction at `pc`
    ///
    /// Starts from the closest absolute anchor at or before `pc` (or from
    /// `line_defined`) and adds the deltas after it. Returns `None` without
    /// line information or when the tables are inconsistent.
    pub fn line_at(&self, pc: usize) -> Option<u32> {
        if pc >= self.line_info.len() {
            return None;
        }
        let anchors = self
            .abs_line_info
            .partition_point(|anchor| anchor.pc as usize <= pc);
        let (mut line, mut base_pc) = match anchors.checked_sub(1) {
            Some(i) => {
                let anchor = self.abs_line_info[i];
                (i64::from(anchor.line), anchor.pc as usize)
            }
            None => {
                // The walk starts before instruction 0
                let line = i64::from(self.line_defined);
                let delta = self.line_delta(0)?;
                (line + delta, 0)
            }
        };
        while base_pc < pc {
            base_pc += 1;
            line += self.line_delta(base_pc)?;
        }
        u32::try_from(line).ok()
    }

    fn line_delta(&self, pc: usize) -> Option<i64> {
        let delta = *self.line_info.get(pc)? as i8;
        (delta != ABS_LINE_INFO).then_some(i64::from(delta))
    }

    /// Depth-first iterator over this prototype and all nested ones
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Deepest nesting level below this prototype (0 without children)
    pub fn nesting_depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 0usize)];
        while let Some((proto, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(proto.protos.iter().map(|child| (child, depth + 1)));
        }
        deepest
    }
}

/// Pre-order walk over a prototype tree, in encoding order
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a Prototype>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Prototype;

    fn next(&mut self) -> Option<Self::Item> {
        let proto = self.stack.pop()?;
        self.stack.extend(proto.protos.iter().rev());
        Some(proto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proto() -> Prototype {
        Prototype {
            source: "@test.lua".into(),
            line_defined: 0,
            last_line_defined: 0,
            num_params: 0,
            is_vararg: true,
            max_stack_size: 2,
            code: Vec::new(),
            constants: Vec::new(),
            upvalues: Vec::new(),
            protos: Vec::new(),
            line_info: Vec::new(),
            abs_line_info: Vec::new(),
            loc_vars: Vec::new(),
            upvalue_names: Vec::new(),
        }
    }

    #[test]
    fn test_line_at_from_deltas() {
        let mut p = proto();
        p.line_defined = 10;
        p.code = vec![0; 4];
        // lines 11, 11, 13, 12
        p.line_info = vec![1, 0, 2, (-1i8) as u8];
        let lines: Vec<_> = (0..4).map(|pc| p.line_at(pc)).collect();
        assert_eq!(lines, vec![Some(11), Some(11), Some(13), Some(12)]);
        assert_eq!(p.line_at(4), None);
    }

    #[test]
    fn test_line_at_uses_anchors() {
        let mut p = proto();
        p.code = vec![0; 4];
        p.line_info = vec![1, ABS_LINE_INFO as u8, 1, 0];
        p.abs_line_info = vec![AbsLineInfo { pc: 1, line: 500 }];
        assert_eq!(p.line_at(0), Some(1));
        assert_eq!(p.line_at(1), Some(500));
        assert_eq!(p.line_at(2), Some(501));
        assert_eq!(p.line_at(3), Some(501));
    }

    #[test]
    fn test_line_at_without_debug_info() {
        let mut p = proto();
        p.code = vec![0; 2];
        assert_eq!(p.line_at(0), None);
    }

    #[test]
    fn test_local_name_respects_ranges() {
        let mut p = proto();
        p.loc_vars = vec![
            LocVar {
                name: "a".into(),
                start_pc: 0,
                end_pc: 10,
            },
            LocVar {
                name: "b".into(),
                start_pc: 2,
                end_pc: 4,
            },
            LocVar {
                name: "c".into(),
                start_pc: 5,
                end_pc: 10,
            },
        ];
        assert_eq!(p.local_name(1, 3).unwrap().as_bytes(), b"a");
        assert_eq!(p.local_name(2, 3).unwrap().as_bytes(), b"b");
        assert_eq!(p.local_name(2, 6).unwrap().as_bytes(), b"c");
        assert_eq!(p.local_name(3, 6), None);
        assert_eq!(p.local_name(0, 6), None);
    }

    #[test]
    fn test_descendants_preorder() {
        let mut leaf = proto();
        leaf.line_defined = 3;
        let mut mid = proto();
        mid.line_defined = 2;
        mid.protos.push(leaf);
        let mut sibling = proto();
        sibling.line_defined = 4;
        let mut root = proto();
        root.protos.push(mid);
        root.protos.push(sibling);

        let order: Vec<_> = root.descendants().map(|p| p.line_defined).collect();
        assert_eq!(order, vec![0, 2, 3, 4]);
        assert_eq!(root.nesting_depth(), 2);
        assert!(root.is_main());
    }
}
