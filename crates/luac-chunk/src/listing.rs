//! Human-readable listing of a prototype tree, in the style of `luac -l -l`

use std::fmt::{self, Write};

use serde::Deserialize;

use crate::constant::Constant;
use crate::header::LUA_SIGNATURE;
use crate::instruction::Instruction;
use crate::opcode::Opcode;
use crate::operand::JumpOffset;
use crate::proto::Prototype;

/// Which tables follow each function's code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingOptions {
    /// Print the constant table
    pub show_constants: bool,
    /// Print local variable ranges
    pub show_locals: bool,
    /// Print upvalue descriptors
    pub show_upvalues: bool,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            show_constants: true,
            show_locals: true,
            show_upvalues: true,
        }
    }
}

/// Render the listing of `main` and every nested function
pub fn render(main: &Prototype) -> String {
    render_with(main, &ListingOptions::default())
}

/// Render with explicit options
pub fn render_with(main: &Prototype, options: &ListingOptions) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_listing(&mut out, main, options);
    out
}

/// Write the listing to any formatter sink
pub fn write_listing<W: Write>(
    out: &mut W,
    main: &Prototype,
    options: &ListingOptions,
) -> fmt::Result {
    for proto in main.descendants() {
        write_header(out, proto)?;
        write_code(out, proto)?;
        if options.show_constants {
            write_constants(out, proto)?;
        }
        if options.show_locals {
            write_locals(out, proto)?;
        }
        if options.show_upvalues {
            write_upvalues(out, proto)?;
        }
    }
    Ok(())
}

fn write_header<W: Write>(out: &mut W, p: &Prototype) -> fmt::Result {
    let kind = if p.is_main() { "main" } else { "function" };
    let vararg = if p.is_vararg { "+" } else { "" };
    writeln!(
        out,
        "\n{kind} <{}:{},{}> ({} instructions)",
        display_source(p),
        p.line_defined,
        p.last_line_defined,
        p.code.len()
    )?;
    writeln!(
        out,
        "{}{vararg} params, {} slots, {} upvalues, {} locals, {} constants, {} functions",
        p.num_params,
        p.max_stack_size,
        p.upvalues.len(),
        p.loc_vars.len(),
        p.constants.len(),
        p.protos.len()
    )
}

/// Chunk name as `luac` shows it: file and literal names lose their `@`/`=`
/// prefix, other sources print as `(string)` or, for binary ones, `(bstring)`
fn display_source(p: &Prototype) -> String {
    let source = p.source.to_str_lossy();
    match source.as_bytes().first() {
        Some(b'@' | b'=') => source[1..].to_string(),
        Some(&b) if b == LUA_SIGNATURE[0] => "(bstring)".to_string(),
        Some(_) => "(string)".to_string(),
        None => "?".to_string(),
    }
}

fn write_code<W: Write>(out: &mut W, p: &Prototype) -> fmt::Result {
    for (pc, ins) in p.instructions().enumerate() {
        let line = match p.line_at(pc) {
            Some(line) => line.to_string(),
            None => "-".to_string(),
        };
        write!(out, "\t{}\t[{line}]\t{ins}", pc + 1)?;
        if let Some(note) = annotation(p, pc, ins) {
            write!(out, "\t; {note}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Trailing comment resolving constants, upvalues and jump targets
fn annotation(p: &Prototype, pc: usize, ins: Instruction) -> Option<String> {
    let constant = |index: u32| -> String {
        p.constants
            .get(index as usize)
            .map_or_else(|| "?".to_string(), Constant::to_string)
    };
    let upvalue = |index: u8| -> String {
        p.upvalue_name(usize::from(index))
            .map_or_else(|| "-".to_string(), |name| name.to_string())
    };
    let rk = |ins: Instruction| -> Option<String> {
        ins.k().then(|| constant(u32::from(ins.c())))
    };

    let note = match ins.opcode().ok()? {
        Opcode::LoadK => constant(ins.bx()),
        Opcode::GetUpval | Opcode::SetUpval => upvalue(ins.b()),
        Opcode::GetTabUp => format!("{} {}", upvalue(ins.b()), constant(u32::from(ins.c()))),
        Opcode::SetTabUp => {
            let mut note = format!("{} {}", upvalue(ins.a()), constant(u32::from(ins.b())));
            if let Some(value) = rk(ins) {
                note.push(' ');
                note.push_str(&value);
            }
            note
        }
        Opcode::GetField => constant(u32::from(ins.c())),
        Opcode::Self_ if ins.k() => constant(u32::from(ins.c())),
        Opcode::SetField => {
            let mut note = constant(u32::from(ins.b()));
            if let Some(value) = rk(ins) {
                note.push(' ');
                note.push_str(&value);
            }
            note
        }
        Opcode::AddK
        | Opcode::SubK
        | Opcode::MulK
        | Opcode::ModK
        | Opcode::PowK
        | Opcode::DivK
        | Opcode::IDivK
        | Opcode::BAndK
        | Opcode::BOrK
        | Opcode::BXorK => constant(u32::from(ins.c())),
        Opcode::EqK | Opcode::MMBinK => constant(u32::from(ins.b())),
        Opcode::Jmp => {
            let target = JumpOffset::new(ins.sj()).target(pc)?;
            format!("to {}", target + 1)
        }
        Opcode::Closure => format!("function {}", ins.bx()),
        _ => return None,
    };
    Some(note)
}

fn write_constants<W: Write>(out: &mut W, p: &Prototype) -> fmt::Result {
    writeln!(out, "constants ({}):", p.constants.len())?;
    for (i, k) in p.constants.iter().enumerate() {
        writeln!(out, "\t{i}\t{}\t{k}", constant_type(k))?;
    }
    Ok(())
}

fn constant_type(k: &Constant) -> &'static str {
    match k {
        Constant::Nil => "N",
        Constant::Boolean(_) => "B",
        Constant::Float(_) => "F",
        Constant::Integer(_) => "I",
        Constant::String(_) => "S",
    }
}

fn write_locals<W: Write>(out: &mut W, p: &Prototype) -> fmt::Result {
    writeln!(out, "locals ({}):", p.loc_vars.len())?;
    for (i, var) in p.loc_vars.iter().enumerate() {
        writeln!(
            out,
            "\t{i}\t{}\t{}\t{}",
            var.name,
            u64::from(var.start_pc) + 1,
            u64::from(var.end_pc) + 1
        )?;
    }
    Ok(())
}

fn write_upvalues<W: Write>(out: &mut W, p: &Prototype) -> fmt::Result {
    writeln!(out, "upvalues ({}):", p.upvalues.len())?;
    for (i, up) in p.upvalues.iter().enumerate() {
        let name = p
            .upvalue_name(i)
            .map_or_else(|| "-".to_string(), |name| name.to_string());
        writeln!(
            out,
            "\t{i}\t{name}\t{}\t{}",
            u8::from(up.in_stack),
            up.index
        )?;
    }
    Ok(())
}
