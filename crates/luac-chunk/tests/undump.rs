mod support;

use std::io::Cursor;

use luac_chunk::{
    AbsLineInfo, BytecodeError, Constant, HeaderField, LoaderConfig, LocVar, LuaString, Prototype,
    read_from, undump, undump_with,
};
use support::{ChunkBuilder, chunk, child_function, env_upvalue, main_function};

#[test]
fn test_minimal_main_function() {
    let main = main_function();
    let loaded = undump(&chunk(&main)).unwrap();

    assert_eq!(loaded, main);
    assert!(loaded.is_main());
    assert_eq!(loaded.upvalue_name(0).map(LuaString::as_bytes), Some(&b"_ENV"[..]));
}

#[test]
fn test_every_field_survives_loading() {
    let mut main = main_function();
    main.num_params = 2;
    main.is_vararg = false;
    main.max_stack_size = 250;
    main.last_line_defined = 0;
    main.constants = vec![
        Constant::Nil,
        Constant::Boolean(true),
        Constant::Boolean(false),
        Constant::Integer(-7),
        Constant::Integer(i64::MAX),
        Constant::Float(0.5),
        Constant::String(LuaString::from("x")),
        Constant::String(LuaString::from(&[0xffu8, 0x00, 0x41][..])),
        Constant::String(LuaString::from("a".repeat(300).as_str())),
        Constant::String(LuaString::default()),
    ];
    main.abs_line_info = vec![AbsLineInfo { pc: 1, line: 900 }];
    main.line_info = vec![1, 0x80];
    main.loc_vars = vec![LocVar {
        name: LuaString::from("i"),
        start_pc: 0,
        end_pc: 2,
    }];

    let loaded = undump(&chunk(&main)).unwrap();
    assert_eq!(loaded, main);
    assert_eq!(loaded.line_at(0), Some(1));
    assert_eq!(loaded.line_at(1), Some(900));
    assert_eq!(loaded.local_name(1, 1).map(ToString::to_string).as_deref(), Some("i"));
}

#[test]
fn test_children_decode_in_order_and_inherit_source() {
    let mut main = main_function();
    main.protos = vec![child_function(3), child_function(7), child_function(12)];
    let mut named = child_function(20);
    named.source = LuaString::from("=other");
    main.protos.push(named);

    let loaded = undump(&chunk(&main)).unwrap();
    let lines: Vec<u32> = loaded.protos.iter().map(|p| p.line_defined).collect();
    assert_eq!(lines, [3, 7, 12, 20]);
    for child in &loaded.protos[..3] {
        assert_eq!(child.source, main.source);
        assert!(!child.is_main());
    }
    assert_eq!(loaded.protos[3].source.as_bytes(), b"=other");
}

#[test]
fn test_grandchildren_inherit_through_parent() {
    let mut inner = child_function(2);
    inner.protos.push(child_function(3));
    let mut main = main_function();
    main.protos.push(inner);

    let loaded = undump(&chunk(&main)).unwrap();
    assert_eq!(loaded.protos[0].protos[0].source.as_bytes(), b"@test.lua");
    assert_eq!(loaded.descendants().count(), 3);
    assert_eq!(loaded.nesting_depth(), 2);
}

#[test]
fn test_upvalue_count_mismatch() {
    let mut main = main_function();
    main.upvalues = vec![env_upvalue(); 3];
    main.upvalue_names.clear();

    let mut builder = ChunkBuilder::new();
    builder.header().byte(2).function(&main);
    let err = undump(&builder.finish()).unwrap_err();

    assert_eq!(err.field, "upvalue count");
    assert_eq!(err.depth, 0);
    assert!(matches!(
        err.kind(),
        BytecodeError::UpvalueCountMismatch {
            declared: 2,
            actual: 3
        }
    ));
}

#[test]
fn test_unknown_constant_tag() {
    let mut main = main_function();
    main.constants = vec![Constant::Integer(1)];
    let mut bytes = chunk(&main);
    let tag_at = bytes
        .iter()
        .position(|&b| b == 0x13)
        .expect("integer tag present");
    bytes[tag_at] = 0x42;

    let err = undump(&bytes).unwrap_err();
    assert_eq!(err.field, "constants");
    assert_eq!(err.offset, tag_at + 1);
    assert!(matches!(
        err.kind(),
        BytecodeError::UnknownConstantTag { tag: 0x42 }
    ));
}

#[test]
fn test_error_in_nested_function_reports_depth() {
    let mut inner = child_function(2);
    inner.constants = vec![Constant::Integer(5)];
    let mut main = main_function();
    main.protos.push(inner);
    let mut bytes = chunk(&main);
    let tag_at = bytes.iter().rposition(|&b| b == 0x13).unwrap();
    bytes[tag_at] = 0x07;

    let err = undump(&bytes).unwrap_err();
    assert_eq!(err.depth, 1);
    assert_eq!(err.field, "constants");
}

#[test]
fn test_truncation_never_panics() {
    let mut main = main_function();
    main.constants = vec![
        Constant::Float(1.5),
        Constant::String(LuaString::from("hello")),
    ];
    main.protos.push(child_function(4));
    main.loc_vars.push(LocVar {
        name: LuaString::from("v"),
        start_pc: 0,
        end_pc: 1,
    });
    let bytes = chunk(&main);
    assert!(undump(&bytes).is_ok());

    for len in 0..bytes.len() {
        let err = undump(&bytes[..len]).unwrap_err();
        assert!(
            matches!(
                err.kind(),
                BytecodeError::UnexpectedEndOfInput { .. } | BytecodeError::MalformedVarint { .. }
            ),
            "prefix of {len} bytes gave {err}"
        );
    }
}

#[test]
fn test_header_mismatch_names_field() {
    let mut bytes = chunk(&main_function());
    bytes[5] = 1;
    let err = undump(&bytes).unwrap_err();
    assert_eq!(err.field, "header");
    assert!(matches!(
        err.kind(),
        BytecodeError::HeaderMismatch {
            field: HeaderField::Format
        }
    ));
}

#[test]
fn test_trailing_bytes_are_ignored() {
    let mut bytes = chunk(&main_function());
    bytes.extend_from_slice(b"garbage");
    assert_eq!(undump(&bytes).unwrap(), main_function());
}

#[test]
fn test_type_size_layout() {
    let main = main_function();
    let bytes = ChunkBuilder::new().with_type_sizes().chunk(&main);
    let config = LoaderConfig {
        check_type_sizes: true,
        ..LoaderConfig::default()
    };

    assert_eq!(undump_with(&bytes, &config).unwrap(), main);
    // The same bytes are not a valid default-layout chunk
    assert!(undump(&bytes).is_err());
    // And the default layout is rejected when sizes are expected
    assert!(undump_with(&chunk(&main), &config).is_err());
}

fn nested(depth: u32) -> Prototype {
    let mut main = main_function();
    let mut slot = &mut main;
    for line in 1..=depth {
        slot.protos.push(child_function(line));
        slot = &mut slot.protos[0];
    }
    main
}

#[test]
fn test_nesting_limit() {
    let config = LoaderConfig {
        max_depth: 4,
        ..LoaderConfig::default()
    };

    let ok = undump_with(&chunk(&nested(4)), &config).unwrap();
    assert_eq!(ok.nesting_depth(), 4);

    let err = undump_with(&chunk(&nested(5)), &config).unwrap_err();
    assert!(matches!(
        err.kind(),
        BytecodeError::NestingTooDeep { limit: 4 }
    ));
    assert_eq!(err.depth, 4);
}

#[test]
fn test_read_from_stream() {
    let main = main_function();
    let mut stream = Cursor::new(chunk(&main));
    let loaded = read_from(&mut stream, &LoaderConfig::default()).unwrap();
    assert_eq!(loaded, main);
}

#[test]
fn test_line_number_overflow() {
    let mut builder = ChunkBuilder::new();
    builder
        .header()
        .byte(0)
        .string(b"@x.lua")
        // line defined: 2^32
        .varint(1 << 32);
    let err = undump(&builder.finish()).unwrap_err();
    assert_eq!(err.field, "line defined");
    assert!(matches!(
        err.kind(),
        BytecodeError::IntegerOverflow { .. }
    ));
}
