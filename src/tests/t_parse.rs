use super::*;
use crate::ir::Type;
use crate::lexer::Lexer;
use indoc::indoc;

fn parse_result(source: &str) -> Result<AnalysisResult, ParseError> {
    let tokens = Lexer::new(source).tokenize().expect("Failed to tokenize");
    Parser::new(source, &tokens).parse()
}

fn parse_ok(source: &str) -> AnalysisResult {
    parse_result(source).expect("Failed to parse")
}

#[test]
fn test_parse_struct_fields() {
    let result = parse_ok(indoc! {r#"
        struct Person {
            1: required string name
            2: optional i32 age = 18
            3: list<string> tags;
        }
    "#});
    let def = &result.struct_defs["Person"];
    assert_eq!(def.sequence_num, 0);
    assert_eq!(def.fields.len(), 3);

    assert_eq!(def.fields[0].name, "name");
    assert_eq!(def.fields[0].field_id, 1);
    assert_eq!(def.fields[0].req, FieldReq::Required);

    assert_eq!(def.fields[1].req, FieldReq::Optional);
    assert_eq!(def.fields[1].default_value.as_deref(), Some("18"));

    match &def.fields[2].ty {
        Type::Container(c) => match &c.inner {
            Type::List(inner) => match inner.as_ref() {
                Type::Base(base) => assert_eq!(base.inner, RealBaseType::String),
                other => panic!("Expected base inner type, got {other:?}"),
            },
            other => panic!("Expected list, got {other:?}"),
        },
        other => panic!("Expected container, got {other:?}"),
    }
}

#[test]
fn test_parse_field_without_requiredness_is_required() {
    let result = parse_ok("struct A { 1: i32 x }");
    assert_eq!(result.struct_defs["A"].fields[0].req, FieldReq::Required);
}

#[test]
fn test_parse_typedef_sequence_numbers() {
    let result = parse_ok(indoc! {"
        typedef i64 UserId
        typedef list<UserId> UserIds
    "});
    assert_eq!(result.typedefs["UserId"].sequence_num, 0);
    assert_eq!(result.typedefs["UserIds"].sequence_num, 1);
    match &result.typedefs["UserId"].original_type {
        Type::Base(base) => assert_eq!(base.inner, RealBaseType::I64),
        other => panic!("Expected base type, got {other:?}"),
    }
}

#[test]
fn test_parse_enum_values() {
    let result = parse_ok(indoc! {"
        enum Color {
            RED = 1,
            GREEN,
            BLUE = 0x10
        }
    "});
    let def = &result.enum_defs["Color"];
    assert_eq!(def.fields.len(), 3);
    assert_eq!(def.fields[0].value, 1);
    assert_eq!(def.fields[1].value, 0);
    assert_eq!(def.fields[2].value, 16);
}

#[test]
fn test_parse_namespace_forms() {
    let result = parse_ok(indoc! {r#"
        namespace * common
        namespace go a.b.c
        namespace php "x.y"
    "#});
    assert_eq!(result.namespaces.len(), 3);
    assert_eq!(result.namespaces[0].scope, "*");
    assert_eq!(result.namespaces[0].name, "common");
    assert_eq!(result.namespaces[1].scope, "go");
    assert_eq!(result.namespaces[1].name, "a.b.c");
    assert_eq!(result.namespaces[2].scope, "php");
    assert_eq!(result.namespaces[2].name, "x.y");
}

#[test]
fn test_parse_includes() {
    let result = parse_ok(indoc! {r#"
        include "base.thrift"
        include "sub/other.thrift"
    "#});
    assert_eq!(result.include_names.len(), 2);
    assert_eq!(result.include_names[0].name, "base.thrift");
    assert_eq!(result.include_names[1].name, "sub/other.thrift");
}

#[test]
fn test_parse_service_functions() {
    let result = parse_ok(indoc! {r#"
        service Greeter {
            Reply hello(1: Request req) (path="/hello")
            Reply bye(1: Request req);
        } (servType="http")
    "#});
    assert_eq!(result.service_defs.len(), 1);
    let service = result.service_def.as_ref().expect("service");
    assert_eq!(service.name, "Greeter");
    assert_eq!(service.annotations[0].key, "servType");

    let hello = &service.function_defs["hello"];
    assert_eq!(hello.sequence_num, 0);
    assert_eq!(hello.service_name, "Greeter");
    assert_eq!(hello.requests.len(), 1);
    assert_eq!(hello.requests[0].name, "req");
    assert_eq!(hello.annotations[0].key, "path");
    assert_eq!(service.function_defs["bye"].sequence_num, 1);

    // The flat table sees both as well.
    assert_eq!(result.function_defs.len(), 2);
}

#[test]
fn test_parse_annotations_keep_source_order() {
    let result = parse_ok(r#"struct A { 1: i32 x (desc="d", json="j") }"#);
    let field = &result.struct_defs["A"].fields[0];
    let keys: Vec<&str> = field.annotations.iter().map(|a| a.key.as_str()).collect();
    assert_eq!(keys, vec!["desc", "json"]);
}

#[test]
fn test_parse_annotation_values() {
    let result = parse_ok(r#"struct A { 1: i32 x (a="s", b=10, c=0x10, d) }"#);
    let field = &result.struct_defs["A"].fields[0];
    assert_eq!(
        field.annotations[0].value,
        Some(crate::ir::AnnotationValue::Literal("\"s\"".to_string()))
    );
    assert_eq!(
        field.annotations[1].value,
        Some(crate::ir::AnnotationValue::Integer { value: 10, bits: 10 })
    );
    assert_eq!(
        field.annotations[2].value,
        Some(crate::ir::AnnotationValue::Integer { value: 16, bits: 16 })
    );
    assert_eq!(field.annotations[3].value, None);
}

#[test]
fn test_parse_base_type_annotations() {
    let result = parse_ok(r#"struct A { 1: i32 (scale="2") x }"#);
    let field = &result.struct_defs["A"].fields[0];
    match &field.ty {
        Type::Base(base) => {
            assert_eq!(base.annotations.len(), 1);
            assert_eq!(base.annotations[0].key, "scale");
        }
        other => panic!("Expected base type, got {other:?}"),
    }
    // The field's own annotation list stays empty.
    assert!(field.annotations.is_empty());
}

#[test]
fn test_union_and_exception_are_discarded() {
    let result = parse_ok(indoc! {"
        union U {
            1: i32 a
            2: string b
        }
        exception E {
            1: string message
        }
        struct Kept {
            1: i32 x
        }
    "});
    assert_eq!(result.struct_defs.len(), 1);
    assert_eq!(result.struct_defs["Kept"].fields.len(), 1);
}

#[test]
fn test_throws_do_not_leak_into_params() {
    let result = parse_ok(indoc! {"
        service S {
            Reply f(1: Request req) throws (1: Oops e, 2: Worse w)
        }
    "});
    let func = &result.function_defs["f"];
    assert_eq!(func.requests.len(), 1);
    assert_eq!(func.requests[0].name, "req");
}

#[test]
fn test_oneway_void_function() {
    let result = parse_ok("service S { oneway void ping(1: Ping p) }");
    let func = &result.function_defs["ping"];
    assert_eq!(func.response, Type::Udf("void".to_string()));
}

#[test]
fn test_missing_field_id_is_fatal() {
    let err = parse_result("struct A { i32 x }").unwrap_err();
    assert!(
        err.to_string()
            .contains("field number is required for x")
    );
}

#[test]
fn test_duplicate_field_id_is_fatal() {
    let err = parse_result("struct D { 1: i32 a; 1: i32 b }").unwrap_err();
    assert!(
        err.to_string()
            .contains("field id : 1 duplicated in struct D")
    );
}

#[test]
fn test_parse_const_texts() {
    let result = parse_ok(indoc! {r#"
        const i32 MAX = 10
        const map<string,i32> LIMITS = {"a": 1, "b": 2}
        const list<string> NAMES = ["x", "y"]
    "#});
    assert_eq!(result.const_defs["MAX"].ty_text, "i32");
    assert_eq!(result.const_defs["MAX"].value_text, "10");
    assert_eq!(result.const_defs["LIMITS"].ty_text, "map<string,i32>");
    assert_eq!(result.const_defs["LIMITS"].value_text, r#"{"a": 1, "b": 2}"#);
    assert_eq!(result.const_defs["NAMES"].value_text, r#"["x", "y"]"#);
}

#[test]
fn test_senum_is_discarded() {
    let result = parse_ok(indoc! {r#"
        senum Old {
            "a"
            "b"
        }
        struct A { 1: i32 x }
    "#});
    assert!(result.enum_defs.is_empty());
    assert_eq!(result.struct_defs.len(), 1);
}

#[test]
fn test_map_type_composition() {
    let result = parse_ok("struct A { 1: map<string, list<i64>> index }");
    let field = &result.struct_defs["A"].fields[0];
    let Type::Container(c) = &field.ty else {
        panic!("Expected container");
    };
    let Type::Map(m) = &c.inner else {
        panic!("Expected map");
    };
    match &m.key {
        Type::Base(base) => assert_eq!(base.inner, RealBaseType::String),
        other => panic!("Expected base key, got {other:?}"),
    }
    assert!(matches!(&m.value, Type::Container(_)));
}

#[test]
fn test_unexpected_declaration() {
    let err = parse_result("widget A {}").unwrap_err();
    assert!(err.to_string().contains("Expected declaration"));
}
