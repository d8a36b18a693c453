use super::*;
use crate::ir::BaseType;
use crate::lexer::Lexer;
use crate::parse::Parser;
use indoc::indoc;

fn analyze(source: &str) -> AnalysisResult {
    let tokens = Lexer::new(source).tokenize().expect("Failed to tokenize");
    Parser::new(source, &tokens).parse().expect("Failed to parse")
}

fn gen_opt(source: &str, opt: CodeGenOpt) -> String {
    let codes = code_gen(&analyze(source), "test", "go", true, opt).expect("Failed to generate");
    codes["test"].clone()
}

fn r#gen(source: &str) -> String {
    gen_opt(source, CodeGenOpt::default())
}

fn base(t: RealBaseType) -> Type {
    Type::Base(BaseType {
        inner: t,
        annotations: Vec::new(),
    })
}

#[test]
fn test_expand_base_type_table() {
    let typedefs = IndexMap::new();
    let cases = [
        (RealBaseType::Bool, "bool"),
        (RealBaseType::Byte, "uint32"),
        (RealBaseType::I8, "int32"),
        (RealBaseType::I16, "int32"),
        (RealBaseType::I32, "int32"),
        (RealBaseType::I64, "int64"),
        (RealBaseType::Double, "double"),
        (RealBaseType::String, "string"),
        (RealBaseType::Binary, "bytes"),
    ];
    for (input, expected) in cases {
        assert_eq!(expand_type(&base(input), &typedefs), expected);
    }
}

#[test]
fn test_expand_unresolved_udf_passes_through() {
    assert_eq!(expand_type(&Type::Udf("Foo".to_string()), &IndexMap::new()), "Foo");
}

#[test]
fn test_expand_typedef_chain_collapses_to_fixed_point() {
    let result = analyze(indoc! {"
        typedef list<i64> Ids
        typedef Ids AliasedIds
    "});
    let expanded = expand_type(&Type::Udf("AliasedIds".to_string()), &result.typedefs);
    assert_eq!(expanded, "repeated int64");
    // Same as expanding the chain's tail directly.
    assert_eq!(
        expanded,
        expand_type(&result.typedefs["Ids"].original_type, &result.typedefs)
    );
}

#[test]
fn test_expand_set_equals_list() {
    let inner = base(RealBaseType::String);
    let set = Type::Set(Box::new(inner.clone()));
    let list = Type::List(Box::new(inner));
    let typedefs = IndexMap::new();
    assert_eq!(expand_type(&set, &typedefs), expand_type(&list, &typedefs));
    assert_eq!(expand_type(&set, &typedefs), "repeated string");
}

#[test]
fn test_expand_map() {
    let map = Type::Map(Box::new(crate::ir::MapType {
        key: base(RealBaseType::String),
        value: base(RealBaseType::I32),
    }));
    assert_eq!(expand_type(&map, &IndexMap::new()), "map<string, int32>");
}

#[test]
fn test_minimal_struct_output() {
    let text = r#gen("struct A { 1: i32 x }");
    assert_eq!(
        text,
        "syntax = \"proto3\";\n\
         package test;\n\
         \n\
         // Code generated by thriftpp. DO NOT EDIT.\n\
         import \"google/api/annotations.proto\";\n\
         import \"dirpc/dirpc.proto\";\n\
         \n\
         \n\
         message A {\n\
         \tint32 x = 1;\n\
         }\n\
         \n"
    );
}

#[test]
fn test_typedef_collapse_in_struct() {
    let text = r#gen(indoc! {"
        typedef list<i64> Ids
        struct B { 1: Ids v }
    "});
    assert!(text.contains("repeated int64 v = 1;"));
}

#[test]
fn test_set_downgrades_to_repeated() {
    let text = r#gen("struct C { 1: set<string> s }");
    assert!(text.contains("repeated string s = 1;"));
}

#[test]
fn test_optional_prefix_rules() {
    let opt = CodeGenOpt {
        proto3_with_optional: true,
    };
    let text = gen_opt(
        indoc! {"
            struct A {
                1: optional string s
                2: optional map<string,i32> m
                3: optional list<i32> l
                4: required i32 r
            }
        "},
        opt,
    );
    assert!(text.contains("optional string s = 1;"));
    // Repeated and map fields never take the optional prefix.
    assert!(text.contains("\tmap<string, int32> m = 2;"));
    assert!(text.contains("\trepeated int32 l = 3;"));
    assert!(text.contains("\tint32 r = 4;"));
}

#[test]
fn test_optional_prefix_off_by_default() {
    let text = r#gen("struct A { 1: optional string s }");
    assert!(text.contains("\tstring s = 1;"));
}

#[test]
fn test_enum_sorted_with_positional_zero_substitution() {
    let text = r#gen(indoc! {"
        enum E {
            B = 7,
            A = 0
        }
    "});
    let a_pos = text.find("A=0;").expect("A entry");
    let b_pos = text.find("B=7;").expect("B entry");
    assert!(a_pos < b_pos);
}

#[test]
fn test_enum_unvalued_fields_take_positional_index() {
    let text = r#gen(indoc! {"
        enum F {
            X = 2,
            Y = 0,
            Z
        }
    "});
    assert!(text.contains("\tY=0;"));
    assert!(text.contains("\tZ=1;"));
    assert!(text.contains("\tX=2;"));
}

#[test]
fn test_enum_field_desc_annotation_becomes_comment() {
    let text = r#gen(r#"enum E { A = 1 (desc="first one") }"#);
    assert!(text.contains("\tA=1; //first one"));
}

#[test]
fn test_json_annotation_emits_json_name_brackets() {
    let text = r#gen(r#"struct A { 1: i32 x (json="jx") }"#);
    assert!(text.contains("int32 x = 1 [json_name = \"jx\"];"));
}

#[test]
fn test_desc_only_annotation_elides_brackets() {
    let text = r#gen(r#"struct A { 1: i32 x (desc="the x") }"#);
    assert!(text.contains("int32 x = 1; //the x"));
    assert!(!text.contains("["));
}

#[test]
fn test_desc_and_json_combined() {
    let text = r#gen(r#"struct A { 1: i32 x (desc="d", json="j") }"#);
    assert!(text.contains("int32 x = 1 [json_name = \"j\"]; //d"));
}

#[test]
fn test_invalid_field_annotations_chain() {
    let err = code_gen(
        &analyze(r#"struct A { 1: i32 x (foo="1", bar="2") }"#),
        "test",
        "go",
        true,
        CodeGenOpt::default(),
    )
    .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("invalid field annotation \"foo\""));
    assert!(msg.contains("invalid field annotation \"bar\""));
}

#[test]
fn test_service_with_http_options() {
    let text = r#gen(indoc! {r#"
        service Greeter {
            Reply hello(1: Request req) (path="/p", httpMethod="POST", contentType="json")
        } (servType="http", version="1", servName="x")
    "#});
    assert!(text.contains("service Greeter {"));
    assert!(text.contains("rpc hello ( Request ) returns ( Reply ) {"));
    assert!(text.contains("option (google.api.http) = {"));
    assert!(text.contains("post: \"/p\""));
    assert!(text.contains("body: \"*\""));
    assert!(text.contains("option (dirpc.method_opt) = {"));
    assert!(text.contains("contentType: \"json\""));
    assert!(text.contains("option (dirpc.service_opt) = {"));
    assert!(text.contains("version: \"1\""));
    assert!(text.contains("servName: \"x\""));
    assert!(text.contains("servType: \"http\""));
}

#[test]
fn test_get_method_has_no_body_clause() {
    let text = r#gen(indoc! {r#"
        service S {
            Reply f(1: Req r) (path="/q", httpMethod="GET")
        } (servType="http", version="1", servName="x")
    "#});
    assert!(text.contains("get: \"/q\""));
    assert!(!text.contains("body: \"*\""));
}

#[test]
fn test_service_opt_defaults() {
    let text = r#gen("service S { }");
    assert!(text.contains("version: 0.0.1"));
    assert!(text.contains("servType: http"));
    assert!(!text.contains("servName:"));
}

#[test]
fn test_service_opt_retry_aliasing() {
    let text = r#gen(r#"service S { } (servType="http", retryCount="3")"#);
    assert!(text.contains("retry: 3"));

    let text = r#gen(r#"service S { } (servType="http", retry="2", retryCount="3")"#);
    assert!(text.contains("retry: 2"));
    assert!(!text.contains("retry: 3"));
}

#[test]
fn test_service_timeouts_in_service_opt() {
    let text = r#gen(indoc! {r#"
        service S {
        } (servType="grpc", timeoutMsec="100", connectTimeoutMsec="50",
           minHealthyRatio="0", healthyThreshold="5", maxCooldownTime="60")
    "#});
    assert!(text.contains("timeoutMsec: 100"));
    assert!(text.contains("connectTimeoutMsec: 50"));
    assert!(text.contains("minHealthyRatio: 0"));
    assert!(text.contains("healthyThreshold: 5"));
    assert!(text.contains("maxCooldownTime: 60"));
}

#[test]
fn test_exactly_one_rpc_input() {
    let err = code_gen(
        &analyze("service S { Reply f(1: A a, 2: B b) }"),
        "test",
        "go",
        true,
        CodeGenOpt::default(),
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "grpc requires exact one input, function f has 2"
    );
}

#[test]
fn test_package_from_matching_namespace() {
    let text = r#gen("namespace go my.pkg\nstruct A { 1: i32 x }");
    assert!(text.contains("package my.pkg;"));

    // No matching scope falls back to the unit name.
    let text = r#gen("namespace java other.pkg\nstruct A { 1: i32 x }");
    assert!(text.contains("package test;"));
}

#[test]
fn test_php_namespace_options() {
    let result = analyze("namespace php a.b\nstruct A { 1: i32 x }");
    let codes =
        code_gen(&result, "test", "php", true, CodeGenOpt::default()).expect("Failed to generate");
    let text = &codes["test"];
    assert!(text.contains(r#"option php_namespace = "a\\b";"#));
    assert!(text.contains(r#"option php_metadata_namespace = "a\\b\\GPBMetadata";"#));
}

#[test]
fn test_unit_without_service_has_no_service_block() {
    let text = r#gen(indoc! {"
        enum E { A = 1 }
        struct A { 1: i32 x }
    "});
    assert!(text.contains("enum E {"));
    assert!(text.contains("message A {"));
    assert!(!text.contains("service "));
}

#[test]
fn test_includes_generate_child_units_without_main_imports() {
    let mut root = analyze("include \"base.thrift\"\nstruct R { 1: base.Item item }");
    root.includes
        .insert("base".to_string(), analyze("struct Item { 1: i32 id }"));
    let codes =
        code_gen(&root, "main", "go", true, CodeGenOpt::default()).expect("Failed to generate");

    let main = &codes["main"];
    assert!(main.contains("import \"base.proto\";"));
    assert!(main.contains("import \"google/api/annotations.proto\";"));

    let child = &codes["base"];
    assert!(child.contains("message Item {"));
    assert!(child.contains("package base;"));
    assert!(!child.contains("google/api"));
    assert!(!child.contains("dirpc"));
}

#[test]
fn test_declarations_emitted_in_sequence_order() {
    let text = r#gen(indoc! {"
        struct Second { 1: i32 x }
        enum First { A = 1 }
        struct Third { 1: i32 y }
    "});
    // Enums precede structs; structs keep their source order.
    let first = text.find("enum First").expect("enum");
    let second = text.find("message Second").expect("second");
    let third = text.find("message Third").expect("third");
    assert!(first < second);
    assert!(second < third);
}

#[test]
fn test_struct_leading_comment() {
    let text = r#gen("/* account record */\nstruct A { 1: i32 x }");
    assert!(text.contains("//account record\nmessage A {"));
}

#[test]
fn test_function_comments_in_service_block() {
    let text = r#gen(indoc! {r#"
        service S {
            /* does things */
            Reply f(1: Req r) // tail
        }
    "#});
    assert!(text.contains("\t//does things\n"));
    assert!(text.contains("} //tail"));
}

#[test]
fn test_field_same_line_comment_wins_over_desc() {
    let text = r#gen("struct A { 1: i32 x (desc=\"from desc\") // inline\n}");
    assert!(text.contains("int32 x = 1; //inline"));
    assert!(!text.contains("from desc"));
}
