use super::*;
use std::collections::HashMap;
use indoc::indoc;

struct MapSearcher(HashMap<&'static str, &'static str>);

impl IncludeSearcher for MapSearcher {
    fn open(&self, file: &str) -> io::Result<String> {
        self.0
            .get(file)
            .map(|s| s.to_string())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no {file}")))
    }
}

fn resolve(
    idl: &str,
    files: &[(&'static str, &'static str)],
    single_mode: bool,
) -> Result<AnalysisResult, CompileError> {
    let searcher = MapSearcher(files.iter().cloned().collect());
    parse_idl(idl, &searcher, &mut HashSet::new(), single_mode, false)
}

#[test]
fn test_resolve_includes_by_reference_name() {
    let root = indoc! {r#"
        include "base.thrift"
        struct Root { 1: base.Item item }
    "#};
    let result = resolve(root, &[("base.thrift", "struct Item { 1: i32 id }")], false)
        .expect("resolution should succeed");
    assert_eq!(result.includes.len(), 1);
    let base = &result.includes["base"];
    assert!(base.struct_defs.contains_key("Item"));
}

#[test]
fn test_nested_includes() {
    let result = resolve(
        r#"include "a.thrift""#,
        &[
            ("a.thrift", "include \"b.thrift\"\nstruct A { 1: i32 x }"),
            ("b.thrift", "struct B { 1: i32 y }"),
        ],
        false,
    )
    .expect("resolution should succeed");
    assert!(result.includes["a"].includes.contains_key("b"));
}

#[test]
fn test_duplicate_include_resolved_once() {
    let root = indoc! {r#"
        include "base.thrift"
        include "base.thrift"
    "#};
    let result = resolve(root, &[("base.thrift", "struct Item { 1: i32 id }")], false)
        .expect("resolution should succeed");
    // Both directives survive for import emission; the child is resolved once.
    assert_eq!(result.include_names.len(), 2);
    assert_eq!(result.includes.len(), 1);
}

#[test]
fn test_cycled_include() {
    let err = resolve(
        r#"include "b.thrift""#,
        &[
            ("b.thrift", r#"include "c.thrift""#),
            ("c.thrift", r#"include "b.thrift""#),
        ],
        false,
    )
    .unwrap_err();
    assert!(err.to_string().contains("cycled include b.thrift"));
}

#[test]
fn test_cycle_back_to_root_reports_root_path() {
    let searcher = MapSearcher(
        [("b.thrift", r#"include "a.thrift""#)].into_iter().collect(),
    );
    let mut searched = HashSet::new();
    searched.insert("a.thrift".to_string());
    let err = parse_idl(
        r#"include "b.thrift""#,
        &searcher,
        &mut searched,
        false,
        false,
    )
    .unwrap_err();
    assert!(err.to_string().contains("cycled include a.thrift"));
}

#[test]
fn test_illegal_include_path() {
    let err = resolve(r#"include "noext""#, &[("noext", "")], false).unwrap_err();
    assert!(err.to_string().contains("illegal include path: noext"));
}

#[test]
fn test_missing_include_file() {
    let err = resolve(r#"include "gone.thrift""#, &[], false).unwrap_err();
    assert!(
        err.to_string()
            .contains("fail to load include file: gone.thrift")
    );
}

#[test]
fn test_single_mode_skips_resolution() {
    let result = resolve(r#"include "gone.thrift""#, &[], true)
        .expect("single mode should not resolve includes");
    assert_eq!(result.include_names.len(), 1);
    assert!(result.includes.is_empty());
}

#[test]
fn test_reference_name() {
    assert_eq!(reference_name("base.thrift").unwrap(), "base");
    assert_eq!(reference_name("dir/sub.v2.thrift").unwrap(), "sub");
    assert!(reference_name("noext").is_err());
}

#[test]
fn test_dir_searcher_appends_current_dir() {
    let searcher = DirSearcher::new(&["some/dir"]);
    assert_eq!(searcher.dirs.len(), 2);
    assert_eq!(searcher.dirs[1], Path::new("."));
}

#[test]
fn test_parse_error_in_include_is_wrapped() {
    let err = resolve(
        r#"include "bad.thrift""#,
        &[("bad.thrift", "struct {")],
        false,
    )
    .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("fail to parse idl: bad.thrift"));
}
