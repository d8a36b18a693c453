//! Include resolution.
//!
//! Includes are loaded depth-first on the same call stack. A set of include
//! paths currently being resolved detects cycles; each child unit is keyed
//! in its parent's `includes` map by reference name (basename cut at the
//! first dot).

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::diag::CompileError;
use crate::ir::AnalysisResult;
use crate::lexer::Lexer;
use crate::parse::Parser;
use crate::semck;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("illegal include path: {0}")]
    IllegalIncludePath(String),

    #[error("cycled include {0}")]
    CycledInclude(String),

    #[error("fail to load include file: {path}, due to {source}")]
    LoadInclude { path: String, source: io::Error },

    #[error("fail to parse idl: {path}, due to {source}")]
    ParseInclude {
        path: String,
        source: Box<CompileError>,
    },
}

/// Source of include file contents. The default implementation walks a
/// directory list; tests substitute an in-memory map.
pub trait IncludeSearcher {
    fn open(&self, file: &str) -> io::Result<String>;
}

pub struct DirSearcher {
    dirs: Vec<PathBuf>,
}

impl DirSearcher {
    /// `.` is appended when the list does not contain it.
    pub fn new<S: AsRef<str>>(dirs: &[S]) -> Self {
        let mut out: Vec<PathBuf> = dirs.iter().map(|d| PathBuf::from(d.as_ref())).collect();
        if !out.iter().any(|d| d == Path::new(".")) {
            out.push(PathBuf::from("."));
        }
        DirSearcher { dirs: out }
    }
}

impl IncludeSearcher for DirSearcher {
    fn open(&self, file: &str) -> io::Result<String> {
        for dir in &self.dirs {
            if let Ok(data) = std::fs::read_to_string(dir.join(file)) {
                return Ok(data);
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("cannot find {} in any of the {:?}", file, self.dirs),
        ))
    }
}

/// Parses the root IDL text and, unless `single_mode` is set, resolves its
/// includes recursively. When `check_dirpc` is set, every unit defining a
/// service is validated against the DiRPC annotation rules. `root_name` is
/// the root file's own name; seeding the in-flight set with it makes a
/// cycle back through the root report the root's path.
pub fn analyze(
    idl: &str,
    root_name: Option<&str>,
    dirs: &[String],
    single_mode: bool,
    check_dirpc: bool,
) -> Result<AnalysisResult, CompileError> {
    let searcher = DirSearcher::new(dirs);
    let mut searched = HashSet::new();
    if let Some(name) = root_name {
        searched.insert(name.to_string());
    }
    parse_idl(idl, &searcher, &mut searched, single_mode, check_dirpc)
}

pub fn parse_idl(
    idl: &str,
    searcher: &dyn IncludeSearcher,
    searched: &mut HashSet<String>,
    single_mode: bool,
    check_dirpc: bool,
) -> Result<AnalysisResult, CompileError> {
    let tokens = Lexer::new(idl).tokenize()?;
    let mut result = Parser::new(idl, &tokens).parse()?;

    if !single_mode {
        let mut seen = HashSet::new();
        let include_names: Vec<String> = result
            .include_names
            .iter()
            .map(|inc| inc.name.clone())
            .collect();
        for include_path in include_names {
            if !seen.insert(include_path.clone()) {
                continue;
            }
            let ref_name = reference_name(&include_path)?;
            if searched.contains(&include_path) {
                return Err(ResolveError::CycledInclude(include_path).into());
            }
            let sub_idl =
                searcher
                    .open(&include_path)
                    .map_err(|source| ResolveError::LoadInclude {
                        path: include_path.clone(),
                        source,
                    })?;
            searched.insert(include_path.clone());
            let child = parse_idl(&sub_idl, searcher, searched, single_mode, check_dirpc)
                .map_err(|source| ResolveError::ParseInclude {
                    path: include_path.clone(),
                    source: Box::new(source),
                })?;
            searched.remove(&include_path);
            result.includes.insert(ref_name, child);
        }
    }

    if check_dirpc {
        semck::dirpc_fields_check(&result)?;
    }
    Ok(result)
}

/// Basename cut at the first extension dot. A path without a dot in its
/// basename is rejected.
pub fn reference_name(include_path: &str) -> Result<String, ResolveError> {
    let base = Path::new(include_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    match base.find('.') {
        Some(idx) if idx > 0 => Ok(base[..idx].to_string()),
        _ => Err(ResolveError::IllegalIncludePath(include_path.to_string())),
    }
}

#[cfg(test)]
#[path = "tests/t_include.rs"]
mod t_include;
