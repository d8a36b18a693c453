//! Per-IDL translation driver: analysis, validation, generation.

use std::path::Path;

use indexmap::IndexMap;

use crate::codegen::{self, CodeGenOpt};
use crate::diag::CompileError;
use crate::include;
use crate::semck;

pub struct ConvertOptions<'a> {
    /// Include search directories.
    pub dirs: &'a [String],
    /// Namespace scope picked for the package name.
    pub lang: &'a str,
    pub key_words_file: Option<&'a Path>,
    /// Disables include resolution entirely.
    pub single_mode: bool,
    /// Validate only, emit nothing.
    pub syntax_check_only: bool,
    pub proto3_with_optional: bool,
    /// Enforce the DiRPC annotation matrix on units defining services.
    pub check_dirpc: bool,
}

/// Translates one root IDL. Returns `None` under syntax-check-only, else the
/// proto3 text of the root unit and every transitively included unit, keyed
/// by reference name.
pub fn convert(
    source: &str,
    entry: &str,
    opts: &ConvertOptions,
) -> Result<Option<IndexMap<String, String>>, CompileError> {
    let root_name = Path::new(entry)
        .file_name()
        .map(|n| n.to_string_lossy().to_string());
    let result = include::analyze(
        source,
        root_name.as_deref(),
        opts.dirs,
        opts.single_mode,
        opts.check_dirpc,
    )?;
    semck::check_key_words(&result, opts.key_words_file)?;
    if opts.syntax_check_only {
        return Ok(None);
    }

    let name = Path::new(entry)
        .file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| entry.to_string());
    let codes = codegen::code_gen(
        &result,
        &name,
        opts.lang,
        true,
        CodeGenOpt {
            proto3_with_optional: opts.proto3_with_optional,
        },
    )?;
    Ok(Some(codes))
}
