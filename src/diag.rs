use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

use thiserror::Error;

use crate::codegen::CodegenError;
use crate::include::ResolveError;
use crate::lexer::LexError;
use crate::parse::ParseError;
use crate::semck::SemCheckError;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    SemCheck(#[from] SemCheckError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error("IO error: {path}: {source}", path = .0.display(), source = .1)]
    Io(PathBuf, std::io::Error),
}

impl CompileError {
    /// Source span of the error, when it points at a location in the root
    /// IDL. Errors raised inside included units carry no span; they are
    /// already stringified with the include path.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Lex(e) => Some(e.span()),
            CompileError::Parse(e) => e.span(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn start() -> Self {
        Position {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self {
            start: Position::start(),
            end: Position::start(),
        }
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Formats an error with a source snippet and a marker line under the span.
///
/// ```text
/// (3:9) Unexpected character: @
/// │ 2 │ struct A {
/// │ 3 │     1: @ x
/// │   │        ^
/// │ 4 │ }
/// ```
///
/// One line of context is shown before and after the span. A single-column
/// span gets a caret, anything wider a run of dashes.
pub fn format_error(source: &str, span: Span, error: impl Display) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let start_line = span.start.line.max(1);
    let end_line = span.end.line.max(start_line).min(lines.len().max(1));

    let first = start_line.saturating_sub(1).max(1);
    let last = (end_line + 1).min(lines.len());
    let width = last.max(1).to_string().len();

    let mut out = format!("({}:{}) {}\n", span.start.line, span.start.column, error);
    for line_no in first..=last {
        let content = lines.get(line_no - 1).copied().unwrap_or("");
        out.push_str(&format!("│ {line_no:>width$} │ {content}\n"));

        if line_no < start_line || line_no > end_line {
            continue;
        }
        let from = if line_no == start_line {
            span.start.column.max(1)
        } else {
            1
        };
        let to = if line_no == end_line {
            span.end.column.max(from)
        } else {
            content.chars().count() + 1
        };
        if to > from || (to == from && start_line == end_line) {
            let len = (to - from).max(1);
            let marker = if len == 1 && start_line == end_line {
                "^".to_string()
            } else {
                "-".repeat(len)
            };
            out.push_str(&format!(
                "│ {:>width$} │ {}{}\n",
                "",
                " ".repeat(from - 1),
                marker
            ));
        }
    }
    out
}
