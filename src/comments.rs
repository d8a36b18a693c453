//! Comment attachment.
//!
//! Comments live on trivia channels in the token stream. For a declaration
//! delimited by its start and stop tokens, multi-line comments in the trivia
//! run immediately left of the start token attach (a blank line breaks the
//! run), and a single-line comment attaches from the right of the stop token
//! when it sits on the same source line, else from the line directly above
//! the start token. Whitespace carrying a newline breaks attachment in both
//! single-line cases; single-line comment tokens swallow their own newline,
//! so "directly above" means no whitespace newline in between.

use crate::ir::Comments;
use crate::lexer::{Token, TokenKind};

pub fn extract(tokens: &[Token], start: usize, stop: usize) -> Comments {
    Comments {
        multi_line: multi_line_before(tokens, start),
        single_line: single_line_for(tokens, start, stop),
    }
}

/// All multi-line comments in the trivia run left of `start`, joined with
/// newlines. The scan stops at a significant token or at a blank line.
fn multi_line_before(tokens: &[Token], start: usize) -> String {
    let mut collected: Vec<&str> = Vec::new();
    for token in tokens[..start].iter().rev() {
        match &token.kind {
            TokenKind::Whitespace { newlines } => {
                if *newlines >= 2 {
                    break;
                }
            }
            TokenKind::MlComment(text) => collected.push(text),
            TokenKind::SlComment(_) => {}
            _ => break,
        }
    }
    collected.reverse();
    collected.join("\n")
}

fn single_line_for(tokens: &[Token], start: usize, stop: usize) -> String {
    // Prefer a comment to the right of the stop token, on the same line.
    let mut newline_seen = false;
    for token in tokens.iter().skip(stop + 1) {
        match &token.kind {
            TokenKind::Whitespace { newlines } => {
                if *newlines > 0 {
                    newline_seen = true;
                }
            }
            TokenKind::SlComment(text) => {
                if !newline_seen {
                    return text.clone();
                }
                break;
            }
            TokenKind::MlComment(_) => {}
            _ => break,
        }
    }

    // Fall back to the last comment directly above the start token.
    let mut newline_seen = false;
    for token in tokens[..start].iter().rev() {
        match &token.kind {
            TokenKind::Whitespace { newlines } => {
                if *newlines > 0 {
                    newline_seen = true;
                }
            }
            TokenKind::SlComment(text) => {
                if !newline_seen {
                    return text.clone();
                }
                break;
            }
            TokenKind::MlComment(_) => {}
            _ => break,
        }
    }

    String::new()
}

#[cfg(test)]
#[path = "tests/t_comments.rs"]
mod t_comments;
