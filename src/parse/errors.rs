use thiserror::Error;

use crate::diag::Span;
use crate::ir::builder::BuildError;
use crate::lexer::{Token, TokenKind};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Expected declaration, found: {0}")]
    ExpectedDecl(Token),

    #[error("Expected {0}, found: {1}")]
    ExpectedToken(TokenKind, Token),

    #[error("Expected identifier, found: {0}")]
    ExpectedIdent(Token),

    #[error("Expected type, found: {0}")]
    ExpectedType(Token),

    #[error("Expected string literal, found: {0}")]
    ExpectedStringLit(Token),

    #[error("Expected integer, found: {0}")]
    ExpectedIntLit(Token),

    #[error("Expected constant value, found: {0}")]
    ExpectedConstValue(Token),

    #[error("Expected annotation value, found: {0}")]
    ExpectedAnnotationValue(Token),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::ExpectedDecl(token) => Some(token.span),
            ParseError::ExpectedToken(_, token) => Some(token.span),
            ParseError::ExpectedIdent(token) => Some(token.span),
            ParseError::ExpectedType(token) => Some(token.span),
            ParseError::ExpectedStringLit(token) => Some(token.span),
            ParseError::ExpectedIntLit(token) => Some(token.span),
            ParseError::ExpectedConstValue(token) => Some(token.span),
            ParseError::ExpectedAnnotationValue(token) => Some(token.span),
            ParseError::Build(_) => None,
        }
    }
}
