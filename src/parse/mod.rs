//! Recursive-descent Thrift parser.
//!
//! The parser walks the lexed token stream and fires the matching
//! [`IrBuilder`] exit event at the end of each production, in post order.
//! That keeps the builder's annotation-drain points in exactly the order a
//! parse-tree walk would produce. Trivia tokens are skipped when advancing
//! but stay addressable by index for comment attachment.

mod errors;

pub use errors::ParseError;

use crate::comments;
use crate::ir::builder::IrBuilder;
use crate::ir::{AnalysisResult, Comments, FieldReq, RealBaseType};
use crate::lexer::{Token, TokenKind, TokenKind as TK};

pub struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    /// Index of the current significant token.
    pos: usize,
    /// Index of the most recently consumed significant token.
    prev: usize,
    curr_token: &'a Token,
    builder: IrBuilder,
    current_service: String,
}

impl<'a> Parser<'a> {
    /// `tokens` must be the full stream for `source`, terminated by `Eof`.
    pub fn new(source: &'a str, tokens: &'a [Token]) -> Self {
        let mut pos = 0;
        while tokens[pos].is_trivia() {
            pos += 1;
        }
        Parser {
            source,
            tokens,
            pos,
            prev: pos,
            curr_token: &tokens[pos],
            builder: IrBuilder::new(),
            current_service: String::new(),
        }
    }

    pub fn parse(mut self) -> Result<AnalysisResult, ParseError> {
        while self.curr_token.kind != TK::Eof {
            self.parse_item()?;
        }
        Ok(self.builder.finish())
    }

    fn advance(&mut self) {
        if self.curr_token.kind == TK::Eof {
            return;
        }
        self.prev = self.pos;
        self.pos += 1;
        while self.tokens[self.pos].is_trivia() {
            self.pos += 1;
        }
        self.curr_token = &self.tokens[self.pos];
    }

    fn peek(&self) -> &Token {
        let mut i = self.pos + 1;
        while i < self.tokens.len() && self.tokens[i].is_trivia() {
            i += 1;
        }
        self.tokens
            .get(i)
            .unwrap_or(&self.tokens[self.tokens.len() - 1])
    }

    fn consume(&mut self, expected: &TokenKind) -> Result<(), ParseError> {
        if self.curr_token.kind == *expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::ExpectedToken(
                expected.clone(),
                self.curr_token.clone(),
            ))
        }
    }

    fn parse_ident(&mut self) -> Result<String, ParseError> {
        if let TK::Ident(name) = &self.curr_token.kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(ParseError::ExpectedIdent(self.curr_token.clone()))
        }
    }

    fn parse_string_lit(&mut self) -> Result<String, ParseError> {
        if let TK::StringLit(text) = &self.curr_token.kind {
            let text = text.clone();
            self.advance();
            Ok(text)
        } else {
            Err(ParseError::ExpectedStringLit(self.curr_token.clone()))
        }
    }

    fn skip_list_separator(&mut self) {
        if matches!(self.curr_token.kind, TK::Comma | TK::Semicolon) {
            self.advance();
        }
    }

    fn comments(&self, start: usize, stop: usize) -> Comments {
        comments::extract(self.tokens, start, stop)
    }

    fn line(&self) -> usize {
        self.curr_token.span.start.line
    }

    fn parse_item(&mut self) -> Result<(), ParseError> {
        match self.curr_token.kind {
            TK::KwInclude => self.parse_include(),
            TK::KwCppInclude => self.parse_cpp_include(),
            TK::KwNamespace => self.parse_namespace(),
            TK::KwConst => self.parse_const(),
            TK::KwTypedef => self.parse_typedef(),
            TK::KwEnum => self.parse_enum(),
            TK::KwSenum => self.parse_senum(),
            TK::KwStruct => self.parse_struct(),
            TK::KwUnion => self.parse_union(),
            TK::KwException => self.parse_exception(),
            TK::KwService => self.parse_service(),
            _ => Err(ParseError::ExpectedDecl(self.curr_token.clone())),
        }
    }

    fn parse_include(&mut self) -> Result<(), ParseError> {
        self.consume(&TK::KwInclude)?;
        let literal = self.parse_string_lit()?;
        self.builder.exit_include(&literal);
        Ok(())
    }

    /// Accepted and ignored; cpp includes have no proto3 counterpart.
    fn parse_cpp_include(&mut self) -> Result<(), ParseError> {
        self.consume(&TK::KwCppInclude)?;
        self.parse_string_lit()?;
        Ok(())
    }

    fn parse_namespace(&mut self) -> Result<(), ParseError> {
        self.consume(&TK::KwNamespace)?;
        let scope = if self.curr_token.kind == TK::Star {
            self.advance();
            "*".to_string()
        } else {
            self.parse_ident()?
        };
        let name = match &self.curr_token.kind {
            TK::StringLit(text) => {
                let name = text.trim_matches(['"', '\'']).to_string();
                self.advance();
                name
            }
            _ => self.parse_ident()?,
        };
        self.builder.exit_namespace(scope, name);
        Ok(())
    }

    fn parse_typedef(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let line = self.line();
        self.consume(&TK::KwTypedef)?;
        self.parse_field_type()?;
        let name = self.parse_ident()?;
        self.parse_type_annotations()?;
        let comments = self.comments(start, self.prev);
        self.builder.exit_typedef(name, comments, line);
        Ok(())
    }

    fn parse_const(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.consume(&TK::KwConst)?;
        let ty_start = self.curr_token.span.start.offset;
        self.parse_field_type()?;
        let ty_text = self.source[ty_start..self.tokens[self.prev].span.end.offset].to_string();
        let name = self.parse_ident()?;
        self.consume(&TK::Equals)?;
        let value_text = self.parse_const_value()?;
        self.skip_list_separator();
        let comments = self.comments(start, self.prev);
        self.builder.exit_const(name, ty_text, value_text, comments);
        Ok(())
    }

    fn parse_enum(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let line = self.line();
        self.consume(&TK::KwEnum)?;
        let name = self.parse_ident()?;
        self.consume(&TK::LBrace)?;
        while self.curr_token.kind != TK::RBrace {
            self.parse_enum_field()?;
        }
        self.consume(&TK::RBrace)?;
        self.parse_type_annotations()?;
        let comments = self.comments(start, self.prev);
        self.builder.exit_enum(name, comments, line);
        Ok(())
    }

    fn parse_enum_field(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let key = self.parse_ident()?;
        let value = if self.curr_token.kind == TK::Equals {
            self.advance();
            match &self.curr_token.kind {
                TK::IntLit(v) => {
                    let v = *v;
                    self.advance();
                    Some(v)
                }
                TK::HexLit(v) => {
                    let v = *v;
                    self.advance();
                    Some(v)
                }
                _ => return Err(ParseError::ExpectedIntLit(self.curr_token.clone())),
            }
        } else {
            None
        };
        self.parse_type_annotations()?;
        self.skip_list_separator();
        let comments = self.comments(start, self.prev);
        self.builder.exit_enum_field(key, value, comments);
        Ok(())
    }

    /// senum is deprecated Thrift; the body is parsed and discarded.
    fn parse_senum(&mut self) -> Result<(), ParseError> {
        self.consume(&TK::KwSenum)?;
        self.parse_ident()?;
        self.consume(&TK::LBrace)?;
        while self.curr_token.kind != TK::RBrace {
            self.parse_string_lit()?;
            self.skip_list_separator();
        }
        self.consume(&TK::RBrace)?;
        self.parse_type_annotations()?;
        self.builder.exit_senum();
        Ok(())
    }

    fn parse_struct(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let line = self.line();
        self.consume(&TK::KwStruct)?;
        let name = self.parse_ident()?;
        let lbrace = self.pos;
        self.consume(&TK::LBrace)?;
        while self.curr_token.kind != TK::RBrace {
            self.parse_field()?;
        }
        self.consume(&TK::RBrace)?;
        self.parse_type_annotations()?;
        // The struct's own single-line comment hangs off the opening brace.
        let comments = self.comments(start, lbrace);
        self.builder.exit_struct(name, comments, line)?;
        Ok(())
    }

    fn parse_union(&mut self) -> Result<(), ParseError> {
        self.consume(&TK::KwUnion)?;
        self.parse_ident()?;
        self.consume(&TK::LBrace)?;
        while self.curr_token.kind != TK::RBrace {
            self.parse_field()?;
        }
        self.consume(&TK::RBrace)?;
        self.parse_type_annotations()?;
        self.builder.exit_union();
        Ok(())
    }

    fn parse_exception(&mut self) -> Result<(), ParseError> {
        self.consume(&TK::KwException)?;
        self.parse_ident()?;
        self.consume(&TK::LBrace)?;
        while self.curr_token.kind != TK::RBrace {
            self.parse_field()?;
        }
        self.consume(&TK::RBrace)?;
        self.parse_type_annotations()?;
        self.builder.exit_exception();
        Ok(())
    }

    fn parse_field(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let field_id = if let TK::IntLit(v) = &self.curr_token.kind
            && self.peek().kind == TK::Colon
        {
            let v = *v;
            self.advance();
            self.advance();
            Some(v)
        } else {
            None
        };
        let req = match self.curr_token.kind {
            TK::KwRequired => {
                self.advance();
                FieldReq::Required
            }
            TK::KwOptional => {
                self.advance();
                FieldReq::Optional
            }
            _ => FieldReq::Required,
        };
        self.parse_field_type()?;
        let name = self.parse_ident()?;
        let default_value = if self.curr_token.kind == TK::Equals {
            self.advance();
            Some(self.parse_const_value()?)
        } else {
            None
        };
        self.parse_type_annotations()?;
        self.skip_list_separator();
        let comments = self.comments(start, self.prev);
        self.builder
            .exit_field(name, field_id, req, default_value, comments)?;
        Ok(())
    }

    fn parse_service(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let line = self.line();
        self.consume(&TK::KwService)?;
        let name = self.parse_ident()?;
        if self.curr_token.kind == TK::KwExtends {
            self.advance();
            self.parse_ident()?;
        }
        self.consume(&TK::LBrace)?;
        self.current_service = name.clone();
        while self.curr_token.kind != TK::RBrace {
            self.parse_function()?;
        }
        self.consume(&TK::RBrace)?;
        self.parse_type_annotations()?;
        self.current_service.clear();
        let comments = self.comments(start, self.prev);
        self.builder.exit_service(name, comments, line);
        Ok(())
    }

    fn parse_function(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        if self.curr_token.kind == TK::KwOneway {
            self.advance();
        }
        if self.curr_token.kind == TK::KwVoid {
            self.advance();
            self.builder.exit_udf_type("void".to_string());
        } else {
            self.parse_field_type()?;
        }
        let name = self.parse_ident()?;
        self.consume(&TK::LParen)?;
        while self.curr_token.kind != TK::RParen {
            self.parse_field()?;
        }
        self.consume(&TK::RParen)?;
        if self.curr_token.kind == TK::KwThrows {
            self.advance();
            self.builder.enter_throws();
            self.consume(&TK::LParen)?;
            while self.curr_token.kind != TK::RParen {
                self.parse_field()?;
            }
            self.consume(&TK::RParen)?;
            self.builder.exit_throws();
        }
        self.parse_type_annotations()?;
        self.skip_list_separator();
        let comments = self.comments(start, self.prev);
        let service = self.current_service.clone();
        self.builder.exit_function(name, &service, comments);
        Ok(())
    }

    fn parse_field_type(&mut self) -> Result<(), ParseError> {
        let base = match self.curr_token.kind {
            TK::KwBool => Some(RealBaseType::Bool),
            TK::KwByte => Some(RealBaseType::Byte),
            TK::KwI8 => Some(RealBaseType::I8),
            TK::KwI16 => Some(RealBaseType::I16),
            TK::KwI32 => Some(RealBaseType::I32),
            TK::KwI64 => Some(RealBaseType::I64),
            TK::KwDouble => Some(RealBaseType::Double),
            TK::KwString => Some(RealBaseType::String),
            TK::KwBinary => Some(RealBaseType::Binary),
            _ => None,
        };
        if let Some(tag) = base {
            self.advance();
            self.builder.exit_real_base_type(tag);
            self.parse_type_annotations()?;
            self.builder.exit_base_type();
            return Ok(());
        }
        match &self.curr_token.kind {
            TK::KwMap => {
                self.advance();
                self.parse_cpp_type()?;
                self.consume(&TK::Lt)?;
                self.parse_field_type()?;
                self.consume(&TK::Comma)?;
                self.parse_field_type()?;
                self.consume(&TK::Gt)?;
                self.builder.exit_map_type();
                self.parse_type_annotations()?;
                self.builder.exit_container_type();
                Ok(())
            }
            TK::KwSet => {
                self.advance();
                self.parse_cpp_type()?;
                self.consume(&TK::Lt)?;
                self.parse_field_type()?;
                self.consume(&TK::Gt)?;
                self.builder.exit_set_type();
                self.parse_type_annotations()?;
                self.builder.exit_container_type();
                Ok(())
            }
            TK::KwList => {
                self.advance();
                self.consume(&TK::Lt)?;
                self.parse_field_type()?;
                self.consume(&TK::Gt)?;
                self.parse_cpp_type()?;
                self.builder.exit_list_type();
                self.parse_type_annotations()?;
                self.builder.exit_container_type();
                Ok(())
            }
            TK::Ident(name) => {
                let name = name.clone();
                self.advance();
                self.builder.exit_udf_type(name);
                Ok(())
            }
            _ => Err(ParseError::ExpectedType(self.curr_token.clone())),
        }
    }

    /// `cpp_type "..."` qualifiers are accepted and ignored.
    fn parse_cpp_type(&mut self) -> Result<(), ParseError> {
        if self.curr_token.kind == TK::KwCppType {
            self.advance();
            self.parse_string_lit()?;
        }
        Ok(())
    }

    fn parse_type_annotations(&mut self) -> Result<(), ParseError> {
        if self.curr_token.kind != TK::LParen {
            return Ok(());
        }
        self.advance();
        while self.curr_token.kind != TK::RParen {
            let start = self.pos;
            let key = self.parse_ident()?;
            let mut has_value = false;
            if self.curr_token.kind == TK::Equals {
                self.advance();
                match &self.curr_token.kind {
                    TK::StringLit(text) => {
                        self.builder.exit_annotation_literal(text.clone());
                        self.advance();
                    }
                    TK::IntLit(v) => {
                        self.builder.exit_annotation_integer(*v, 10);
                        self.advance();
                    }
                    TK::HexLit(v) => {
                        self.builder.exit_annotation_integer(*v, 16);
                        self.advance();
                    }
                    _ => {
                        return Err(ParseError::ExpectedAnnotationValue(
                            self.curr_token.clone(),
                        ));
                    }
                }
                has_value = true;
            }
            self.skip_list_separator();
            let comments = self.comments(start, self.prev);
            self.builder.exit_type_annotation(key, has_value, comments);
        }
        self.consume(&TK::RParen)?;
        Ok(())
    }

    fn parse_const_value(&mut self) -> Result<String, ParseError> {
        let start = self.curr_token.span.start.offset;
        self.skip_const_value()?;
        let end = self.tokens[self.prev].span.end.offset;
        Ok(self.source[start..end].to_string())
    }

    fn skip_const_value(&mut self) -> Result<(), ParseError> {
        match self.curr_token.kind {
            TK::IntLit(_)
            | TK::HexLit(_)
            | TK::DoubleLit(_)
            | TK::StringLit(_)
            | TK::Ident(_) => {
                self.advance();
                Ok(())
            }
            TK::LBracket => {
                self.advance();
                while self.curr_token.kind != TK::RBracket {
                    self.skip_const_value()?;
                    self.skip_list_separator();
                }
                self.consume(&TK::RBracket)
            }
            TK::LBrace => {
                self.advance();
                while self.curr_token.kind != TK::RBrace {
                    self.skip_const_value()?;
                    self.consume(&TK::Colon)?;
                    self.skip_const_value()?;
                    self.skip_list_separator();
                }
                self.consume(&TK::RBrace)
            }
            _ => Err(ParseError::ExpectedConstValue(self.curr_token.clone())),
        }
    }
}

#[cfg(test)]
#[path = "../tests/t_parse.rs"]
mod t_parse;
