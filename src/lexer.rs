use std::fmt::{Display, Formatter, Result as FmtResult};
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

use crate::diag::{Position, Span};

/// Token channel, mirroring the hidden channels of the original grammar.
/// The parser only looks at `Default` tokens; comment attachment walks the
/// trivia channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Default,
    SlComment,
    MlComment,
    Whitespace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn channel(&self) -> Channel {
        match self.kind {
            TokenKind::SlComment(_) => Channel::SlComment,
            TokenKind::MlComment(_) => Channel::MlComment,
            TokenKind::Whitespace { .. } => Channel::Whitespace,
            _ => Channel::Default,
        }
    }

    pub fn is_trivia(&self) -> bool {
        self.channel() != Channel::Default
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),

    // Literals. String literals keep their outer quotes: annotation values
    // are emitted verbatim, quotes included.
    IntLit(i64),
    HexLit(i64),
    DoubleLit(String),
    StringLit(String),

    // Keywords
    KwInclude,
    KwCppInclude,
    KwNamespace,
    KwConst,
    KwTypedef,
    KwEnum,
    KwSenum,
    KwStruct,
    KwUnion,
    KwException,
    KwService,
    KwExtends,
    KwRequired,
    KwOptional,
    KwOneway,
    KwVoid,
    KwThrows,
    KwMap,
    KwSet,
    KwList,
    KwCppType,
    KwBool,
    KwByte,
    KwI8,
    KwI16,
    KwI32,
    KwI64,
    KwDouble,
    KwString,
    KwBinary,

    // Punctuation
    Colon,
    Semicolon,
    Comma,
    Equals,
    Lt,
    Gt,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Star,

    // Trivia. Single-line comments swallow their terminating newline, so a
    // declaration directly below a comment sees no whitespace token in
    // between; the attachment rules rely on this.
    SlComment(String),
    MlComment(String),
    Whitespace { newlines: usize },

    Eof,
}

impl TokenKind {
    fn keyword(ident: &str) -> Option<TokenKind> {
        let kind = match ident {
            "include" => TokenKind::KwInclude,
            "cpp_include" => TokenKind::KwCppInclude,
            "namespace" => TokenKind::KwNamespace,
            "const" => TokenKind::KwConst,
            "typedef" => TokenKind::KwTypedef,
            "enum" => TokenKind::KwEnum,
            "senum" => TokenKind::KwSenum,
            "struct" => TokenKind::KwStruct,
            "union" => TokenKind::KwUnion,
            "exception" => TokenKind::KwException,
            "service" => TokenKind::KwService,
            "extends" => TokenKind::KwExtends,
            "required" => TokenKind::KwRequired,
            "optional" => TokenKind::KwOptional,
            "oneway" => TokenKind::KwOneway,
            "void" => TokenKind::KwVoid,
            "throws" => TokenKind::KwThrows,
            "map" => TokenKind::KwMap,
            "set" => TokenKind::KwSet,
            "list" => TokenKind::KwList,
            "cpp_type" => TokenKind::KwCppType,
            "bool" => TokenKind::KwBool,
            "byte" => TokenKind::KwByte,
            "i8" => TokenKind::KwI8,
            "i16" => TokenKind::KwI16,
            "i32" => TokenKind::KwI32,
            "i64" => TokenKind::KwI64,
            "double" => TokenKind::KwDouble,
            "string" => TokenKind::KwString,
            "binary" => TokenKind::KwBinary,
            _ => return None,
        };
        Some(kind)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TokenKind::Ident(name) => write!(f, "{name}"),
            TokenKind::IntLit(v) => write!(f, "{v}"),
            TokenKind::HexLit(v) => write!(f, "{v:#x}"),
            TokenKind::DoubleLit(text) => write!(f, "{text}"),
            TokenKind::StringLit(text) => write!(f, "{text}"),
            TokenKind::KwInclude => write!(f, "include"),
            TokenKind::KwCppInclude => write!(f, "cpp_include"),
            TokenKind::KwNamespace => write!(f, "namespace"),
            TokenKind::KwConst => write!(f, "const"),
            TokenKind::KwTypedef => write!(f, "typedef"),
            TokenKind::KwEnum => write!(f, "enum"),
            TokenKind::KwSenum => write!(f, "senum"),
            TokenKind::KwStruct => write!(f, "struct"),
            TokenKind::KwUnion => write!(f, "union"),
            TokenKind::KwException => write!(f, "exception"),
            TokenKind::KwService => write!(f, "service"),
            TokenKind::KwExtends => write!(f, "extends"),
            TokenKind::KwRequired => write!(f, "required"),
            TokenKind::KwOptional => write!(f, "optional"),
            TokenKind::KwOneway => write!(f, "oneway"),
            TokenKind::KwVoid => write!(f, "void"),
            TokenKind::KwThrows => write!(f, "throws"),
            TokenKind::KwMap => write!(f, "map"),
            TokenKind::KwSet => write!(f, "set"),
            TokenKind::KwList => write!(f, "list"),
            TokenKind::KwCppType => write!(f, "cpp_type"),
            TokenKind::KwBool => write!(f, "bool"),
            TokenKind::KwByte => write!(f, "byte"),
            TokenKind::KwI8 => write!(f, "i8"),
            TokenKind::KwI16 => write!(f, "i16"),
            TokenKind::KwI32 => write!(f, "i32"),
            TokenKind::KwI64 => write!(f, "i64"),
            TokenKind::KwDouble => write!(f, "double"),
            TokenKind::KwString => write!(f, "string"),
            TokenKind::KwBinary => write!(f, "binary"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Equals => write!(f, "="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::SlComment(text) => write!(f, "{text}"),
            TokenKind::MlComment(text) => write!(f, "{text}"),
            TokenKind::Whitespace { .. } => write!(f, " "),
            TokenKind::Eof => write!(f, "<eof>"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LexError {
    #[error("Unexpected character: {0}")]
    UnexpectedCharacter(char, Position),

    #[error("Unterminated string literal")]
    UnterminatedString(Position),

    #[error("Unterminated block comment")]
    UnterminatedComment(Position),

    #[error("Invalid integer: {0}")]
    InvalidInteger(String, Position),
}

impl LexError {
    pub fn span(&self) -> Span {
        let pos = match self {
            LexError::UnexpectedCharacter(_, pos) => *pos,
            LexError::UnterminatedString(pos) => *pos,
            LexError::UnterminatedComment(pos) => *pos,
            LexError::InvalidInteger(_, pos) => *pos,
        };
        Span::new(pos, pos)
    }
}

pub struct Lexer<'a> {
    source: Peekable<Chars<'a>>,
    pos: Position,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source: source.chars().peekable(),
            pos: Position::start(),
        }
    }

    /// Produces the full token stream, trivia included, terminated by `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.next()?;
        self.pos.offset += ch.len_utf8();
        if ch == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        Some(ch)
    }

    fn token(&self, kind: TokenKind, start: Position) -> Token {
        Token {
            kind,
            span: Span::new(start, self.pos),
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let Some(&ch) = self.source.peek() else {
            return Ok(self.token(TokenKind::Eof, start));
        };
        match ch {
            c if c.is_whitespace() => {
                let mut newlines = 0;
                while let Some(&c) = self.source.peek()
                    && c.is_whitespace()
                {
                    if c == '\n' {
                        newlines += 1;
                    }
                    self.advance();
                }
                Ok(self.token(TokenKind::Whitespace { newlines }, start))
            }
            '/' => {
                self.advance();
                match self.source.peek() {
                    Some(&'/') => Ok(self.lex_line_comment(start, "/")),
                    Some(&'*') => self.lex_block_comment(start),
                    _ => Err(LexError::UnexpectedCharacter('/', start)),
                }
            }
            '#' => {
                self.advance();
                Ok(self.lex_line_comment(start, "#"))
            }
            '"' | '\'' => self.lex_string(start, ch),
            c if c.is_ascii_digit() || c == '+' || c == '-' => self.lex_number(start),
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = self.source.peek()
                    && (c.is_alphanumeric() || c == '_' || c == '.')
                {
                    ident.push(c);
                    self.advance();
                }
                let kind =
                    TokenKind::keyword(&ident).unwrap_or(TokenKind::Ident(ident));
                Ok(self.token(kind, start))
            }
            _ => {
                let kind = match ch {
                    ':' => TokenKind::Colon,
                    ';' => TokenKind::Semicolon,
                    ',' => TokenKind::Comma,
                    '=' => TokenKind::Equals,
                    '<' => TokenKind::Lt,
                    '>' => TokenKind::Gt,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    '*' => TokenKind::Star,
                    c => return Err(LexError::UnexpectedCharacter(c, start)),
                };
                self.advance();
                Ok(self.token(kind, start))
            }
        }
    }

    /// The leading `/` or `#` has been consumed. Swallows the terminating
    /// newline; the stored text ends before it.
    fn lex_line_comment(&mut self, start: Position, lead: &str) -> Token {
        let mut text = String::from(lead);
        while let Some(&c) = self.source.peek() {
            if c == '\n' {
                self.advance();
                break;
            }
            if c != '\r' {
                text.push(c);
            }
            self.advance();
        }
        self.token(TokenKind::SlComment(text), start)
    }

    /// The leading `/` has been consumed, a `*` is pending.
    fn lex_block_comment(&mut self, start: Position) -> Result<Token, LexError> {
        let mut text = String::from("/");
        let mut prev_star = false;
        while let Some(c) = self.advance() {
            text.push(c);
            if prev_star && c == '/' && text.len() > 3 {
                return Ok(self.token(TokenKind::MlComment(text), start));
            }
            prev_star = c == '*';
        }
        Err(LexError::UnterminatedComment(start))
    }

    fn lex_string(&mut self, start: Position, quote: char) -> Result<Token, LexError> {
        let mut text = String::new();
        text.push(quote);
        self.advance();
        while let Some(c) = self.advance() {
            text.push(c);
            if c == quote {
                return Ok(self.token(TokenKind::StringLit(text), start));
            }
        }
        Err(LexError::UnterminatedString(start))
    }

    fn lex_number(&mut self, start: Position) -> Result<Token, LexError> {
        let mut text = String::new();
        if let Some(&c) = self.source.peek()
            && (c == '+' || c == '-')
        {
            text.push(c);
            self.advance();
        }

        // Hex integers only occur unsigned in practice; keep the sign path
        // for decimals.
        if self.source.peek() == Some(&'0') {
            text.push('0');
            self.advance();
            if let Some(&c) = self.source.peek()
                && (c == 'x' || c == 'X')
            {
                self.advance();
                let mut digits = String::new();
                while let Some(&c) = self.source.peek()
                    && c.is_ascii_hexdigit()
                {
                    digits.push(c);
                    self.advance();
                }
                let value = i64::from_str_radix(&digits, 16)
                    .map_err(|_| LexError::InvalidInteger(format!("0x{digits}"), start))?;
                return Ok(self.token(TokenKind::HexLit(value), start));
            }
        }

        while let Some(&c) = self.source.peek()
            && c.is_ascii_digit()
        {
            text.push(c);
            self.advance();
        }
        if text.is_empty() || text == "+" || text == "-" {
            return Err(LexError::InvalidInteger(text, start));
        }

        let mut is_double = false;
        if self.source.peek() == Some(&'.') {
            is_double = true;
            text.push('.');
            self.advance();
            while let Some(&c) = self.source.peek()
                && c.is_ascii_digit()
            {
                text.push(c);
                self.advance();
            }
        }
        if let Some(&c) = self.source.peek()
            && (c == 'e' || c == 'E')
        {
            is_double = true;
            text.push(c);
            self.advance();
            if let Some(&c) = self.source.peek()
                && (c == '+' || c == '-')
            {
                text.push(c);
                self.advance();
            }
            while let Some(&c) = self.source.peek()
                && c.is_ascii_digit()
            {
                text.push(c);
                self.advance();
            }
        }

        if is_double {
            Ok(self.token(TokenKind::DoubleLit(text), start))
        } else {
            let value = text
                .parse::<i64>()
                .map_err(|_| LexError::InvalidInteger(text.clone(), start))?;
            Ok(self.token(TokenKind::IntLit(value), start))
        }
    }
}

#[cfg(test)]
#[path = "tests/t_lexer.rs"]
mod t_lexer;
