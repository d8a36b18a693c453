//! Typed intermediate representation of one Thrift unit.
//!
//! Field types form a recursive sum type ([`Type`]); declarations carry a
//! 0-based sequence number per kind that fixes emission order. Declarations
//! are keyed by name in [`IndexMap`]s for O(1) lookup; the sequence numbers
//! are still the source of truth for ordering.

pub mod builder;

use indexmap::IndexMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// The nine Thrift primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealBaseType {
    Bool,
    Byte,
    I8,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
}

impl RealBaseType {
    pub fn name(&self) -> &'static str {
        match self {
            RealBaseType::Bool => "bool",
            RealBaseType::Byte => "byte",
            RealBaseType::I8 => "i8",
            RealBaseType::I16 => "i16",
            RealBaseType::I32 => "i32",
            RealBaseType::I64 => "i64",
            RealBaseType::Double => "double",
            RealBaseType::String => "string",
            RealBaseType::Binary => "binary",
        }
    }
}

impl Display for RealBaseType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Base(BaseType),
    /// User-defined type reference. Resolution is deferred to emission;
    /// unresolved names pass through as bare identifiers.
    Udf(String),
    Container(Box<ContainerType>),
    List(Box<Type>),
    Set(Box<Type>),
    Map(Box<MapType>),
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Type::Base(base) => write!(f, "{}", base.inner),
            Type::Udf(name) => write!(f, "{name}"),
            Type::Container(c) => write!(f, "{}", c.inner),
            Type::List(inner) => write!(f, "list<{inner}>"),
            Type::Set(inner) => write!(f, "set<{inner}>"),
            Type::Map(m) => write!(f, "map<{}, {}>", m.key, m.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaseType {
    pub inner: RealBaseType,
    pub annotations: Vec<AnnotationField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerType {
    pub inner: Type,
    pub annotations: Vec<AnnotationField>,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapType {
    pub key: Type,
    pub value: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    /// String literal, outer quotes preserved.
    Literal(String),
    /// Integer with the radix it was written in (10 or 16).
    Integer { value: i64, bits: u32 },
}

impl AnnotationValue {
    pub fn as_text(&self) -> String {
        match self {
            AnnotationValue::Literal(text) => text.clone(),
            AnnotationValue::Integer { value, .. } => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationField {
    pub key: String,
    pub value: Option<AnnotationValue>,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Comments {
    pub multi_line: String,
    pub single_line: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldReq {
    #[default]
    Required,
    Optional,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub req: FieldReq,
    pub name: String,
    pub field_id: i64,
    pub ty: Type,
    pub annotations: Vec<AnnotationField>,
    /// Raw source text of the default const expression, if any. Captured
    /// for completeness; the emitter does not interpret it.
    pub default_value: Option<String>,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub name: String,
    pub sequence_num: usize,
    pub fields: Vec<StructField>,
    pub annotations: Vec<AnnotationField>,
    pub comments: Comments,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedefType {
    pub name: String,
    pub sequence_num: usize,
    pub original_type: Type,
    pub annotations: Vec<AnnotationField>,
    pub comments: Comments,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumField {
    pub key: String,
    pub value: i64,
    pub annotations: Vec<AnnotationField>,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub sequence_num: usize,
    pub fields: Vec<EnumField>,
    pub annotations: Vec<AnnotationField>,
    pub comments: Comments,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub name: String,
    /// Owning service, by name. Back-references are by name rather than
    /// pointer so units own their declarations exclusively.
    pub service_name: String,
    pub sequence_num: usize,
    pub response: Type,
    pub requests: Vec<StructField>,
    pub annotations: Vec<AnnotationField>,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceType {
    pub name: String,
    pub annotations: Vec<AnnotationField>,
    pub comments: Comments,
    /// Functions of this service, re-sequenced from 0 at service exit.
    pub function_defs: IndexMap<String, FunctionType>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstType {
    pub name: String,
    /// Declared type and value, as raw source text.
    pub ty_text: String,
    pub value_text: String,
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameSpace {
    /// Language identifier, or `*`.
    pub scope: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncludeName {
    pub name: String,
}

/// Everything extracted from one IDL unit, plus the sub-results of its
/// includes keyed by reference name (basename cut at the first dot).
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    pub typedefs: IndexMap<String, TypedefType>,
    pub struct_defs: IndexMap<String, StructType>,
    /// Flat function table. Ambiguous when two services share a function
    /// name; emission and validation use the per-service tables.
    pub function_defs: IndexMap<String, FunctionType>,
    pub enum_defs: IndexMap<String, EnumType>,
    pub const_defs: IndexMap<String, ConstType>,
    /// First service in the unit, for single-service IDLs.
    pub service_def: Option<ServiceType>,
    pub service_defs: Vec<ServiceType>,
    pub include_names: Vec<IncludeName>,
    pub includes: IndexMap<String, AnalysisResult>,
    pub namespaces: Vec<NameSpace>,
}

/// First annotation with the given key, in source order.
pub fn annotation<'a>(
    annotations: &'a [AnnotationField],
    key: &str,
) -> Option<&'a AnnotationValue> {
    annotations
        .iter()
        .find(|a| a.key == key)
        .and_then(|a| a.value.as_ref())
}

/// Annotation value as text, or `default` when absent.
pub fn annotation_string(annotations: &[AnnotationField], key: &str, default: &str) -> String {
    annotation(annotations, key)
        .map(|v| v.as_text())
        .unwrap_or_else(|| default.to_string())
}

/// Annotation value as text with outer double quotes stripped; empty when
/// absent.
pub fn annotation_trimmed(annotations: &[AnnotationField], key: &str) -> String {
    annotation_string(annotations, key, "")
        .trim_matches('"')
        .to_string()
}
