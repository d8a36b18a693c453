//! Stack-based IR builder.
//!
//! The builder consumes the post-order exit events of a parse and assembles
//! declarations bottom-up on four working stacks: types, fields (with a
//! sentinel marking the start of a throws list), enum fields, and
//! annotations. Every declaration that accepts annotations drains the
//! annotation stack at its exit; the drained run is in source order.

use indexmap::IndexMap;
use thiserror::Error;

use crate::ir::{
    AnalysisResult, AnnotationField, AnnotationValue, BaseType, Comments, ConstType,
    ContainerType, EnumField, EnumType, FieldReq, FunctionType, IncludeName, MapType, NameSpace,
    RealBaseType, ServiceType, StructField, StructType, Type, TypedefType,
};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("field number is required for {0}")]
    MissingFieldId(String),

    #[error("field id : {id} duplicated in struct {name}")]
    DuplicateFieldId { id: i64, name: String },
}

#[derive(Default)]
pub struct IrBuilder {
    types: Vec<Type>,
    /// `None` is the throws-list sentinel.
    fields: Vec<Option<StructField>>,
    enum_fields: Vec<EnumField>,
    annotations: Vec<AnnotationField>,
    values: Vec<AnnotationValue>,

    typedefs: IndexMap<String, TypedefType>,
    struct_defs: IndexMap<String, StructType>,
    function_defs: IndexMap<String, FunctionType>,
    enum_defs: IndexMap<String, EnumType>,
    const_defs: IndexMap<String, ConstType>,
    service_def: Option<ServiceType>,
    service_defs: Vec<ServiceType>,
    include_names: Vec<IncludeName>,
    namespaces: Vec<NameSpace>,
    functions_by_service: IndexMap<String, Vec<FunctionType>>,
}

impl IrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pops everything accumulated since the last drain, in source order.
    fn drain_annotations(&mut self) -> Vec<AnnotationField> {
        std::mem::take(&mut self.annotations)
    }

    fn pop_type(&mut self) -> Type {
        self.types.pop().expect("type stack underflow")
    }

    pub fn exit_include(&mut self, literal: &str) {
        self.include_names.push(IncludeName {
            name: literal.trim_matches(['"', '\'']).to_string(),
        });
    }

    pub fn exit_namespace(&mut self, scope: String, name: String) {
        self.namespaces.push(NameSpace { scope, name });
    }

    pub fn exit_real_base_type(&mut self, tag: RealBaseType) {
        self.types.push(Type::Base(BaseType {
            inner: tag,
            annotations: Vec::new(),
        }));
    }

    /// Rewraps the pending base type with the annotations lexed after it.
    pub fn exit_base_type(&mut self) {
        let annotations = self.drain_annotations();
        if let Some(Type::Base(base)) = self.types.last_mut() {
            base.annotations = annotations;
        }
    }

    pub fn exit_udf_type(&mut self, name: String) {
        self.types.push(Type::Udf(name));
    }

    pub fn exit_list_type(&mut self) {
        let inner = self.pop_type();
        self.types.push(Type::List(Box::new(inner)));
    }

    pub fn exit_set_type(&mut self) {
        let inner = self.pop_type();
        self.types.push(Type::Set(Box::new(inner)));
    }

    pub fn exit_map_type(&mut self) {
        let value = self.pop_type();
        let key = self.pop_type();
        self.types.push(Type::Map(Box::new(MapType { key, value })));
    }

    pub fn exit_container_type(&mut self) {
        let inner = self.pop_type();
        let annotations = self.drain_annotations();
        self.types.push(Type::Container(Box::new(ContainerType {
            inner,
            annotations,
            comments: Comments::default(),
        })));
    }

    pub fn exit_annotation_literal(&mut self, text: String) {
        self.values.push(AnnotationValue::Literal(text));
    }

    pub fn exit_annotation_integer(&mut self, value: i64, bits: u32) {
        self.values.push(AnnotationValue::Integer { value, bits });
    }

    pub fn exit_type_annotation(&mut self, key: String, has_value: bool, comments: Comments) {
        let value = if has_value { self.values.pop() } else { None };
        self.annotations.push(AnnotationField {
            key,
            value,
            comments,
        });
    }

    pub fn exit_field(
        &mut self,
        name: String,
        field_id: Option<i64>,
        req: FieldReq,
        default_value: Option<String>,
        comments: Comments,
    ) -> Result<(), BuildError> {
        let ty = self.pop_type();
        let Some(field_id) = field_id else {
            return Err(BuildError::MissingFieldId(name));
        };
        let annotations = self.drain_annotations();
        self.fields.push(Some(StructField {
            req,
            name,
            field_id,
            ty,
            annotations,
            default_value,
            comments,
        }));
        Ok(())
    }

    fn drain_fields(&mut self) -> Vec<StructField> {
        let mut fields: Vec<StructField> = Vec::new();
        while let Some(item) = self.fields.pop() {
            match item {
                Some(field) => fields.push(field),
                None => break,
            }
        }
        fields.reverse();
        fields
    }

    pub fn exit_struct(
        &mut self,
        name: String,
        comments: Comments,
        line: usize,
    ) -> Result<(), BuildError> {
        let fields = self.drain_fields();
        let mut used = std::collections::HashSet::new();
        for field in &fields {
            if !used.insert(field.field_id) {
                return Err(BuildError::DuplicateFieldId {
                    id: field.field_id,
                    name,
                });
            }
        }
        let def = StructType {
            sequence_num: self.struct_defs.len(),
            name: name.clone(),
            fields,
            annotations: self.drain_annotations(),
            comments,
            line,
        };
        self.struct_defs.insert(name, def);
        Ok(())
    }

    /// Union bodies are accepted by the grammar and produce no IR.
    pub fn exit_union(&mut self) {
        self.annotations.clear();
        self.fields.clear();
    }

    /// Same discard as unions.
    pub fn exit_exception(&mut self) {
        self.annotations.clear();
        self.fields.clear();
    }

    pub fn exit_senum(&mut self) {
        self.annotations.clear();
    }

    pub fn exit_enum_field(&mut self, key: String, value: Option<i64>, comments: Comments) {
        let annotations = self.drain_annotations();
        self.enum_fields.push(EnumField {
            key,
            value: value.unwrap_or(0),
            annotations,
            comments,
        });
    }

    pub fn exit_enum(&mut self, name: String, comments: Comments, line: usize) {
        let fields = std::mem::take(&mut self.enum_fields);
        let def = EnumType {
            sequence_num: self.enum_defs.len(),
            name: name.clone(),
            fields,
            annotations: self.drain_annotations(),
            comments,
            line,
        };
        self.enum_defs.insert(name, def);
    }

    pub fn exit_typedef(&mut self, name: String, comments: Comments, line: usize) {
        let original_type = self.pop_type();
        let def = TypedefType {
            sequence_num: self.typedefs.len(),
            name: name.clone(),
            original_type,
            annotations: self.drain_annotations(),
            comments,
            line,
        };
        self.typedefs.insert(name, def);
    }

    pub fn exit_const(
        &mut self,
        name: String,
        ty_text: String,
        value_text: String,
        comments: Comments,
    ) {
        // The declared type was parsed like any field type; consts keep only
        // its source text, so the pushed Type is dropped here.
        self.pop_type();
        self.const_defs.insert(
            name.clone(),
            ConstType {
                name,
                ty_text,
                value_text,
                comments,
            },
        );
    }

    pub fn enter_throws(&mut self) {
        self.fields.push(None);
    }

    /// Discards the throws entries back to the sentinel so they do not leak
    /// into the enclosing function's parameter list.
    pub fn exit_throws(&mut self) {
        while let Some(item) = self.fields.pop() {
            if item.is_none() {
                break;
            }
        }
        self.annotations.clear();
    }

    pub fn exit_function(&mut self, name: String, service_name: &str, comments: Comments) {
        let response = self.pop_type();
        let requests = self.drain_fields();
        let def = FunctionType {
            sequence_num: self.function_defs.len(),
            name: name.clone(),
            service_name: service_name.to_string(),
            response,
            requests,
            annotations: self.drain_annotations(),
            comments,
        };
        self.functions_by_service
            .entry(service_name.to_string())
            .or_default()
            .push(def.clone());
        self.function_defs.insert(name, def);
    }

    pub fn exit_service(&mut self, name: String, comments: Comments, line: usize) {
        let mut function_defs = IndexMap::new();
        if let Some(functions) = self.functions_by_service.swap_remove(&name) {
            for (seq, mut function) in functions.into_iter().enumerate() {
                function.sequence_num = seq;
                function_defs.insert(function.name.clone(), function);
            }
        }
        let def = ServiceType {
            name: name.clone(),
            annotations: self.drain_annotations(),
            comments,
            function_defs,
            line,
        };
        if self.service_def.is_none() {
            self.service_def = Some(def.clone());
        }
        self.service_defs.push(def);
    }

    pub fn finish(self) -> AnalysisResult {
        AnalysisResult {
            typedefs: self.typedefs,
            struct_defs: self.struct_defs,
            function_defs: self.function_defs,
            enum_defs: self.enum_defs,
            const_defs: self.const_defs,
            service_def: self.service_def,
            service_defs: self.service_defs,
            include_names: self.include_names,
            includes: IndexMap::new(),
            namespaces: self.namespaces,
        }
    }
}

#[cfg(test)]
#[path = "../tests/t_builder.rs"]
mod t_builder;
