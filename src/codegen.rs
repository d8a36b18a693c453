//! Proto3 generation.
//!
//! The generator walks a completed IR without mutating it, in stable
//! sequence order: enums, then messages, then the service block. Typedefs
//! collapse transitively at emission time; sets are downgraded to repeated
//! lists; DiRPC annotations materialize as option blocks.

use indexmap::IndexMap;
use thiserror::Error;

use crate::emitter::IndentBuffer;
use crate::ir::{
    AnalysisResult, AnnotationField, EnumType, FunctionType, RealBaseType, ServiceType,
    StructType, Type, TypedefType, annotation, annotation_string, annotation_trimmed,
};

const BANNER: &str = "// Code generated by thriftpp. DO NOT EDIT.";

#[derive(Debug, Clone, Copy, Default)]
pub struct CodeGenOpt {
    pub proto3_with_optional: bool,
}

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("fail to expand field {field} of {strukt}")]
    ExpandField { field: String, strukt: String },

    #[error("fail to expand response type {ty} of function {func}")]
    ExpandResponse { ty: String, func: String },

    #[error("fail to expand request param {param} of function {func}")]
    ExpandRequest { param: String, func: String },

    #[error("grpc requires exact one input, function {func} has {count}")]
    ExactOneInput { func: String, count: usize },

    #[error("{0}")]
    InvalidFieldAnnotation(String),
}

fn base_proto3(t: RealBaseType) -> &'static str {
    match t {
        RealBaseType::Bool => "bool",
        RealBaseType::Byte => "uint32",
        RealBaseType::I8 => "int32",
        RealBaseType::I16 => "int32",
        RealBaseType::I32 => "int32",
        RealBaseType::I64 => "int64",
        RealBaseType::Double => "double",
        RealBaseType::String => "string",
        RealBaseType::Binary => "bytes",
    }
}

/// Resolves a Type to its proto3 textual form, collapsing typedef chains to
/// their fixed point. An empty result means the type has no proto3 form.
pub fn expand_type(ty: &Type, typedefs: &IndexMap<String, TypedefType>) -> String {
    match ty {
        Type::Udf(name) => match typedefs.get(name) {
            Some(def) => expand_type(&def.original_type, typedefs),
            None => name.clone(),
        },
        Type::Container(c) => expand_type(&c.inner, typedefs),
        // Sets downgrade to repeated lists.
        Type::Set(inner) => expand_type(&Type::List(inner.clone()), typedefs),
        Type::List(inner) => {
            let v = expand_type(inner, typedefs);
            if v.is_empty() {
                return String::new();
            }
            format!("repeated {v}")
        }
        Type::Map(m) => {
            let k = expand_type(&m.key, typedefs);
            if k.is_empty() {
                return String::new();
            }
            let v = expand_type(&m.value, typedefs);
            if v.is_empty() {
                return String::new();
            }
            format!("map<{k}, {v}>")
        }
        Type::Base(base) => base_proto3(base.inner).to_string(),
    }
}

/// ` //text` for `//`-style comments; anything else passes through.
fn single_line_format(s: &str) -> String {
    if s.contains("//") {
        let s = s.strip_prefix("//").unwrap_or(s).trim();
        return format!(" //{s}");
    }
    s.to_string()
}

/// Reflows a block comment (possibly multi-line) into a single `//` line.
fn multi_line_format(s: &str) -> String {
    if !s.contains("/*") {
        return s.to_string();
    }
    let lines: Vec<String> = s
        .split('\n')
        .map(|line| {
            let line = line
                .trim_start()
                .strip_prefix("/**")
                .or_else(|| line.trim_start().strip_prefix("/*"))
                .unwrap_or(line);
            line.trim_end()
                .strip_suffix("*/")
                .unwrap_or(line)
                .trim()
                .to_string()
        })
        .collect();
    format!("//{}", lines.join(" ").trim())
}

/// Literal content of a quoted string, or None when not quoted.
fn unquote(s: &str) -> Option<&str> {
    let s = s.strip_prefix('"')?;
    s.strip_suffix('"')
}

fn write_leading_comments(buf: &mut IndentBuffer, multi: &str, single: &str) {
    if !multi.is_empty() {
        buf.write_line(&multi_line_format(multi));
    } else if !single.is_empty() {
        buf.write_line(&single_line_format(single));
    }
}

/// Trailing comment after a field line: its own single-line comment, else
/// an unquoted `desc` annotation, else its multi-line comment.
fn write_trailing_comment(
    buf: &mut IndentBuffer,
    annotations: &[AnnotationField],
    multi: &str,
    single: &str,
) {
    if !single.is_empty() {
        buf.write_str(&single_line_format(single));
        return;
    }
    let desc = annotation_string(annotations, "desc", "");
    if !desc.is_empty() {
        if let Some(inner) = unquote(&desc) {
            buf.write_str(" //");
            buf.write_str(inner.trim());
        }
        return;
    }
    if !multi.is_empty() {
        buf.write_str(" ");
        buf.write_str(&multi_line_format(multi));
    }
}

fn gen_enum(def: &EnumType, buf: &mut IndentBuffer) {
    let mut fields = def.fields.clone();
    fields.sort_by_key(|f| f.value);

    write_leading_comments(buf, &def.comments.multi_line, &def.comments.single_line);
    buf.write_line(&format!("enum {} {{", def.name));
    for (i, field) in fields.iter().enumerate() {
        let mut buf = buf.derive(1);
        buf.write_str(&field.key);
        buf.write_byte(b'=');
        // A declared zero (or no value) takes the positional index, so the
        // first emitted entry starts the range at 0.
        let value = if field.value == 0 { i as i64 } else { field.value };
        buf.write_str(&value.to_string());
        buf.write_byte(b';');
        write_trailing_comment(
            &mut buf,
            &field.annotations,
            &field.comments.multi_line,
            &field.comments.single_line,
        );
        buf.new_line(1);
    }
    buf.write_line("}");
}

/// Only `desc` and `json` are valid on a struct field; every other key is
/// collected into one chained error.
fn check_valid_option(annotations: &[AnnotationField]) -> Result<(), CodegenError> {
    let mut message: Option<String> = None;
    for a in annotations {
        if a.key != "desc" && a.key != "json" {
            message = Some(match message {
                None => format!("invalid field annotation {:?}", a.key),
                Some(prev) => format!("invalid field annotation {:?}, {}", a.key, prev),
            });
        }
    }
    match message {
        Some(msg) => Err(CodegenError::InvalidFieldAnnotation(msg)),
        None => Ok(()),
    }
}

fn gen_struct(
    def: &StructType,
    buf: &mut IndentBuffer,
    typedefs: &IndexMap<String, TypedefType>,
    opt: CodeGenOpt,
) -> Result<(), CodegenError> {
    write_leading_comments(buf, &def.comments.multi_line, &def.comments.single_line);

    buf.write_line(&format!("message {} {{", def.name));
    for field in &def.fields {
        let mut buf = buf.derive(1);
        let type_name = expand_type(&field.ty, typedefs);
        if type_name.is_empty() {
            return Err(CodegenError::ExpandField {
                field: field.name.clone(),
                strukt: def.name.clone(),
            });
        }

        if opt.proto3_with_optional
            && field.req == crate::ir::FieldReq::Optional
            && !type_name.trim().starts_with("repeated")
            && !type_name.trim().starts_with("map<")
        {
            buf.write_str("optional");
            buf.write_byte(b' ');
        }

        buf.write_str(&type_name);
        buf.write_byte(b' ');
        buf.write_str(&field.name);
        buf.write_str(" = ");
        buf.write_str(&field.field_id.to_string());

        check_valid_option(&field.annotations)?;

        // Brackets appear only when a non-desc annotation exists.
        let n = field.annotations.len();
        let has_option = n > 0 && (annotation(&field.annotations, "desc").is_none() || n > 1);
        if has_option {
            buf.write_str(" [");
        }
        let json_name = annotation_string(&field.annotations, "json", "");
        if !json_name.is_empty() {
            buf.write_str("json_name = ");
            buf.write_str(&json_name);
        }
        if has_option {
            buf.write_str("]");
        }

        buf.write_str(";");
        write_trailing_comment(
            &mut buf,
            &field.annotations,
            &field.comments.multi_line,
            &field.comments.single_line,
        );
        buf.new_line(1);
    }
    buf.write_line("}");
    Ok(())
}

/// Integer-validated timeout options plus contentType, in fixed key order.
fn http_options(annotations: &[AnnotationField]) -> Vec<(&'static str, String)> {
    let mut options = Vec::new();
    for key in [
        "timeoutMsec",
        "connectTimeoutMsec",
        "sendTimeoutMsec",
        "recvTimeoutMsec",
    ] {
        let value = annotation_trimmed(annotations, key);
        if !value.is_empty() && value.parse::<i64>().is_ok() {
            options.push((key, value));
        }
    }
    let content_type = annotation_string(annotations, "contentType", "");
    if !content_type.is_empty() {
        options.push(("contentType", content_type));
    }
    options
}

fn gen_function_options(func: &FunctionType, buf: &mut IndentBuffer) {
    let path = annotation_trimmed(&func.annotations, "path");
    let method = annotation_trimmed(&func.annotations, "httpMethod");
    if !path.is_empty() && !method.is_empty() {
        buf.write_line("option (google.api.http) = {");
        let mut ibuf = buf.derive(1);
        let method = method.to_lowercase();
        ibuf.write_line(&format!("{method}: \"{path}\""));
        if method == "post" || method == "put" {
            ibuf.write_line("body: \"*\"");
        }
        buf.write_line("};");
    }

    let options = http_options(&func.annotations);
    if !options.is_empty() {
        buf.write_line("option (dirpc.method_opt) = {");
        let mut ibuf = buf.derive(1);
        for (key, value) in options {
            ibuf.write_line(&format!("{key}: {value}"));
        }
        buf.write_line("};");
    }
}

fn gen_function(
    func: &FunctionType,
    buf: &mut IndentBuffer,
    typedefs: &IndexMap<String, TypedefType>,
) -> Result<(), CodegenError> {
    write_leading_comments(buf, &func.comments.multi_line, &func.comments.single_line);

    let resp_type = expand_type(&func.response, typedefs);
    if resp_type.is_empty() {
        return Err(CodegenError::ExpandResponse {
            ty: func.response.to_string(),
            func: func.name.clone(),
        });
    }
    if func.requests.len() != 1 {
        return Err(CodegenError::ExactOneInput {
            func: func.name.clone(),
            count: func.requests.len(),
        });
    }
    let req = &func.requests[0];
    let req_type = expand_type(&req.ty, typedefs);
    if req_type.is_empty() {
        return Err(CodegenError::ExpandRequest {
            param: req.name.clone(),
            func: func.name.clone(),
        });
    }

    buf.write_line(&format!(
        "rpc {} ( {} ) returns ( {} ) {{",
        func.name, req_type, resp_type
    ));
    gen_function_options(func, &mut buf.derive(1));
    buf.write_str("}");
    if !func.comments.single_line.is_empty() {
        buf.write_line(&single_line_format(&func.comments.single_line));
    } else {
        buf.new_line(1);
    }
    Ok(())
}

fn gen_service_opt(service: &ServiceType, buf: &mut IndentBuffer) {
    let version = annotation_string(&service.annotations, "version", "0.0.1");
    let serv_name = annotation_string(&service.annotations, "servName", "");
    let serv_type = annotation_string(&service.annotations, "servType", "http");
    let sign_type = annotation_string(&service.annotations, "signType", "");

    let retry = annotation_trimmed(&service.annotations, "retry");
    let retry_count = annotation_trimmed(&service.annotations, "retryCount");
    let min_healthy_ratio = annotation_trimmed(&service.annotations, "minHealthyRatio");
    let healthy_threshold = annotation_trimmed(&service.annotations, "healthyThreshold");
    let max_cooldown_time = annotation_trimmed(&service.annotations, "maxCooldownTime");

    buf.write_line("option (dirpc.service_opt) = {");
    let mut ibuf = buf.derive(1);
    ibuf.write_line(&format!("version: {version}"));
    if !serv_name.is_empty() {
        ibuf.write_line(&format!("servName: {serv_name}"));
    }
    ibuf.write_line(&format!("servType: {serv_type}"));
    if !sign_type.is_empty() {
        ibuf.write_line(&format!("signType: {sign_type}"));
    }
    for (key, value) in http_options(&service.annotations) {
        ibuf.write_line(&format!("{key}: {value}"));
    }
    if !retry.is_empty() {
        ibuf.write_line(&format!("retry: {retry}"));
    } else if !retry_count.is_empty() {
        ibuf.write_line(&format!("retry: {retry_count}"));
    }
    if !min_healthy_ratio.is_empty() {
        ibuf.write_line(&format!("minHealthyRatio: {min_healthy_ratio}"));
    }
    if !healthy_threshold.is_empty() {
        ibuf.write_line(&format!("healthyThreshold: {healthy_threshold}"));
    }
    if !max_cooldown_time.is_empty() {
        ibuf.write_line(&format!("maxCooldownTime: {max_cooldown_time}"));
    }
    buf.write_line("};");
}

/// Generates one proto3 document per unit, keyed by reference name. Child
/// units are generated with `main_package` off so they skip the google.api
/// and dirpc imports.
pub fn code_gen(
    result: &AnalysisResult,
    current_name: &str,
    lang: &str,
    main_package: bool,
    opt: CodeGenOpt,
) -> Result<IndexMap<String, String>, CodegenError> {
    let mut buf = IndentBuffer::new(0);
    buf.write_line(r#"syntax = "proto3";"#);

    let pkg_name = result
        .namespaces
        .iter()
        .find(|ns| ns.scope == lang)
        .map(|ns| ns.name.clone())
        .unwrap_or_else(|| current_name.to_string());
    buf.write_line(&format!("package {pkg_name};"));
    buf.new_line(1);

    buf.write_line(BANNER);
    if main_package {
        buf.write_line("import \"google/api/annotations.proto\";");
        buf.write_line("import \"dirpc/dirpc.proto\";");
    }
    for include in &result.include_names {
        let base = std::path::Path::new(&include.name)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = match base.find('.') {
            Some(idx) => base[..idx].to_string(),
            None => base,
        };
        buf.write_line(&format!("import \"{name}.proto\";"));
    }
    buf.new_line(1);

    if lang == "php" {
        let ns = pkg_name.replace('.', "\\\\");
        buf.write_line(&format!("option php_namespace = \"{ns}\";"));
        buf.write_line(&format!("option php_metadata_namespace = \"{ns}\\\\GPBMetadata\";"));
    }
    buf.new_line(1);

    let mut enums: Vec<&EnumType> = result.enum_defs.values().collect();
    enums.sort_by_key(|e| e.sequence_num);
    for def in enums {
        gen_enum(def, &mut buf);
        buf.new_line(1);
    }

    let mut structs: Vec<&StructType> = result.struct_defs.values().collect();
    structs.sort_by_key(|s| s.sequence_num);
    for def in structs {
        gen_struct(def, &mut buf, &result.typedefs, opt)?;
        buf.new_line(1);
    }

    if let Some(service) = &result.service_def {
        if !service.comments.multi_line.is_empty() {
            buf.write_line(&multi_line_format(&service.comments.multi_line));
        }
        buf.write_line(&format!("service {} {{", service.name));
        let mut functions: Vec<&FunctionType> = service.function_defs.values().collect();
        functions.sort_by_key(|f| f.sequence_num);
        for func in functions {
            gen_function(func, &mut buf.derive(1), &result.typedefs)?;
            buf.new_line(1);
        }
        gen_service_opt(service, &mut buf.derive(1));
        buf.write_line("}");
    }

    let mut out = IndexMap::new();
    out.insert(current_name.to_string(), buf.contents());
    for (sub_name, sub_result) in &result.includes {
        let codes = code_gen(sub_result, sub_name, lang, false, opt)?;
        for (k, v) in codes {
            out.insert(k, v);
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "tests/t_codegen.rs"]
mod t_codegen;
