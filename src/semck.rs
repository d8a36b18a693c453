//! Semantic validation of a completed IR.
//!
//! Two independent passes: the reserved-keyword check guards declaration
//! names against a built-in set (optionally extended from a JSON file), and
//! the DiRPC check enforces the service/method annotation matrix per
//! transport.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::diag::CompileError;
use crate::ir::{AnalysisResult, FunctionType, ServiceType, annotation_trimmed};

/// Names that would collide with proto3 syntax in the generated output.
const KEY_WORDS: &[&str] = &[
    "syntax", "package", "import", "option", "message", "enum", "service", "rpc", "returns",
    "stream", "repeated", "optional", "required", "oneof", "map", "reserved", "extend", "true",
    "false",
];

#[derive(Debug, Error)]
pub enum SemCheckError {
    #[error("line:{line}, {kind} include KeyWords: {word}")]
    KeyWordCollision {
        line: usize,
        kind: &'static str,
        word: String,
    },

    #[error("missing required field: {0}")]
    MissingServiceField(&'static str),

    #[error("illegal server timeout")]
    IllegalServerTimeout,

    #[error("illegal server connect timeout")]
    IllegalServerConnectTimeout,

    #[error("illegal server send timeout")]
    IllegalServerSendTimeout,

    #[error("illegal server recv timeout")]
    IllegalServerRecvTimeout,

    #[error("illegal timeout for function {0}")]
    IllegalTimeout(String),

    #[error("illegal connect timeout for function {0}")]
    IllegalConnectTimeout(String),

    #[error("illegal send timeout for function {0}")]
    IllegalSendTimeout(String),

    #[error("illegal recv timeout for function {0}")]
    IllegalRecvTimeout(String),

    #[error("illegal or missing required field httpMethod for function {0}")]
    BadHttpMethod(String),

    #[error("missing required field path for function {0}")]
    MissingPath(String),

    #[error("missing required field contentType for function {0}")]
    MissingContentType(String),

    #[error("invalid contentType: {0}, only support \"form\" or \"json\"")]
    InvalidContentType(String),

    #[error("missing timeout for function {0}")]
    MissingTimeout(String),

    #[error("missing connect timeout for function {0}")]
    MissingConnectTimeout(String),

    #[error("missing send timeout for function {0}")]
    MissingSendTimeout(String),

    #[error("missing recv timeout for function {0}")]
    MissingRecvTimeout(String),
}

#[derive(Debug, Default, Deserialize)]
struct KeyWords {
    #[serde(rename = "keyWords", default)]
    keys: Vec<String>,
}

/// Checks service, typedef, struct and enum names against the reserved set.
/// Function names are exempt. The optional JSON file extends the built-in
/// set; malformed JSON is tolerated and ignored.
pub fn check_key_words(
    result: &AnalysisResult,
    key_words_file: Option<&Path>,
) -> Result<(), CompileError> {
    let mut set: HashSet<String> = KEY_WORDS.iter().map(|w| w.to_string()).collect();
    if let Some(path) = key_words_file {
        let data =
            std::fs::read(path).map_err(|e| CompileError::Io(path.to_path_buf(), e))?;
        let extra: KeyWords = serde_json::from_slice(&data).unwrap_or_default();
        set.extend(extra.keys);
    }

    for service in &result.service_defs {
        if set.contains(&service.name) {
            return Err(SemCheckError::KeyWordCollision {
                line: service.line,
                kind: "ServiceDef",
                word: service.name.clone(),
            }
            .into());
        }
    }
    for def in result.typedefs.values() {
        if set.contains(&def.name) {
            return Err(SemCheckError::KeyWordCollision {
                line: def.line,
                kind: "TypedefType",
                word: def.name.clone(),
            }
            .into());
        }
    }
    for def in result.struct_defs.values() {
        if set.contains(&def.name) {
            return Err(SemCheckError::KeyWordCollision {
                line: def.line,
                kind: "StructDefs",
                word: def.name.clone(),
            }
            .into());
        }
    }
    for def in result.enum_defs.values() {
        if set.contains(&def.name) {
            return Err(SemCheckError::KeyWordCollision {
                line: def.line,
                kind: "EnumDefs",
                word: def.name.clone(),
            }
            .into());
        }
    }
    Ok(())
}

fn int_annotation(
    annotations: &[crate::ir::AnnotationField],
    key: &str,
    err: impl FnOnce() -> SemCheckError,
) -> Result<String, SemCheckError> {
    let value = annotation_trimmed(annotations, key);
    if !value.is_empty() && value.parse::<i64>().is_err() {
        return Err(err());
    }
    Ok(value)
}

/// DiRPC annotation completeness. Units without services pass trivially;
/// otherwise every service needs servType/version/servName, and each of its
/// functions must satisfy the transport's required-field matrix.
pub fn dirpc_fields_check(result: &AnalysisResult) -> Result<(), SemCheckError> {
    for service in &result.service_defs {
        dirpc_check_service(service)?;
    }
    Ok(())
}

fn dirpc_check_service(service: &ServiceType) -> Result<(), SemCheckError> {
    let serv_type = annotation_trimmed(&service.annotations, "servType");
    if serv_type.is_empty() {
        return Err(SemCheckError::MissingServiceField("servType"));
    }
    if annotation_trimmed(&service.annotations, "version").is_empty() {
        return Err(SemCheckError::MissingServiceField("version"));
    }
    if annotation_trimmed(&service.annotations, "servName").is_empty() {
        return Err(SemCheckError::MissingServiceField("servName"));
    }

    let server_timeout = int_annotation(&service.annotations, "timeoutMsec", || {
        SemCheckError::IllegalServerTimeout
    })?;
    let server_connect_timeout = int_annotation(&service.annotations, "connectTimeoutMsec", || {
        SemCheckError::IllegalServerConnectTimeout
    })?;
    let server_send_timeout = int_annotation(&service.annotations, "sendTimeoutMsec", || {
        SemCheckError::IllegalServerSendTimeout
    })?;
    let server_recv_timeout = int_annotation(&service.annotations, "recvTimeoutMsec", || {
        SemCheckError::IllegalServerRecvTimeout
    })?;

    let mut functions: Vec<&FunctionType> = service.function_defs.values().collect();
    functions.sort_by_key(|f| f.sequence_num);

    for func in functions {
        let name = func.name.clone();
        let timeout = int_annotation(&func.annotations, "timeoutMsec", || {
            SemCheckError::IllegalTimeout(name.clone())
        })?;
        let connect_timeout = int_annotation(&func.annotations, "connectTimeoutMsec", || {
            SemCheckError::IllegalConnectTimeout(name.clone())
        })?;
        let send_timeout = int_annotation(&func.annotations, "sendTimeoutMsec", || {
            SemCheckError::IllegalSendTimeout(name.clone())
        })?;
        let recv_timeout = int_annotation(&func.annotations, "recvTimeoutMsec", || {
            SemCheckError::IllegalRecvTimeout(name.clone())
        })?;

        match serv_type.as_str() {
            "http" | "https" => {
                let method =
                    annotation_trimmed(&func.annotations, "httpMethod").to_uppercase();
                if method != "POST" && method != "GET" {
                    return Err(SemCheckError::BadHttpMethod(name));
                }
                if annotation_trimmed(&func.annotations, "path").is_empty() {
                    return Err(SemCheckError::MissingPath(name));
                }
                let content_type = annotation_trimmed(&func.annotations, "contentType");
                if content_type.is_empty() {
                    return Err(SemCheckError::MissingContentType(name));
                }
                // flattenform survives for pre-existing IDLs only.
                if content_type != "form" && content_type != "json" && content_type != "flattenform"
                {
                    return Err(SemCheckError::InvalidContentType(content_type));
                }
            }
            "grpc" => {
                if timeout.is_empty() && server_timeout.is_empty() {
                    return Err(SemCheckError::MissingTimeout(name));
                }
                if connect_timeout.is_empty() && server_connect_timeout.is_empty() {
                    return Err(SemCheckError::MissingConnectTimeout(name));
                }
            }
            "thrift" => {
                if send_timeout.is_empty() && server_send_timeout.is_empty() {
                    return Err(SemCheckError::MissingSendTimeout(name));
                }
                if recv_timeout.is_empty() && server_recv_timeout.is_empty() {
                    return Err(SemCheckError::MissingRecvTimeout(name));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/t_semck.rs"]
mod t_semck;
