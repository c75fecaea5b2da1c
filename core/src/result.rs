//! Normalization of storage service replies into `CommandResult`.
//!
//! # Design
//! The service answers every command with a loosely shaped JSON object. The
//! body is first narrowed into `RawResult`, where each field is either a value
//! of the expected type or absent, and then `normalize_with` applies the
//! success predicate, status-code canonicalization and defaulting in one pure
//! step. Nothing in a `CommandResult` is copied from the server without
//! passing through those rules.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StorageError;

/// Error code reported by every failed result that did not carry its own.
pub const APP_GENERIC_ERROR: &str = "app.generic.error";

/// Canonical outcome of a storage command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub code: u16,
    pub success: bool,
    pub error_code: Option<String>,
    pub title: String,
    pub msg: String,
    pub xdata: Map<String, Value>,
    pub validations: Option<Value>,
}

/// A reply body narrowed to the fields normalization looks at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    pub success: Option<bool>,
    /// Only JSON integers; `200.0` or `"200"` are not codes.
    pub code: Option<i64>,
    /// Only truthy values survive; `""`, `"0"`, `false` and `0` are dropped.
    pub error_code: Option<String>,
    pub title: Option<String>,
    pub msg: Option<String>,
    pub xdata: Option<Map<String, Value>>,
    pub validations: Option<Value>,
}

impl RawResult {
    /// Narrow a decoded JSON value. Anything other than an object yields
    /// `None`, which normalizes to a generic failure.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            success: object.get("success").and_then(Value::as_bool),
            code: object.get("code").and_then(Value::as_i64),
            error_code: object.get("errorCode").and_then(truthy_string),
            title: object.get("title").and_then(Value::as_str).map(str::to_string),
            msg: object.get("msg").and_then(Value::as_str).map(str::to_string),
            xdata: object.get("xdata").and_then(Value::as_object).cloned(),
            validations: object.get("validations").filter(|v| !v.is_null()).cloned(),
        })
    }

    /// Decode a response body. Empty or malformed bodies yield `None`.
    pub fn from_body(body: &[u8]) -> Option<Self> {
        let value: Value = serde_json::from_slice(body).ok()?;
        Self::from_value(&value)
    }

    fn is_success(&self) -> bool {
        self.success == Some(true)
            && self.code.is_some_and(|code| (200..300).contains(&code))
            && self.error_code.is_none()
    }
}

fn truthy_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() || s == "0" => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Array(items) if !items.is_empty() => Some(value.to_string()),
        Value::Object(_) => Some(value.to_string()),
        _ => None,
    }
}

/// Texts used when a reply leaves `title` or `msg` out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    pub title: &'static str,
    pub msg: &'static str,
    pub failure_msg: &'static str,
}

impl Defaults {
    pub const GENERIC: Defaults = Defaults {
        title: "Success",
        msg: "Everything looks good",
        failure_msg: "Something went wrong",
    };
}

impl Default for Defaults {
    fn default() -> Self {
        Self::GENERIC
    }
}

/// Canonicalize a reported status code.
///
/// Successful results keep a 2xx code and fall back to 200. Failed results
/// always report 400: the server's own failure code is never passed through.
pub fn status_code(raw: Option<i64>, success: bool) -> u16 {
    match (raw, success) {
        (Some(code), true) => u16::try_from(code)
            .ok()
            .filter(|c| (200..300).contains(c))
            .unwrap_or(200),
        (None, true) => 200,
        // Downstream consumers rely on 400 for every failure, so a 404 or 500
        // from the server still comes out as 400.
        (_, false) => 400,
    }
}

/// Normalize a reply with the generic defaults.
pub fn normalize(raw: Option<&RawResult>) -> CommandResult {
    normalize_with(raw, &Defaults::GENERIC)
}

/// Normalize a reply, filling absent texts from `defaults`.
pub fn normalize_with(raw: Option<&RawResult>, defaults: &Defaults) -> CommandResult {
    let empty = RawResult::default();
    let raw = raw.unwrap_or(&empty);
    let success = raw.is_success();

    let (title, msg) = if success {
        (defaults.title, defaults.msg)
    } else {
        ("Error", defaults.failure_msg)
    };

    CommandResult {
        code: status_code(raw.code, success),
        success,
        error_code: if success {
            None
        } else {
            Some(
                raw.error_code
                    .clone()
                    .unwrap_or_else(|| APP_GENERIC_ERROR.to_string()),
            )
        },
        title: raw.title.clone().unwrap_or_else(|| title.to_string()),
        msg: raw.msg.clone().unwrap_or_else(|| msg.to_string()),
        xdata: raw.xdata.clone().unwrap_or_default(),
        validations: raw.validations.clone(),
    }
}

impl CommandResult {
    /// Convert a local failure into a failed result.
    ///
    /// The message is the error's description, or `default_msg` when the
    /// description is empty.
    pub fn from_failure(err: &StorageError, default_msg: &str) -> Self {
        let description = err.to_string();
        let raw = RawResult {
            success: Some(false),
            code: Some(err.code().unwrap_or(400)),
            title: Some("Error".to_string()),
            msg: Some(if description.is_empty() {
                default_msg.to_string()
            } else {
                description
            }),
            ..RawResult::default()
        };
        normalize(Some(&raw))
    }
}
