//! Rust-side snapshots of JavaScript values
//!
//! A cell result outlives the V8 scope it was produced in, so it is copied
//! out of the isolate as a [`CellValue`].

use crate::settle::SettleState;
use deno_core::error::JsError;
use deno_core::v8;
use serde::Serialize;
use std::fmt;

/// A value produced by a cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    /// Decimal digits, without the `n` suffix
    BigInt(String),
    String(String),
    /// Symbol description
    Symbol(String),
    /// Function name, empty for anonymous functions
    Function(String),
    Promise(SettleState),
    Error(ThrownValue),
    /// Plain objects and arrays
    Json(serde_json::Value),
    /// Anything else, by its constructor name
    Object(String),
}

impl CellValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, CellValue::Undefined)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Undefined => write!(f, "undefined"),
            CellValue::Null => write!(f, "null"),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::BigInt(digits) => write!(f, "{}n", digits),
            CellValue::String(s) => write!(f, "{}", serde_json::Value::String(s.clone())),
            CellValue::Symbol(desc) => write!(f, "Symbol({})", desc),
            CellValue::Function(name) if name.is_empty() => write!(f, "[Function (anonymous)]"),
            CellValue::Function(name) => write!(f, "[Function: {}]", name),
            CellValue::Promise(state) => write!(f, "Promise {{ <{}> }}", state),
            CellValue::Error(thrown) => write!(f, "{}", thrown),
            CellValue::Json(value) => write!(f, "{}", value),
            CellValue::Object(name) => write!(f, "{} {{}}", name),
        }
    }
}

/// Numbers print the way JavaScript prints them.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// Something thrown by a cell.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThrownValue {
    /// An `Error` object (or anything carrying a name and message)
    #[error("{name}: {message}")]
    Structured {
        name: String,
        message: String,
        stack: Option<String>,
    },
    /// A thrown non-error value, e.g. `throw 5`
    #[error("{text}")]
    Opaque { text: String },
}

impl ThrownValue {
    pub fn opaque(text: impl Into<String>) -> Self {
        ThrownValue::Opaque { text: text.into() }
    }

    pub fn stack(&self) -> Option<&str> {
        match self {
            ThrownValue::Structured { stack, .. } => stack.as_deref(),
            ThrownValue::Opaque { .. } => None,
        }
    }

    pub fn from_js_error(error: &JsError) -> Self {
        if error.name.is_none() && error.message.is_none() {
            let text = &error.exception_message;
            let text = text
                .strip_prefix("Uncaught (in promise) ")
                .or_else(|| text.strip_prefix("Uncaught "))
                .unwrap_or(text);
            return ThrownValue::opaque(text);
        }

        ThrownValue::Structured {
            name: error.name.clone().unwrap_or_else(|| "Error".to_string()),
            message: error.message.clone().unwrap_or_default(),
            stack: error.stack.clone(),
        }
    }

    /// Anything the runtime reports: JS exceptions keep their shape, other
    /// failures (event loop stalls, internal errors) become opaque text.
    pub fn from_runtime_error(error: anyhow::Error) -> Self {
        match error.downcast_ref::<JsError>() {
            Some(js_error) => Self::from_js_error(js_error),
            None => ThrownValue::opaque(error.to_string()),
        }
    }
}

/// Copy a V8 value out of the isolate.
pub fn snapshot(scope: &mut v8::HandleScope, value: v8::Local<v8::Value>) -> CellValue {
    if value.is_undefined() {
        return CellValue::Undefined;
    }
    if value.is_null() {
        return CellValue::Null;
    }
    if value.is_boolean() {
        return CellValue::Bool(value.is_true());
    }
    if value.is_number() {
        return CellValue::Number(value.number_value(scope).unwrap_or(f64::NAN));
    }
    if value.is_big_int() {
        return CellValue::BigInt(value.to_rust_string_lossy(scope));
    }
    if value.is_string() {
        return CellValue::String(value.to_rust_string_lossy(scope));
    }
    if let Ok(symbol) = v8::Local::<v8::Symbol>::try_from(value) {
        let description = symbol.description(scope);
        return CellValue::Symbol(if description.is_undefined() {
            String::new()
        } else {
            description.to_rust_string_lossy(scope)
        });
    }
    if let Ok(promise) = v8::Local::<v8::Promise>::try_from(value) {
        return CellValue::Promise(SettleState::from(promise.state()));
    }
    if let Ok(function) = v8::Local::<v8::Function>::try_from(value) {
        return CellValue::Function(function.get_name(scope).to_rust_string_lossy(scope));
    }
    if value.is_native_error() {
        return CellValue::Error(thrown_object(scope, value));
    }

    let Some(object) = value.to_object(scope) else {
        return CellValue::Object("Object".to_string());
    };
    let constructor = object.get_constructor_name().to_rust_string_lossy(scope);
    if value.is_array() || constructor == "Object" {
        if let Some(json) = to_json(scope, value) {
            return CellValue::Json(json);
        }
    }
    CellValue::Object(constructor)
}

/// `JSON.stringify` and parse back; `None` if the value does not survive.
fn to_json(scope: &mut v8::HandleScope, value: v8::Local<v8::Value>) -> Option<serde_json::Value> {
    let scope = &mut v8::TryCatch::new(scope);
    let text = v8::json::stringify(scope, value)?;
    serde_json::from_str(&text.to_rust_string_lossy(scope)).ok()
}

/// Read `name`, `message` and `stack` off a thrown error object.
fn thrown_object(scope: &mut v8::HandleScope, value: v8::Local<v8::Value>) -> ThrownValue {
    let Some(object) = value.to_object(scope) else {
        return ThrownValue::opaque(value.to_rust_string_lossy(scope));
    };

    let mut read = |key: &str| -> Option<String> {
        let key = v8::String::new(scope, key)?;
        let field = object.get(scope, key.into())?;
        if field.is_undefined() {
            None
        } else {
            Some(field.to_rust_string_lossy(scope))
        }
    };

    let name = read("name").unwrap_or_else(|| "Error".to_string());
    let message = read("message").unwrap_or_default();
    let stack = read("stack");
    ThrownValue::Structured { name, message, stack }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_display() {
        assert_eq!(CellValue::Number(42.0).to_string(), "42");
        assert_eq!(CellValue::Number(-0.5).to_string(), "-0.5");
        assert_eq!(CellValue::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(CellValue::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
    }

    #[test]
    fn test_value_display() {
        assert_eq!(CellValue::String("a\"b".into()).to_string(), "\"a\\\"b\"");
        assert_eq!(CellValue::BigInt("10".into()).to_string(), "10n");
        assert_eq!(CellValue::Function(String::new()).to_string(), "[Function (anonymous)]");
        assert_eq!(
            CellValue::Promise(SettleState::Pending).to_string(),
            "Promise { <pending> }"
        );
        assert_eq!(
            CellValue::Json(serde_json::json!({"a": [1, 2]})).to_string(),
            "{\"a\":[1,2]}"
        );
    }

    #[test]
    fn test_thrown_display() {
        let thrown = ThrownValue::Structured {
            name: "TypeError".into(),
            message: "x is not a function".into(),
            stack: None,
        };
        assert_eq!(thrown.to_string(), "TypeError: x is not a function");
        assert_eq!(ThrownValue::opaque("5").to_string(), "5");
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(CellValue::Number(1.5)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "number", "value": 1.5}));

        let json = serde_json::to_value(CellValue::Undefined).unwrap();
        assert_eq!(json, serde_json::json!({"type": "undefined"}));
    }
}
