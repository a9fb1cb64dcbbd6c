use crate::value::{CellValue, ThrownValue};
use serde::Serialize;

/// The outcome of executing one transpiled cell.
///
/// `error` implies `value` is a [`CellValue::Error`]; a returned error
/// object leaves `error` false.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    pub error: bool,
    pub source_code: String,
    pub value: CellValue,
}

impl ResultEnvelope {
    pub fn ok(source_code: impl Into<String>, value: CellValue) -> Self {
        Self {
            error: false,
            source_code: source_code.into(),
            value,
        }
    }

    pub fn failed(source_code: impl Into<String>, thrown: ThrownValue) -> Self {
        Self {
            error: true,
            source_code: source_code.into(),
            value: CellValue::Error(thrown),
        }
    }

    pub fn thrown(&self) -> Option<&ThrownValue> {
        match (&self.value, self.error) {
            (CellValue::Error(thrown), true) => Some(thrown),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope() {
        let envelope = ResultEnvelope::failed("code", ThrownValue::opaque("5"));
        assert!(envelope.error);
        assert_eq!(envelope.thrown(), Some(&ThrownValue::opaque("5")));
    }

    #[test]
    fn test_error_value_is_not_a_failure() {
        let thrown = ThrownValue::opaque("returned, not thrown");
        let envelope = ResultEnvelope::ok("code", CellValue::Error(thrown));
        assert!(!envelope.error);
        assert!(envelope.thrown().is_none());
    }

    #[test]
    fn test_serializes_for_tooling() {
        let envelope = ResultEnvelope::ok("x", CellValue::Bool(true));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "error": false,
                "source_code": "x",
                "value": {"type": "bool", "value": true},
            })
        );
    }
}
