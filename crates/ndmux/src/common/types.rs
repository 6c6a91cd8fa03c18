//! Wire-level types shared by the dispatcher and the record stream.

use core::any::Any;
use core::fmt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque per-item payload. The multiplexer never interprets its contents;
/// only the caller-supplied handler does.
pub type BatchItem = Value;

/// One inbound batch: `{ "batch": [item0, item1, ...] }`.
///
/// Item identifiers are the 0-based positions within `batch`. They are
/// assigned at submission time and are never reused or reordered, so every
/// output record can be correlated with exactly one input item.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub batch: Vec<BatchItem>,
}

impl BatchRequest {
    pub fn new(batch: Vec<BatchItem>) -> Self {
        Self { batch }
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }
}

/// Settled outcome of one batch item, tagged with the item's submission
/// index.
///
/// Serialized untagged: a success record is `{"id": n, "result": ...}` and a
/// failure record is `{"id": n, "error": {"message": ...}}`. Exactly one
/// record is eventually produced per submitted item unless the whole response
/// is torn down by a peer disconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchResult {
    Success { id: usize, result: Value },
    Failure { id: usize, error: NormalizedError },
}

impl BatchResult {
    pub fn success(id: usize, result: Value) -> Self {
        Self::Success { id, result }
    }

    pub fn failure(id: usize, error: NormalizedError) -> Self {
        Self::Failure { id, error }
    }

    /// Submission index of the item this record settles.
    pub fn id(&self) -> usize {
        match self {
            Self::Success { id, .. } | Self::Failure { id, .. } => *id,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

/// Fixed-shape projection of an arbitrary handler failure, safe to serialize.
///
/// Raw handler errors never cross the transport boundary; every failure is
/// reduced to this shape first. The projections below are total: they accept
/// any boxed error or panic payload and always produce a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl NormalizedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Projects a boxed handler error onto the wire shape.
    ///
    /// Handlers that fail with a `NormalizedError` keep their message and
    /// code verbatim; anything else is reduced to its `Display` output.
    pub fn from_failure(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        match err.downcast::<Self>() {
            Ok(normalized) => *normalized,
            Err(other) => Self::new(other.to_string()),
        }
    }

    /// Projects a panic payload onto the wire shape.
    ///
    /// Panic payloads are untyped; string payloads keep their message, all
    /// others map to a generic one.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self::with_code(message, "panic")
    }
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({code})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for NormalizedError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_record_wire_shape() {
        let record = BatchResult::success(3, json!({"ok": true}));
        let line = serde_json::to_value(&record).unwrap();
        assert_eq!(line, json!({"id": 3, "result": {"ok": true}}));
    }

    #[test]
    fn failure_record_wire_shape_omits_missing_code() {
        let record = BatchResult::failure(1, NormalizedError::new("boom"));
        let line = serde_json::to_value(&record).unwrap();
        assert_eq!(line, json!({"id": 1, "error": {"message": "boom"}}));

        let coded = BatchResult::failure(2, NormalizedError::with_code("boom", "E42"));
        let line = serde_json::to_value(&coded).unwrap();
        assert_eq!(
            line,
            json!({"id": 2, "error": {"message": "boom", "code": "E42"}})
        );
    }

    #[test]
    fn from_failure_preserves_normalized_errors() {
        let source: Box<dyn std::error::Error + Send + Sync> =
            Box::new(NormalizedError::with_code("not found", "missing"));
        let projected = NormalizedError::from_failure(source);
        assert_eq!(projected.message, "not found");
        assert_eq!(projected.code.as_deref(), Some("missing"));
    }

    #[test]
    fn from_failure_reduces_foreign_errors_to_display() {
        let source: Box<dyn std::error::Error + Send + Sync> =
            Box::new(std::io::Error::other("disk on fire"));
        let projected = NormalizedError::from_failure(source);
        assert_eq!(projected.message, "disk on fire");
        assert_eq!(projected.code, None);
    }

    #[test]
    fn from_panic_is_total_over_any_payload() {
        let projected = NormalizedError::from_panic(Box::new("static str"));
        assert_eq!(projected.message, "static str");
        assert_eq!(projected.code.as_deref(), Some("panic"));

        let projected = NormalizedError::from_panic(Box::new(String::from("owned")));
        assert_eq!(projected.message, "owned");

        let projected = NormalizedError::from_panic(Box::new(17_u32));
        assert_eq!(projected.message, "handler panicked");
    }
}
