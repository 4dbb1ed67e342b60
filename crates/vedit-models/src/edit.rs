//! Edit operation models.
//!
//! Operations arrive already validated from the edit-instruction parser, so
//! this module only deals with the wire shape. A `type` tag that is not one of
//! the known kinds still deserializes (into [`EditOperation::Unsupported`]) so
//! the record stays readable and the pipeline can reject it at dispatch time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A single edit, applied to the output of the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum EditOperation {
    /// Drop the first `seconds` of the video
    TrimStart { seconds: f64 },
    /// Drop the last `seconds` of the video
    TrimEnd { seconds: f64 },
    /// Change playback speed by `factor` (2.0 = twice as fast)
    Speed { factor: f64 },
    /// Fade video and audio out over the last `seconds`
    FadeOut { seconds: f64 },
    /// Operation kind this build does not know how to apply
    Unsupported { raw: Value },
}

/// Tagged wire form of the known operation kinds.
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownOperation {
    TrimStart { seconds: f64 },
    TrimEnd { seconds: f64 },
    Speed { factor: f64 },
    FadeOut { seconds: f64 },
}

const KNOWN_KINDS: [&str; 4] = ["trim_start", "trim_end", "speed", "fade_out"];

impl EditOperation {
    /// The `type` tag of this operation.
    pub fn kind(&self) -> &str {
        match self {
            EditOperation::TrimStart { .. } => "trim_start",
            EditOperation::TrimEnd { .. } => "trim_end",
            EditOperation::Speed { .. } => "speed",
            EditOperation::FadeOut { .. } => "fade_out",
            EditOperation::Unsupported { raw } => {
                raw.get("type").and_then(Value::as_str).unwrap_or("<untagged>")
            }
        }
    }
}

impl fmt::Display for EditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOperation::TrimStart { seconds } => write!(f, "trim_start({}s)", seconds),
            EditOperation::TrimEnd { seconds } => write!(f, "trim_end({}s)", seconds),
            EditOperation::Speed { factor } => write!(f, "speed({}x)", factor),
            EditOperation::FadeOut { seconds } => write!(f, "fade_out({}s)", seconds),
            EditOperation::Unsupported { .. } => write!(f, "unsupported({})", self.kind()),
        }
    }
}

impl TryFrom<Value> for EditOperation {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let is_known = value
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|kind| KNOWN_KINDS.contains(&kind));

        if !is_known {
            return Ok(EditOperation::Unsupported { raw: value });
        }

        let known: KnownOperation = serde_json::from_value(value).map_err(|e| e.to_string())?;
        Ok(match known {
            KnownOperation::TrimStart { seconds } => EditOperation::TrimStart { seconds },
            KnownOperation::TrimEnd { seconds } => EditOperation::TrimEnd { seconds },
            KnownOperation::Speed { factor } => EditOperation::Speed { factor },
            KnownOperation::FadeOut { seconds } => EditOperation::FadeOut { seconds },
        })
    }
}

impl From<EditOperation> for Value {
    fn from(op: EditOperation) -> Self {
        let known = match op {
            EditOperation::TrimStart { seconds } => KnownOperation::TrimStart { seconds },
            EditOperation::TrimEnd { seconds } => KnownOperation::TrimEnd { seconds },
            EditOperation::Speed { factor } => KnownOperation::Speed { factor },
            EditOperation::FadeOut { seconds } => KnownOperation::FadeOut { seconds },
            EditOperation::Unsupported { raw } => return raw,
        };
        serde_json::to_value(known).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_operations() {
        let ops: Vec<EditOperation> = serde_json::from_value(json!([
            {"type": "trim_start", "seconds": 10},
            {"type": "speed", "factor": 1.5},
            {"type": "fade_out", "seconds": 2.5},
            {"type": "trim_end", "seconds": 3}
        ]))
        .unwrap();

        assert_eq!(
            ops,
            vec![
                EditOperation::TrimStart { seconds: 10.0 },
                EditOperation::Speed { factor: 1.5 },
                EditOperation::FadeOut { seconds: 2.5 },
                EditOperation::TrimEnd { seconds: 3.0 },
            ]
        );
    }

    #[test]
    fn test_unknown_kind_is_kept() {
        let op: EditOperation =
            serde_json::from_value(json!({"type": "reverse", "amount": 1})).unwrap();
        assert_eq!(op.kind(), "reverse");
        assert!(matches!(op, EditOperation::Unsupported { .. }));

        // Written back unchanged
        let value = Value::from(op);
        assert_eq!(value, json!({"type": "reverse", "amount": 1}));
    }

    #[test]
    fn test_known_kind_with_bad_params_is_rejected() {
        let result: Result<EditOperation, _> =
            serde_json::from_value(json!({"type": "speed", "factor": "fast"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_uses_type_tag() {
        let value = serde_json::to_value(EditOperation::FadeOut { seconds: 1.0 }).unwrap();
        assert_eq!(value, json!({"type": "fade_out", "seconds": 1.0}));
    }

    #[test]
    fn test_display() {
        assert_eq!(EditOperation::Speed { factor: 2.0 }.to_string(), "speed(2x)");
    }
}
