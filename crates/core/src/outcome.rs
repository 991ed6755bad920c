//! Stage outcome tagging
//!
//! Every pipeline stage hands its result to the next stage as a
//! [`StageOutcome`]. A degraded outcome still carries a usable value (the
//! substitute input, the cheaper classification, the diagnostic reply) plus
//! the reason the primary path was abandoned. Fatal conditions are not an
//! outcome; they travel as `Err(_)`.

use serde::{Deserialize, Serialize};

/// Result of a single stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome<T> {
    /// Primary path succeeded
    Success { value: T },
    /// A fallback produced the value
    Degraded { value: T, reason: String },
}

impl<T> StageOutcome<T> {
    pub fn success(value: T) -> Self {
        Self::Success { value }
    }

    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Success { value } | Self::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Success { value } | Self::Degraded { value, .. } => value,
        }
    }

    /// Degradation reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }

    /// Map the value while keeping the tag
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StageOutcome<U> {
        match self {
            Self::Success { value } => StageOutcome::Success { value: f(value) },
            Self::Degraded { value, reason } => StageOutcome::Degraded {
                value: f(value),
                reason,
            },
        }
    }

    /// Split into value and optional reason
    pub fn into_parts(self) -> (T, Option<String>) {
        match self {
            Self::Success { value } => (value, None),
            Self::Degraded { value, reason } => (value, Some(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_has_no_reason() {
        let outcome = StageOutcome::success(3);
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.reason(), None);
        assert_eq!(*outcome.value(), 3);
    }

    #[test]
    fn test_map_keeps_degradation() {
        let outcome = StageOutcome::degraded("neutral", "model unavailable").map(str::len);
        assert!(outcome.is_degraded());
        assert_eq!(outcome.reason(), Some("model unavailable"));
        assert_eq!(outcome.into_value(), 7);
    }

    #[test]
    fn test_serialized_tag() {
        let json = serde_json::to_value(StageOutcome::degraded(1, "fallback")).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["reason"], "fallback");
    }
}
