//! Response DTOs returned to the mediation layer.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Severity of a structured probe error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Warning,
    Critical,
}

/// A structured error carried inside a discovery response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeError {
    pub severity: ErrorSeverity,
    pub message: String,
}

impl ProbeError {
    pub fn critical(message: impl Into<String>) -> Self {
        Self {
            severity: ErrorSeverity::Critical,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: ErrorSeverity::Warning,
            message: message.into(),
        }
    }
}

/// Result of one discovery scan: the entity set plus any structured errors.
///
/// The entity payload is kept generic so the topology crate can plug in its
/// own entity type without a dependency cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResponse<E> {
    pub entities: Vec<E>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ProbeError>,
    pub generated_at: String,
}

impl<E> DiscoveryResponse<E> {
    /// A successful response carrying the discovered entities.
    pub fn with_entities(entities: Vec<E>) -> Self {
        Self {
            entities,
            errors: Vec::new(),
            generated_at: Utc::now().to_rfc3339(),
        }
    }

    /// A failed response carrying a single critical error and no entities.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            entities: Vec::new(),
            errors: vec![ProbeError::critical(message)],
            generated_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn is_ok(&self) -> bool {
        !self
            .errors
            .iter()
            .any(|e| e.severity == ErrorSeverity::Critical)
    }
}

/// Result of validating a target's credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub explanation: String,
}

impl ValidationResponse {
    pub fn ok(explanation: impl Into<String>) -> Self {
        Self {
            ok: true,
            explanation: explanation.into(),
        }
    }

    pub fn failed(explanation: impl Into<String>) -> Self {
        Self {
            ok: false,
            explanation: explanation.into(),
        }
    }
}

/// Lifecycle state of an action as reported to the mediation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    Queued,
    InProgress,
    Succeeded,
    Failed,
}

/// Terminal outcome of one action execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub state: ActionState,
    pub description: String,
}

impl ActionResult {
    pub fn succeeded(description: impl Into<String>) -> Self {
        Self {
            state: ActionState::Succeeded,
            description: description.into(),
        }
    }

    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            state: ActionState::Failed,
            description: description.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state == ActionState::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_discovery_carries_one_critical_error() {
        let response: DiscoveryResponse<String> = DiscoveryResponse::failed("cannot read file");
        assert!(!response.is_ok());
        assert!(response.entities.is_empty());
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].severity, ErrorSeverity::Critical);
    }

    #[test]
    fn warnings_do_not_fail_discovery() {
        let mut response: DiscoveryResponse<String> =
            DiscoveryResponse::with_entities(vec!["vm-1".into()]);
        response.errors.push(ProbeError::warning("bad attribute"));
        assert!(response.is_ok());
    }

    #[test]
    fn action_state_serde() {
        assert_eq!(
            serde_json::to_string(&ActionState::InProgress).unwrap(),
            r#""in_progress""#
        );
        assert_eq!(
            serde_json::to_string(&ActionState::Succeeded).unwrap(),
            r#""succeeded""#
        );
    }

    #[test]
    fn validation_explanation_skipped_when_empty() {
        let json = serde_json::to_string(&ValidationResponse::ok("")).unwrap();
        assert!(!json.contains("explanation"));
    }
}
