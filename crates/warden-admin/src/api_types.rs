//! API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default reason recorded when a rejection doesn't give one.
pub const DEFAULT_REJECTION_REASON: &str = "No reason provided";

/// Successful response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
    /// Number of items, for list responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
            count: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    /// A list response carrying its item count.
    pub fn list(data: Vec<T>) -> Self {
        let count = data.len();
        Self {
            count: Some(count),
            ..Self::new(data)
        }
    }
}

/// Failure envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Health check payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Body of a rejection.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

impl RejectRequest {
    /// The given reason, or the default when missing or blank.
    pub fn reason(&self) -> &str {
        match self.reason.as_deref().map(str::trim) {
            Some(reason) if !reason.is_empty() => reason,
            _ => DEFAULT_REJECTION_REASON,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_envelope_counts_items() {
        let json = serde_json::to_value(ApiResponse::list(vec![1, 2, 3])).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 3);
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_single_envelope_omits_count() {
        let json =
            serde_json::to_value(ApiResponse::new("x").with_message("Query approved successfully"))
                .unwrap();
        assert!(json.get("count").is_none());
        assert_eq!(json["message"], "Query approved successfully");
    }

    #[test]
    fn test_reject_reason_defaults() {
        assert_eq!(RejectRequest::default().reason(), DEFAULT_REJECTION_REASON);
        let blank = RejectRequest {
            reason: Some("   ".into()),
        };
        assert_eq!(blank.reason(), DEFAULT_REJECTION_REASON);
        let given = RejectRequest {
            reason: Some("wrong table".into()),
        };
        assert_eq!(given.reason(), "wrong table");
    }
}
