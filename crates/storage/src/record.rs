use std::fmt;

use serde::{Deserialize, Serialize};

/// Execution status of a request.
///
/// Stored and exchanged as the integer codes `0`, `1`, `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum RequestStatus {
    Pending,
    Succeeded,
    Failed,
}

impl RequestStatus {
    pub fn code(self) -> i64 {
        match self {
            RequestStatus::Pending => 0,
            RequestStatus::Succeeded => 1,
            RequestStatus::Failed => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(RequestStatus::Pending),
            1 => Some(RequestStatus::Succeeded),
            2 => Some(RequestStatus::Failed),
            _ => None,
        }
    }

    /// Lower-case name used in logs and human-facing output.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Succeeded => "succeeded",
            RequestStatus::Failed => "failed",
        }
    }

    /// Whether a record at `self` may be moved to `next`.
    ///
    /// Rewriting the current status is always allowed. Otherwise a record
    /// only moves forward: Pending -> {Succeeded, Failed}, Failed -> Succeeded
    /// (a retry that worked). Nothing leaves Succeeded.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Succeeded)
                | (RequestStatus::Pending, RequestStatus::Failed)
                | (RequestStatus::Failed, RequestStatus::Succeeded)
        )
    }

    pub fn is_terminal_success(self) -> bool {
        self == RequestStatus::Succeeded
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RequestStatus> for i64 {
    fn from(status: RequestStatus) -> i64 {
        status.code()
    }
}

impl TryFrom<i64> for RequestStatus {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        RequestStatus::from_code(code).ok_or_else(|| format!("unknown request status code {code}"))
    }
}

/// A row of the request ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub request_id: String,
    pub status: RequestStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_wire_values() {
        assert_eq!(RequestStatus::Pending.code(), 0);
        assert_eq!(RequestStatus::Succeeded.code(), 1);
        assert_eq!(RequestStatus::Failed.code(), 2);
        assert_eq!(RequestStatus::from_code(3), None);
        assert_eq!(RequestStatus::from_code(-1), None);
    }

    #[test]
    fn serializes_as_integer() {
        let record = RequestRecord {
            request_id: "abc123-mint".to_string(),
            status: RequestStatus::Succeeded,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"request_id": "abc123-mint", "status": 1})
        );
        let back: RequestRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn unknown_code_fails_to_deserialize() {
        let result: Result<RequestStatus, _> = serde_json::from_str("7");
        assert!(result.is_err());
    }

    #[test]
    fn succeeded_is_final() {
        assert!(!RequestStatus::Succeeded.can_transition_to(RequestStatus::Failed));
        assert!(!RequestStatus::Succeeded.can_transition_to(RequestStatus::Pending));
        assert!(RequestStatus::Succeeded.can_transition_to(RequestStatus::Succeeded));
    }

    #[test]
    fn failed_can_only_retry_forward() {
        assert!(RequestStatus::Failed.can_transition_to(RequestStatus::Succeeded));
        assert!(RequestStatus::Failed.can_transition_to(RequestStatus::Failed));
        assert!(!RequestStatus::Failed.can_transition_to(RequestStatus::Pending));
    }

    #[test]
    fn pending_moves_to_either_outcome() {
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Succeeded));
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Failed));
    }
}
