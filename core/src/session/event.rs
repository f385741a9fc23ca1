use serde::{Deserialize, Serialize};

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionEventType {
    SESSION_STARTED,
    ANALYSIS_REQUESTED,
    UPLOAD_COMPLETED,
    ANALYSIS_SUPERSEDED,
    ANALYSIS_UPSTREAM_FAILURE,
    ANALYSIS_MALFORMED_PAYLOAD,
    ANALYSIS_NO_ITEMS,
    ANALYSIS_READY,
    ALLOCATION_SET,
    ALLOCATION_REJECTED,
}

impl SessionEventType {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            SessionEventType::ANALYSIS_UPSTREAM_FAILURE
                | SessionEventType::ANALYSIS_MALFORMED_PAYLOAD
                | SessionEventType::ALLOCATION_REJECTED
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionEvent {
    pub ts_utc: String, // RFC3339 UTC string
    pub event_type: SessionEventType,
    pub session_id: String,
    pub details: serde_json::Value,
}

impl SessionEvent {
    pub fn now(
        event_type: SessionEventType,
        session_id: &str,
        details: serde_json::Value,
    ) -> Self {
        Self {
            ts_utc: now_rfc3339_utc(),
            event_type,
            session_id: session_id.to_string(),
            details,
        }
    }
}

fn now_rfc3339_utc() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
