use super::event::{SessionEvent, SessionEventType};
use std::sync::{Arc, Mutex};

/// Receives every lifecycle event of a controller.
pub trait SessionObserver: Send + Sync {
    fn record(&self, event: &SessionEvent);
}

/// Forwards session events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn record(&self, event: &SessionEvent) {
        if event.event_type.is_failure() {
            tracing::warn!(
                session_id = %event.session_id,
                event_type = ?event.event_type,
                details = %event.details,
                "session event"
            );
        } else if event.event_type == SessionEventType::ALLOCATION_SET {
            // one per slider movement
            tracing::debug!(
                session_id = %event.session_id,
                details = %event.details,
                "allocation set"
            );
        } else {
            tracing::info!(
                session_id = %event.session_id,
                event_type = ?event.event_type,
                details = %event.details,
                "session event"
            );
        }
    }
}

/// Keeps events in memory; clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemoryObserver {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl MemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl SessionObserver for MemoryObserver {
    fn record(&self, event: &SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
