use crate::events::{EventSink, RequestEvent};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

/// Writes one log line per request event.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn fire(&self, event: &RequestEvent) {
        let response_time_ms = event.response_time.as_millis() as u64;
        match &event.exception {
            None => info!(
                request_type = %event.request_type,
                name = %event.name,
                response_time_ms,
                response_length = event.response_length,
                "request succeeded"
            ),
            Some(exception) => warn!(
                request_type = %event.request_type,
                name = %event.name,
                response_time_ms,
                exception = %exception,
                "request failed"
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RequestEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RequestEvent> {
        self.lock().clone()
    }

    pub fn failures(&self) -> usize {
        self.lock().iter().filter(|e| e.is_failure()).count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RequestEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for MemorySink {
    fn fire(&self, event: &RequestEvent) {
        self.lock().push(event.clone());
    }
}
