use anyhow::Result;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One finished measurement, success or failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEvent {
    pub request_type: String,
    pub name: String,
    pub response_time: Duration,
    pub response_length: usize,
    pub exception: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RequestEvent {
    pub fn is_failure(&self) -> bool {
        self.exception.is_some()
    }
}

pub trait EventSink: Send + Sync {
    fn fire(&self, event: &RequestEvent);
}

/// Fan-out point for request events, shared by every virtual user.
#[derive(Default)]
pub struct RequestEvents {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl RequestEvents {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.add_sink(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn fire(&self, event: RequestEvent) {
        for sink in &self.sinks {
            sink.fire(&event);
        }
    }

    /// Starts timing a request. The clock starts now; the event is fired
    /// when the span is finished with [`MeasureSpan::success`] or
    /// [`MeasureSpan::failure`]. A span dropped unfinished records nothing.
    pub fn span(&self, request_type: &str, name: &str) -> MeasureSpan<'_> {
        MeasureSpan {
            events: self,
            request_type: request_type.to_string(),
            name: name.to_string(),
            timestamp: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Times `fut` inside a span and hands its result back untouched.
    pub async fn measure<T, F>(&self, request_type: &str, name: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let span = self.span(request_type, name);
        let result = fut.await;
        match &result {
            Ok(_) => span.success(0),
            Err(e) => span.failure(e),
        }
        result
    }
}

pub struct MeasureSpan<'a> {
    events: &'a RequestEvents,
    request_type: String,
    name: String,
    timestamp: DateTime<Utc>,
    started: Instant,
}

impl MeasureSpan<'_> {
    pub fn success(self, response_length: usize) {
        self.finish(response_length, None);
    }

    pub fn failure(self, error: &anyhow::Error) {
        self.finish(0, Some(format!("{:#}", error)));
    }

    fn finish(self, response_length: usize, exception: Option<String>) {
        let response_time = self.started.elapsed();
        self.events.fire(RequestEvent {
            request_type: self.request_type,
            name: self.name,
            response_time,
            response_length,
            exception,
            timestamp: self.timestamp,
        });
    }
}
