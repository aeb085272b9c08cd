use anyhow::Result;
use async_trait::async_trait;
use driver::{runner_config, LoadTask, REQUEST_NAME, REQUEST_TYPE};
use harness::{MemorySink, RequestEvents, Runner, TaskSet};
use llm::{DecodeError, ModelInvoker, PayloadFormat, PreparedRequest, RequestPayloadBuilder};
use loadtest_core::config::{LoadConfig, ModelConfig, PayloadConfig};
use loadtest_core::Message;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const LEGACY_RESPONSE: &str =
    r#"{"completion":" Rex and Charlie raced to the oak tree.","stop_reason":"max_tokens"}"#;

const MESSAGES_RESPONSE: &str = r#"{
    "id": "msg_bdrk_01",
    "type": "message",
    "role": "assistant",
    "content": [
        {"type": "text", "text": "Charlie kept watch while Rex slept."},
        {"type": "text", "text": "ignored"}
    ],
    "stop_reason": "end_turn",
    "usage": {"input_tokens": 150, "output_tokens": 9}
}"#;

/// Returns a fixed body and remembers every request it saw.
struct FixedInvoker {
    body: &'static str,
    calls: AtomicUsize,
    seen: Mutex<Vec<PreparedRequest>>,
    delay: Duration,
}

impl FixedInvoker {
    fn new(body: &'static str) -> Self {
        Self {
            body,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ModelInvoker for FixedInvoker {
    async fn invoke(&self, request: &PreparedRequest) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.body.as_bytes().to_vec())
    }
}

#[derive(Debug)]
struct ThrottledError;

impl std::fmt::Display for ThrottledError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ThrottlingException: Too many requests")
    }
}

impl std::error::Error for ThrottledError {}

struct FailingInvoker;

#[async_trait]
impl ModelInvoker for FailingInvoker {
    async fn invoke(&self, _request: &PreparedRequest) -> Result<Vec<u8>> {
        Err(ThrottledError.into())
    }
}

fn legacy_request() -> Arc<PreparedRequest> {
    let request = RequestPayloadBuilder::new(&ModelConfig::default(), &PayloadConfig::default())
        .build()
        .unwrap();
    Arc::new(request)
}

fn messages_request() -> Arc<PreparedRequest> {
    let model = ModelConfig {
        id: "arn:aws:bedrock:us-east-1:123456789012:provisioned-model/nnp8ar503q42".to_string(),
        max_tokens: 300,
        temperature: 0.7,
        top_p: 0.9,
        aws_region: None,
    };
    let payload = PayloadConfig {
        format: PayloadFormat::Messages,
        messages: vec![Message::user("Tell me about Rex and Charlie.")],
        ..PayloadConfig::default()
    };
    Arc::new(RequestPayloadBuilder::new(&model, &payload).build().unwrap())
}

fn events_with_memory() -> (RequestEvents, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (RequestEvents::new().with_sink(sink.clone()), sink)
}

fn assert_sampling_ranges(body: &Value, max_tokens_field: &str) {
    let temperature = body["temperature"].as_f64().unwrap();
    let top_p = body["top_p"].as_f64().unwrap();
    let max_tokens = body[max_tokens_field].as_u64().unwrap();

    assert!((0.0..=1.0).contains(&temperature));
    assert!((0.0..=1.0).contains(&top_p));
    assert!(max_tokens > 0);
}

#[test]
fn should_decode_legacy_body_with_required_fields() {
    let request = legacy_request();
    let body: Value = serde_json::from_slice(&request.body).unwrap();

    let prompt = body["prompt"].as_str().unwrap();
    let human = prompt.find("\n\nHuman:").unwrap();
    assert!(prompt[human..].contains("\n\nAssistant:"));
    assert_sampling_ranges(&body, "max_tokens_to_sample");
}

#[test]
fn should_decode_messages_body_with_required_fields() {
    let request = messages_request();
    let body: Value = serde_json::from_slice(&request.body).unwrap();

    assert_eq!(body["anthropic_version"], "bedrock-2023-05-31");
    assert_eq!(body["messages"][0]["role"], "user");
    assert!(body["messages"][0]["content"].is_string());
    assert!(body["system"].is_string());
    assert_sampling_ranges(&body, "max_tokens");
}

#[tokio::test]
async fn should_extract_completion_from_legacy_response() {
    let invoker = Arc::new(FixedInvoker::new(LEGACY_RESPONSE));
    let task = LoadTask::new(invoker.clone(), legacy_request());
    let (events, sink) = events_with_memory();

    let result = task.generate(&events).await.unwrap();

    assert_eq!(result.text(), " Rex and Charlie raced to the oak tree.");
    assert_eq!(result.raw, LEGACY_RESPONSE.as_bytes());

    let seen = invoker.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].model_id, "anthropic.claude-v2");
    assert_eq!(seen[0].accept, "application/json");
    assert_eq!(seen[0].content_type, "application/json");

    let recorded = sink.events();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].request_type, REQUEST_TYPE);
    assert_eq!(recorded[0].name, REQUEST_NAME);
    assert_eq!(recorded[0].response_length, LEGACY_RESPONSE.len());
    assert!(!recorded[0].is_failure());
}

#[tokio::test]
async fn should_extract_first_text_block_from_messages_response() {
    let invoker = Arc::new(FixedInvoker::new(MESSAGES_RESPONSE));
    let task = LoadTask::new(invoker, messages_request());
    let (events, sink) = events_with_memory();

    let result = task.generate(&events).await.unwrap();

    assert_eq!(result.text(), "Charlie kept watch while Rex slept.");
    assert_eq!(sink.failures(), 0);
}

#[tokio::test]
async fn should_propagate_invoker_error_and_record_failure() {
    let task = LoadTask::new(Arc::new(FailingInvoker), legacy_request());
    let (events, sink) = events_with_memory();

    let err = task.generate(&events).await.unwrap_err();

    assert!(err.downcast_ref::<ThrottledError>().is_some());

    let recorded = sink.events();
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].is_failure());
    assert_eq!(
        recorded[0].exception.as_deref(),
        Some("ThrottlingException: Too many requests")
    );
}

#[tokio::test]
async fn should_fail_with_decode_error_on_wrong_shape() {
    // a legacy-shaped body for a messages request
    let task = LoadTask::new(Arc::new(FixedInvoker::new(LEGACY_RESPONSE)), messages_request());
    let (events, sink) = events_with_memory();

    let err = task.generate(&events).await.unwrap_err();

    assert!(err.downcast_ref::<DecodeError>().is_some());
    assert_eq!(sink.failures(), 1);
}

#[tokio::test]
async fn should_measure_concurrent_invocations_independently() {
    let invoker = Arc::new(FixedInvoker::new(MESSAGES_RESPONSE).with_delay(Duration::from_millis(10)));
    let request = messages_request();
    let task = Arc::new(LoadTask::new(invoker.clone(), request.clone()));
    let (events, sink) = events_with_memory();
    let events = Arc::new(events);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let task = task.clone();
            let events = events.clone();
            tokio::spawn(async move { task.generate(&events).await })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        let invocation = result.unwrap().unwrap();
        assert_eq!(invocation.text(), "Charlie kept watch while Rex slept.");
        assert!(invocation.elapsed >= Duration::from_millis(10));
    }

    assert_eq!(invoker.calls.load(Ordering::SeqCst), 16);
    let seen = invoker.seen.lock().unwrap();
    assert!(seen.iter().all(|r| r == request.as_ref()));

    let recorded = sink.events();
    assert_eq!(recorded.len(), 16);
    assert!(recorded.iter().all(|e| !e.is_failure()));
    assert!(recorded
        .iter()
        .all(|e| e.response_time >= Duration::from_millis(10)));
}

#[tokio::test]
async fn should_drive_load_task_through_runner() {
    let invoker = Arc::new(FixedInvoker::new(LEGACY_RESPONSE));
    let mut tasks = TaskSet::new();
    tasks
        .register(Box::new(LoadTask::new(invoker.clone(), legacy_request())))
        .unwrap();
    let (events, sink) = events_with_memory();
    let runner = Runner::new(runner_config(&LoadConfig {
        users: 4,
        iterations: Some(5),
        ..LoadConfig::default()
    }));

    let summary = runner.run(Arc::new(tasks), Arc::new(events)).await.unwrap();

    assert_eq!(summary.iterations, 20);
    assert_eq!(summary.failures, 0);
    assert_eq!(invoker.calls.load(Ordering::SeqCst), 20);
    assert_eq!(sink.events().len(), 20);
}

#[tokio::test]
async fn should_count_failed_runs_without_stopping() {
    let mut tasks = TaskSet::new();
    tasks
        .register(Box::new(LoadTask::new(Arc::new(FailingInvoker), legacy_request())))
        .unwrap();
    let (events, sink) = events_with_memory();
    let runner = Runner::new(runner_config(&LoadConfig {
        users: 2,
        iterations: Some(3),
        ..LoadConfig::default()
    }));

    let summary = runner.run(Arc::new(tasks), Arc::new(events)).await.unwrap();

    assert_eq!(summary.iterations, 6);
    assert_eq!(summary.failures, 6);
    assert_eq!(sink.failures(), 6);
}
