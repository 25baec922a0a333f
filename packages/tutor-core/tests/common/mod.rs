#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};

use calc_tutor_core::knowledge::MemoryKnowledgeStore;
use calc_tutor_core::{FrameSettings, Oracle, OracleError, OracleRequest, SessionConfig, Tutor, TutorSession};

/// Oracle that replays queued replies and records every request it saw
#[derive(Default)]
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<Value, OracleError>>>,
    seen: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: Result<Value, OracleError>) {
        self.replies.lock().push_back(reply);
    }

    pub fn push_record(&self, record: Value) {
        self.push(Ok(record));
    }

    pub fn requests(&self) -> Vec<OracleRequest> {
        self.seen.lock().clone()
    }
}

impl Oracle for ScriptedOracle {
    async fn consult(&self, request: &OracleRequest) -> Result<Value, OracleError> {
        self.seen.lock().push(request.clone());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Transport("script exhausted".into())))
    }
}

pub fn record(topic: &str, error_type: &str, delta: i32) -> Value {
    json!({
        "tutor_response": format!("Let's look at {topic} again."),
        "error_type": error_type,
        "micro_drill": false,
        "knowledge_update": { "topic": topic, "confidence_delta": delta }
    })
}

pub fn drill_record(topic: &str, error_type: &str) -> Value {
    let mut value = record(topic, error_type, -5);
    value["micro_drill"] = json!(true);
    value
}

pub fn with_whiteboard(mut value: Value, whiteboard: Value) -> Value {
    value["whiteboard_instruction"] = whiteboard;
    value
}

pub fn limit_whiteboard() -> Value {
    json!({
        "kind": "LIMIT",
        "title": "Limit at 2",
        "functionExpression": "(x^2-4)/(x-2)",
        "viewport": { "xMin": -1, "xMax": 5, "yMin": -1, "yMax": 6 },
        "params": { "limitPoint": 2, "initialOffset": 1.5 }
    })
}

pub fn frame_settings() -> FrameSettings {
    FrameSettings {
        interval: Duration::from_millis(20),
        canvas_width: 400.0,
        canvas_height: 300.0,
    }
}

pub fn tutor_with(store: Arc<MemoryKnowledgeStore>, oracle: ScriptedOracle) -> Tutor<ScriptedOracle> {
    let session = TutorSession::open(store, "student", SessionConfig::default());
    Tutor::new(session, oracle, frame_settings())
}
