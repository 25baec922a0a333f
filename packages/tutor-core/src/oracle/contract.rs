//! Validation of the oracle's structured record.
//!
//! The oracle is trusted to judge but not to be well-formed. Nothing derived
//! from a record reaches the knowledge graph until the whole record passed
//! [`validate_record`].

use calc_viz_algo::VisualizationRequest;
use serde::Deserialize;
use serde_json::Value;

use super::OracleError;
use crate::knowledge::{ErrorKind, KnowledgeUpdate};

pub const MIN_CONFIDENCE_DELTA: i32 = -30;
pub const MAX_CONFIDENCE_DELTA: i32 = 20;

/// A record that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct TutoringRecord {
    pub tutor_response: String,
    pub error_kind: ErrorKind,
    pub micro_drill: bool,
    pub whiteboard: VisualizationRequest,
    pub knowledge_update: KnowledgeUpdate,
}

impl TutoringRecord {
    pub fn is_correct(&self) -> bool {
        self.error_kind == ErrorKind::None
    }
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    tutor_response: String,
    error_type: String,
    micro_drill: bool,
    #[serde(default)]
    whiteboard_instruction: Option<Value>,
    knowledge_update: RawKnowledgeUpdate,
}

#[derive(Debug, Deserialize)]
struct RawKnowledgeUpdate {
    topic: String,
    confidence_delta: f64,
    #[serde(default)]
    mastered: Option<bool>,
    #[serde(default)]
    weak_nodes: Option<Vec<String>>,
}

pub fn validate_record(value: Value) -> Result<TutoringRecord, OracleError> {
    let raw: RawRecord = serde_json::from_value(value)
        .map_err(|e| OracleError::Contract(format!("malformed record: {e}")))?;

    let error_kind: ErrorKind = raw
        .error_type
        .parse()
        .map_err(|e| OracleError::Contract(format!("{e}")))?;

    let whiteboard = match raw.whiteboard_instruction {
        None | Some(Value::Null) => VisualizationRequest::neutral(),
        Some(value) => serde_json::from_value(value)
            .map_err(|e| OracleError::Contract(format!("malformed whiteboard_instruction: {e}")))?,
    };

    let update = raw.knowledge_update;
    let topic = update.topic.trim();
    if topic.is_empty() {
        return Err(OracleError::Contract("knowledge_update.topic is empty".into()));
    }
    if !update.confidence_delta.is_finite() {
        return Err(OracleError::Contract("knowledge_update.confidence_delta is not finite".into()));
    }

    Ok(TutoringRecord {
        tutor_response: raw.tutor_response,
        error_kind,
        micro_drill: raw.micro_drill,
        whiteboard,
        knowledge_update: KnowledgeUpdate {
            topic: topic.to_string(),
            confidence_delta: clamp_delta(update.confidence_delta),
            mastered: update.mastered,
            weak_nodes: update.weak_nodes.unwrap_or_default(),
        },
    })
}

fn clamp_delta(raw: f64) -> i32 {
    let rounded = raw.round();
    let clamped = rounded.clamp(f64::from(MIN_CONFIDENCE_DELTA), f64::from(MAX_CONFIDENCE_DELTA));
    if clamped != rounded {
        tracing::warn!(delta = raw, clamped, "confidence_delta out of range");
    }
    clamped as i32
}
