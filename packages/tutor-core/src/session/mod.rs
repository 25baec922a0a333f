//! One student's tutoring session: attempt counting, reveal gating, the
//! conversation, micro-drill lifecycle, and reconciliation of oracle records
//! into the knowledge graph.
//!
//! A turn is split in two so the oracle call can happen outside the session:
//! [`TutorSession::begin_turn`] hands out a [`PendingTurn`] ticket and
//! [`TutorSession::complete_turn`] consumes it together with the oracle's
//! result.

pub mod state_machine;

use std::sync::Arc;

use calc_viz_algo::VisualizationRequest;
use serde_json::Value;

use crate::config::SessionConfig;
use crate::error::{InputRejection, TurnError};
use crate::knowledge::{self, ErrorKind, KnowledgeGraph, KnowledgeStore};
use crate::oracle::prompt::build_instructions;
use crate::oracle::{validate_record, ChatTurn, OracleError, OracleRequest};

pub use state_machine::{PhaseTransition, TransitionError, TurnPhase, TurnStateMachine};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DrillState {
    #[default]
    Inactive,
    Active {
        topic: String,
    },
}

impl DrillState {
    pub fn is_active(&self) -> bool {
        matches!(self, DrillState::Active { .. })
    }

    pub fn topic(&self) -> Option<&str> {
        match self {
            DrillState::Active { topic } => Some(topic),
            DrillState::Inactive => None,
        }
    }
}

/// Ticket for the one in-flight oracle request
#[derive(Debug)]
pub struct PendingTurn {
    epoch: u64,
    attempt_number: u32,
    reveal_allowed: bool,
    request: OracleRequest,
}

impl PendingTurn {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    pub fn reveal_allowed(&self) -> bool {
        self.reveal_allowed
    }

    pub fn request(&self) -> &OracleRequest {
        &self.request
    }
}

/// Result of an applied turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub tutor_response: String,
    pub error_kind: ErrorKind,
    pub is_correct: bool,
    pub attempt_number: u32,
    pub reveal_allowed: bool,
    /// The record asked for a micro-drill on this turn
    pub micro_drill: bool,
    pub visualization: VisualizationRequest,
    pub persisted: bool,
}

impl TurnOutcome {
    /// The reply followed by the whiteboard narration, for a speech synthesizer
    pub fn speech_text(&self) -> String {
        let reply = self.tutor_response.trim();
        if self.visualization.is_neutral() {
            return reply.to_string();
        }
        let narration = self.visualization.narration();
        match (reply.is_empty(), narration.is_empty()) {
            (_, true) => reply.to_string(),
            (true, false) => narration,
            (false, false) => format!("{reply} {narration}"),
        }
    }
}

pub struct TutorSession {
    key: String,
    store: Arc<dyn KnowledgeStore>,
    config: SessionConfig,
    graph: KnowledgeGraph,
    conversation: Vec<ChatTurn>,
    machine: TurnStateMachine,
    drill: DrillState,
    visualization: VisualizationRequest,
    epoch: u64,
}

impl TutorSession {
    /// Opens the session for `key`, restoring its persisted graph.
    pub fn open(store: Arc<dyn KnowledgeStore>, key: impl Into<String>, config: SessionConfig) -> Self {
        let key = key.into();
        let graph = knowledge::load_graph(store.as_ref(), &key);
        tracing::info!(
            key = %key,
            topics = graph.topics.len(),
            attempts = graph.session_stats.total_attempts,
            "session opened"
        );
        Self {
            key,
            store,
            config,
            graph,
            conversation: Vec::new(),
            machine: TurnStateMachine::new(),
            drill: DrillState::Inactive,
            visualization: VisualizationRequest::neutral(),
            epoch: 0,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    /// Full history, most recent last
    pub fn conversation(&self) -> &[ChatTurn] {
        &self.conversation
    }

    pub fn phase(&self) -> TurnPhase {
        self.machine.phase()
    }

    pub fn transitions(&self) -> &[PhaseTransition] {
        self.machine.history()
    }

    pub fn drill(&self) -> &DrillState {
        &self.drill
    }

    pub fn visualization(&self) -> &VisualizationRequest {
        &self.visualization
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn attempt_number(&self) -> u32 {
        self.graph.session_stats.attempt_on_current_problem.saturating_add(1)
    }

    pub fn reveal_allowed(&self) -> bool {
        self.attempt_number() > self.config.reveal_after_failures
    }

    pub fn begin_turn(&mut self, input: &str) -> Result<PendingTurn, TurnError> {
        let message = input.trim();
        if message.is_empty() {
            return Err(InputRejection::EmptyInput.into());
        }
        if self.machine.is_busy() {
            return Err(InputRejection::Busy.into());
        }

        let attempt_number = self.attempt_number();
        let reveal_allowed = self.reveal_allowed();

        self.conversation.push(ChatTurn::user(message));
        let skip = self.conversation.len().saturating_sub(self.config.history_window);
        let request = OracleRequest {
            message: message.to_string(),
            knowledge_graph: self.graph.clone(),
            conversation_history: self.conversation[skip..].to_vec(),
            instructions: build_instructions(&self.graph, attempt_number, reveal_allowed),
        };

        if let Err(err) = self.machine.dispatch() {
            self.conversation.pop();
            tracing::error!(error = %err, "turn dispatch rejected");
            return Err(InputRejection::Busy.into());
        }

        tracing::debug!(attempt_number, reveal_allowed, epoch = self.epoch, "turn dispatched");
        Ok(PendingTurn {
            epoch: self.epoch,
            attempt_number,
            reveal_allowed,
            request,
        })
    }

    pub fn complete_turn(
        &mut self,
        pending: PendingTurn,
        result: Result<Value, OracleError>,
    ) -> Result<TurnOutcome, TurnError> {
        if pending.epoch != self.epoch {
            tracing::info!(
                stale_epoch = pending.epoch,
                epoch = self.epoch,
                "discarding reply for a reset session"
            );
            return Err(TurnError::Superseded);
        }

        let record = match result.and_then(validate_record) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(error = %err, "oracle turn failed");
                if let Err(t) = self.machine.failed(err.to_string()) {
                    tracing::error!(error = %t, "unexpected phase on failure");
                }
                return Err(err.into());
            }
        };

        let is_correct = record.is_correct();
        let mut graph = knowledge::apply_update(
            &self.graph,
            &record.knowledge_update,
            record.error_kind,
            is_correct,
        );
        if record.micro_drill {
            graph = knowledge::record_micro_drill(&graph);
            self.drill = DrillState::Active {
                topic: record.knowledge_update.topic.clone(),
            };
        }
        self.graph = graph;
        self.visualization = record.whiteboard.clone();
        self.conversation.push(ChatTurn::assistant(record.tutor_response.clone()));

        let persisted = knowledge::persist_graph(self.store.as_ref(), &self.key, &self.graph);
        if let Err(err) = self.machine.applied() {
            tracing::error!(error = %err, "unexpected phase on apply");
        }

        tracing::info!(
            topic = %record.knowledge_update.topic,
            error_kind = %record.error_kind,
            is_correct,
            micro_drill = record.micro_drill,
            "turn applied"
        );

        Ok(TurnOutcome {
            tutor_response: record.tutor_response,
            error_kind: record.error_kind,
            is_correct,
            attempt_number: pending.attempt_number,
            reveal_allowed: pending.reveal_allowed,
            micro_drill: record.micro_drill,
            visualization: record.whiteboard,
            persisted,
        })
    }

    /// Leaves an active drill. Returns false when no drill was active.
    pub fn dismiss_drill(&mut self) -> bool {
        if !self.drill.is_active() {
            return false;
        }
        self.drill = DrillState::Inactive;
        self.graph = knowledge::dismiss_drill_counters(&self.graph);
        knowledge::persist_graph(self.store.as_ref(), &self.key, &self.graph);
        true
    }

    /// Starts over: empty graph, no conversation, persisted graph removed. A
    /// reply still in flight for the old session is discarded when it lands.
    pub fn reset(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.graph = knowledge::create_empty();
        self.conversation.clear();
        self.drill = DrillState::Inactive;
        self.visualization = VisualizationRequest::neutral();
        self.machine.force_idle("session reset");
        knowledge::clear_graph(self.store.as_ref(), &self.key);
        tracing::info!(key = %self.key, epoch = self.epoch, "session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::MemoryKnowledgeStore;
    use serde_json::json;

    fn record(error_type: &str, delta: i32, drill: bool) -> Value {
        json!({
            "tutor_response": "Check the sign of the second term.",
            "error_type": error_type,
            "micro_drill": drill,
            "knowledge_update": { "topic": "derivatives", "confidence_delta": delta }
        })
    }

    fn session() -> (Arc<MemoryKnowledgeStore>, TutorSession) {
        let store = Arc::new(MemoryKnowledgeStore::new());
        let session = TutorSession::open(store.clone(), "test", SessionConfig::default());
        (store, session)
    }

    #[test]
    fn test_rejects_empty_and_busy() {
        let (_, mut s) = session();
        assert_eq!(
            s.begin_turn("   ").unwrap_err(),
            TurnError::InputRejected(InputRejection::EmptyInput)
        );
        let _pending = s.begin_turn("d/dx x^2 = x").unwrap();
        assert_eq!(
            s.begin_turn("hello?").unwrap_err(),
            TurnError::InputRejected(InputRejection::Busy)
        );
        assert_eq!(s.conversation().len(), 1);
    }

    #[test]
    fn test_applied_turn_updates_everything() {
        let (store, mut s) = session();
        let pending = s.begin_turn("d/dx x^2 = x").unwrap();
        assert_eq!(pending.attempt_number(), 1);
        assert!(!pending.reveal_allowed());
        let outcome = s.complete_turn(pending, Ok(record("SIGN_ERROR", -5, false))).unwrap();

        assert_eq!(outcome.error_kind, ErrorKind::SignError);
        assert!(!outcome.is_correct);
        assert!(outcome.persisted);
        assert!(outcome.visualization.is_neutral());
        assert_eq!(s.phase(), TurnPhase::Idle);
        assert_eq!(s.graph().topic("derivatives").unwrap().confidence_score, 45);
        assert_eq!(s.conversation().len(), 2);
        assert!(store.raw("test").is_some());
    }

    #[test]
    fn test_failed_turn_leaves_graph_untouched() {
        let (store, mut s) = session();
        let pending = s.begin_turn("hmm").unwrap();
        let err = s
            .complete_turn(pending, Err(OracleError::Transport("down".into())))
            .unwrap_err();
        assert!(matches!(err, TurnError::OracleTransport(_)));
        assert!(s.graph().is_empty());
        assert_eq!(s.phase(), TurnPhase::Idle);
        assert!(store.raw("test").is_none());

        let pending = s.begin_turn("again").unwrap();
        let err = s.complete_turn(pending, Ok(json!({ "tutor_response": "hi" }))).unwrap_err();
        assert!(matches!(err, TurnError::OracleContractViolation(_)));
        assert!(s.graph().is_empty());
    }

    #[test]
    fn test_reveal_gating() {
        let (_, mut s) = session();
        let mut seen = Vec::new();
        for _ in 0..4 {
            let pending = s.begin_turn("try").unwrap();
            seen.push((pending.attempt_number(), pending.reveal_allowed()));
            s.complete_turn(pending, Ok(record("ARITHMETIC_ERROR", -2, false))).unwrap();
        }
        assert_eq!(seen, vec![(1, false), (2, false), (3, false), (4, true)]);

        let pending = s.begin_turn("got it").unwrap();
        s.complete_turn(pending, Ok(record("NONE", 5, false))).unwrap();
        assert_eq!(s.attempt_number(), 1);
        assert!(!s.reveal_allowed());
    }

    #[test]
    fn test_drill_lifecycle() {
        let (_, mut s) = session();
        let pending = s.begin_turn("try").unwrap();
        s.complete_turn(pending, Ok(record("SIGN_ERROR", -5, true))).unwrap();
        assert_eq!(s.drill().topic(), Some("derivatives"));
        assert_eq!(s.graph().session_stats.micro_drills_completed, 1);

        let pending = s.begin_turn("next").unwrap();
        s.complete_turn(pending, Ok(record("NONE", 5, false))).unwrap();
        assert!(s.drill().is_active());

        assert!(s.dismiss_drill());
        assert!(!s.drill().is_active());
        assert_eq!(s.graph().session_stats.consecutive_failures, 0);
        assert!(!s.dismiss_drill());
    }

    #[test]
    fn test_history_window_in_request() {
        let store = Arc::new(MemoryKnowledgeStore::new());
        let config = SessionConfig {
            history_window: 3,
            ..SessionConfig::default()
        };
        let mut s = TutorSession::open(store, "w", config);
        for i in 0..3 {
            let pending = s.begin_turn(&format!("m{i}")).unwrap();
            s.complete_turn(pending, Ok(record("NONE", 1, false))).unwrap();
        }
        let pending = s.begin_turn("latest").unwrap();
        let history = &pending.request().conversation_history;
        assert_eq!(history.len(), 3);
        assert_eq!(history.last().unwrap().content, "latest");
        assert_eq!(s.conversation().len(), 7);
    }

    #[test]
    fn test_reset_discards_in_flight_reply() {
        let (store, mut s) = session();
        let pending = s.begin_turn("one").unwrap();
        s.complete_turn(pending, Ok(record("SIGN_ERROR", -5, false))).unwrap();
        assert!(store.raw("test").is_some());

        let pending = s.begin_turn("two").unwrap();
        s.reset();
        assert!(store.raw("test").is_none());
        assert!(s.conversation().is_empty());
        assert_eq!(s.phase(), TurnPhase::Idle);

        let err = s.complete_turn(pending, Ok(record("NONE", 5, false))).unwrap_err();
        assert_eq!(err, TurnError::Superseded);
        assert!(s.graph().is_empty());
        assert!(s.conversation().is_empty());
    }

    #[test]
    fn test_speech_text_includes_narration() {
        let (_, mut s) = session();
        let pending = s.begin_turn("show me").unwrap();
        let mut value = record("NONE", 2, false);
        value["whiteboard_instruction"] = json!({
            "kind": "DERIVATIVE",
            "title": "Slope at 1",
            "functionExpression": "x^2",
            "params": { "point": 1 }
        });
        let outcome = s.complete_turn(pending, Ok(value)).unwrap();
        assert_eq!(outcome.speech_text(), "Check the sign of the second term. Slope at 1");
        assert_eq!(s.visualization().title, "Slope at 1");
    }
}
