use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Confidence assigned to a topic the first time it is seen
pub const DEFAULT_CONFIDENCE: u8 = 50;
pub const MAX_CONFIDENCE: u8 = 100;
/// Score at or above which a correct answer marks the topic mastered
pub const MASTERY_THRESHOLD: u8 = 85;
/// Per-topic recent error window
pub const TOPIC_ERROR_WINDOW: usize = 5;
/// Graph-level error history cap
pub const ERROR_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ConceptualGap,
    ArithmeticError,
    SignError,
    WrongTheorem,
    NotationConfusion,
    CorrectIdeaWrongExecution,
    None,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::ConceptualGap,
        ErrorKind::ArithmeticError,
        ErrorKind::SignError,
        ErrorKind::WrongTheorem,
        ErrorKind::NotationConfusion,
        ErrorKind::CorrectIdeaWrongExecution,
        ErrorKind::None,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ConceptualGap => "CONCEPTUAL_GAP",
            ErrorKind::ArithmeticError => "ARITHMETIC_ERROR",
            ErrorKind::SignError => "SIGN_ERROR",
            ErrorKind::WrongTheorem => "WRONG_THEOREM",
            ErrorKind::NotationConfusion => "NOTATION_CONFUSION",
            ErrorKind::CorrectIdeaWrongExecution => "CORRECT_IDEA_WRONG_EXECUTION",
            ErrorKind::None => "NONE",
        }
    }

    /// Human wording used in prompts and terminal output
    pub const fn describe(self) -> &'static str {
        match self {
            ErrorKind::ConceptualGap => "a gap in the underlying concept",
            ErrorKind::ArithmeticError => "arithmetic slips",
            ErrorKind::SignError => "sign errors",
            ErrorKind::WrongTheorem => "applying the wrong theorem or rule",
            ErrorKind::NotationConfusion => "confusion about notation",
            ErrorKind::CorrectIdeaWrongExecution => "the right idea carried out incorrectly",
            ErrorKind::None => "no error",
        }
    }

    pub const fn is_error(self) -> bool {
        !matches!(self, ErrorKind::None)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownErrorKind(pub String);

impl fmt::Display for UnknownErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown error kind: {}", self.0)
    }
}

impl std::error::Error for UnknownErrorKind {}

impl FromStr for ErrorKind {
    type Err = UnknownErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownErrorKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicState {
    pub mastered: bool,
    pub confidence_score: u8,
    pub attempts: u32,
    /// Most recent last
    pub last_errors: VecDeque<ErrorKind>,
}

impl Default for TopicState {
    fn default() -> Self {
        Self {
            mastered: false,
            confidence_score: DEFAULT_CONFIDENCE,
            attempts: 0,
            last_errors: VecDeque::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub error_kind: ErrorKind,
    pub topic: String,
    /// Unix milliseconds
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionStats {
    pub total_attempts: u32,
    pub consecutive_failures: u32,
    pub micro_drills_completed: u32,
    pub current_topic: String,
    pub attempt_on_current_problem: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnowledgeGraph {
    pub topics: BTreeMap<String, TopicState>,
    pub weak_nodes: BTreeSet<String>,
    /// Oldest first
    pub error_history: VecDeque<ErrorRecord>,
    pub session_stats: SessionStats,
}

impl KnowledgeGraph {
    pub fn topic(&self, name: &str) -> Option<&TopicState> {
        self.topics.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
            && self.weak_nodes.is_empty()
            && self.error_history.is_empty()
            && self.session_stats == SessionStats::default()
    }

    /// Re-establishes the bounds on a graph read from storage: scores clamped,
    /// windows truncated oldest-first, `NONE` entries dropped.
    pub fn normalized(mut self) -> Self {
        for state in self.topics.values_mut() {
            state.confidence_score = state.confidence_score.min(MAX_CONFIDENCE);
            state.last_errors.retain(|kind| kind.is_error());
            while state.last_errors.len() > TOPIC_ERROR_WINDOW {
                state.last_errors.pop_front();
            }
        }
        self.error_history.retain(|record| record.error_kind.is_error());
        while self.error_history.len() > ERROR_HISTORY_LIMIT {
            self.error_history.pop_front();
        }
        let mastered: Vec<String> = self
            .topics
            .iter()
            .filter(|(_, s)| s.mastered)
            .map(|(name, _)| name.clone())
            .collect();
        for name in mastered {
            self.weak_nodes.remove(&name);
        }
        self
    }
}

/// The oracle's proposed change to one topic, already validated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeUpdate {
    pub topic: String,
    pub confidence_delta: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mastered: Option<bool>,
    #[serde(default)]
    pub weak_nodes: Vec<String>,
}
