use thiserror::Error;

use crate::oracle::OracleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputRejection {
    #[error("empty submission")]
    EmptyInput,
    #[error("a reply is still pending")]
    Busy,
}

/// Failures caught at the turn boundary. None of them mutate the knowledge
/// graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("input rejected: {0}")]
    InputRejected(InputRejection),
    #[error("oracle transport error: {0}")]
    OracleTransport(String),
    #[error("oracle contract violation: {0}")]
    OracleContractViolation(String),
    #[error("turn superseded by a session reset")]
    Superseded,
}

impl TurnError {
    /// Text shown to the student
    pub fn user_message(&self) -> &'static str {
        match self {
            TurnError::InputRejected(InputRejection::EmptyInput) => "Type an answer or a question first.",
            TurnError::InputRejected(InputRejection::Busy) => "Hang on, I'm still thinking about your last message.",
            TurnError::OracleTransport(_) => "I couldn't reach the tutor just now. Please try again.",
            TurnError::OracleContractViolation(_) => {
                "I got confused formulating a reply. Could you send that again?"
            }
            TurnError::Superseded => "That reply belonged to a previous session and was discarded.",
        }
    }
}

impl From<InputRejection> for TurnError {
    fn from(rejection: InputRejection) -> Self {
        TurnError::InputRejected(rejection)
    }
}

impl From<OracleError> for TurnError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::Transport(msg) => TurnError::OracleTransport(msg),
            OracleError::Contract(msg) => TurnError::OracleContractViolation(msg),
        }
    }
}
