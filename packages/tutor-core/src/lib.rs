pub mod animation;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod logging;
pub mod oracle;
pub mod services;
pub mod session;
pub mod tutor;

pub use animation::{AnimationSession, FrameSettings, RenderedFrame};
pub use config::{Config, SessionConfig};
pub use error::{InputRejection, TurnError};
pub use knowledge::{ErrorKind, KnowledgeGraph, KnowledgeStore, KnowledgeUpdate};
pub use oracle::{ChatTurn, LLMOracle, Oracle, OracleError, OracleRequest, Role, TutoringRecord};
pub use session::{DrillState, PendingTurn, TurnOutcome, TurnPhase, TutorSession};
pub use tutor::Tutor;
