use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingOracle,
    Applied,
    Failed,
}

impl TurnPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            TurnPhase::Idle => "IDLE",
            TurnPhase::AwaitingOracle => "AWAITING_ORACLE",
            TurnPhase::Applied => "APPLIED",
            TurnPhase::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhaseTransition {
    pub from: TurnPhase,
    pub to: TurnPhase,
    pub reason: String,
    pub timestamp_ms: u64,
}

const HISTORY_LIMIT: usize = 100;

#[derive(Debug)]
pub struct TurnStateMachine {
    current: TurnPhase,
    history: Vec<PhaseTransition>,
    change_count: u64,
}

impl Default for TurnStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnStateMachine {
    pub fn new() -> Self {
        Self {
            current: TurnPhase::Idle,
            history: Vec::new(),
            change_count: 0,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.current
    }

    pub fn is_busy(&self) -> bool {
        self.current == TurnPhase::AwaitingOracle
    }

    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    pub fn history(&self) -> &[PhaseTransition] {
        &self.history
    }

    pub fn can_transition_to(&self, target: TurnPhase) -> bool {
        matches!(
            (self.current, target),
            (TurnPhase::Idle, TurnPhase::AwaitingOracle)
                | (TurnPhase::AwaitingOracle, TurnPhase::Applied)
                | (TurnPhase::AwaitingOracle, TurnPhase::Failed)
                | (TurnPhase::AwaitingOracle, TurnPhase::Idle)
                | (TurnPhase::Applied, TurnPhase::Idle)
                | (TurnPhase::Failed, TurnPhase::Idle)
        )
    }

    pub fn transition_to(
        &mut self,
        target: TurnPhase,
        reason: impl Into<String>,
    ) -> Result<(), TransitionError> {
        if !self.can_transition_to(target) {
            return Err(TransitionError::InvalidTransition {
                from: self.current,
                to: target,
            });
        }

        let transition = PhaseTransition {
            from: self.current,
            to: target,
            reason: reason.into(),
            timestamp_ms: now_ms(),
        };
        tracing::trace!(from = transition.from.as_str(), to = target.as_str(), reason = %transition.reason, "turn phase");

        self.current = target;
        self.change_count = self.change_count.saturating_add(1);
        self.history.push(transition);

        if self.history.len() > HISTORY_LIMIT {
            let extra = self.history.len() - HISTORY_LIMIT;
            self.history.drain(0..extra);
        }

        Ok(())
    }

    pub fn dispatch(&mut self) -> Result<(), TransitionError> {
        self.transition_to(TurnPhase::AwaitingOracle, "request dispatched")
    }

    /// `Applied → Idle` in one step
    pub fn applied(&mut self) -> Result<(), TransitionError> {
        self.transition_to(TurnPhase::Applied, "record applied")?;
        self.transition_to(TurnPhase::Idle, "turn complete")
    }

    /// `Failed → Idle` in one step
    pub fn failed(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.transition_to(TurnPhase::Failed, reason)?;
        self.transition_to(TurnPhase::Idle, "turn abandoned")
    }

    /// Returns to `Idle` from wherever the machine is. Used by session reset.
    pub fn force_idle(&mut self, reason: impl Into<String>) {
        if self.current != TurnPhase::Idle && self.can_transition_to(TurnPhase::Idle) {
            let _ = self.transition_to(TurnPhase::Idle, reason);
        }
    }
}

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: TurnPhase, to: TurnPhase },
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut sm = TurnStateMachine::new();
        assert_eq!(sm.phase(), TurnPhase::Idle);
        sm.dispatch().unwrap();
        assert!(sm.is_busy());
        sm.applied().unwrap();
        assert_eq!(sm.phase(), TurnPhase::Idle);
        let phases: Vec<TurnPhase> = sm.history().iter().map(|t| t.to).collect();
        assert_eq!(phases, vec![TurnPhase::AwaitingOracle, TurnPhase::Applied, TurnPhase::Idle]);
    }

    #[test]
    fn test_failure_path_returns_to_idle() {
        let mut sm = TurnStateMachine::new();
        sm.dispatch().unwrap();
        sm.failed("timeout").unwrap();
        assert_eq!(sm.phase(), TurnPhase::Idle);
        assert_eq!(sm.history()[1].reason, "timeout");
    }

    #[test]
    fn test_invalid_transitions() {
        let mut sm = TurnStateMachine::new();
        assert!(sm.applied().is_err());
        assert!(sm.failed("x").is_err());
        sm.dispatch().unwrap();
        assert!(sm.dispatch().is_err());
        assert_eq!(sm.change_count(), 1);
    }

    #[test]
    fn test_force_idle() {
        let mut sm = TurnStateMachine::new();
        sm.force_idle("reset");
        assert_eq!(sm.change_count(), 0);
        sm.dispatch().unwrap();
        sm.force_idle("reset");
        assert_eq!(sm.phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_history_is_capped() {
        let mut sm = TurnStateMachine::new();
        for _ in 0..60 {
            sm.dispatch().unwrap();
            sm.applied().unwrap();
        }
        assert_eq!(sm.history().len(), HISTORY_LIMIT);
        assert_eq!(sm.change_count(), 180);
    }
}
