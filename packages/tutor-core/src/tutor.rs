use calc_viz_algo::{Scene, VisualizationRequest};

use crate::animation::{AnimationSession, FrameSettings};
use crate::error::TurnError;
use crate::oracle::Oracle;
use crate::session::{TurnOutcome, TutorSession};

/// Drives a [`TutorSession`] against an [`Oracle`] and keeps the whiteboard
/// animation in step with the applied visualization.
///
/// `submit` takes `&mut self`, so only one oracle request can be in flight.
pub struct Tutor<O: Oracle> {
    session: TutorSession,
    oracle: O,
    frames: FrameSettings,
    animation: Option<AnimationSession>,
}

impl<O: Oracle> Tutor<O> {
    pub fn new(session: TutorSession, oracle: O, frames: FrameSettings) -> Self {
        Self {
            session,
            oracle,
            frames,
            animation: None,
        }
    }

    pub fn session(&self) -> &TutorSession {
        &self.session
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// The running animation, if the current visualization is renderable
    pub fn animation(&self) -> Option<&AnimationSession> {
        self.animation.as_ref()
    }

    pub async fn submit(&mut self, input: &str) -> Result<TurnOutcome, TurnError> {
        let pending = self.session.begin_turn(input)?;
        let result = self.oracle.consult(pending.request()).await;
        let outcome = self.session.complete_turn(pending, result)?;
        self.show(&outcome.visualization);
        Ok(outcome)
    }

    pub fn dismiss_drill(&mut self) -> bool {
        self.session.dismiss_drill()
    }

    pub fn reset(&mut self) {
        self.animation = None;
        self.session.reset();
    }

    fn show(&mut self, request: &VisualizationRequest) {
        // the old task must be gone before the new one starts
        if let Some(previous) = self.animation.take() {
            previous.stop();
        }
        self.animation = Scene::build(request).map(|scene| AnimationSession::start(scene, self.frames));
    }
}
