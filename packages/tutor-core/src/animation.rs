//! Frame loop for the visualization currently on the whiteboard.
//!
//! Each [`AnimationSession`] owns one tokio task. The task stops on its own
//! once the scene settles and is aborted when the session is dropped, so a
//! replaced visualization can never publish into its successor's channel.

use std::sync::Arc;
use std::time::Duration;

use calc_viz_algo::{to_svg_path, AnimationClock, Frame, Scene, VisualizationKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSettings {
    pub interval: Duration,
    pub canvas_width: f64,
    pub canvas_height: f64,
}

impl FrameSettings {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            interval: config.frame_interval,
            canvas_width: config.canvas_width,
            canvas_height: config.canvas_height,
        }
    }
}

/// One published frame, with canvas paths already rendered to SVG
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFrame {
    /// Sequence number, 0 for the initial frame
    pub index: u64,
    pub elapsed: f64,
    pub frame: Frame,
    pub overlay_svg: String,
    pub settled: bool,
}

pub struct AnimationSession {
    kind: VisualizationKind,
    curve_svg: Arc<str>,
    frames: watch::Receiver<RenderedFrame>,
    handle: JoinHandle<()>,
}

impl AnimationSession {
    /// Starts ticking `scene`. Must be called inside a tokio runtime.
    pub fn start(scene: Scene, settings: FrameSettings) -> Self {
        let transform = scene.transform(settings.canvas_width, settings.canvas_height);
        let curve_svg: Arc<str> =
            to_svg_path(&scene.curve_path(settings.canvas_width, settings.canvas_height)).into();
        let kind = scene.kind();

        let render = move |index: u64, clock: &AnimationClock| {
            let t = clock.elapsed();
            let frame = scene.frame_at(t);
            RenderedFrame {
                index,
                elapsed: t,
                overlay_svg: to_svg_path(&frame.overlay_path(&transform)),
                settled: scene.is_settled(t),
                frame,
            }
        };

        let mut clock = AnimationClock::new();
        let initial = render(0, &clock);
        let already_settled = initial.settled;
        let (tx, rx) = watch::channel(initial);
        let dt = settings.interval.as_secs_f64();

        let handle = tokio::spawn(async move {
            if already_settled {
                return;
            }
            let mut ticker = tokio::time::interval(settings.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            let mut index = 0u64;
            loop {
                ticker.tick().await;
                clock.tick(dt);
                index += 1;
                let rendered = render(index, &clock);
                let settled = rendered.settled;
                if tx.send(rendered).is_err() {
                    break;
                }
                if settled {
                    tracing::debug!(index, elapsed = clock.elapsed(), "animation settled");
                    break;
                }
            }
        });

        tracing::debug!(kind = kind.as_str(), "animation started");
        Self {
            kind,
            curve_svg,
            frames: rx,
            handle,
        }
    }

    pub fn kind(&self) -> VisualizationKind {
        self.kind
    }

    /// The function's curve as an SVG path; constant for the session
    pub fn curve_svg(&self) -> &str {
        &self.curve_svg
    }

    pub fn latest(&self) -> RenderedFrame {
        self.frames.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderedFrame> {
        self.frames.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for AnimationSession {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calc_viz_algo::{VisualizationParams, VisualizationRequest, Viewport};

    fn settings() -> FrameSettings {
        FrameSettings {
            interval: Duration::from_millis(100),
            canvas_width: 400.0,
            canvas_height: 300.0,
        }
    }

    fn integral_scene() -> Scene {
        let request = VisualizationRequest {
            kind: VisualizationKind::Integral,
            title: "Area under x^2".into(),
            function_expression: "x^2".into(),
            viewport: Viewport { x_min: -1.0, x_max: 3.0, y_min: -1.0, y_max: 9.0 },
            params: VisualizationParams {
                lower_bound: Some(0.0),
                upper_bound: Some(2.0),
                ..VisualizationParams::default()
            },
            steps: Vec::new(),
        };
        Scene::build(&request).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_advance_until_settled() {
        let session = AnimationSession::start(integral_scene(), settings());
        assert_eq!(session.latest().index, 0);
        assert!(session.curve_svg().starts_with('M'));

        let mut rx = session.subscribe();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().index, 1);

        loop {
            if rx.changed().await.is_err() || rx.borrow().settled {
                break;
            }
        }
        let last = session.latest();
        assert!(last.settled);
        assert!(matches!(last.frame, Frame::Integral(_)));
        tokio::task::yield_now().await;
        assert!(session.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_task() {
        let session = AnimationSession::start(integral_scene(), settings());
        let mut rx = session.subscribe();
        drop(session);
        tokio::time::advance(Duration::from_secs(1)).await;
        // the sender went away with the aborted task
        assert!(rx.changed().await.is_err());
        assert_eq!(rx.borrow().index, 0);
    }
}
