use std::path::PathBuf;
use std::time::Duration;

use crate::logging::LogSettings;

const DEFAULT_SESSION_KEY: &str = "default";
const DEFAULT_REVEAL_AFTER: u32 = 3;
const DEFAULT_HISTORY_WINDOW: usize = 20;
const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;
const DEFAULT_CANVAS_WIDTH: f64 = 800.0;
const DEFAULT_CANVAS_HEIGHT: f64 = 500.0;

#[derive(Debug, Clone)]
pub struct Config {
    pub logging: LogSettings,
    pub data_dir: PathBuf,
    pub session_key: String,
    pub session: SessionConfig,
    pub frame_interval: Duration,
    pub canvas_width: f64,
    pub canvas_height: f64,
}

/// Turn-policy knobs used by the session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Failed attempts on the current problem before reveal mode is allowed
    pub reveal_after_failures: u32,
    /// Conversation turns sent to the oracle
    pub history_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reveal_after_failures: DEFAULT_REVEAL_AFTER,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = env_string("TUTOR_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let logging = LogSettings::from_env(&data_dir);

        let session_key =
            env_string("TUTOR_SESSION_KEY").unwrap_or_else(|| DEFAULT_SESSION_KEY.to_string());

        let session = SessionConfig {
            reveal_after_failures: env_parse("TUTOR_REVEAL_AFTER").unwrap_or(DEFAULT_REVEAL_AFTER),
            history_window: env_parse::<usize>("TUTOR_HISTORY_WINDOW")
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_HISTORY_WINDOW),
        };

        let frame_interval = Duration::from_millis(
            env_parse::<u64>("TUTOR_FRAME_INTERVAL_MS")
                .filter(|&ms| ms > 0)
                .unwrap_or(DEFAULT_FRAME_INTERVAL_MS),
        );

        let canvas_width = env_parse::<f64>("TUTOR_CANVAS_WIDTH")
            .filter(|w| w.is_finite() && *w > 0.0)
            .unwrap_or(DEFAULT_CANVAS_WIDTH);
        let canvas_height = env_parse::<f64>("TUTOR_CANVAS_HEIGHT")
            .filter(|h| h.is_finite() && *h > 0.0)
            .unwrap_or(DEFAULT_CANVAS_HEIGHT);

        Self {
            logging,
            data_dir,
            session_key,
            session,
            frame_interval,
            canvas_width,
            canvas_height,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("calc-tutor"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key)?.trim().parse().ok()
}
