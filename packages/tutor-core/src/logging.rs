use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "tutor.log";
const FALLBACK_FILTER: &str = "info";

/// Where tutor logs go. The terminal always gets a stderr stream so log
/// lines never interleave with replies on stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    /// Directory for the daily rolling file, `None` when file logs are off
    pub file_dir: Option<PathBuf>,
}

impl LogSettings {
    /// `RUST_LOG`, `ENABLE_FILE_LOGS` and `LOG_DIR`. Without `LOG_DIR` the
    /// files land under `<data_dir>/logs`.
    pub fn from_env(data_dir: &Path) -> Self {
        Self::resolve(
            std::env::var("RUST_LOG").ok(),
            std::env::var("ENABLE_FILE_LOGS").ok(),
            std::env::var("LOG_DIR").ok(),
            data_dir,
        )
    }

    fn resolve(
        filter: Option<String>,
        file_flag: Option<String>,
        log_dir: Option<String>,
        data_dir: &Path,
    ) -> Self {
        let filter = filter
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_FILTER.to_string());
        let file_dir = file_flag.as_deref().is_some_and(flag_enabled).then(|| {
            log_dir
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("logs"))
        });
        Self { filter, file_dir }
    }
}

fn flag_enabled(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Keeps the non-blocking file writer flushing until dropped
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

pub fn init_tracing(settings: &LogSettings) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER));
    let stderr_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    let mut guard = None;
    let file_layer = settings.file_dir.as_deref().and_then(|dir| match std::fs::create_dir_all(dir) {
        Ok(()) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            let (writer, worker) = tracing_appender::non_blocking(appender);
            guard = Some(FileLogGuard { _guard: worker });
            Some(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
        }
        Err(err) => {
            eprintln!("file logging disabled, cannot create {}: {err}", dir.display());
            None
        }
    });

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("tracing already initialised: {err}");
        return None;
    }

    if let (Some(dir), Some(_)) = (&settings.file_dir, &guard) {
        tracing::info!(dir = %dir.display(), "writing daily log files");
    }
    guard
}
