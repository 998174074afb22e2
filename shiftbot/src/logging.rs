use crate::errors::BotError;
use std::env;
use std::path::PathBuf;
use tracing::{warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE: &str = "shiftbot.log";

fn level_from_env() -> Level {
    env::var("LOG_LEVEL")
        .map(|level| match level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            "trace" => Level::TRACE,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO)
}

/// `SHIFTBOT_LOG_DIR`, else the platform's local data directory
pub fn log_dir() -> PathBuf {
    if let Ok(custom_dir) = env::var("SHIFTBOT_LOG_DIR") {
        return PathBuf::from(custom_dir);
    }
    dirs::data_local_dir()
        .unwrap_or_else(env::temp_dir)
        .join("shiftbot")
        .join("logs")
}

/// Install the global subscriber: stderr plus a daily rolling file.
///
/// The level comes from `LOG_LEVEL`; `RUST_LOG` directives are applied on top. Keep the
/// returned guard alive for as long as file logging should continue. When the log
/// directory cannot be created only stderr is used and `None` is returned.
pub fn init_logging() -> Result<Option<WorkerGuard>, BotError> {
    let log_level = level_from_env();
    let filter = EnvFilter::from_default_env().add_directive(log_level.into());
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_ansi(false);

    let dir = log_dir();
    let dir_error = std::fs::create_dir_all(&dir).err();

    let (file_layer, guard) = if dir_error.is_none() {
        let file_appender = tracing_appender::rolling::daily(&dir, LOG_FILE);
        let (writer, guard) = tracing_appender::non_blocking(file_appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| BotError::Internal(format!("logging already initialised: {e}")))?;

    if let Some(e) = dir_error {
        warn!(dir = %dir.display(), error = %e, "cannot create log directory, logging to stderr only");
    }
    Ok(guard)
}
