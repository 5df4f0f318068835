use crate::error::{RegressionError, RegressionResult};
use tracing_subscriber::EnvFilter;

/// Output shape for diagnostic logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Install the global subscriber; `RUST_LOG` takes precedence over `level`
///
/// Logs go to stderr so progress lines and the summary table on stdout stay
/// machine-readable.
pub fn init_logging(level: &str, format: LogFormat) -> RegressionResult<()> {
    let level = level.to_ascii_lowercase();
    if !LEVELS.contains(&level.as_str()) {
        return Err(RegressionError::config(format!(
            "unknown log level '{level}' (expected one of {})",
            LEVELS.join(", ")
        )));
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Json => subscriber.json().try_init(),
        LogFormat::Compact => subscriber.compact().try_init(),
        LogFormat::Pretty => subscriber.pretty().try_init(),
    };
    installed.map_err(|e| RegressionError::config(format!("failed to install logger: {e}")))
}
