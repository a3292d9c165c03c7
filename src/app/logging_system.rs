use super::config::{LogFormat, LogLevel};
use thiserror::Error;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// HTTP internals are only interesting when something is already wrong.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls"];

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("Failed to install the global tracing subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Builds the filter string: the default level first, then a `warn` directive
/// per noisy dependency.
pub fn build_filter_string(level: LogLevel) -> String {
    std::iter::once(level.as_str().to_string())
        .chain(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global subscriber writing timestamped lines to stdout.
/// `RUST_LOG`, when set, takes precedence over `level`.
pub fn init_logging(level: LogLevel, format: LogFormat) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let directives = build_filter_string(level);
            EnvFilter::try_new(&directives).map_err(|source| LoggingError::Filter {
                filter: directives,
                source,
            })?
        }
    };
    let timer = ChronoLocal::new(TIMESTAMP_FORMAT.to_string());

    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_timer(timer)
                    .with_target(false)
                    .with_ansi(false),
            )
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stdout)
                    .with_timer(timer)
                    .with_current_span(false),
            )
            .try_init()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_string_starts_with_default_level() {
        let filter = build_filter_string(LogLevel::Debug);
        assert!(filter.starts_with("debug,"));
        assert!(filter.contains("reqwest=warn"));
        assert!(filter.contains("hyper=warn"));
    }

    #[test]
    fn filter_string_parses_for_every_level() {
        for level in [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            assert!(EnvFilter::try_new(build_filter_string(level)).is_ok());
        }
    }
}
