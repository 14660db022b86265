use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(
                    f,
                    "invalid log level/filter '{}': unable to build EnvFilter",
                    value
                )
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Crates whose events follow the configured level; everything else stays at `warn`.
const APPLICATION_TARGETS: [&str; 2] = ["application_tool", "application_tool_api"];

/// Turns the configured level into filter directives. A bare level such as `debug` applies to
/// the application crates only, so axum and hyper stay quiet. Anything containing a directive
/// separator is taken verbatim.
pub fn build_filter(log_level: &str) -> Result<EnvFilter, TelemetryError> {
    let level = log_level.trim();
    let directives = if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        let mut directives = vec!["warn".to_string()];
        directives.extend(
            APPLICATION_TARGETS
                .iter()
                .map(|target| format!("{target}={level}")),
        );
        directives.join(",")
    };
    EnvFilter::try_new(&directives).map_err(|source| TelemetryError::EnvFilter {
        value: log_level.to_string(),
        source,
    })
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level when present.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&config.log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level_scopes_application_crates() {
        let filter = build_filter("debug").expect("bare level parses");
        let rendered = filter.to_string().to_ascii_lowercase();
        assert!(rendered.contains("application_tool=debug"));
        assert!(rendered.contains("application_tool_api=debug"));
        assert!(rendered.contains("warn"));
    }

    #[test]
    fn rejects_unparseable_filter() {
        match build_filter("versions=[unterminated") {
            Err(TelemetryError::EnvFilter { value, .. }) => {
                assert_eq!(value, "versions=[unterminated")
            }
            other => panic!("expected env filter error, got {other:?}"),
        }
    }
}
