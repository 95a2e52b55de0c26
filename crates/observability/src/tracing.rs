//! Tracing/logging initialization.
//!
//! Filtering follows `RUST_LOG` (default `info`). Output is JSON lines unless
//! a human-readable format is asked for.

use tracing_subscriber::EnvFilter;

pub const LOG_FORMAT_VAR: &str = "LEDGERGATE_LOG_FORMAT";

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    /// `json` or `pretty`, case-insensitive. Anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_formats() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse(" pretty "), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("xml"), None);
        assert_eq!(LogFormat::default(), LogFormat::Json);
    }

    #[test]
    fn init_twice_is_harmless() {
        init(LogFormat::Json);
        init(LogFormat::Pretty);
        ::tracing::info!("still alive");
    }
}
