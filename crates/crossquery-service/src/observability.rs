//! Structured logging setup.
//!
//! Query engine spans (`run`, `resolve`, `fetch`, `posted_ids`) carry the
//! candidate and batch counts; with span events enabled they show each stage
//! entering and leaving.
//!
//! ```ignore
//! use crossquery_service::observability::{init_logging, LoggingConfig};
//!
//! init_logging(LoggingConfig::from_settings(&config.logging)?);
//! ```

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::config::{ConfigLoadError, LoggingSettings};

/// Configuration for structured logging.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Whether to use JSON format (true) or text format (false)
    pub json_format: bool,
    /// The default log level if RUST_LOG is not set
    pub default_level: Level,
    /// Whether to include span events (enter/exit)
    pub include_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json_format: false,
            default_level: Level::INFO,
            include_spans: false,
        }
    }
}

impl LoggingConfig {
    pub fn json() -> Self {
        Self {
            json_format: true,
            ..Default::default()
        }
    }

    pub fn text() -> Self {
        Self::default()
    }

    /// Builds the logging configuration from the `logging` config section.
    pub fn from_settings(settings: &LoggingSettings) -> Result<Self, ConfigLoadError> {
        let level = settings
            .level
            .parse::<Level>()
            .map_err(|_| ConfigLoadError::Invalid {
                message: format!("logging.level '{}' is not a log level", settings.level),
            })?;
        Ok(Self {
            json_format: settings.json,
            default_level: level,
            include_spans: false,
        })
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Include span events in the output.
    pub fn with_spans(mut self) -> Self {
        self.include_spans = true;
        self
    }
}

/// Initialize the global subscriber.
///
/// Call once at startup; later calls have no effect.
pub fn init_logging(config: LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_level.to_string()));

    let span_events = if config.include_spans {
        FmtSpan::ENTER | FmtSpan::EXIT
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_current_span(true)
                .with_target(true)
                .with_file(false)
                .with_line_number(false),
        );
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .compact()
                .with_span_events(span_events)
                .with_target(true),
        );
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// A JSON subscriber writing to `writer`, for capturing log output in tests.
pub fn json_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(EnvFilter::new("trace"))
        .with(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_current_span(true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct CaptureWriter {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl CaptureWriter {
        fn new() -> Self {
            Self {
                buffer: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn output(&self) -> String {
            let buffer = self.buffer.lock().unwrap();
            String::from_utf8_lossy(&buffer).to_string()
        }
    }

    impl std::io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.buffer.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_logging_config_from_settings() {
        let settings = LoggingSettings {
            level: "DEBUG".to_string(),
            json: true,
        };
        let config = LoggingConfig::from_settings(&settings).unwrap();
        assert!(config.json_format);
        assert_eq!(config.default_level, Level::DEBUG);
        assert!(!config.include_spans);
    }

    #[test]
    fn test_logging_config_rejects_unknown_level() {
        let settings = LoggingSettings {
            level: "loud".to_string(),
            json: false,
        };
        assert!(LoggingConfig::from_settings(&settings).is_err());
    }

    #[test]
    fn test_logging_config_builders() {
        let config = LoggingConfig::text().with_level(Level::WARN).with_spans();
        assert!(!config.json_format);
        assert_eq!(config.default_level, Level::WARN);
        assert!(config.include_spans);
        assert!(LoggingConfig::json().json_format);
    }

    #[test]
    fn test_structured_logs_are_json_formatted() {
        let writer = CaptureWriter::new();
        let subscriber = json_subscriber(writer.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(matches = 3, pages = 1, "query complete");
        });

        let output = writer.output();
        assert!(!output.is_empty(), "Should have captured log output");
        for line in output.lines().filter(|l| !l.is_empty()) {
            let json: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(json["level"], "INFO");
            assert_eq!(json["fields"]["matches"], 3);
            assert!(json.get("target").is_some());
        }
    }
}
