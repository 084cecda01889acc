//! Tracing subscriber initialization with a console layer, an append-only
//! log file and optional OpenTelemetry trace export.
//!
//! # Usage
//!
//! ```no_run
//! use autostep_observe::tracing_setup::{LogSettings, init_tracing, shutdown_tracing};
//!
//! let settings = LogSettings::from_verbosity(1, false, "info")
//!     .with_log_file("/var/lib/autostep/logs/autostep.log");
//! init_tracing(&settings).unwrap();
//! // ...
//! shutdown_tracing();
//! ```

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// What [`init_tracing`] installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is not set.
    pub filter: String,
    /// Append-only log file; `None` logs to the console only.
    pub log_file: Option<PathBuf>,
    /// Bridge spans to the OpenTelemetry stdout exporter.
    pub otel: bool,
}

impl LogSettings {
    /// Filter derived from CLI verbosity: `--quiet` is errors only, `-v`
    /// turns on debug for autostep crates, `-vv` and up is trace.
    pub fn from_verbosity(verbose: u8, quiet: bool, default_level: &str) -> Self {
        let filter = match verbose {
            0 if quiet => "error".to_string(),
            0 => default_level.to_string(),
            1 => "info,autostep=debug,autostep_core=debug,autostep_infra=debug".to_string(),
            _ => "trace".to_string(),
        };
        Self {
            filter,
            log_file: None,
            otel: false,
        }
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn with_otel(mut self, enabled: bool) -> Self {
        self.otel = enabled;
        self
    }
}

/// Open `path` for appending, creating it and its parent directory.
fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize the global tracing subscriber.
///
/// - Console `fmt` layer on stderr, so stdout stays clean for `--json`.
/// - Plain-text `fmt` layer appending to `settings.log_file` when set.
/// - When `settings.otel` is true, additionally bridges tracing spans to
///   OpenTelemetry using a stdout exporter.
/// - `RUST_LOG` takes precedence over `settings.filter`.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or the global
/// subscriber has already been set.
pub fn init_tracing(settings: &LogSettings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = match &settings.log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let otel_layer = if settings.otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("autostep");

        // Store the provider for shutdown and register it globally.
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// Safe to call even when OTel was not enabled (no-op in that case).
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_filter_from_verbosity() {
        assert_eq!(LogSettings::from_verbosity(0, true, "info").filter, "error");
        assert_eq!(LogSettings::from_verbosity(0, false, "warn").filter, "warn");
        assert!(LogSettings::from_verbosity(1, false, "info").filter.contains("autostep_core=debug"));
        assert_eq!(LogSettings::from_verbosity(3, true, "info").filter, "trace");
    }

    #[test]
    fn test_builder() {
        let s = LogSettings::from_verbosity(0, false, "info")
            .with_log_file("/tmp/a.log")
            .with_otel(true);
        assert_eq!(s.log_file, Some(PathBuf::from("/tmp/a.log")));
        assert!(s.otel);
    }

    #[test]
    fn test_open_log_file_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("autostep.log");

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
