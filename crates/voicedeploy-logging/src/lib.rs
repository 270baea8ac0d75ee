//! # voicedeploy-logging
//!
//! Logging for voicedeploy.
//!
//! Progress of a deployment is reported as [`LogEvent`]s through a [`Logger`],
//! which renders them for people on stderr and, optionally, appends them as
//! JSON lines to a log file. Diagnostics go through `tracing`, set up by
//! [`init_tracing`].
//!
//! ## Log Formats
//!
//! - `Pretty` - Human-readable colored output
//! - `JSON` - Structured JSON lines
//! - `Compact` - Minimal text output

mod events;
mod logfile;

pub use events::{LogEvent, LogFormat, Logger, HISTORY_LIMIT};
pub use logfile::{default_log_path, logs_dir};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing for the application. `RUST_LOG` overrides `level`.
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(false).with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty | LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .init();
        }
    }
}
