//! ---
//! hub_section: "01-core-functionality"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Tracing subscriber initialisation for R-Hub binaries."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
//! Tracing setup for `r-hubctl`.
//!
//! Every `r-hubctl` command prints its result as JSON on stdout so it can be
//! piped into `jq` or another tool. Diagnostics therefore never touch stdout:
//! the console layer writes to stderr, and a second layer keeps a daily JSON
//! log under `[logging] directory` for workflow post-mortems.
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "R_HUB_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Flush guards for the two non-blocking writers, held for the process lifetime.
static GUARDS: OnceCell<[WorkerGuard; 2]> = OnceCell::new();

/// Console log formats selectable with `[logging] format`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// One JSON object per event, for log shippers.
    #[default]
    StructuredJson,
    /// Human readable lines for interactive use.
    Pretty,
}

/// Install the global subscriber for a hub binary.
///
/// `R_HUB_LOG` takes precedence over `RUST_LOG`; both fall back to `info`.
/// The log file is named `<file_prefix or service>.log.<date>`. Calling this
/// twice keeps the first subscriber.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)?;
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, format!("{prefix}.log")));
    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = GUARDS.set([file_guard, stderr_guard]);

    let console = fmt::layer().with_timer(fmt::time::UtcTime::rfc_3339());
    let console_layer = match config.format {
        LogFormat::StructuredJson => console
            .with_target(false)
            .json()
            .with_writer(stderr_writer)
            .boxed(),
        LogFormat::Pretty => console.with_writer(stderr_writer).boxed(),
    };
    let file_layer = fmt::layer()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer)
        .boxed();

    let installed = tracing_subscriber::registry()
        .with(hub_filter())
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    info!(
        service = service_name,
        log_dir = %config.directory.display(),
        format = ?config.format,
        installed,
        "tracing initialised"
    );
    Ok(())
}

fn hub_filter() -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("ignoring {LOG_ENV}={directive:?} ({err}); logging at {DEFAULT_DIRECTIVE}");
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        Err(_) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}
