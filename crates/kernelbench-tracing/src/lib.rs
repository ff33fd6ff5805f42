//! Shared tracing configuration for the kernelbench workspace.
//!
//! Bench binaries, integration tests and backend code all install their
//! `tracing` subscriber through this crate so that log output looks the same
//! regardless of which benchmark target is running. Measured regions never
//! log; setup and teardown phases do, and [`performance`] provides the timing
//! spans used around them.

pub mod performance;

#[macro_use]
pub mod macros;

use std::env;
use std::error::Error;
use std::fmt;

#[doc(hidden)]
pub mod __private {
    pub use tracing::debug_span;
}

use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter, Registry};

/// Configuration describing how the shared tracing subscriber should behave.
#[derive(Clone, Debug)]
pub struct TracingConfig {
    /// Optional tracing directives (e.g. `kernelbench_backends=debug,info`).
    /// When absent the crate falls back to `RUST_LOG` and finally to
    /// [`default_directive`](Self::default_directive).
    pub directives: Option<String>,
    /// Fallback directive used when neither `directives` nor `RUST_LOG`
    /// resolve to a valid filter.
    pub default_directive: String,
    /// Controls whether event targets (module paths) appear in output.
    pub include_targets: bool,
    /// Controls ANSI formatting. Disable for CI logs that strip colour codes.
    pub ansi: bool,
    /// Span lifecycle events to emit. Defaults to [`FmtSpan::NONE`].
    pub span_events: FmtSpan,
    /// Output format for the formatter layer.
    pub output: TracingOutput,
    /// Minimum duration in microseconds for performance spans to be logged.
    /// `None` logs every span.
    pub performance_threshold_us: Option<u64>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_local()
    }
}

impl TracingConfig {
    /// Configuration tuned for interactive runs (pretty, ANSI-enabled output).
    ///
    /// Criterion prints its own report on stdout, so the default level is
    /// `warn` to keep setup chatter out of the way.
    pub fn for_local() -> Self {
        Self {
            directives: None,
            default_directive: "warn".to_string(),
            include_targets: true,
            ansi: true,
            span_events: FmtSpan::NONE,
            output: TracingOutput::Pretty,
            performance_threshold_us: None,
        }
    }

    /// Configuration tuned for CI or log collection (JSON, no ANSI).
    pub fn for_ci() -> Self {
        Self {
            directives: None,
            default_directive: "info".to_string(),
            include_targets: true,
            ansi: false,
            span_events: FmtSpan::NONE,
            output: TracingOutput::Json,
            performance_threshold_us: None,
        }
    }

    /// Configuration for inspecting setup costs of each backend.
    ///
    /// Enables debug output for the backend and harness crates together with
    /// span close events, so compile, staging and allocation timings show up.
    pub fn for_performance() -> Self {
        Self {
            directives: Some("kernelbench_backends=debug,kernelbench_harness=debug,info".to_string()),
            default_directive: "info".to_string(),
            include_targets: true,
            ansi: false,
            span_events: FmtSpan::CLOSE,
            output: TracingOutput::Json,
            performance_threshold_us: None,
        }
    }

    /// Build a configuration using environment hints.
    ///
    /// # Environment Variables
    ///
    /// - `KERNELBENCH_TRACING_PROFILE` - Profile preset: `local` (default), `ci`, or `performance`
    /// - `KERNELBENCH_TRACING_DIRECTIVES` - Overrides tracing directives
    /// - `KERNELBENCH_TRACING_FORMAT` - Output format: `pretty`, `compact`, or `json`
    /// - `KERNELBENCH_PERF_THRESHOLD_US` - Minimum duration (microseconds) for performance spans
    pub fn from_env() -> Self {
        let profile = env::var("KERNELBENCH_TRACING_PROFILE")
            .unwrap_or_else(|_| "local".to_string())
            .to_ascii_lowercase();

        let mut config = match profile.as_str() {
            "ci" => Self::for_ci(),
            "performance" => Self::for_performance(),
            _ => Self::for_local(),
        };

        if let Ok(directives) = env::var("KERNELBENCH_TRACING_DIRECTIVES") {
            if !directives.trim().is_empty() {
                config.directives = Some(directives);
            }
        }

        if let Ok(format) = env::var("KERNELBENCH_TRACING_FORMAT") {
            if let Some(parsed) = TracingOutput::from_env_value(&format) {
                config.output = parsed;
                if matches!(config.output, TracingOutput::Json) {
                    config.ansi = false;
                }
            }
        }

        if let Ok(threshold) = env::var("KERNELBENCH_PERF_THRESHOLD_US") {
            if let Ok(threshold_us) = threshold.parse::<u64>() {
                config.performance_threshold_us = Some(threshold_us);
            }
        }

        config
    }

    /// Resolve the `EnvFilter` to use for the subscriber.
    fn resolve_filter(&self) -> Result<EnvFilter, TracingSetupError> {
        if let Some(directives) = &self.directives {
            EnvFilter::try_new(directives).map_err(|err| TracingSetupError::InvalidFilter(err.to_string()))
        } else {
            match EnvFilter::try_from_default_env() {
                Ok(filter) => Ok(filter),
                Err(_) => Ok(EnvFilter::new(self.default_directive.clone())),
            }
        }
    }
}

/// Errors surfaced when configuring the shared tracing subscriber fails.
#[derive(Debug)]
pub enum TracingSetupError {
    /// The provided directive string could not be parsed.
    InvalidFilter(String),
    /// Installing the global subscriber failed (usually because one is
    /// already set).
    SubscriberInit(tracing_subscriber::util::TryInitError),
}

impl fmt::Display for TracingSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TracingSetupError::InvalidFilter(msg) => {
                write!(f, "invalid tracing directive: {msg}")
            }
            TracingSetupError::SubscriberInit(err) => {
                write!(f, "failed to install global tracing subscriber: {err}")
            }
        }
    }
}

impl Error for TracingSetupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TracingSetupError::SubscriberInit(err) => Some(err),
            _ => None,
        }
    }
}

/// Build a `tracing` subscriber using the provided configuration.
pub fn build_subscriber(config: &TracingConfig) -> Result<impl Subscriber + Send + Sync, TracingSetupError> {
    let (filter, fmt_layer) = subscriber_layers(config)?;
    Ok(Registry::default().with(fmt_layer).with(filter))
}

/// Build the filter and formatting layers for external composition.
pub fn subscriber_layers(
    config: &TracingConfig,
) -> Result<(EnvFilter, Box<dyn Layer<Registry> + Send + Sync>), TracingSetupError> {
    let filter = config.resolve_filter()?;
    let span_events = config.span_events.clone();
    let include_targets = config.include_targets;
    let ansi = config.ansi;

    // Bench output goes to stdout; keep logs on stderr so reports stay parseable.
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.output {
        TracingOutput::Compact => Box::new(
            tracing_fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(include_targets)
                .with_ansi(ansi)
                .with_span_events(span_events),
        ),
        TracingOutput::Pretty => Box::new(
            tracing_fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_target(include_targets)
                .with_ansi(ansi)
                .with_span_events(span_events),
        ),
        TracingOutput::Json => Box::new(
            tracing_fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(include_targets)
                .with_span_events(span_events)
                .with_ansi(false),
        ),
    };

    Ok((filter, layer))
}

/// Install the configured subscriber as the process-wide default.
///
/// Also publishes [`TracingConfig::performance_threshold_us`] to
/// [`performance::set_default_threshold`] so spans created via
/// [`perf_span!`] honour it.
pub fn init_global_tracing(config: &TracingConfig) -> Result<(), TracingSetupError> {
    build_subscriber(config)?
        .try_init()
        .map_err(TracingSetupError::SubscriberInit)?;
    performance::set_default_threshold(config.performance_threshold_us);
    Ok(())
}

/// Output format choices for the tracing formatter layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TracingOutput {
    Compact,
    Pretty,
    Json,
}

impl TracingOutput {
    fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}
