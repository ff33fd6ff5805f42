//! Performance-focused tracing utilities
//!
//! Timing helpers for the setup phases that surround a measured region:
//! kernel compilation, host/device staging and buffer allocation. None of
//! these are meant to be used inside the region criterion measures.
//!
//! ## Example
//!
//! ```rust
//! use kernelbench_tracing::performance::{PerformanceSpan, record_allocation};
//!
//! // Create a performance span with threshold filtering
//! let span = PerformanceSpan::new("compile_kernel", Some(100));
//! // ... do work ...
//! drop(span); // Logs only if duration > 100μs
//!
//! // Record a host allocation
//! record_allocation(4096, "host", 12);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::Level;

const NO_THRESHOLD: u64 = u64::MAX;

static DEFAULT_THRESHOLD_US: AtomicU64 = AtomicU64::new(NO_THRESHOLD);

/// Set the threshold applied by [`PerformanceSpan::with_default_threshold`].
pub fn set_default_threshold(threshold_us: Option<u64>) {
    DEFAULT_THRESHOLD_US.store(threshold_us.unwrap_or(NO_THRESHOLD), Ordering::Relaxed);
}

/// Threshold currently applied to spans created by `perf_span!`.
pub fn default_threshold() -> Option<u64> {
    match DEFAULT_THRESHOLD_US.load(Ordering::Relaxed) {
        NO_THRESHOLD => None,
        value => Some(value),
    }
}

/// RAII guard that measures span duration and conditionally logs based on threshold.
///
/// The span is timed when created and logged when dropped, but only if the
/// duration exceeds the optional threshold.
///
/// # Example
///
/// ```rust
/// use kernelbench_tracing::performance::PerformanceSpan;
///
/// {
///     let _span = PerformanceSpan::new("stage_inputs", Some(1000));
///     // ... operation code ...
/// } // Span logged only if duration > 1000μs
/// ```
pub struct PerformanceSpan {
    threshold_us: Option<u64>,
    start_time: Instant,
    span: tracing::Span,
}

impl PerformanceSpan {
    /// Create a new performance span with optional threshold filtering.
    ///
    /// # Arguments
    ///
    /// * `span_name` - Name of the operation being measured
    /// * `threshold_us` - Minimum duration in microseconds to log (None = always log)
    pub fn new(span_name: impl AsRef<str>, threshold_us: Option<u64>) -> Self {
        Self::with_level(Level::DEBUG, span_name, threshold_us)
    }

    /// Create a span that uses the process-wide default threshold.
    pub fn with_default_threshold(span_name: impl AsRef<str>) -> Self {
        Self::new(span_name, default_threshold())
    }

    /// Create a new performance span at the specified tracing level.
    pub fn with_level(level: Level, span_name: impl AsRef<str>, threshold_us: Option<u64>) -> Self {
        let span_name = span_name.as_ref();
        let span = match level {
            Level::TRACE => tracing::trace_span!("perf", name = %span_name),
            Level::DEBUG => tracing::debug_span!("perf", name = %span_name),
            Level::INFO => tracing::info_span!("perf", name = %span_name),
            Level::WARN => tracing::warn_span!("perf", name = %span_name),
            Level::ERROR => tracing::error_span!("perf", name = %span_name),
        };

        Self {
            threshold_us,
            start_time: Instant::now(),
            span,
        }
    }

    /// Get the elapsed time since span creation.
    pub fn elapsed_us(&self) -> u64 {
        self.start_time.elapsed().as_micros() as u64
    }
}

impl Drop for PerformanceSpan {
    fn drop(&mut self) {
        let elapsed_us = self.elapsed_us();

        if self.threshold_us.is_none_or(|t| elapsed_us >= t) {
            let _entered = self.span.enter();
            tracing::debug!(
                duration_us = elapsed_us,
                duration_ms = elapsed_us as f64 / 1000.0,
                "performance_span_complete"
            );
        }
    }
}

/// Record a buffer allocation.
///
/// # Arguments
///
/// * `size_bytes` - Size of allocation in bytes
/// * `location` - `"host"` or `"device"`
/// * `duration_us` - Time taken for the allocation (and initial fill) in microseconds
pub fn record_allocation(size_bytes: usize, location: &str, duration_us: u64) {
    tracing::debug!(
        event = "allocation",
        size_bytes = size_bytes,
        size_mb = size_bytes as f64 / (1024.0 * 1024.0),
        location = location,
        duration_us = duration_us,
        "buffer_allocation"
    );
}

/// Record a data transfer event with bandwidth calculation.
///
/// # Arguments
///
/// * `bytes` - Number of bytes transferred
/// * `direction` - `"H2D"` (host to device) or `"D2H"` (device to host)
/// * `duration_us` - Transfer time in microseconds
///
/// # Example
///
/// ```rust
/// use kernelbench_tracing::performance::record_transfer;
///
/// record_transfer(4096, "H2D", 250);
/// ```
pub fn record_transfer(bytes: usize, direction: &str, duration_us: u64) {
    tracing::debug!(
        event = "transfer",
        bytes = bytes,
        direction = direction,
        duration_us = duration_us,
        bandwidth_gbps = bandwidth_gbps(bytes, duration_us),
        "data_transfer"
    );
}

/// Bandwidth in GiB/s for `bytes` moved in `duration_us` microseconds.
pub fn bandwidth_gbps(bytes: usize, duration_us: u64) -> f64 {
    if duration_us == 0 {
        return 0.0;
    }
    (bytes as f64 / duration_us as f64) * 1_000_000.0 / (1024.0 * 1024.0 * 1024.0)
}
