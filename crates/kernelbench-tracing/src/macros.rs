//! Convenience macro for performance tracing

/// Create a performance span with automatic field capture.
///
/// Returns a [`crate::performance::PerformanceSpan`] guard that logs its
/// duration when dropped, filtered by the process-wide threshold installed
/// by [`crate::init_global_tracing`].
///
/// # Syntax
///
/// ```text
/// perf_span!("name")
/// perf_span!("name", field1 = value1, field2 = value2, ...)
/// ```
///
/// # Example
///
/// ```rust
/// use kernelbench_tracing::perf_span;
///
/// {
///     let _span = perf_span!("stage_inputs", bytes = 4096);
///     // ... operation code ...
/// } // Logs duration with fields
/// ```
#[macro_export]
macro_rules! perf_span {
    ($name:expr) => {{
        $crate::performance::PerformanceSpan::with_default_threshold($name)
    }};
    ($name:expr, $($field:tt = $value:expr),+ $(,)?) => {{
        let _span = $crate::__private::debug_span!(
            "perf",
            name = $name,
            $($field = $value),+
        ).entered();
        $crate::performance::PerformanceSpan::with_default_threshold($name)
    }};
}
