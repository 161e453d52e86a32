//! Shared handler utilities

use std::time::Instant;

/// Histogram of handler latencies, labelled by operation and result
pub const OPERATION_DURATION: &str = "robo_operation_duration_seconds";

/// Record operation duration with result label.
///
/// Labels: operation, result (ok/err)
#[inline]
pub fn record_op_duration(operation: &'static str, start: Instant, success: bool) {
    let result = if success { "ok" } else { "err" };
    metrics::histogram!(
        OPERATION_DURATION,
        "operation" => operation,
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}
