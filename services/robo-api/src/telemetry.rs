//! Prometheus metrics setup

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

use crate::handlers::shared::OPERATION_DURATION;

/// Install the global Prometheus recorder and describe the service metrics
pub fn setup_metrics() -> Result<PrometheusHandle, BuildError> {
    // Checkout and webhook calls wait on the provider, conversations on the generator
    let latency_buckets = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(OPERATION_DURATION.to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    metrics::describe_counter!(
        "robo_checkouts_created_total",
        "Total robot checkout sessions created"
    );
    metrics::describe_counter!(
        "robo_webhooks_processed_total",
        "Total provider webhooks by outcome"
    );
    metrics::describe_counter!(
        "robo_conversations_total",
        "Total conversation requests by result"
    );
    metrics::describe_counter!(
        "robo_robot_tokens_issued_total",
        "Total robot tokens issued"
    );
    metrics::describe_counter!(
        "robo_subscriptions_canceled_total",
        "Total subscriptions set to cancel at period end"
    );
    metrics::describe_histogram!(
        OPERATION_DURATION,
        "Handler latency in seconds by operation and result"
    );

    Ok(handle)
}
