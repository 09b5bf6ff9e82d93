//! OpenTelemetry metrics for the channel client
//!
//! Instruments are created from the global meter provider, so they export
//! wherever [`tether_core::init_observability`] pointed it. Without an
//! installed provider every `record_*` call is a cheap no-op.

use crate::connection_state::ConnectionState;
use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram, Meter},
    KeyValue,
};

/// Client-side instruments, all under `tether.client.*`
pub struct ClientMetrics {
    pub connection_state: Gauge<i64>,
    pub messages_sent: Counter<u64>,
    pub messages_received: Counter<u64>,
    pub messages_queued: Counter<u64>,
    pub messages_dropped: Counter<u64>,
    pub requests_total: Counter<u64>,
    pub request_duration: Histogram<f64>,
    pub errors_total: Counter<u64>,
    pub reconnection_attempts: Counter<u64>,
    pub reconnection_success: Counter<u64>,
    pub reconnection_exhausted: Counter<u64>,
    pub keepalive_timeouts: Counter<u64>,
}

impl ClientMetrics {
    /// Create instruments on the global meter named after the service
    pub fn new(service_name: impl Into<String>) -> Self {
        let meter = global::meter_with_scope(
            opentelemetry::InstrumentationScope::builder(service_name.into()).build(),
        );
        Self::new_with_meter(&meter)
    }

    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            connection_state: meter
                .i64_gauge("tether.client.connection.state")
                .with_description("Connection state (0=closed, 1=connecting, 2=open, 3=closing)")
                .build(),
            messages_sent: meter
                .u64_counter("tether.client.messages.sent")
                .with_description("Frames handed to the transport")
                .build(),
            messages_received: meter
                .u64_counter("tether.client.messages.received")
                .with_description("Structured messages received, by type")
                .build(),
            messages_queued: meter
                .u64_counter("tether.client.messages.queued")
                .with_description("Messages queued while disconnected")
                .build(),
            messages_dropped: meter
                .u64_counter("tether.client.messages.dropped")
                .with_description("Queued messages dropped because their flush failed")
                .build(),
            requests_total: meter
                .u64_counter("tether.client.requests.total")
                .with_description("Correlated requests, by type and outcome")
                .build(),
            request_duration: meter
                .f64_histogram("tether.client.request.duration")
                .with_description("Request round-trip time in seconds")
                .build(),
            errors_total: meter
                .u64_counter("tether.client.errors.total")
                .with_description("Errors reported through the error event, by phase")
                .build(),
            reconnection_attempts: meter
                .u64_counter("tether.client.reconnection.attempts")
                .with_description("Scheduled reconnection attempts")
                .build(),
            reconnection_success: meter
                .u64_counter("tether.client.reconnection.success")
                .with_description("Connections opened after at least one reconnection")
                .build(),
            reconnection_exhausted: meter
                .u64_counter("tether.client.reconnection.exhausted")
                .with_description("Times the reconnection policy gave up")
                .build(),
            keepalive_timeouts: meter
                .u64_counter("tether.client.keepalive.timeouts")
                .with_description("Connections closed for silence")
                .build(),
        }
    }

    pub fn update_connection_state(&self, state: ConnectionState) {
        self.connection_state.record(state.metric_value(), &[]);
    }

    pub fn record_message_sent(&self) {
        self.messages_sent.add(1, &[]);
    }

    pub fn record_message_received(&self, kind: &str) {
        self.messages_received
            .add(1, &[KeyValue::new("type", kind.to_string())]);
    }

    pub fn record_queued(&self) {
        self.messages_queued.add(1, &[]);
    }

    pub fn record_dropped(&self) {
        self.messages_dropped.add(1, &[]);
    }

    pub fn record_request(&self, request_type: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("type", request_type.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    pub fn record_error(&self, phase: &str) {
        self.errors_total
            .add(1, &[KeyValue::new("phase", phase.to_string())]);
    }

    pub fn record_reconnection_attempt(&self) {
        self.reconnection_attempts.add(1, &[]);
    }

    pub fn record_reconnection_success(&self) {
        self.reconnection_success.add(1, &[]);
    }

    pub fn record_exhausted(&self) {
        self.reconnection_exhausted.add(1, &[]);
    }

    pub fn record_keepalive_timeout(&self) {
        self.keepalive_timeouts.add(1, &[]);
    }
}
