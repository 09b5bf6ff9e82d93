//! OpenTelemetry observability configuration and initialization
//!
//! The channel client logs through `tracing`. Applications choose how those
//! records leave the process:
//!
//! - [`init_logging`] installs a JSON console subscriber only, which is what
//!   most front-end bridges and demos want.
//! - [`init_observability`] additionally exports traces and metrics to an OTLP
//!   collector, so the `tether.client.*` instruments recorded by the client
//!   reach a backend.
//!
//! # Usage Pattern
//!
//! ```rust,no_run
//! use tether_core::ObservabilityConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ObservabilityConfig::new("spectrum-ui")
//!         .with_endpoint("http://localhost:4317")
//!         .with_log_level("debug");
//!
//!     tether_core::init_observability(config).expect("Failed to init observability");
//!
//!     // ... run the client ...
//!
//!     tether_core::shutdown_observability();
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: Collector endpoint
//! - `RUST_LOG`: Log level filter (e.g., "info", "tether_client=debug")

use opentelemetry::{global, KeyValue};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type InitResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Providers installed by [`init_observability`], kept for shutdown
struct Providers {
    tracer: Option<SdkTracerProvider>,
    meter: Option<SdkMeterProvider>,
}

static PROVIDERS: Mutex<Providers> = Mutex::new(Providers {
    tracer: None,
    meter: None,
});

fn providers() -> std::sync::MutexGuard<'static, Providers> {
    PROVIDERS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Configuration for OpenTelemetry export
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Service name reported in resource attributes
    pub service_name: String,
    pub service_version: String,
    /// OTLP collector endpoint
    pub otlp_endpoint: String,
    pub enable_traces: bool,
    pub enable_metrics: bool,
    /// Level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Interval between metric exports
    pub metrics_interval: Duration,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "tether".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
            enable_traces: true,
            enable_metrics: true,
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            metrics_interval: Duration::from_secs(30),
        }
    }
}

impl ObservabilityConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = endpoint.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    pub fn with_traces(mut self, enable: bool) -> Self {
        self.enable_traces = enable;
        self
    }

    pub fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    pub fn with_metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = interval;
        self
    }

    fn resource(&self) -> opentelemetry_sdk::Resource {
        opentelemetry_sdk::Resource::builder_empty()
            .with_attributes(vec![
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                    self.service_name.clone(),
                ),
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                    self.service_version.clone(),
                ),
            ])
            .build()
    }
}

/// Install a JSON console subscriber without any OTLP export
///
/// `RUST_LOG` takes precedence over `level`. Calling this more than once, or
/// after another global subscriber was installed, returns an error.
pub fn init_logging(level: &str) -> InitResult<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer())
        .try_init()?;
    Ok(())
}

/// Initialize tracing, metrics and structured logging
///
/// Must be called from within a tokio runtime: the batch exporters spawn
/// their workers on it.
pub fn init_observability(config: ObservabilityConfig) -> InitResult<()> {
    let tracer = if config.enable_traces {
        Some(init_tracer(&config)?)
    } else {
        None
    };

    if config.enable_metrics {
        init_metrics(&config)?;
    }

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;

    match tracer {
        Some(tracer) => tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .with(env_filter)
            .with(json_layer())
            .try_init()?,
        None => tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer())
            .try_init()?,
    }

    tracing::info!(
        service_name = %config.service_name,
        otlp_endpoint = %config.otlp_endpoint,
        traces = config.enable_traces,
        metrics = config.enable_metrics,
        "OpenTelemetry initialized"
    );

    Ok(())
}

fn json_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .json()
}

fn init_tracer(config: &ObservabilityConfig) -> InitResult<opentelemetry_sdk::trace::Tracer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler};

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(config.resource())
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .build();

    let tracer = provider.tracer(config.service_name.clone());
    providers().tracer = Some(provider.clone());
    global::set_tracer_provider(provider);
    Ok(tracer)
}

fn init_metrics(config: &ObservabilityConfig) -> InitResult<()> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .build()?;

    let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(exporter)
        .with_interval(config.metrics_interval)
        .build();

    let provider = SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(config.resource())
        .build();

    providers().meter = Some(provider.clone());
    global::set_meter_provider(provider);
    Ok(())
}

/// Flush and stop telemetry export
///
/// Shuts down the providers installed by [`init_observability`], exporting
/// any buffered spans and metrics. Safe to call repeatedly; later calls find
/// nothing to shut down.
pub fn shutdown_observability() {
    let (tracer, meter) = {
        let mut providers = providers();
        (providers.tracer.take(), providers.meter.take())
    };
    if tracer.is_none() && meter.is_none() {
        return;
    }

    tracing::info!("Shutting down OpenTelemetry");
    if let Some(provider) = tracer {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = %e, "Tracer provider shutdown failed");
        }
    }
    if let Some(provider) = meter {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = %e, "Meter provider shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.service_name, "tether");
        assert!(config.enable_traces);
        assert!(config.enable_metrics);
        assert_eq!(config.metrics_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_custom_config() {
        let config = ObservabilityConfig::new("spectrum-ui")
            .with_endpoint("http://custom:4317")
            .with_log_level("debug")
            .with_version("1.0.0")
            .with_traces(false)
            .with_metrics_interval(Duration::from_secs(5));

        assert_eq!(config.service_name, "spectrum-ui");
        assert_eq!(config.otlp_endpoint, "http://custom:4317");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.service_version, "1.0.0");
        assert!(!config.enable_traces);
        assert_eq!(config.metrics_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_init_all_disabled() {
        let config = ObservabilityConfig::new("test-none")
            .with_traces(false)
            .with_metrics(false);

        // Another test binary may already own the global subscriber; either
        // outcome is acceptable as long as nothing panics.
        let _ = init_observability(config);
        let _ = init_logging("info");
    }

    #[test]
    fn test_shutdown_releases_providers() {
        {
            let mut providers = providers();
            providers.tracer = Some(SdkTracerProvider::builder().build());
            providers.meter = Some(SdkMeterProvider::builder().build());
        }

        shutdown_observability();
        {
            let providers = providers();
            assert!(providers.tracer.is_none());
            assert!(providers.meter.is_none());
        }

        shutdown_observability();
    }
}
