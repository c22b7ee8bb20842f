use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How the global subscriber should be assembled.
#[derive(Debug, Clone, Copy)]
pub struct TracingOptions<'a> {
    /// Filter used when `RUST_LOG` is not set.
    pub log_level: &'a str,
    /// Emit flattened JSON lines instead of human-readable output.
    pub json: bool,
    /// OTLP gRPC collector. Span export is disabled when absent.
    pub otlp_endpoint: Option<&'a str>,
}

impl Default for TracingOptions<'_> {
    fn default() -> Self {
        Self {
            log_level: "info",
            json: false,
            otlp_endpoint: None,
        }
    }
}

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed or the OTLP pipeline cannot
/// be built.
pub fn init_tracing(service_name: &str, options: TracingOptions<'_>) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(options.log_level));

    let telemetry = match options.otlp_endpoint {
        Some(endpoint) => {
            let otlp_exporter = opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint);

            let tracer = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(otlp_exporter)
                .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                    KeyValue::new("service.name", service_name.to_string()),
                ])))
                .install_batch(runtime::Tokio)
                .map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to initialize OTLP tracer for '{}' at '{}': {}",
                        service_name,
                        endpoint,
                        e
                    )
                })?;

            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    let (json_layer, text_layer) = if options.json {
        let layer = fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .json()
            .flatten_event(true);
        (Some(layer), None)
    } else {
        (None, Some(fmt::layer().with_target(false)))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(telemetry)
        .with(json_layer)
        .with(text_layer)
        .try_init()?;

    Ok(())
}
