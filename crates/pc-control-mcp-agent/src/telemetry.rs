// OpenTelemetry support for tool call tracing
// Only compiled in when the 'telemetry' feature is enabled

#[cfg(feature = "telemetry")]
pub use with_telemetry::*;

#[cfg(not(feature = "telemetry"))]
pub use without_telemetry::*;

#[cfg(feature = "telemetry")]
mod with_telemetry {
    use opentelemetry::global::BoxedSpan;
    use opentelemetry::{
        global,
        trace::{Span, SpanKind, Status, Tracer, TracerProvider},
        KeyValue,
    };
    use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{
        logs::LoggerProvider, propagation::TraceContextPropagator, runtime,
        trace::TracerProvider as SdkTracerProvider, Resource,
    };
    use opentelemetry_semantic_conventions::{
        attribute::{SERVICE_NAME, SERVICE_VERSION},
        SCHEMA_URL,
    };
    use std::time::Duration;
    use tracing::info;

    const TRACER_NAME: &str = "pc-control-mcp";
    const EXPORT_TIMEOUT: Duration = Duration::from_millis(500);

    /// One span per tool call.
    pub struct StepSpan {
        span: BoxedSpan,
        start_time: std::time::Instant,
    }

    impl StepSpan {
        pub fn new(tool_name: &str, step_id: Option<&str>) -> Self {
            let tracer = global::tracer(TRACER_NAME);
            let mut span = tracer
                .span_builder(format!("step.{tool_name}"))
                .with_kind(SpanKind::Internal)
                .start(&tracer);

            span.set_attribute(KeyValue::new("tool.name", tool_name.to_string()));
            span.set_attribute(KeyValue::new(
                "tool.start_time",
                chrono::Utc::now().to_rfc3339(),
            ));
            if let Some(id) = step_id {
                span.set_attribute(KeyValue::new("step.id", id.to_string()));
            }

            StepSpan {
                span,
                start_time: std::time::Instant::now(),
            }
        }

        pub fn set_attribute(&mut self, key: &str, value: String) {
            self.span
                .set_attribute(KeyValue::new(key.to_string(), value));
        }

        pub fn add_event(&mut self, name: &str, attributes: Vec<(&str, String)>) {
            let kvs: Vec<KeyValue> = attributes
                .into_iter()
                .map(|(k, v)| KeyValue::new(k.to_string(), v))
                .collect();
            self.span.add_event(name.to_string(), kvs);
        }

        pub fn set_status(&mut self, success: bool, error: Option<&str>) {
            let duration_ms = self.start_time.elapsed().as_millis() as i64;
            self.span
                .set_attribute(KeyValue::new("tool.duration_ms", duration_ms));
            self.span
                .set_attribute(KeyValue::new("tool.success", success));

            let status = if success {
                Status::Ok
            } else {
                let message = error.unwrap_or("Failed");
                self.span
                    .set_attribute(KeyValue::new("error.message", message.to_string()));
                Status::error(message.to_string())
            };
            self.span.set_status(status);
        }

        pub fn end(mut self) {
            self.span.set_attribute(KeyValue::new(
                "tool.end_time",
                chrono::Utc::now().to_rfc3339(),
            ));
            self.span.end();
        }
    }

    fn env_is_true(name: &str) -> bool {
        std::env::var(name)
            .unwrap_or_default()
            .eq_ignore_ascii_case("true")
    }

    fn is_ci() -> bool {
        env_is_true("CI") || env_is_true("GITHUB_ACTIONS")
    }

    fn resource() -> Resource {
        let mut resource_kvs = vec![
            KeyValue::new(SERVICE_NAME, "pc-control-mcp-agent"),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ];

        let deployment_env = std::env::var("DEPLOYMENT_ENVIRONMENT")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "development".to_string());
        resource_kvs.push(KeyValue::new("deployment.environment", deployment_env));

        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.to_str().map(|s| s.to_string()));
        let instance_id = std::env::var("SERVICE_INSTANCE_ID").unwrap_or_else(|_| {
            format!(
                "{}-{}",
                hostname.as_deref().unwrap_or("unknown"),
                std::process::id()
            )
        });
        resource_kvs.push(KeyValue::new("service.instance.id", instance_id));
        if let Some(hostname) = hostname {
            resource_kvs.push(KeyValue::new("host.name", hostname));
        }

        resource_kvs.push(KeyValue::new("os.type", std::env::consts::OS));
        resource_kvs.push(KeyValue::new("os.arch", std::env::consts::ARCH));

        Resource::from_schema_url(resource_kvs, SCHEMA_URL)
    }

    /// Installs the global tracer provider when `OTEL_SDK_ENABLED=true`.
    pub fn init_telemetry() -> anyhow::Result<()> {
        if !env_is_true("OTEL_SDK_ENABLED") {
            info!("OpenTelemetry is disabled by default (set OTEL_SDK_ENABLED=true to enable)");
            return Ok(());
        }
        if env_is_true("OTEL_SDK_DISABLED") {
            info!("OpenTelemetry is disabled via OTEL_SDK_DISABLED");
            return Ok(());
        }
        if is_ci() {
            info!("Running in CI environment, disabling OpenTelemetry to avoid blocking");
            return Ok(());
        }

        global::set_text_map_propagator(TraceContextPropagator::new());

        let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:4318".to_string());
        info!("Initializing OpenTelemetry with endpoint: {}", otlp_endpoint);

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(format!("{otlp_endpoint}/v1/traces"))
            .with_timeout(EXPORT_TIMEOUT)
            .build()?;

        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter, runtime::Tokio)
            .with_resource(resource())
            .build();
        global::set_tracer_provider(provider);

        info!("OpenTelemetry telemetry initialized successfully");
        Ok(())
    }

    pub fn shutdown_telemetry() {
        global::shutdown_tracer_provider();
    }

    /// Traces and logs layer for the subscriber, bridging `tracing` to OTLP.
    ///
    /// `None` unless `OTEL_EXPORTER_OTLP_ENDPOINT` is set (and not disabled or in CI).
    pub fn create_otel_logs_layer<S>() -> Option<impl tracing_subscriber::Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber
            + for<'span> tracing_subscriber::registry::LookupSpan<'span>
            + Send
            + Sync,
    {
        if env_is_true("OTEL_SDK_DISABLED") || is_ci() {
            return None;
        }
        let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;
        let resource = resource();

        let trace_exporter = match opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(format!("{otlp_endpoint}/v1/traces"))
            .with_timeout(EXPORT_TIMEOUT)
            .build()
        {
            Ok(exporter) => exporter,
            Err(e) => {
                eprintln!("Failed to create OTLP trace exporter: {e}");
                return None;
            }
        };
        let trace_provider = SdkTracerProvider::builder()
            .with_batch_exporter(trace_exporter, runtime::Tokio)
            .with_resource(resource.clone())
            .build();
        // Concrete tracer must be taken before the provider goes global.
        let tracer = trace_provider.tracer("pc-control-mcp-tracing");
        global::set_tracer_provider(trace_provider);
        let traces_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        let log_exporter = match opentelemetry_otlp::LogExporter::builder()
            .with_http()
            .with_endpoint(format!("{otlp_endpoint}/v1/logs"))
            .with_timeout(EXPORT_TIMEOUT)
            .build()
        {
            Ok(exporter) => exporter,
            Err(e) => {
                eprintln!("Failed to create OTLP logs exporter: {e}");
                return None;
            }
        };
        let logger_provider = LoggerProvider::builder()
            .with_batch_exporter(log_exporter, runtime::Tokio)
            .with_resource(resource)
            .build();
        let logs_layer = OpenTelemetryTracingBridge::new(&logger_provider);

        eprintln!("OpenTelemetry layer enabled: {otlp_endpoint}/v1/traces, {otlp_endpoint}/v1/logs");

        use tracing_subscriber::Layer;
        Some(traces_layer.and_then(logs_layer))
    }
}

#[cfg(not(feature = "telemetry"))]
mod without_telemetry {
    use tracing::debug;

    pub struct StepSpan;

    impl StepSpan {
        pub fn new(_tool_name: &str, _step_id: Option<&str>) -> Self {
            debug!("Telemetry disabled: StepSpan created (no-op)");
            StepSpan
        }

        pub fn set_attribute(&mut self, _key: &str, _value: String) {}
        pub fn add_event(&mut self, _name: &str, _attributes: Vec<(&str, String)>) {}
        pub fn set_status(&mut self, _success: bool, _error: Option<&str>) {}
        pub fn end(self) {}
    }

    pub fn init_telemetry() -> anyhow::Result<()> {
        Ok(())
    }

    pub fn shutdown_telemetry() {
        debug!("Telemetry disabled: shutdown_telemetry (no-op)");
    }
}
