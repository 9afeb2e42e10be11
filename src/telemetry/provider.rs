//! Signal provider construction
//!
//! Traces and logs are pushed through batching processors; metrics are pulled
//! from instruments by a periodic reader and then pushed to the exporter. All
//! three providers carry the same [`Resource`].

use crate::config::{BatchConfig, MetricReaderConfig};
use opentelemetry_sdk::logs::{
    BatchConfigBuilder as LogBatchConfigBuilder, BatchLogProcessor, LogExporter,
    SdkLoggerProvider,
};
use opentelemetry_sdk::metrics::exporter::PushMetricExporter;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::{
    BatchConfigBuilder as TraceBatchConfigBuilder, BatchSpanProcessor, SdkTracerProvider,
    SpanExporter,
};
use opentelemetry_sdk::Resource;

/// Wrap a span exporter in a batch processor and attach the resource.
pub fn build_tracer_provider<E>(
    exporter: E,
    resource: Resource,
    batch: &BatchConfig,
) -> SdkTracerProvider
where
    E: SpanExporter + 'static,
{
    let batch_config = TraceBatchConfigBuilder::default()
        .with_max_queue_size(batch.max_queue_size)
        .with_max_export_batch_size(batch.max_export_batch_size)
        .with_scheduled_delay(batch.scheduled_delay)
        .build();

    let processor = BatchSpanProcessor::builder(exporter)
        .with_batch_config(batch_config)
        .build();

    SdkTracerProvider::builder()
        .with_span_processor(processor)
        .with_resource(resource)
        .build()
}

/// Wrap a metric exporter in a periodic reader and attach the resource.
pub fn build_meter_provider<E>(
    exporter: E,
    resource: Resource,
    reader: &MetricReaderConfig,
) -> SdkMeterProvider
where
    E: PushMetricExporter,
{
    let reader = PeriodicReader::builder(exporter)
        .with_interval(reader.interval)
        .build();

    SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(resource)
        .build()
}

/// Wrap a log exporter in a batch processor and attach the resource.
pub fn build_logger_provider<E>(
    exporter: E,
    resource: Resource,
    batch: &BatchConfig,
) -> SdkLoggerProvider
where
    E: LogExporter + 'static,
{
    let batch_config = LogBatchConfigBuilder::default()
        .with_max_queue_size(batch.max_queue_size)
        .with_max_export_batch_size(batch.max_export_batch_size)
        .with_scheduled_delay(batch.scheduled_delay)
        .build();

    let processor = BatchLogProcessor::builder(exporter)
        .with_batch_config(batch_config)
        .build();

    SdkLoggerProvider::builder()
        .with_log_processor(processor)
        .with_resource(resource)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::logs::{AnyValue, LogRecord as _, Logger as _, LoggerProvider as _, Severity};
    use opentelemetry::metrics::MeterProvider as _;
    use opentelemetry::trace::{Tracer as _, TracerProvider as _};
    use opentelemetry::{Key, Value};
    use opentelemetry_sdk::logs::InMemoryLogExporter;
    use opentelemetry_sdk::metrics::InMemoryMetricExporter;
    use opentelemetry_sdk::trace::InMemorySpanExporter;

    fn resource() -> Resource {
        Resource::builder().with_service_name("provider-test").build()
    }

    #[test]
    fn test_tracer_provider_exports_with_resource() {
        let exporter = InMemorySpanExporter::default();
        let provider = build_tracer_provider(exporter.clone(), resource(), &BatchConfig::default());

        provider.tracer("test").in_span("work", |_cx| {});
        provider.force_flush().unwrap();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "work");
        let _ = provider.shutdown();
    }

    #[test]
    fn test_meter_provider_pushes_on_flush() {
        let exporter = InMemoryMetricExporter::default();
        let provider =
            build_meter_provider(exporter.clone(), resource(), &MetricReaderConfig::default());

        let counter = provider.meter("test").u64_counter("jobs").build();
        counter.add(3, &[]);
        provider.force_flush().unwrap();

        assert!(!exporter.get_finished_metrics().unwrap().is_empty());
        let _ = provider.shutdown();
    }

    #[test]
    fn test_logger_provider_exports_with_resource() {
        let exporter = InMemoryLogExporter::default();
        let provider =
            build_logger_provider(exporter.clone(), resource(), &BatchConfig::default());

        let logger = provider.logger("test");
        let mut record = logger.create_log_record();
        record.set_body(AnyValue::String("hello".into()));
        record.set_severity_number(Severity::Info);
        logger.emit(record);
        provider.force_flush().unwrap();

        let logs = exporter.get_emitted_logs().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(
            logs[0].resource.get(&Key::from_static_str("service.name")),
            Some(Value::from("provider-test"))
        );
        let _ = provider.shutdown();
    }
}
