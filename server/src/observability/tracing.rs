//! Tracing subscriber and optional OTLP export.
//!
//! Stdout always gets JSON lines. With OTLP enabled, spans leave the process
//! with credential attributes dropped and user content masked, and only
//! `WARN` and above are bridged to OTLP logs: usage rows are mirrored at
//! `INFO` and carry the user ID and query verbatim.

use anyhow::Context as _;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, Value};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig as _;
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::{
    BatchSpanProcessor, Sampler, SdkTracerProvider, SpanData, SpanExporter,
};
use opentelemetry_sdk::Resource;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Layer as _, Registry};

use crate::config::ObservabilityConfig;

/// Instrumentation scope name of every exported span.
const TRACER_NAME: &str = "searchbot-server";

/// Replacement value for masked attributes.
const MASK: &str = "[redacted]";

/// Key fragments that mark a credential. Matching attributes are dropped.
const CREDENTIAL_FRAGMENTS: [&str; 6] = [
    "token",
    "secret",
    "password",
    "authorization",
    "signature",
    "cookie",
];

/// Keys (last dotted segment) that carry user content. Values are masked so
/// the attribute still shows up in traces.
const USER_CONTENT_KEYS: [&str; 6] = ["query", "user_id", "event_ts", "text", "title", "body"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scrub {
    Keep,
    Mask,
    Drop,
}

fn classify(key: &str) -> Scrub {
    let key = key.to_ascii_lowercase();
    if CREDENTIAL_FRAGMENTS.iter().any(|fragment| key.contains(fragment)) {
        return Scrub::Drop;
    }

    let leaf = key.rsplit('.').next().unwrap_or_default();
    if USER_CONTENT_KEYS.iter().any(|k| *k == leaf) {
        Scrub::Mask
    } else {
        Scrub::Keep
    }
}

/// Drop credential attributes and mask user content in place.
fn scrub(attributes: &mut Vec<KeyValue>) {
    attributes.retain(|kv| classify(kv.key.as_str()) != Scrub::Drop);
    for kv in attributes.iter_mut() {
        if classify(kv.key.as_str()) == Scrub::Mask {
            kv.value = Value::from(MASK);
        }
    }
}

/// Span exporter that runs [`scrub`] over span and event attributes.
#[derive(Debug)]
struct ScrubbingSpanExporter<E> {
    inner: E,
}

impl<E> SpanExporter for ScrubbingSpanExporter<E>
where
    E: SpanExporter,
{
    async fn export(&self, mut batch: Vec<SpanData>) -> OTelSdkResult {
        for span in &mut batch {
            scrub(&mut span.attributes);
            for event in &mut span.events.events {
                scrub(&mut event.attributes);
            }
        }
        self.inner.export(batch).await
    }

    fn shutdown(&mut self) -> OTelSdkResult {
        self.inner.shutdown()
    }

    fn force_flush(&mut self) -> OTelSdkResult {
        self.inner.force_flush()
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.inner.set_resource(resource);
    }
}

struct Providers {
    tracer: SdkTracerProvider,
    logger: SdkLoggerProvider,
}

/// Flushes and shuts down the OTLP providers when dropped. Hold it until the
/// end of `main`.
pub struct OtelGuard {
    providers: Option<Providers>,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        let Some(providers) = self.providers.take() else {
            return;
        };
        if let Err(e) = providers.tracer.shutdown() {
            tracing::warn!(error = %e, "OTLP tracer shutdown failed");
        }
        if let Err(e) = providers.logger.shutdown() {
            tracing::warn!(error = %e, "OTLP logger shutdown failed");
        }
    }
}

fn build_resource(config: &ObservabilityConfig) -> Resource {
    Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attributes([
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("deployment.environment", config.environment.clone()),
        ])
        .build()
}

fn build_providers(config: &ObservabilityConfig) -> anyhow::Result<Providers> {
    let resource = build_resource(config);

    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()
        .context("Failed to build OTLP span exporter")?;
    let sampler = Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
        config.trace_sample_ratio,
    )));
    let tracer = SdkTracerProvider::builder()
        .with_resource(resource.clone())
        .with_sampler(sampler)
        .with_span_processor(
            BatchSpanProcessor::builder(ScrubbingSpanExporter {
                inner: span_exporter,
            })
            .build(),
        )
        .build();

    let log_exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()
        .context("Failed to build OTLP log exporter")?;
    let logger = SdkLoggerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(log_exporter)
        .build();

    Ok(Providers { tracer, logger })
}

/// `RUST_LOG` wins; otherwise the configured level. Transport crates are
/// silenced while exporting so the exporter does not trace itself.
fn env_filter(config: &ObservabilityConfig, exporting: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if exporting {
            EnvFilter::new(format!("{},hyper=off,tonic=off,h2=off", config.log_level))
        } else {
            EnvFilter::new(config.log_level.clone())
        }
    })
}

/// Install the global subscriber. Returns a guard that must outlive `main`'s
/// work.
///
/// When `config.enabled` is set but the exporters cannot be built, the
/// service still starts with stdout logging and reports the failure there.
pub fn init(config: &ObservabilityConfig) -> OtelGuard {
    let (providers, export_error) = if config.enabled {
        match build_providers(config) {
            Ok(providers) => (Some(providers), None),
            Err(e) => (None, Some(e)),
        }
    } else {
        (None, None)
    };

    let trace_layer = providers.as_ref().map(|p| {
        tracing_opentelemetry::layer().with_tracer(p.tracer.tracer(TRACER_NAME))
    });
    let log_layer = providers
        .as_ref()
        .map(|p| OpenTelemetryTracingBridge::new(&p.logger).with_filter(LevelFilter::WARN));

    Registry::default()
        .with(env_filter(config, providers.is_some()))
        .with(trace_layer)
        .with(log_layer)
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    if let Some(e) = export_error {
        tracing::error!(error = ?e, "OTLP export disabled");
    }

    OtelGuard { providers }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_of<'a>(attributes: &'a [KeyValue], key: &str) -> Option<&'a Value> {
        attributes
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| &kv.value)
    }

    #[test]
    fn credentials_are_dropped() {
        assert_eq!(classify("slack_bot_token"), Scrub::Drop);
        assert_eq!(classify("Authorization"), Scrub::Drop);
        assert_eq!(classify("x_slack_signature"), Scrub::Drop);
        assert_eq!(classify("wp_password"), Scrub::Drop);
    }

    #[test]
    fn user_content_is_masked() {
        assert_eq!(classify("query"), Scrub::Mask);
        assert_eq!(classify("user_id"), Scrub::Mask);
        assert_eq!(classify("event_ts"), Scrub::Mask);
        assert_eq!(classify("http.request.body"), Scrub::Mask);
        assert_eq!(classify("channel_id"), Scrub::Keep);
        assert_eq!(classify("event_id"), Scrub::Keep);
        assert_eq!(classify("retry_num"), Scrub::Keep);
    }

    #[test]
    fn usage_row_fields_are_scrubbed() {
        let mut attributes = vec![
            KeyValue::new("user_id", "U123"),
            KeyValue::new("query", "how do I leave the company"),
            KeyValue::new("event_ts", "1715873754.429808"),
            KeyValue::new("slack_bot_token", "xoxb-1"),
            KeyValue::new("channel_id", "D1"),
        ];

        scrub(&mut attributes);

        assert_eq!(attributes.len(), 4);
        assert!(value_of(&attributes, "slack_bot_token").is_none());
        for key in ["user_id", "query", "event_ts"] {
            assert_eq!(value_of(&attributes, key), Some(&Value::from(MASK)), "{key}");
        }
        assert_eq!(value_of(&attributes, "channel_id"), Some(&Value::from("D1")));
    }

    #[test]
    fn instrument_skip_list_is_present() {
        let events = include_str!("../events/handlers.rs");
        assert!(events.contains("skip(state, headers, body)"));

        let slack = include_str!("../slack/client.rs");
        assert!(slack.contains("#[instrument(skip(self, status))]"));
        assert!(slack.contains("#[instrument(skip(self, layout)"));

        let search = include_str!("../search/mod.rs");
        assert!(search.contains("#[instrument(skip(self))]"));
    }
}
