//! Observability: structured logging and optional OpenTelemetry export.
//!
//! # Quick start
//!
//! ```rust,no_run
//! # use searchbot_server::{config::ObservabilityConfig, observability};
//! let config = ObservabilityConfig::from_env();
//! // In main(), before any logging:
//! let _otel_guard = observability::init(&config);
//! // `_otel_guard` must stay alive until the end of `main`.
//! ```

pub mod tracing;

pub use tracing::OtelGuard;

use crate::config::ObservabilityConfig;

/// Initialise the tracing subscriber (and OTLP export when enabled).
///
/// Keep the returned guard alive for the lifetime of `main` so providers
/// flush and shut down gracefully.
pub fn init(config: &ObservabilityConfig) -> OtelGuard {
    tracing::init(config)
}
