use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    cache::{
        METRIC_ENTRY_HIT, METRIC_ENTRY_MISS, METRIC_ENTRY_STORE, METRIC_LIST_HIT,
        METRIC_LIST_MISS, METRIC_LIST_STORE,
    },
    config::{LogFormat, LoggingSettings},
};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_LIST_HIT,
            Unit::Count,
            "Metadata list lookups served from the key-value store."
        );
        describe_counter!(
            METRIC_LIST_MISS,
            Unit::Count,
            "Metadata list lookups that had to rescan the collection."
        );
        describe_counter!(
            METRIC_LIST_STORE,
            Unit::Count,
            "Metadata lists written to the key-value store."
        );
        describe_counter!(
            METRIC_ENTRY_HIT,
            Unit::Count,
            "Compiled entries served from memory."
        );
        describe_counter!(
            METRIC_ENTRY_MISS,
            Unit::Count,
            "Entry lookups that required a compile."
        );
        describe_counter!(
            METRIC_ENTRY_STORE,
            Unit::Count,
            "Compiled entries stored in memory."
        );
    });
}
