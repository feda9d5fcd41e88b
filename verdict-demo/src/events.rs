use std::collections::HashSet;

use tracing_subscriber::{
    Layer, filter::Targets, layer::SubscriberExt, util::SubscriberInitExt,
};
use verdict_core::trace_categories;

/// Type of event to trace.
#[derive(Clone, Debug, Eq, Hash, PartialEq, clap::ValueEnum)]
pub enum TraceEvent {
    /// Traces case registration and round lifecycle.
    #[clap(name = "registry")]
    Registry,
    /// Traces delivery of events to receivers.
    #[clap(name = "broadcast")]
    Broadcast,
    /// Traces output files being opened, written, and closed.
    #[clap(name = "output")]
    Output,
    /// Traces the sample suites and panics they raise.
    #[clap(name = "suites")]
    Suites,
}

/// Target used by the sample suites.
pub(crate) const SUITES_TARGET: &str = "suites";

#[derive(Default)]
pub(crate) struct TraceEventConfig {
    enabled_trace_events: HashSet<TraceEvent>,
}

impl TraceEventConfig {
    /// Installs a stderr subscriber that logs the given event classes at debug level.
    pub fn init(enabled_log_events: &[TraceEvent]) {
        let config = Self {
            enabled_trace_events: enabled_log_events.iter().cloned().collect(),
        };

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .without_time()
            .with_target(false)
            .with_filter(config.compose_filter());

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            // Something went wrong; proceed on anyway but complain audibly.
            eprintln!("warning: failed to initialize tracing.");
        }
    }

    fn compose_filter(&self) -> Targets {
        let mut filter =
            Targets::new().with_default(tracing_subscriber::filter::LevelFilter::INFO);

        for event in &self.enabled_trace_events {
            let target = match event {
                TraceEvent::Registry => trace_categories::REGISTRY,
                TraceEvent::Broadcast => trace_categories::BROADCAST,
                TraceEvent::Output => trace_categories::OUTPUT,
                TraceEvent::Suites => SUITES_TARGET,
            };

            filter = filter.with_target(target, tracing::Level::DEBUG);
        }

        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn enabled_events_log_at_debug() {
        let config = TraceEventConfig {
            enabled_trace_events: [TraceEvent::Output].into_iter().collect(),
        };
        let filter = config.compose_filter();

        assert!(filter.would_enable(trace_categories::OUTPUT, &tracing::Level::DEBUG));
        assert!(!filter.would_enable(trace_categories::REGISTRY, &tracing::Level::DEBUG));
        assert!(filter.would_enable(trace_categories::REGISTRY, &tracing::Level::WARN));
        assert_eq!(filter.default_level(), Some(LevelFilter::INFO));
    }
}
