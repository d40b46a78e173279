//! Command implementations behind the `start`/`stop` CLI surface.
//!
//! Kept in the library so the fleet operations and their output lines
//! are testable against a shared supervisor.

use crate::groups::{AdvisorSpec, ConfigError, GroupRegistry};
use crate::settings::RuntimeSettings;
use crate::supervisor::StartSummary;

/// Expand the configured groups over the configured product universe.
///
/// # Errors
///
/// Returns [`ConfigError`] listing every invalid group.
pub fn build_specs(
    settings: &RuntimeSettings,
    registry: &GroupRegistry,
) -> Result<Vec<AdvisorSpec>, ConfigError> {
    registry.build_specs(&settings.groups, &settings.products())
}

/// Human-readable start report.
#[must_use]
pub fn format_started(summary: StartSummary) -> String {
    format!(
        "Started advisors: {} new, {} already running",
        summary.new, summary.already_running
    )
}

/// Human-readable stop report.
#[must_use]
pub fn format_stopped(stopped: usize) -> String {
    format!("Stopped advisors: {stopped}")
}

/// Human-readable config error listing, one line per group field.
#[must_use]
pub fn format_config_error(error: &ConfigError) -> String {
    let mut lines = vec!["invalid advisor group config:".to_string()];
    for (group_id, errors) in &error.groups {
        for field_error in errors {
            lines.push(format!("  {group_id}: {field_error}"));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::advisor::{Advisor, AdvisorDeps, NoOpAdvisor};
    use crate::bus::{EventBus, InProcessBus};
    use crate::orderbook::{InMemoryOrderBook, InsideQuoteSource};
    use crate::supervisor::AdvisorsSupervisor;
    use crate::telemetry::TelemetryHub;

    const SAMPLE: &str = r#"
        [venues.exchange_a]
        products = ["btc_usd", "eth_usd"]

        [groups.group_a]
        advisor = "noop"
        factory = "one_per_product"
        products = "exchange_a"
    "#;

    fn supervisor() -> AdvisorsSupervisor {
        let deps = AdvisorDeps {
            bus: Arc::new(InProcessBus::new()) as Arc<dyn EventBus>,
            books: Arc::new(InMemoryOrderBook::new()) as Arc<dyn InsideQuoteSource>,
            telemetry: Arc::new(TelemetryHub::new()),
        };
        AdvisorsSupervisor::new(deps).with_builder(
            "noop",
            Arc::new(|_spec: &AdvisorSpec| Box::new(NoOpAdvisor) as Box<dyn Advisor>),
        )
    }

    #[tokio::test]
    async fn start_then_stop_reports_real_counts() {
        let settings = RuntimeSettings::from_toml(SAMPLE).unwrap();
        let registry = GroupRegistry::new();
        let supervisor = supervisor();

        let specs = build_specs(&settings, &registry).unwrap();
        assert_eq!(specs.len(), 2);

        let summary = supervisor.start(&specs).unwrap();
        assert_eq!(
            format_started(summary),
            "Started advisors: 2 new, 0 already running"
        );

        let summary = supervisor.start(&specs).unwrap();
        assert_eq!(
            format_started(summary),
            "Started advisors: 0 new, 2 already running"
        );

        let stopped = supervisor.stop(&specs).await;
        assert_eq!(format_stopped(stopped), "Stopped advisors: 2");
        assert_eq!(supervisor.stop(&specs).await, 0);
    }

    #[test]
    fn config_errors_list_every_group_field() {
        let settings = RuntimeSettings::from_toml(
            r#"
            [groups.group_a]
            factory = "one_per_product"
            "#,
        )
        .unwrap();

        let error = build_specs(&settings, &GroupRegistry::new()).unwrap_err();
        let listing = format_config_error(&error);
        assert!(listing.contains("group_a: advisor must be present"));
        assert!(listing.contains("group_a: products must be present"));
    }
}
