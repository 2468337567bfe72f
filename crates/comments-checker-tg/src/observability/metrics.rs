use super::GLOBAL_LABELS;
use crate::config::from_env_or_panic;
use serde::Deserialize;

#[derive(Deserialize)]
struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    metrics_port: u16,
}

fn default_metrics_port() -> u16 {
    2000
}

pub fn init_metrics() {
    let config: MetricsConfig = from_env_or_panic("");

    let mut builder = metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.metrics_port));

    for (key, value) in GLOBAL_LABELS {
        builder = builder.add_global_label(*key, *value);
    }

    builder
        .install()
        .expect("BUG: failed to initialize the metrics listener");

    describe_metrics();
}

fn describe_metrics() {
    metrics::describe_counter!(
        "tg_updates_total",
        "Number of updates received from Telegram"
    );
    metrics::describe_counter!(
        "tg_updates_skipped_total",
        "Number of updates received from Telegram, that were skipped by the bot"
    );
    metrics::describe_counter!(
        "channel_checks_total",
        "Number of channels checked by the verdict of the check"
    );
    metrics::describe_counter!(
        "channel_check_flood_waits_total",
        "Number of times the channel directory asked to slow down"
    );
    metrics::describe_counter!(
        "channel_check_runs_total",
        "Number of finished channel check runs by their final status"
    );
}
