use opentelemetry::{KeyValue, metrics::UpDownCounter};
use std::sync::LazyLock;

static STATDS: LazyLock<UpDownCounter<i64>> = LazyLock::new(|| {
    logfire::i64_up_down_counter("wa_onboarding_statds")
        .with_description("WhatsApp onboarding service statistics")
        .with_unit("event")
        .build()
});

fn incr_statds(metric: String, value: String) {
    STATDS.add(1, &[KeyValue::new(metric, value)]);
}

pub fn incr_onboarding_outcome_statds(outcome: &str) {
    incr_statds("onboarding_outcome".to_string(), outcome.into())
}

pub fn incr_token_strategy_statds(strategy: &str) {
    incr_statds("token_strategy".to_string(), strategy.into())
}

pub fn incr_webhook_event_statds(kind: &str) {
    incr_statds("webhook_event".to_string(), kind.into())
}
