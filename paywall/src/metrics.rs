//! Prometheus counters for entitlement and billing events.
//!
//! Registered in the default registry, which `/internal/metrics` renders next
//! to the HTTP metrics from `axum-prometheus`.

use crate::entitlements::{AccessDecision, DenialReason, Tier};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, TextEncoder, register_int_counter_vec};

static ACCESS_DECISIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "paywall_access_decisions_total",
        "Gated strategy access decisions by tier and outcome",
        &["tier", "outcome"]
    )
    .expect("Failed to register paywall_access_decisions_total metric")
});

static BILLING_EVENTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "paywall_billing_events_total",
        "Payment provider webhook events by type and result",
        &["event_type", "result"]
    )
    .expect("Failed to register paywall_billing_events_total metric")
});

pub fn record_access_decision(tier: Tier, decision: AccessDecision) {
    let outcome = match decision {
        AccessDecision::Granted => "granted",
        AccessDecision::Denied(DenialReason::Unauthenticated) => "unauthenticated",
        AccessDecision::Denied(DenialReason::QuotaExceeded) => "quota_exceeded",
    };
    let tier = tier.to_string();
    ACCESS_DECISIONS.with_label_values(&[tier.as_str(), outcome]).inc();
}

/// `result` is one of `applied`, `rejected` or `failed`.
pub fn record_billing_event(event_type: &str, result: &str) {
    BILLING_EVENTS.with_label_values(&[event_type, result]).inc();
}

/// Render the default registry in the Prometheus text format.
pub fn gather_default_registry() -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
