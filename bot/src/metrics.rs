//! Prometheus metrics for the bot.
//!
//! The [`BotMetrics`] struct owns a dedicated [`Registry`] that the
//! gateway's `/metrics` endpoint encodes into the Prometheus text
//! exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

/// Central collection of all bot-level Prometheus metrics.
pub struct BotMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Member-join events handled.
    pub joins: IntCounter,
    /// Verification codes stored.
    pub codes_issued: IntCounter,
    /// Codes stored but not delivered by mail.
    pub code_deliveries_failed: IntCounter,
    /// Successful code confirmations.
    pub verifications: IntCounter,
    /// Administrator overrides.
    pub manual_verifications: IntCounter,
    /// Records revoked by a conflict sweep.
    pub conflict_revocations: IntCounter,
    /// Evictions that failed during a sweep or data deletion.
    pub eviction_failures: IntCounter,
    /// Instructions that reached neither the member nor the fallback channel.
    pub notification_failures: IntCounter,
    /// Operations aborted by a store error.
    pub store_errors: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Verification records in the store.
    pub records: IntGauge,
}

impl BotMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let joins = register_int_counter_with_registry!(
            Opts::new("kahukura_joins_total", "Member-join events handled"),
            registry
        )
        .expect("failed to register joins counter");

        let codes_issued = register_int_counter_with_registry!(
            Opts::new("kahukura_codes_issued_total", "Verification codes issued"),
            registry
        )
        .expect("failed to register codes_issued counter");

        let code_deliveries_failed = register_int_counter_with_registry!(
            Opts::new(
                "kahukura_code_deliveries_failed_total",
                "Verification codes that could not be mailed"
            ),
            registry
        )
        .expect("failed to register code_deliveries_failed counter");

        let verifications = register_int_counter_with_registry!(
            Opts::new("kahukura_verifications_total", "Successful code verifications"),
            registry
        )
        .expect("failed to register verifications counter");

        let manual_verifications = register_int_counter_with_registry!(
            Opts::new(
                "kahukura_manual_verifications_total",
                "Manual verifications by administrators"
            ),
            registry
        )
        .expect("failed to register manual_verifications counter");

        let conflict_revocations = register_int_counter_with_registry!(
            Opts::new(
                "kahukura_conflict_revocations_total",
                "Claimants revoked because another member verified the same email"
            ),
            registry
        )
        .expect("failed to register conflict_revocations counter");

        let eviction_failures = register_int_counter_with_registry!(
            Opts::new("kahukura_eviction_failures_total", "Evictions that failed"),
            registry
        )
        .expect("failed to register eviction_failures counter");

        let notification_failures = register_int_counter_with_registry!(
            Opts::new(
                "kahukura_notification_failures_total",
                "Notifications that failed both directly and in the fallback channel"
            ),
            registry
        )
        .expect("failed to register notification_failures counter");

        let store_errors = register_int_counter_with_registry!(
            Opts::new("kahukura_store_errors_total", "Operations aborted by a store error"),
            registry
        )
        .expect("failed to register store_errors counter");

        let records = register_int_gauge_with_registry!(
            Opts::new("kahukura_records", "Verification records in the store"),
            registry
        )
        .expect("failed to register records gauge");

        Self {
            registry,
            joins,
            codes_issued,
            code_deliveries_failed,
            verifications,
            manual_verifications,
            conflict_revocations,
            eviction_failures,
            notification_failures,
            store_errors,
            records,
        }
    }

    /// Encode every metric in the text exposition format.
    pub fn encode(&self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl Default for BotMetrics {
    fn default() -> Self {
        Self::new()
    }
}
