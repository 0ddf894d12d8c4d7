// Prometheus metrics definitions for the matchday backend.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Players waiting in a matchmaking queue, by mode.
    pub static ref QUEUE_DEPTH: IntGaugeVec = IntGaugeVec::new(
        Opts::new("matchday_queue_depth", "Players waiting for an opponent"),
        &["mode"],
    )
    .unwrap();

    /// Live WebSocket connections.
    pub static ref CONNECTED_WEBSOCKETS: IntGauge =
        IntGauge::new("matchday_connected_websockets", "Live WebSocket connections").unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    /// Queue entries created, by mode.
    pub static ref QUEUE_ENQUEUED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("matchday_queue_enqueued_total", "Queue entries created"),
        &["mode"],
    )
    .unwrap();

    /// Pairings made, by mode.
    pub static ref QUEUE_MATCHED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("matchday_queue_matched_total", "Players paired from the queue"),
        &["mode"],
    )
    .unwrap();

    /// Entries that timed out without an opponent, by mode.
    pub static ref QUEUE_EXPIRED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("matchday_queue_expired_total", "Queue entries that timed out"),
        &["mode"],
    )
    .unwrap();

    /// Matches simulated, by mode.
    pub static ref MATCHES_SIMULATED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("matchday_matches_simulated_total", "Matches simulated"),
        &["mode"],
    )
    .unwrap();

    /// Rating transactions, by result (ok, failed).
    pub static ref RATING_UPDATES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("matchday_rating_updates_total", "Rating update transactions"),
        &["result"],
    )
    .unwrap();

    /// Notifications the reply sink could not deliver.
    pub static ref SINK_FAILURES_TOTAL: IntCounter = IntCounter::new(
        "matchday_sink_failures_total",
        "Queue notifications that failed to deliver",
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// Total goals per simulated match.
    pub static ref GOALS_PER_MATCH: Histogram = Histogram::with_opts(
        HistogramOpts::new("matchday_goals_per_match", "Total goals per simulated match")
            .buckets(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0, 12.0, 16.0]),
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Call once at startup.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(QUEUE_DEPTH.clone()),
        Box::new(CONNECTED_WEBSOCKETS.clone()),
        Box::new(QUEUE_ENQUEUED_TOTAL.clone()),
        Box::new(QUEUE_MATCHED_TOTAL.clone()),
        Box::new(QUEUE_EXPIRED_TOTAL.clone()),
        Box::new(MATCHES_SIMULATED_TOTAL.clone()),
        Box::new(RATING_UPDATES_TOTAL.clone()),
        Box::new(SINK_FAILURES_TOTAL.clone()),
        Box::new(GOALS_PER_MATCH.clone()),
    ];

    for c in collectors {
        // Tests and the server may both call this; a second registration is harmless.
        if let Err(e) = REGISTRY.register(c) {
            tracing::debug!("metric already registered: {e}");
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
