use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;

lazy_static! {
    pub static ref ATTRDB_POLL_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("attrdb_poll_total", "Per-query poll attempts"),
        &["query_id"]
    )
    .expect("metric can not be created");

    pub static ref ATTRDB_POLL_FAILURE_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("attrdb_poll_failure_total", "Per-query poll attempts that failed"),
        &["query_id"]
    )
    .expect("metric can not be created");

    pub static ref ATTRDB_FLUSH_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("attrdb_flush_total", "Per-query subscriber flush attempts"),
        &["query_id"]
    )
    .expect("metric can not be created");

    pub static ref ATTRDB_DELIVERY_FAILURE_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "attrdb_delivery_failure_total",
            "Flushes aborted because a subscriber channel was full"
        ),
        &["query_id"]
    )
    .expect("metric can not be created");

    pub static ref ATTRDB_ACTIVE_QUERIES: IntGauge =
        IntGauge::new("attrdb_active_queries", "Currently registered streaming queries")
            .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

fn register_custom_metrics() {
    REGISTRY
        .register(Box::new(ATTRDB_POLL_TOTAL.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(ATTRDB_POLL_FAILURE_TOTAL.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(ATTRDB_FLUSH_TOTAL.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(ATTRDB_DELIVERY_FAILURE_TOTAL.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(ATTRDB_ACTIVE_QUERIES.clone()))
        .expect("collector can be registered");
}

/// Encode all database metrics in the prometheus text format. Serving them
/// (HTTP or otherwise) is the embedder's concern.
pub fn gather() -> String {
    use prometheus::Encoder;

    REGISTER.call_once(register_custom_metrics);

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("could not encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
