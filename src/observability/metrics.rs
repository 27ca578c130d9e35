use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub assignments_total: IntCounterVec,
    pub assignment_latency_seconds: HistogramVec,
    pub roster_fetch_failures: IntCounter,
    pub orders_in_store: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Total assignment attempts by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let assignment_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "assignment_latency_seconds",
                "Latency of order assignment in seconds",
            ),
            &["outcome"],
        )
        .expect("valid assignment_latency_seconds metric");

        let roster_fetch_failures = IntCounter::new(
            "roster_fetch_failures_total",
            "Roster feed fetches that failed and degraded to an empty pool",
        )
        .expect("valid roster_fetch_failures_total metric");

        let orders_in_store = IntGauge::new("orders_in_store", "Current number of stored orders")
            .expect("valid orders_in_store metric");

        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(assignment_latency_seconds.clone()))
            .expect("register assignment_latency_seconds");
        registry
            .register(Box::new(roster_fetch_failures.clone()))
            .expect("register roster_fetch_failures_total");
        registry
            .register(Box::new(orders_in_store.clone()))
            .expect("register orders_in_store");

        Self {
            registry,
            assignments_total,
            assignment_latency_seconds,
            roster_fetch_failures,
            orders_in_store,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
