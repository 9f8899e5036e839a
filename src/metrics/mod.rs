//! Prometheus collectors of the resource store.
//!
//! One [`StorageMetrics`] is built per process against an explicit
//! [`Registry`] and shared through an `Arc`.


use prometheus::exponential_buckets;
use prometheus::Encoder;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;

pub const RESULT_OK: &str = "ok";
pub const RESULT_ERROR: &str = "error";

#[derive(Clone)]
pub struct StorageMetrics {
    registry: Registry,

    /// Write attempts by operation and outcome
    pub write_events: IntCounterVec,
    /// Live watch subscribers across all broadcasters
    pub watch_subscribers: IntGauge,
    pub watch_slow_consumer_drops: IntCounter,
    /// Seconds between the write and its delivery to a watcher
    pub watch_event_latency: HistogramVec,
    pub bulk_requests: IntCounterVec,
}

impl StorageMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let write_events = IntCounterVec::new(
            Opts::new("write_events_total", "Resource write attempts"),
            &["operation", "result"],
        )?;
        let watch_subscribers = IntGauge::new("watch_subscribers", "Active watch subscribers")?;
        let watch_slow_consumer_drops = IntCounter::new(
            "watch_slow_consumer_drops_total",
            "Watch subscribers dropped because their buffer was full",
        )?;
        let watch_event_latency = HistogramVec::new(
            HistogramOpts::new(
                "watch_event_latency_seconds",
                "Delay between a write and its watch delivery",
            )
            .buckets(exponential_buckets(0.001, 2.0, 14)?),
            &["resource"],
        )?;
        let bulk_requests = IntCounterVec::new(
            Opts::new("bulk_requests_total", "Bulk ingestion streams by outcome"),
            &["result"],
        )?;

        registry.register(Box::new(write_events.clone()))?;
        registry.register(Box::new(watch_subscribers.clone()))?;
        registry.register(Box::new(watch_slow_consumer_drops.clone()))?;
        registry.register(Box::new(watch_event_latency.clone()))?;
        registry.register(Box::new(bulk_requests.clone()))?;

        Ok(Self {
            registry: registry.clone(),
            write_events,
            watch_subscribers,
            watch_slow_consumer_drops,
            watch_event_latency,
            bulk_requests,
        })
    }

    /// Collectors bound to a private registry, handy when nobody scrapes.
    pub fn standalone() -> prometheus::Result<Self> {
        Self::new(&Registry::new())
    }

    pub fn record_write(
        &self,
        operation: &str,
        ok: bool,
    ) {
        let result = if ok { RESULT_OK } else { RESULT_ERROR };
        self.write_events.with_label_values(&[operation, result]).inc();
    }

    pub fn record_bulk(
        &self,
        ok: bool,
    ) {
        let result = if ok { RESULT_OK } else { RESULT_ERROR };
        self.bulk_requests.with_label_values(&[result]).inc();
    }

    /// Render the registry in the Prometheus text exposition format
    pub fn gather_text(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("could not encode metrics: {:?}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
