//! Metrics collection for concurrency and stress testing.
//!
//! Provides atomic counters for throughput and latency measurements.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Counters {
    connections: AtomicUsize,
    connections_failed: AtomicUsize,
    disconnects: AtomicUsize,
    messages_sent: AtomicUsize,
    messages_received: AtomicUsize,
    errors: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<Counters>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connection(&self) {
        self.inner.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_failed(&self) {
        self.inner.connections_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disconnect(&self) {
        self.inner.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_sent(&self) {
        self.inner.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_received(&self) {
        self.inner.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.inner.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connections_total(&self) -> usize {
        self.inner.connections.load(Ordering::Relaxed)
    }

    pub fn connections_failed(&self) -> usize {
        self.inner.connections_failed.load(Ordering::Relaxed)
    }

    pub fn disconnects(&self) -> usize {
        self.inner.disconnects.load(Ordering::Relaxed)
    }

    pub fn messages_sent(&self) -> usize {
        self.inner.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> usize {
        self.inner.messages_received.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> usize {
        self.inner.errors.load(Ordering::Relaxed)
    }

    pub fn report(&self) {
        println!(
            "connections: {} ok, {} failed, {} closed | messages: {} sent, {} received | errors: {}",
            self.connections_total(),
            self.connections_failed(),
            self.disconnects(),
            self.messages_sent(),
            self.messages_received(),
            self.errors()
        );
    }
}

#[derive(Debug, Clone, Default)]
pub struct Latencies {
    samples: Arc<Mutex<Vec<Duration>>>,
}

impl Latencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, latency: Duration) {
        self.samples.lock().push(latency);
    }

    pub fn count(&self) -> usize {
        self.samples.lock().len()
    }

    fn percentile(&self, pct: usize) -> Option<Duration> {
        let mut samples = self.samples.lock().clone();
        if samples.is_empty() {
            return None;
        }
        samples.sort_unstable();
        let idx = (samples.len() * pct / 100).min(samples.len() - 1);
        Some(samples[idx])
    }

    pub fn p50(&self) -> Option<Duration> {
        self.percentile(50)
    }

    pub fn p99(&self) -> Option<Duration> {
        self.percentile(99)
    }

    pub fn report(&self) {
        println!(
            "latency: {} samples, p50 {:?}, p99 {:?}",
            self.count(),
            self.p50(),
            self.p99()
        );
    }
}
