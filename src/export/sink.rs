//! Event sinks and the interval flusher.

use crate::core::Result;
use crate::export::MetricsEvent;
use crate::metrics::MetricsRegistry;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Destination for exported event batches.
///
/// Implementations ship the batch to a collector, a file, stdout or a test
/// buffer. Delivery is best-effort: a failing sink never stops the registry
/// from clearing its state for the next interval.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Receive one exported batch.
    async fn emit(&self, events: &[MetricsEvent]) -> Result<()>;
}

/// In-memory sink that retains every batch it receives.
///
/// Useful in tests and as a staging buffer for a custom shipper.
#[derive(Debug, Default)]
pub struct BufferSink {
    batches: Mutex<Vec<Vec<MetricsEvent>>>,
}

impl BufferSink {
    /// Create an empty buffer sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All batches received so far.
    pub fn batches(&self) -> Vec<Vec<MetricsEvent>> {
        self.batches.lock().clone()
    }

    /// Total number of events across all batches.
    pub fn event_count(&self) -> usize {
        self.batches.lock().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl EventSink for BufferSink {
    async fn emit(&self, events: &[MetricsEvent]) -> Result<()> {
        self.batches.lock().push(events.to_vec());
        Ok(())
    }
}

/// Periodic flusher driving a registry into a sink.
///
/// Runs `registry.flush_to(sink)` on a fixed interval until stopped. Sink
/// failures are logged and the loop continues; the registry has already
/// cleared its state, so the failed batch is dropped rather than
/// double-counted on the next tick.
pub struct Flusher {
    registry: Arc<MetricsRegistry>,
    sink: Arc<dyn EventSink>,
    period: Duration,
    shutdown: Arc<AtomicBool>,
}

impl Flusher {
    /// Create a flusher for the given registry and sink.
    pub fn new(registry: Arc<MetricsRegistry>, sink: Arc<dyn EventSink>, period: Duration) -> Self {
        Self {
            registry,
            sink,
            period,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the flush loop in the background.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let sink = Arc::clone(&self.sink);
        let shutdown = Arc::clone(&self.shutdown);
        let period = self.period;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            // The first tick fires immediately; skip it so the first real
            // flush happens one full period after start.
            ticker.tick().await;

            while !shutdown.load(Ordering::Relaxed) {
                ticker.tick().await;
                match registry.flush_to(sink.as_ref()).await {
                    Ok(events) => {
                        tracing::debug!(events = events.len(), "flushed metrics batch");
                    },
                    Err(err) => {
                        tracing::warn!(error = %err, "metrics sink rejected batch");
                    },
                }
            }
        })
    }

    /// Signal the flush loop to stop after the current tick.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_buffer_sink_collects_batches() {
        let sink = BufferSink::new();
        let events = vec![MetricsEvent::now(
            "x",
            crate::export::MetricValue::Scalar(1.0),
        )];
        sink.emit(&events).await.unwrap();
        sink.emit(&events).await.unwrap();

        assert_eq!(sink.batches().len(), 2);
        assert_eq!(sink.event_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flusher_drains_registry_on_interval() {
        let registry = Arc::new(MetricsRegistry::new());
        registry.counter("jobs_total").inc(4.0, None).unwrap();

        let sink = Arc::new(BufferSink::new());
        let flusher = Flusher::new(
            Arc::clone(&registry),
            Arc::clone(&sink) as Arc<dyn EventSink>,
            Duration::from_secs(10),
        );
        let handle = flusher.start();

        tokio::time::sleep(Duration::from_secs(11)).await;
        flusher.stop();

        assert!(sink.event_count() >= 1);
        // Flush cleared the counter for the next interval.
        assert_eq!(registry.counter("jobs_total").value(), 0.0);

        handle.abort();
    }
}
