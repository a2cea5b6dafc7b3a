use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::gateway::{ProgressGateway, ProgressRecord};
use crate::error::GatewayError;

/// In-process progress store
///
/// Keeps every saved record, the beacons sent during unload and the highest
/// number of saves that were ever outstanding at once. Latency and failures
/// can be injected to exercise the sync engine.
#[derive(Debug, Default)]
pub struct MemoryProgressGateway {
    records: Mutex<HashMap<String, ProgressRecord>>,
    saves: Mutex<Vec<ProgressRecord>>,
    beacons: Mutex<Vec<ProgressRecord>>,
    latency: Mutex<Duration>,
    failing_saves: Mutex<usize>,
    failing_fetches: Mutex<bool>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    save_calls: AtomicUsize,
}

impl MemoryProgressGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        let gateway = Self::default();
        gateway.set_latency(latency);
        gateway
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Make the next `count` save calls fail
    pub fn fail_next_saves(&self, count: usize) {
        *self.failing_saves.lock() = count;
    }

    pub fn set_fetch_failing(&self, failing: bool) {
        *self.failing_fetches.lock() = failing;
    }

    /// Seed a previously saved record
    pub fn insert(&self, record: ProgressRecord) {
        self.records
            .lock()
            .insert(record.content_id.clone(), record);
    }

    /// Records from successful saves, in completion order
    pub fn saves(&self) -> Vec<ProgressRecord> {
        self.saves.lock().clone()
    }

    pub fn beacons(&self) -> Vec<ProgressRecord> {
        self.beacons.lock().clone()
    }

    /// Number of save calls received, including failed ones
    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        let mut remaining = self.failing_saves.lock();
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl ProgressGateway for MemoryProgressGateway {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn save(&self, record: &ProgressRecord) -> Result<(), GatewayError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let result = if self.take_failure() {
            Err(GatewayError::Unavailable("simulated save failure".into()))
        } else {
            self.insert(record.clone());
            self.saves.lock().push(record.clone());
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn fetch(&self, content_id: &str) -> Result<Option<ProgressRecord>, GatewayError> {
        if *self.failing_fetches.lock() {
            return Err(GatewayError::Unavailable("simulated fetch failure".into()));
        }
        Ok(self.records.lock().get(content_id).cloned())
    }

    fn send_beacon(&self, record: ProgressRecord) {
        self.insert(record.clone());
        self.beacons.lock().push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_then_fetch() {
        let gateway = MemoryProgressGateway::new();
        let record = ProgressRecord::new("movie-1", 42.0, 100.0, "desktop", "linux");
        gateway.save(&record).await.unwrap();

        let fetched = gateway.fetch("movie-1").await.unwrap();
        assert_eq!(fetched, Some(record));
        assert!(gateway.fetch("movie-2").await.unwrap().is_none());
        assert_eq!(gateway.save_calls(), 1);
        assert_eq!(gateway.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let gateway = MemoryProgressGateway::new();
        gateway.fail_next_saves(1);
        let record = ProgressRecord::new("movie-1", 42.0, 100.0, "desktop", "linux");

        assert!(gateway.save(&record).await.is_err());
        assert!(gateway.save(&record).await.is_ok());
        assert_eq!(gateway.saves().len(), 1);
        assert_eq!(gateway.save_calls(), 2);
        assert_eq!(gateway.in_flight(), 0);

        gateway.set_fetch_failing(true);
        assert!(gateway.fetch("movie-1").await.is_err());
    }
}
