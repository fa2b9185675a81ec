use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;
use tubesense_core::CoreError;

/// Counting gate that caps the number of remote calls in flight.
#[derive(Debug)]
pub struct AdmissionGate {
    semaphore: Semaphore,
    limit: usize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl AdmissionGate {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Semaphore::new(limit),
            limit,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub async fn acquire(&self) -> Result<GatePermit<'_>, CoreError> {
        let start_time = Instant::now();
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| CoreError::Internal {
                message: "admission gate closed".to_string(),
            })?;

        let now_in_flight = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(now_in_flight, Ordering::AcqRel);

        let queue_wait_time = start_time.elapsed();
        debug!(
            "Admitted remote call ({}/{} in flight, waited {:?})",
            now_in_flight, self.limit, queue_wait_time
        );

        Ok(GatePermit {
            _permit: permit,
            in_flight: &self.in_flight,
            queue_wait_time,
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Highest number of simultaneously admitted calls seen so far.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct GatePermit<'a> {
    _permit: SemaphorePermit<'a>,
    in_flight: &'a AtomicUsize,
    pub queue_wait_time: Duration,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
