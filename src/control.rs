// Request admission for the Opsgenie API
//
// Bounds the number of in-flight API requests and caps the request rate
// within a sliding one second window. Shared by every concurrent scrape.

use crate::errors::ExporterError;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

#[derive(Clone)]
pub struct RequestLimiter {
    max_inflight: Arc<Semaphore>,
    window: Arc<Mutex<RateWindow>>,
}

struct RateWindow {
    rate_per_sec: u32,
    timestamps: VecDeque<Instant>,
    span: Duration,
}

impl RequestLimiter {
    pub fn new(max_inflight: usize, rate_per_sec: u32) -> Self {
        let window = RateWindow {
            rate_per_sec: rate_per_sec.max(1),
            timestamps: VecDeque::with_capacity(rate_per_sec as usize),
            span: Duration::from_secs(1),
        };
        Self {
            max_inflight: Arc::new(Semaphore::new(max_inflight.max(1))),
            window: Arc::new(Mutex::new(window)),
        }
    }

    /// Wait for a rate slot, then for an in-flight permit. The permit is
    /// released on drop.
    pub async fn acquire(&self) -> Result<RequestPermit, ExporterError> {
        loop {
            let mut guard = self.window.lock().await;
            let now = Instant::now();
            while let Some(front) = guard.timestamps.front() {
                if now.duration_since(*front) >= guard.span {
                    guard.timestamps.pop_front();
                } else {
                    break;
                }
            }
            if (guard.timestamps.len() as u32) < guard.rate_per_sec {
                guard.timestamps.push_back(now);
                break;
            }
            let wait = guard
                .timestamps
                .front()
                .map(|front| guard.span.saturating_sub(now.duration_since(*front)))
                .unwrap_or_default();
            drop(guard);
            tokio::time::sleep(wait.max(Duration::from_millis(5))).await;
        }
        let permit = self
            .max_inflight
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ExporterError::LimiterClosed)?;
        Ok(RequestPermit { _permit: permit })
    }

    pub fn available_permits(&self) -> usize {
        self.max_inflight.available_permits()
    }
}

pub struct RequestPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
