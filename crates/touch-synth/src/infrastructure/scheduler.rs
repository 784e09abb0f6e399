//! Scheduler adapters for inter-step delays.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::application::inject_gesture::Scheduler;

/// Real-time delays on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Records requested delays and only yields, so gestures run at full speed.
#[derive(Debug, Default)]
pub struct InstantScheduler {
    delays: Mutex<Vec<Duration>>,
}

impl InstantScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn total(&self) -> Duration {
        self.delays().iter().sum()
    }
}

#[async_trait]
impl Scheduler for InstantScheduler {
    async fn sleep(&self, delay: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(delay);
        tokio::task::yield_now().await;
    }
}
