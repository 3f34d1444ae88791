//! Cool-down after every batch of processed units
//!
//! When harvesting many accounts or collections in one run, the batch loop
//! reports each finished unit. After every `batch_size` units the
//! [`BatchThrottle`] prints a notice and pauses for `cool_down` so the remote
//! side does not flag the account or IP. A unit is one account or collection,
//! not one request.
//!
//! Pipelines that run concurrently must share one [`BatchCounter`]: it
//! increments and checks the boundary under a single lock, so each boundary
//! fires exactly once.

use crate::config::ThrottleConfig;
use crate::error::{Error, Result};
use crate::notice::{MessageKey, Reporter};
use crate::pacing::suspend;
use std::borrow::Cow;
use std::num::NonZeroU64;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Pauses the batch loop at every batch boundary
#[derive(Debug, Clone, Copy)]
pub struct BatchThrottle {
    batch_size: NonZeroU64,
    cool_down: Duration,
}

impl BatchThrottle {
    /// Throttle pausing for `cool_down` after every `batch_size` units
    pub fn new(batch_size: NonZeroU64, cool_down: Duration) -> Self {
        Self {
            batch_size,
            cool_down,
        }
    }

    /// Throttle described by `config`
    pub fn from_config(config: &ThrottleConfig) -> Result<Self> {
        let batch_size = NonZeroU64::new(config.batch_size)
            .ok_or_else(|| Error::config("batch_size", "batch_size must be at least 1"))?;
        Ok(Self::new(batch_size, config.cool_down))
    }

    /// Units per batch
    pub fn batch_size(&self) -> u64 {
        self.batch_size.get()
    }

    /// Pause length
    pub fn cool_down(&self) -> Duration {
        self.cool_down
    }

    /// Whether `count` completed units sits on a batch boundary
    ///
    /// Zero never does.
    pub fn is_boundary(&self, count: u64) -> bool {
        count > 0 && count % self.batch_size.get() == 0
    }

    /// Cool down if `count` is on a batch boundary
    ///
    /// On a boundary, emits [`MessageKey::BatchCoolDown`] through `reporter`
    /// with `batches` and `rest_time`, then sleeps for the cool-down. Returns
    /// whether a cool-down happened. A cancelled `cancel` aborts with
    /// [`Error::Cancelled`]; if it was already cancelled no notice is emitted.
    pub async fn checkpoint(
        &self,
        count: u64,
        reporter: &dyn Reporter,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        if !self.is_boundary(count) {
            return Ok(false);
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let rest_time = self.cool_down.as_secs();
        tracing::info!(
            processed = count,
            batch_size = self.batch_size.get(),
            rest_time_secs = rest_time,
            "Batch boundary reached, cooling down"
        );
        reporter.report(
            MessageKey::BatchCoolDown,
            &[
                ("batches", Cow::Owned(self.batch_size.get().to_string())),
                ("rest_time", Cow::Owned(rest_time.to_string())),
            ],
        );

        suspend(self.cool_down, cancel).await?;
        tracing::info!(processed = count, "Cool-down finished, resuming");
        Ok(true)
    }
}

/// Count of completed units shared by every pipeline of one run
///
/// Starts at zero and only grows; it resets with the process.
#[derive(Debug, Default)]
pub struct BatchCounter {
    count: Mutex<u64>,
}

impl BatchCounter {
    /// Counter starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count
    pub async fn get(&self) -> u64 {
        *self.count.lock().await
    }

    /// Record one completed unit and cool down if a boundary was reached
    ///
    /// The lock is held across the cool-down, so other pipelines that finish a
    /// unit meanwhile wait for it to end. Returns the new count.
    pub async fn complete_unit(
        &self,
        throttle: &BatchThrottle,
        reporter: &dyn Reporter,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let mut count = self.count.lock().await;
        *count += 1;
        let current = *count;
        throttle.checkpoint(current, reporter, cancel).await?;
        Ok(current)
    }
}
