//! Jitter delay between network-bound fetches
//!
//! The batch loop calls [`RequestPacer::wait`] before every request that goes
//! to the remote API, spacing requests out to stay under remote rate limits.
//! It is never used around local file I/O.
//!
//! Waiting is a `tokio::time::sleep`, so other tasks keep running. A cancelled
//! [`CancellationToken`] ends the wait at once with [`Error::Cancelled`].
//!
//! # Example
//!
//! ```no_run
//! use douk_hooks::pacing::{PacingWindow, RequestPacer};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> douk_hooks::Result<()> {
//! let pacer = RequestPacer::new(PacingWindow::new(0.5, 2.0)?);
//! let cancel = CancellationToken::new();
//!
//! pacer.wait(&cancel).await?;
//! // ... fetch ...
//! # Ok(())
//! # }
//! ```

use crate::config::PacingConfig;
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Longest accepted pacing bound, in seconds
pub const MAX_PACING_SECONDS: f64 = 3600.0;

/// Bounds of the jitter delay, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingWindow {
    lower: f64,
    upper: f64,
}

impl PacingWindow {
    /// Window `[lower, upper]` with `0 <= lower <= upper <= MAX_PACING_SECONDS`
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if !(0.0..=MAX_PACING_SECONDS).contains(&lower) {
            return Err(Error::config(
                "pacing_lower_seconds",
                format!(
                    "pacing_lower_seconds must be between 0 and {MAX_PACING_SECONDS}, got {lower}"
                ),
            ));
        }
        if !(lower..=MAX_PACING_SECONDS).contains(&upper) {
            return Err(Error::config(
                "pacing_upper_seconds",
                format!(
                    "pacing_upper_seconds must be between {lower} and {MAX_PACING_SECONDS}, got {upper}"
                ),
            ));
        }
        Ok(Self { lower, upper })
    }

    /// Window described by `config`
    pub fn from_config(config: &PacingConfig) -> Result<Self> {
        Self::new(config.pacing_lower_seconds, config.pacing_upper_seconds)
    }

    /// Shortest delay in seconds
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Longest delay in seconds
    pub fn upper(&self) -> f64 {
        self.upper
    }
}

impl Default for PacingWindow {
    fn default() -> Self {
        Self {
            lower: 0.5,
            upper: 2.0,
        }
    }
}

/// Inserts a uniformly random delay before each remote request
pub struct RequestPacer {
    window: PacingWindow,
    rng: Mutex<StdRng>,
}

impl RequestPacer {
    /// Pacer seeded from OS entropy
    pub fn new(window: PacingWindow) -> Self {
        Self {
            window,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Pacer with a fixed seed, producing a reproducible delay sequence
    pub fn with_seed(window: PacingWindow, seed: u64) -> Self {
        Self {
            window,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// The configured bounds
    pub fn window(&self) -> PacingWindow {
        self.window
    }

    /// Draw the next delay, uniform over the closed window
    pub fn sample_delay(&self) -> Duration {
        // A poisoned lock only means another sampler panicked mid-draw; the RNG is still usable
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let secs = rng.gen_range(self.window.lower..=self.window.upper);
        Duration::from_secs_f64(secs)
    }

    /// Sleep for a freshly drawn delay
    ///
    /// Returns [`Error::Cancelled`] as soon as `cancel` fires, without
    /// finishing the delay.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<()> {
        let delay = self.sample_delay();
        tracing::debug!(delay_ms = delay.as_millis(), "Pacing before request");
        suspend(delay, cancel).await
    }
}

/// Sleep for `duration` unless `cancel` fires first
pub(crate) async fn suspend(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
