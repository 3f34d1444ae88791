//! The hook set handed to the batch loop
//!
//! [`Hooks`] bundles the pacer, filter, failure policy, throttle and the shared
//! unit counter behind the four calls the batch loop makes:
//!
//! | when                        | call                                   |
//! |-----------------------------|----------------------------------------|
//! | before each remote fetch    | [`Hooks::before_fetch`]                |
//! | after a record is retrieved | [`Hooks::keep`]                        |
//! | after a unit fails          | [`Hooks::continue_after_failure`]      |
//! | after a unit completes      | [`Hooks::unit_completed`]              |
//!
//! # Example
//!
//! ```no_run
//! use douk_hooks::{Config, Hooks};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> douk_hooks::Result<()> {
//! let hooks = Hooks::from_config(&Config::default())?;
//! let cancel = CancellationToken::new();
//!
//! for account in ["a", "b", "c"] {
//!     hooks.before_fetch(&cancel).await?;
//!     // ... fetch `account`, filter its items with hooks.keep(..) ...
//!     hooks.unit_completed(&cancel).await?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::error::Result;
use crate::failure::{self, AlwaysContinue, FailurePolicy};
use crate::filter::{self, AcceptAll, Item, ItemFilter, RuleFilter};
use crate::notice::{BuiltinCatalog, ConsoleReporter, Localizer, Reporter};
use crate::pacing::{PacingWindow, RequestPacer};
use crate::throttle::{BatchCounter, BatchThrottle};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything the batch loop consults while iterating over units
pub struct Hooks {
    pacer: RequestPacer,
    throttle: BatchThrottle,
    counter: BatchCounter,
    filter: Arc<dyn ItemFilter>,
    failure_policy: Arc<dyn FailurePolicy>,
    reporter: Arc<dyn Reporter>,
}

impl Hooks {
    /// Hooks built from `config`
    ///
    /// Notices go to the console in the configured locale.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let localizer: Arc<dyn Localizer> = Arc::new(BuiltinCatalog::new(config.locale));
        let filter: Arc<dyn ItemFilter> = if config.filter.is_empty() {
            Arc::new(AcceptAll)
        } else {
            Arc::new(RuleFilter::from_config(&config.filter))
        };

        Ok(Self {
            pacer: RequestPacer::new(PacingWindow::from_config(&config.pacing)?),
            throttle: BatchThrottle::from_config(&config.throttle)?,
            counter: BatchCounter::new(),
            filter,
            failure_policy: failure::from_kind(config.failure_policy, localizer.clone()),
            reporter: Arc::new(ConsoleReporter::new(localizer)),
        })
    }

    /// Hooks from explicit parts, accepting everything and always continuing
    pub fn new(pacer: RequestPacer, throttle: BatchThrottle, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            pacer,
            throttle,
            counter: BatchCounter::new(),
            filter: Arc::new(AcceptAll),
            failure_policy: Arc::new(AlwaysContinue),
            reporter,
        }
    }

    /// Replace the item filter
    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn ItemFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Replace the failure policy
    #[must_use]
    pub fn with_failure_policy(mut self, policy: Arc<dyn FailurePolicy>) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Replace the reporter
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replace the pacer, e.g. with a seeded one
    #[must_use]
    pub fn with_pacer(mut self, pacer: RequestPacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// Jitter delay before a remote fetch
    pub async fn before_fetch(&self, cancel: &CancellationToken) -> Result<()> {
        self.pacer.wait(cancel).await
    }

    /// Whether a fetched item is kept; a panicking filter drops it
    pub fn keep(&self, item: &Item) -> bool {
        filter::evaluate(self.filter.as_ref(), item)
    }

    /// Whether the loop moves on after a unit failed
    ///
    /// The policy runs on the blocking pool, so a [`PromptOperator`] waiting
    /// on the terminal does not stall other tasks. A policy that panics stops
    /// the loop.
    ///
    /// [`PromptOperator`]: crate::failure::PromptOperator
    pub async fn continue_after_failure(&self) -> bool {
        let policy = Arc::clone(&self.failure_policy);
        let proceed = match tokio::task::spawn_blocking(move || policy.continue_after_failure()).await
        {
            Ok(proceed) => proceed,
            Err(e) => {
                tracing::warn!(error = %e, "Failure policy did not answer, stopping");
                false
            }
        };
        tracing::debug!(proceed, "Unit failed, consulted failure policy");
        proceed
    }

    /// Count a completed unit and cool down on batch boundaries
    ///
    /// Returns the number of units completed so far in this run.
    pub async fn unit_completed(&self, cancel: &CancellationToken) -> Result<u64> {
        self.counter
            .complete_unit(&self.throttle, self.reporter.as_ref(), cancel)
            .await
    }

    /// Units completed so far
    pub async fn completed_units(&self) -> u64 {
        self.counter.get().await
    }

    /// The batch throttle settings
    pub fn throttle(&self) -> &BatchThrottle {
        &self.throttle
    }

    /// The pacer
    pub fn pacer(&self) -> &RequestPacer {
        &self.pacer
    }
}
