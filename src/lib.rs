//! # douk-hooks
//!
//! Customization hooks for a bulk content downloader.
//!
//! ## What it governs
//!
//! - **Pacing** - a random jitter delay before every remote fetch
//! - **Batch throttling** - a long cool-down after every N accounts or collections
//! - **API access** - token checks for the downloader's API-server mode
//! - **Decision points** - which fetched items are kept, and whether a batch
//!   run continues after a unit fails
//!
//! Everything is configured by one immutable [`Config`] built at startup.
//!
//! ## Quick Start
//!
//! ```no_run
//! use douk_hooks::{Config, Hooks, cancel_on_signal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         throttle: douk_hooks::config::ThrottleConfig {
//!             batch_size: 20,
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     };
//!
//!     let hooks = Hooks::from_config(&config)?;
//!     let cancel = cancel_on_signal();
//!
//!     for account in ["account-1", "account-2"] {
//!         hooks.before_fetch(&cancel).await?;
//!         println!("fetching {account}");
//!         hooks.unit_completed(&cancel).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// API-mode token gate
pub mod access;
/// REST API boundary
pub mod api;
/// Run-mode selection and lifecycle
pub mod app;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Failure continuation policies
pub mod failure;
/// Item inclusion filters
pub mod filter;
/// Hook bundle for the batch loop
pub mod hooks;
/// Localized user-visible notices
pub mod notice;
/// Jitter delay between requests
pub mod pacing;
/// Cool-down between batches
pub mod throttle;

// Re-export commonly used types
pub use access::{AccessGate, CredentialConfiguration};
pub use app::{Application, RunMode, cancel_on_signal};
pub use config::Config;
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use failure::{AlwaysContinue, FailurePolicy, PromptOperator, StopOnFailure};
pub use filter::{AcceptAll, Item, ItemFilter, RuleFilter};
pub use hooks::Hooks;
pub use notice::{Locale, Localizer, MessageKey, Reporter};
pub use pacing::{PacingWindow, RequestPacer};
pub use throttle::{BatchCounter, BatchThrottle};
