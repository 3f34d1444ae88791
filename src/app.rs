//! Run-mode selection and process lifecycle
//!
//! The process takes an optional first positional argument: `api` starts the
//! API server mode, anything else (or nothing) starts the interactive mode.
//! What each mode does belongs to the host [`Application`]; this module only
//! selects the mode, wires up shutdown signals and treats cancellation as a
//! normal exit.

use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Which entry point the process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Interactive terminal menu
    #[default]
    Interactive,
    /// HTTP API server
    Api,
}

impl RunMode {
    /// Mode for the first positional argument
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            Some("api") => RunMode::Api,
            _ => RunMode::Interactive,
        }
    }
}

/// The host application's two entry points
#[async_trait]
pub trait Application: Send + Sync {
    /// Run the interactive mode until done or cancelled
    async fn run_interactive(&self, cancel: CancellationToken) -> Result<()>;

    /// Run the API server mode until cancelled
    async fn run_api(&self, cancel: CancellationToken) -> Result<()>;
}

/// Run `app` in `mode`
///
/// Returns `Ok(())` when the run finishes or is cancelled, whether the
/// cancellation surfaces as [`Error::Cancelled`] or as `cancel` firing while
/// the app is still running.
pub async fn run(mode: RunMode, app: &dyn Application, cancel: CancellationToken) -> Result<()> {
    tracing::info!(?mode, "Starting");

    let work = async {
        match mode {
            RunMode::Api => app.run_api(cancel.clone()).await,
            RunMode::Interactive => app.run_interactive(cancel.clone()).await,
        }
    };

    let result = tokio::select! {
        result = work => result,
        _ = cancel.cancelled() => Err(Error::Cancelled),
    };

    match result {
        Err(Error::Cancelled) => {
            tracing::info!("Run cancelled, exiting");
            Ok(())
        }
        other => other,
    }
}

/// Token cancelled on the first termination signal
///
/// Spawns a task listening for SIGTERM/SIGINT on Unix and Ctrl+C elsewhere.
pub fn cancel_on_signal() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.cancel();
    });
    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedApp {
        calls: Mutex<Vec<RunMode>>,
        outcome: Option<fn() -> Result<()>>,
        block: bool,
    }

    impl ScriptedApp {
        async fn act(&self, mode: RunMode) -> Result<()> {
            self.calls.lock().unwrap().push(mode);
            if self.block {
                std::future::pending::<()>().await;
            }
            self.outcome.map_or(Ok(()), |f| f())
        }
    }

    #[async_trait]
    impl Application for ScriptedApp {
        async fn run_interactive(&self, _cancel: CancellationToken) -> Result<()> {
            self.act(RunMode::Interactive).await
        }

        async fn run_api(&self, _cancel: CancellationToken) -> Result<()> {
            self.act(RunMode::Api).await
        }
    }

    #[test]
    fn mode_selection() {
        assert_eq!(RunMode::from_arg(Some("api")), RunMode::Api);
        assert_eq!(RunMode::from_arg(None), RunMode::Interactive);
        assert_eq!(RunMode::from_arg(Some("API")), RunMode::Interactive);
        assert_eq!(RunMode::from_arg(Some("menu")), RunMode::Interactive);
        assert_eq!(RunMode::from_arg(Some("")), RunMode::Interactive);
    }

    #[tokio::test]
    async fn dispatches_to_selected_mode() {
        let app = ScriptedApp::default();
        run(RunMode::Api, &app, CancellationToken::new()).await.unwrap();
        run(RunMode::Interactive, &app, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            *app.calls.lock().unwrap(),
            vec![RunMode::Api, RunMode::Interactive]
        );
    }

    #[tokio::test]
    async fn cancelled_outcome_is_clean_exit() {
        let app = ScriptedApp {
            outcome: Some(|| Err(Error::Cancelled)),
            ..Default::default()
        };
        assert!(run(RunMode::Interactive, &app, CancellationToken::new()).await.is_ok());
    }

    #[tokio::test]
    async fn other_errors_propagate() {
        let app = ScriptedApp {
            outcome: Some(|| Err(Error::ApiServerError("boom".into()))),
            ..Default::default()
        };
        let result = run(RunMode::Api, &app, CancellationToken::new()).await;
        assert!(matches!(result, Err(Error::ApiServerError(_))));
    }

    #[tokio::test]
    async fn cancel_token_ends_a_blocked_run() {
        let app = ScriptedApp {
            block: true,
            ..Default::default()
        };
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run(RunMode::Interactive, &app, cancel),
        )
        .await
        .expect("run must end once cancelled");
        assert!(result.is_ok());
    }
}
