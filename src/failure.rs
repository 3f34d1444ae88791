//! What to do after a unit fails to fetch
//!
//! In the account and collection batch modes, a failed unit asks the
//! [`FailurePolicy`] whether the loop moves on to the next unit. The default
//! keeps going.

use crate::config::FailurePolicyKind;
use crate::notice::{Localizer, MessageKey};
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::{Arc, Mutex};

/// Decides whether the batch loop continues after a failed unit
pub trait FailurePolicy: Send + Sync {
    /// `true` moves on to the next unit, `false` stops the loop
    fn continue_after_failure(&self) -> bool;
}

/// Always continues
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysContinue;

impl FailurePolicy for AlwaysContinue {
    fn continue_after_failure(&self) -> bool {
        true
    }
}

/// Always stops
#[derive(Debug, Clone, Copy, Default)]
pub struct StopOnFailure;

impl FailurePolicy for StopOnFailure {
    fn continue_after_failure(&self) -> bool {
        false
    }
}

/// Asks the operator
///
/// Writes a localized prompt and reads one line. Any input continues; a bare
/// Enter stops. End of input or a read error also stops.
///
/// This blocks on the reader, so it is never the default. [`Hooks`] runs it on
/// tokio's blocking pool; call it through `spawn_blocking` when using it
/// directly from async code.
///
/// [`Hooks`]: crate::hooks::Hooks
pub struct PromptOperator<R, W> {
    io: Mutex<(R, W)>,
    localizer: Arc<dyn Localizer>,
}

impl<R, W> PromptOperator<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    /// Prompt on `output`, answer from `input`
    pub fn new(input: R, output: W, localizer: Arc<dyn Localizer>) -> Self {
        Self {
            io: Mutex::new((input, output)),
            localizer,
        }
    }

    fn ask(&self) -> io::Result<bool> {
        let mut guard = self.io.lock().unwrap_or_else(|e| e.into_inner());
        let (input, output) = &mut *guard;

        output.write_all(self.localizer.template(MessageKey::FailurePrompt).as_bytes())?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(!line.trim_end_matches(['\r', '\n']).is_empty())
    }
}

impl PromptOperator<BufReader<Stdin>, Stdout> {
    /// Prompt on the terminal
    pub fn stdio(localizer: Arc<dyn Localizer>) -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout(), localizer)
    }
}

impl<R, W> FailurePolicy for PromptOperator<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn continue_after_failure(&self) -> bool {
        match self.ask() {
            Ok(proceed) => proceed,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read operator answer, stopping");
                false
            }
        }
    }
}

/// Policy for `kind`
pub fn from_kind(kind: FailurePolicyKind, localizer: Arc<dyn Localizer>) -> Arc<dyn FailurePolicy> {
    match kind {
        FailurePolicyKind::Continue => Arc::new(AlwaysContinue),
        FailurePolicyKind::Stop => Arc::new(StopOnFailure),
        FailurePolicyKind::Prompt => Arc::new(PromptOperator::stdio(localizer)),
    }
}
