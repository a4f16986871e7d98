//! Prompt resolution
//!
//! Service calls that need the user's involvement return a prompt path
//! instead of a result. [`PromptCoordinator`] shows the prompt and blocks
//! until the matching `Completed` signal arrives or the timeout elapses.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::bus::{BusSignal, ObjectPath, SecretServiceBus};
use crate::error::{SecretError, SecretResult};
use crate::trace_operation;
use crate::tracing::span_names;

/// How a prompt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The user completed the prompt; carries the object paths of the result
    Completed(Vec<ObjectPath>),
    /// The user declined
    Dismissed,
}

impl PromptOutcome {
    /// Returns true if the user declined
    #[must_use]
    pub const fn is_dismissed(&self) -> bool {
        matches!(self, Self::Dismissed)
    }
}

/// Result of a service call that may need a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The call finished; carries its result path (root when there is none)
    Immediate(ObjectPath),
    /// The call waits for the given prompt
    Pending(ObjectPath),
}

impl OperationOutcome {
    /// Classifies a `(result, prompt)` reply
    ///
    /// A non-root prompt always wins: the result is not valid until the
    /// prompt completes.
    #[must_use]
    pub fn from_reply(result: ObjectPath, prompt: ObjectPath) -> Self {
        if prompt.is_root() {
            Self::Immediate(result)
        } else {
            Self::Pending(prompt)
        }
    }

    /// Classifies a reply that only carries a prompt (`Delete`)
    #[must_use]
    pub fn from_prompt(prompt: ObjectPath) -> Self {
        Self::from_reply(ObjectPath::root(), prompt)
    }
}

/// An operation outcome after any prompt was answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The operation finished and reported this object
    Path(ObjectPath),
    /// The operation finished without reporting an object
    NoPath,
    /// The user dismissed the prompt; nothing was done
    Dismissed,
}

impl Resolution {
    /// The reported object, if any
    #[must_use]
    pub fn path(self) -> Option<ObjectPath> {
        match self {
            Self::Path(path) => Some(path),
            Self::NoPath | Self::Dismissed => None,
        }
    }

    /// Returns true if the user dismissed the prompt
    #[must_use]
    pub const fn is_dismissed(&self) -> bool {
        matches!(self, Self::Dismissed)
    }
}

/// Shows prompts and waits for their completion
#[derive(Clone)]
pub struct PromptCoordinator {
    bus: Arc<dyn SecretServiceBus>,
    window_id: String,
}

impl PromptCoordinator {
    /// Creates a coordinator that parents prompts to `window_id`
    pub fn new(bus: Arc<dyn SecretServiceBus>, window_id: impl Into<String>) -> Self {
        Self {
            bus,
            window_id: window_id.into(),
        }
    }

    /// Shows `prompt` and waits for it to complete
    ///
    /// The root path means no prompt is needed and completes immediately.
    /// A completion that arrives after the timeout is left unclaimed.
    ///
    /// # Errors
    /// Returns `SecretError::PromptTimeout` if the prompt is not answered in
    /// time, or `SecretError::Bus` if it cannot be shown.
    pub fn await_prompt(&self, prompt: &ObjectPath, timeout: Duration) -> SecretResult<PromptOutcome> {
        if prompt.is_root() {
            return Ok(PromptOutcome::Completed(Vec::new()));
        }

        let span = trace_operation!(span_names::PROMPT_AWAIT, prompt = %prompt);
        let _guard = span.enter();

        let hub = self.bus.signals();
        let cursor = hub.cursor();
        self.bus.prompt(prompt, &self.window_id)?;

        let signal = hub.wait_for(cursor, timeout, |signal| {
            matches!(signal, BusSignal::PromptCompleted { prompt: p, .. } if p == prompt)
        });

        match signal {
            Some(BusSignal::PromptCompleted { dismissed: true, .. }) => {
                debug!("Prompt dismissed");
                Ok(PromptOutcome::Dismissed)
            }
            Some(BusSignal::PromptCompleted { result, .. }) => {
                debug!(results = result.len(), "Prompt completed");
                Ok(PromptOutcome::Completed(result))
            }
            _ => {
                warn!(timeout = ?timeout, "Prompt was not answered in time");
                Err(SecretError::PromptTimeout {
                    prompt: prompt.to_string(),
                    timeout,
                })
            }
        }
    }

    /// Turns an operation outcome into its final resolution
    ///
    /// # Errors
    /// Propagates errors from [`await_prompt`](Self::await_prompt).
    pub fn resolve(&self, outcome: OperationOutcome, timeout: Duration) -> SecretResult<Resolution> {
        match outcome {
            OperationOutcome::Immediate(path) if path.is_root() => Ok(Resolution::NoPath),
            OperationOutcome::Immediate(path) => Ok(Resolution::Path(path)),
            OperationOutcome::Pending(prompt) => match self.await_prompt(&prompt, timeout)? {
                PromptOutcome::Dismissed => Ok(Resolution::Dismissed),
                PromptOutcome::Completed(result) => Ok(result
                    .into_iter()
                    .find(|path| !path.is_root())
                    .map_or(Resolution::NoPath, Resolution::Path)),
            },
        }
    }

    /// Parent window id passed to the service
    #[must_use]
    pub fn window_id(&self) -> &str {
        &self.window_id
    }
}

impl std::fmt::Debug for PromptCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptCoordinator")
            .field("window_id", &self.window_id)
            .finish_non_exhaustive()
    }
}
