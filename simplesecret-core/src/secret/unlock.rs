//! Lock state handling and user consent
//!
//! A collection unlocked through a master password never involves the user.
//! Every other unlock goes through a prompt, and the first successful one
//! records the user's consent for the lifetime of the owning facade.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use super::collection::is_default_collection;
use super::prompt::{PromptCoordinator, PromptOutcome};
use super::transport::Secret;
use crate::bus::{ObjectPath, SecretServiceBus};
use crate::error::{SecretError, SecretResult};
use crate::trace_operation;
use crate::tracing::span_names;

/// Interval between lock state checks while waiting for it to settle
const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lock state of the managed collection, as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    /// The collection is locked
    #[default]
    Locked,
    /// An unlock is in progress
    Unlocking,
    /// The collection is unlocked
    Unlocked,
}

/// How a locked collection gets unlocked
#[derive(Debug)]
pub enum UnlockMethod {
    /// Silently, with the collection's master password (encrypted for the session)
    MasterPassword(Secret),
    /// Through a user prompt
    Interactive,
}

/// Records whether the user has unlocked interactively at least once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsentFlag(bool);

impl ConsentFlag {
    /// Records consent
    pub fn grant(&mut self) {
        self.0 = true;
    }

    /// Forgets consent
    pub fn revoke(&mut self) {
        self.0 = false;
    }

    /// Whether consent was given since the last revoke
    #[must_use]
    pub const fn is_granted(self) -> bool {
        self.0
    }
}

/// Unlocks and locks one collection
pub struct UnlockStateMachine {
    bus: Arc<dyn SecretServiceBus>,
    prompts: PromptCoordinator,
    collection: ObjectPath,
    method: UnlockMethod,
    state: LockState,
    consent: ConsentFlag,
    settle_delay: Duration,
}

impl UnlockStateMachine {
    /// Creates a state machine for `collection`
    pub fn new(
        bus: Arc<dyn SecretServiceBus>,
        prompts: PromptCoordinator,
        collection: ObjectPath,
        method: UnlockMethod,
        settle_delay: Duration,
    ) -> Self {
        Self {
            bus,
            prompts,
            collection,
            method,
            state: LockState::Locked,
            consent: ConsentFlag::default(),
            settle_delay,
        }
    }

    /// Last observed lock state
    #[must_use]
    pub const fn state(&self) -> LockState {
        self.state
    }

    /// Consent recorded so far
    #[must_use]
    pub const fn consent(&self) -> ConsentFlag {
        self.consent
    }

    /// The managed collection
    #[must_use]
    pub const fn collection(&self) -> &ObjectPath {
        &self.collection
    }

    /// Whether the managed collection is one of the service's default ones
    #[must_use]
    pub fn is_default(&self) -> bool {
        is_default_collection(&self.collection)
    }

    /// Whether the master password path applies to this collection
    #[must_use]
    pub fn uses_master_password(&self) -> bool {
        matches!(self.method, UnlockMethod::MasterPassword(_)) && !self.is_default()
    }

    /// Reads the current lock state from the service
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if the state cannot be read.
    pub fn refresh(&mut self) -> SecretResult<LockState> {
        self.state = if self.bus.is_locked(&self.collection)? {
            LockState::Locked
        } else {
            LockState::Unlocked
        };
        Ok(self.state)
    }

    /// Unlocks the collection if it is locked
    ///
    /// Returns whether the collection is unlocked afterwards. A dismissed
    /// prompt leaves it locked and is not an error.
    ///
    /// # Errors
    /// Returns `SecretError::PromptTimeout` if the unlock prompt is not
    /// answered, or `SecretError::Bus` if a remote call fails.
    pub fn ensure_unlocked(&mut self, timeout: Duration) -> SecretResult<bool> {
        if self.refresh()? == LockState::Unlocked {
            return Ok(true);
        }

        self.state = LockState::Unlocking;
        let interactive = !self.uses_master_password();
        if let Err(e) = self.unlock_remote(interactive, timeout) {
            self.state = LockState::Locked;
            return Err(e);
        }

        let unlocked = self.refresh()? == LockState::Unlocked;
        if unlocked && interactive {
            self.consent.grant();
        }
        Ok(unlocked)
    }

    fn unlock_remote(&self, interactive: bool, timeout: Duration) -> SecretResult<()> {
        if let (false, UnlockMethod::MasterPassword(master)) = (interactive, &self.method) {
            debug!(collection = %self.collection, "Unlocking with master password");
            self.bus
                .unlock_with_master_password(&self.collection, master)?;
            return Ok(());
        }

        debug!(collection = %self.collection, "Requesting interactive unlock");
        let (_, prompt) = self.bus.unlock(std::slice::from_ref(&self.collection))?;
        if self.prompts.await_prompt(&prompt, timeout)? == PromptOutcome::Dismissed {
            info!(collection = %self.collection, "Unlock prompt was dismissed");
        }
        Ok(())
    }

    /// Locks the collection if it is unlocked
    ///
    /// Waits up to the settle delay for the service to report the new state.
    /// Locking a default collection forgets the recorded consent.
    ///
    /// # Errors
    /// Returns `SecretError::Bus` if a remote call fails.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub fn lock(&mut self, timeout: Duration) -> SecretResult<()> {
        if self.refresh()? == LockState::Locked {
            return Ok(());
        }

        let (_, prompt) = self.bus.lock(std::slice::from_ref(&self.collection))?;
        self.prompts.await_prompt(&prompt, timeout)?;
        self.wait_for_lock_to_settle()?;

        if self.is_default() {
            self.consent.revoke();
        }
        debug!(state = ?self.state, "Lock requested");
        Ok(())
    }

    fn wait_for_lock_to_settle(&mut self) -> SecretResult<()> {
        // None when the delay is too large to represent: poll without a deadline
        let deadline = Instant::now().checked_add(self.settle_delay);
        while self.refresh()? != LockState::Locked {
            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        warn!("Collection still reports unlocked after the settle delay");
                        break;
                    }
                    SETTLE_POLL_INTERVAL.min(deadline - now)
                }
                None => SETTLE_POLL_INTERVAL,
            };
            std::thread::sleep(pause);
        }
        Ok(())
    }

    /// Makes sure the user explicitly allowed access to the collection
    ///
    /// The first call for a default collection locks it and asks the user to
    /// unlock it again; later calls reuse the recorded consent while the
    /// collection stays unlocked.
    ///
    /// # Errors
    /// Returns `SecretError::AccessDenied` if the collection is still locked
    /// afterwards, or any error from [`lock`](Self::lock) and
    /// [`ensure_unlocked`](Self::ensure_unlocked).
    pub fn unlock_with_user_permission(&mut self, timeout: Duration) -> SecretResult<()> {
        let span = trace_operation!(span_names::UNLOCK, collection = %self.collection);
        let _guard = span.enter();

        if !self.consent.is_granted() && self.is_default() {
            self.lock(timeout)?;
        }

        if self.ensure_unlocked(timeout)? {
            Ok(())
        } else {
            Err(SecretError::AccessDenied(
                "The collection was not unlocked with user permission".to_string(),
            ))
        }
    }

    /// Wipes the stored master password
    ///
    /// Silent unlocks are no longer possible afterwards.
    pub fn clear(&mut self) {
        if let UnlockMethod::MasterPassword(master) = &mut self.method {
            master.clear();
        }
        self.method = UnlockMethod::Interactive;
    }
}

impl std::fmt::Debug for UnlockStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnlockStateMachine")
            .field("collection", &self.collection)
            .field("state", &self.state)
            .field("consent", &self.consent)
            .field("master_password", &self.uses_master_password())
            .finish_non_exhaustive()
    }
}
