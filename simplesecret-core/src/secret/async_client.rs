//! Non-blocking access to a [`SimpleCollection`]
//!
//! Facade calls block while the service waits for the user. This module runs
//! them on the tokio blocking pool, one at a time, with optional cancellation
//! and timeouts. Cancelling or timing out only stops waiting for the result;
//! the call itself runs to completion in the background.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use secrecy::SecretString;
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

use super::simple::SimpleCollection;
use crate::bus::Attributes;
use crate::error::{SecretError, SecretResult};

/// Token for abandoning pending operations
///
/// Clones share state: cancelling one cancels all of them.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new cancellation token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels all operations using this token
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Checks if the token has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resets the cancellation state
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    async fn cancelled(&self) {
        while !self.is_cancelled() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Result of an operation that may be cancelled or time out
#[derive(Debug)]
pub enum AsyncResult<T> {
    /// The operation finished
    Success(T),
    /// The caller stopped waiting
    Cancelled,
    /// The operation failed
    Error(SecretError),
    /// The operation did not finish in time
    Timeout,
}

impl<T> AsyncResult<T> {
    /// Returns true if the operation finished
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true if the caller stopped waiting
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true if the operation failed
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns true if the operation timed out
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// The value, if the operation finished
    pub fn into_success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    fn from_result(result: SecretResult<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) => Self::Error(e),
        }
    }
}

/// A [`SimpleCollection`] usable from async code and shareable across tasks
///
/// Operations are serialised by an internal mutex.
#[derive(Clone)]
pub struct AsyncSimpleCollection {
    inner: Arc<Mutex<SimpleCollection>>,
}

impl AsyncSimpleCollection {
    /// Wraps a facade
    #[must_use]
    pub fn new(collection: SimpleCollection) -> Self {
        Self {
            inner: Arc::new(Mutex::new(collection)),
        }
    }

    /// Runs `op` on the blocking pool with exclusive access to the facade
    ///
    /// # Errors
    /// Returns the error of `op`, or `SecretError::ServiceUnavailable` if the
    /// background task panicked.
    pub async fn run<F, T>(&self, op: F) -> SecretResult<T>
    where
        F: FnOnce(&mut SimpleCollection) -> SecretResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut collection = inner.lock();
            op(&mut collection)
        })
        .await
        .map_err(|e| SecretError::ServiceUnavailable(format!("Background task failed: {e}")))?
    }

    /// Runs `op`, giving up when `cancel_token` is cancelled
    #[instrument(skip(self, op, cancel_token), fields(cancellable = true))]
    pub async fn run_with_cancellation<F, T>(
        &self,
        op: F,
        cancel_token: &CancellationToken,
    ) -> AsyncResult<T>
    where
        F: FnOnce(&mut SimpleCollection) -> SecretResult<T> + Send + 'static,
        T: Send + 'static,
    {
        if cancel_token.is_cancelled() {
            return AsyncResult::Cancelled;
        }

        tokio::select! {
            result = self.run(op) => {
                if cancel_token.is_cancelled() {
                    return AsyncResult::Cancelled;
                }
                AsyncResult::from_result(result)
            }
            () = cancel_token.cancelled() => {
                debug!("Stopped waiting for a cancelled operation");
                AsyncResult::Cancelled
            }
        }
    }

    /// Runs `op`, giving up after `timeout`
    #[allow(clippy::cast_possible_truncation)] // timeout.as_millis() won't exceed u64::MAX
    #[instrument(skip(self, op), fields(timeout_ms = timeout.as_millis() as u64))]
    pub async fn run_with_timeout<F, T>(&self, op: F, timeout: Duration) -> AsyncResult<T>
    where
        F: FnOnce(&mut SimpleCollection) -> SecretResult<T> + Send + 'static,
        T: Send + 'static,
    {
        match tokio::time::timeout(timeout, self.run(op)).await {
            Ok(result) => AsyncResult::from_result(result),
            Err(_) => {
                warn!("Secret service operation timed out");
                AsyncResult::Timeout
            }
        }
    }

    /// Creates an item
    ///
    /// # Errors
    /// See [`SimpleCollection::create_item`].
    pub async fn create_item(
        &self,
        label: String,
        password: SecretString,
        attributes: Option<Attributes>,
    ) -> SecretResult<Option<String>> {
        use secrecy::ExposeSecret;

        self.run(move |c| c.create_item(&label, password.expose_secret(), attributes.as_ref()))
            .await
    }

    /// Password stored in an item
    ///
    /// # Errors
    /// See [`SimpleCollection::get_secret`].
    pub async fn get_secret(&self, path: String) -> SecretResult<Option<SecretString>> {
        self.run(move |c| c.get_secret(&path)).await
    }

    /// Passwords of every item
    ///
    /// # Errors
    /// See [`SimpleCollection::get_secrets`].
    pub async fn get_secrets(&self) -> SecretResult<HashMap<String, SecretString>> {
        self.run(SimpleCollection::get_secrets).await
    }

    /// Items matching all of `attributes`
    ///
    /// # Errors
    /// See [`SimpleCollection::get_items`].
    pub async fn get_items(&self, attributes: Attributes) -> SecretResult<Option<Vec<String>>> {
        self.run(move |c| c.get_items(&attributes)).await
    }

    /// Deletes an item
    ///
    /// # Errors
    /// See [`SimpleCollection::delete_item`].
    pub async fn delete_item(&self, path: String) -> SecretResult<bool> {
        self.run(move |c| c.delete_item(&path)).await
    }

    /// Locks the collection
    ///
    /// # Errors
    /// See [`SimpleCollection::lock`].
    pub async fn lock(&self) -> SecretResult<()> {
        self.run(SimpleCollection::lock).await
    }

    /// Asks the user to unlock the collection
    ///
    /// # Errors
    /// See [`SimpleCollection::unlock_with_user_permission`].
    pub async fn unlock_with_user_permission(&self) -> SecretResult<()> {
        self.run(SimpleCollection::unlock_with_user_permission)
            .await
    }

    /// Closes the underlying facade once no operation is running
    pub async fn close(&self) {
        let _ = self
            .run(|c| {
                c.close();
                Ok(())
            })
            .await;
    }
}

impl std::fmt::Debug for AsyncSimpleCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSimpleCollection").finish_non_exhaustive()
    }
}

/// Handle for an operation running in the background
pub struct PendingOperation<T> {
    receiver: oneshot::Receiver<AsyncResult<T>>,
    cancel_token: CancellationToken,
}

impl<T> PendingOperation<T> {
    /// Stops waiting for the operation
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Checks if the operation has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Awaits the result, `Cancelled` if the background task went away
    pub async fn await_result(self) -> AsyncResult<T> {
        self.receiver.await.unwrap_or(AsyncResult::Cancelled)
    }

    /// The cancellation token of this operation
    #[must_use]
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }
}

/// Spawns `op` on the runtime and returns a handle to its result
///
/// Must be called from within a tokio runtime.
pub fn spawn_operation<F, T>(
    collection: AsyncSimpleCollection,
    op: F,
    timeout: Option<Duration>,
) -> PendingOperation<T>
where
    F: FnOnce(&mut SimpleCollection) -> SecretResult<T> + Send + 'static,
    T: Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        let result = match timeout {
            Some(timeout) => {
                tokio::select! {
                    result = collection.run_with_timeout(op, timeout) => result,
                    () = token.cancelled() => AsyncResult::Cancelled,
                }
            }
            None => collection.run_with_cancellation(op, &token).await,
        };
        // The receiver may have been dropped
        let _ = sender.send(result);
    });

    PendingOperation {
        receiver,
        cancel_token,
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;
    use crate::bus::BusContext;
    use crate::config::ClientSettings;
    use crate::testing::{MockSecretService, PromptResponse};

    fn collection(mock: &Arc<MockSecretService>) -> AsyncSimpleCollection {
        let context = BusContext::new(mock.clone());
        AsyncSimpleCollection::new(
            SimpleCollection::default_collection(&context, &ClientSettings::default()).unwrap(),
        )
    }

    #[test]
    fn test_cancellation_token() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());

        clone.cancel();
        assert!(token.is_cancelled());

        token.reset();
        assert!(!clone.is_cancelled());
    }

    #[test]
    fn test_async_result_predicates() {
        assert!(AsyncResult::Success(1).is_success());
        assert!(AsyncResult::<()>::Cancelled.is_cancelled());
        assert!(AsyncResult::<()>::Timeout.is_timeout());
        assert!(AsyncResult::<()>::Error(SecretError::NotFound("x".into())).is_error());
        assert_eq!(AsyncResult::Success(2).into_success(), Some(2));
    }

    #[tokio::test]
    async fn test_store_and_read_back() {
        let mock = Arc::new(MockSecretService::new());
        let collection = collection(&mock);

        let path = collection
            .create_item("label".into(), SecretString::from("pw"), None)
            .await
            .unwrap()
            .unwrap();
        let secret = collection.get_secret(path).await.unwrap().unwrap();
        assert_eq!(secret.expose_secret(), "pw");
    }

    #[tokio::test]
    async fn test_pre_cancelled_token() {
        let mock = Arc::new(MockSecretService::new());
        let collection = collection(&mock);
        let token = CancellationToken::new();
        token.cancel();

        let result = collection
            .run_with_cancellation(|c| c.items(), &token)
            .await;
        assert!(result.is_cancelled());
    }

    #[tokio::test]
    async fn test_unanswered_prompt_times_out() {
        let mock = Arc::new(MockSecretService::new());
        mock.set_prompt_response(PromptResponse::Ignore);
        let collection = collection(&mock);
        collection
            .run(|c| {
                c.set_timeout(Duration::from_millis(200));
                Ok(())
            })
            .await
            .unwrap();

        let result = collection
            .run_with_timeout(SimpleCollection::get_secrets, Duration::from_millis(20))
            .await;
        assert!(result.is_timeout());
    }

    #[tokio::test]
    async fn test_spawned_operation() {
        let mock = Arc::new(MockSecretService::new());
        let collection = collection(&mock);

        let pending = spawn_operation(collection, |c| c.items(), None);
        let items = pending.await_result().await.into_success().unwrap();
        assert!(items.is_empty());
    }
}
