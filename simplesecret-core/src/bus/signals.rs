//! Signal delivery with keyed, deadline-bounded waits
//!
//! The bus implementation publishes every service signal into a [`SignalHub`].
//! A caller that expects a signal takes a [`SignalCursor`] *before* issuing the
//! request that will cause it, then waits for the first matching signal
//! published after the cursor. Waiters wake as soon as a signal arrives
//! instead of sleeping a fixed interval.
//!
//! Matching signals are consumed. Unclaimed signals (for instance the
//! completion of a prompt whose waiter already timed out) stay in a bounded
//! history and are eventually discarded.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::ObjectPath;

/// Number of recent signals retained for late waiters
const HISTORY_LIMIT: usize = 64;

/// A signal emitted by the secret service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusSignal {
    /// `Service.CollectionCreated(collection)`
    CollectionCreated {
        /// Path of the new collection
        collection: ObjectPath,
    },
    /// `Collection.ItemCreated(item)`, emitted on the collection's path
    ItemCreated {
        /// Collection that emitted the signal
        collection: ObjectPath,
        /// Path of the new item
        item: ObjectPath,
    },
    /// `Prompt.Completed(dismissed, result)`, emitted on the prompt's path
    PromptCompleted {
        /// Prompt that completed
        prompt: ObjectPath,
        /// Whether the user dismissed the prompt
        dismissed: bool,
        /// Object paths carried in the result variant, if any
        result: Vec<ObjectPath>,
    },
}

/// Position in the signal stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SignalCursor(u64);

#[derive(Debug, Default)]
struct HubState {
    last_seq: u64,
    history: VecDeque<(u64, BusSignal)>,
}

/// Fan-in point for service signals
#[derive(Debug, Default)]
pub struct SignalHub {
    state: Mutex<HubState>,
    arrived: Condvar,
}

impl SignalHub {
    /// Creates an empty hub
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a signal and wakes all waiters
    pub fn publish(&self, signal: BusSignal) {
        let mut state = self.state.lock();
        state.last_seq += 1;
        let seq = state.last_seq;
        state.history.push_back((seq, signal));
        while state.history.len() > HISTORY_LIMIT {
            state.history.pop_front();
        }
        drop(state);
        self.arrived.notify_all();
    }

    /// Returns the current end of the stream
    ///
    /// Only signals published after this point are visible to a wait that
    /// starts from the returned cursor.
    #[must_use]
    pub fn cursor(&self) -> SignalCursor {
        SignalCursor(self.state.lock().last_seq)
    }

    /// Waits for the first signal after `since` accepted by `matches`
    ///
    /// Returns `None` if no such signal arrives within `timeout`. The matched
    /// signal is removed from the history.
    pub fn wait_for<F>(&self, since: SignalCursor, timeout: Duration, matches: F) -> Option<BusSignal>
    where
        F: FnMut(&BusSignal) -> bool,
    {
        self.wait_confirmed(since, timeout, matches, |_| true)
    }

    /// Like [`wait_for`](Self::wait_for), with a second check that runs
    /// without the hub lock held
    ///
    /// `matches` must be cheap; it runs under the lock and should only look
    /// at the signal itself. Candidates it accepts are handed to `confirm`,
    /// which may make remote calls. A rejected candidate stays in the
    /// history for other waiters and the wait goes on until the deadline.
    pub fn wait_confirmed<F, C>(
        &self,
        since: SignalCursor,
        timeout: Duration,
        mut matches: F,
        mut confirm: C,
    ) -> Option<BusSignal>
    where
        F: FnMut(&BusSignal) -> bool,
        C: FnMut(&BusSignal) -> bool,
    {
        let deadline = Instant::now().checked_add(timeout);
        let mut scanned = since.0;
        loop {
            let (seq, signal) = self.next_candidate(scanned, deadline, &mut matches)?;
            scanned = seq;
            if !confirm(&signal) {
                continue;
            }

            let mut state = self.state.lock();
            if let Some(index) = state.history.iter().position(|(s, _)| *s == seq) {
                state.history.remove(index);
                return Some(signal);
            }
            // Claimed by another waiter in the meantime
        }
    }

    /// First signal after `after` accepted by `matches`, left in the history
    fn next_candidate<F>(
        &self,
        after: u64,
        deadline: Option<Instant>,
        matches: &mut F,
    ) -> Option<(u64, BusSignal)>
    where
        F: FnMut(&BusSignal) -> bool,
    {
        let mut state = self.state.lock();
        loop {
            let found = state
                .history
                .iter()
                .find(|(seq, signal)| *seq > after && matches(signal));
            if let Some((seq, signal)) = found {
                return Some((*seq, signal.clone()));
            }

            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return None;
                    }
                    // Re-scan after a timeout too: a signal may have landed
                    // between the wakeup and re-acquiring the lock.
                    let _ = self.arrived.wait_until(&mut state, deadline);
                }
                None => self.arrived.wait(&mut state),
            }
        }
    }

    /// Number of signals currently retained
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().history.len()
    }
}
