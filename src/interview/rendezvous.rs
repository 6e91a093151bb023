//! # Audio/Video Rendezvous
//!
//! Each interview runs over two independent WebSocket connections: audio
//! (the live conversation) and video (the recording upload). Downstream
//! analysis needs both sides finished, so the video channel waits on a
//! per-candidate rendezvous signal that the audio channel sets when its
//! session finalizes.
//!
//! ## Protocol:
//! 1. The audio channel registers a signal when its session is accepted
//! 2. The audio channel fires the signal during finalization, whatever the
//!    reason the session ended
//! 3. The video channel waits on the signal with a timeout, then removes
//!    the entry so a later interview for the same candidate starts clean
//!
//! Ordering between the two connections is not guaranteed: the video upload
//! can finish before the audio session has even connected, so a waiter
//! arriving first creates the entry itself and parks on it until the audio
//! channel fires it or the timeout passes. Firing a signal that was never
//! registered (or was already removed) is a no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

/// Outcome of waiting on a rendezvous signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The audio channel finalized before the deadline
    Signalled,
    /// The deadline passed without the audio channel finalizing
    TimedOut,
}

#[derive(Debug, Default)]
struct RendezvousSignal {
    notify: Notify,
    set: AtomicBool,
}

impl RendezvousSignal {
    fn fire(&self) {
        self.set.store(true, Ordering::SeqCst);
        // notify_one stores a permit, so a waiter arriving after the fire
        // still observes it
        self.notify.notify_one();
    }

    async fn wait(&self) {
        if self.set.load(Ordering::SeqCst) {
            return;
        }
        self.notify.notified().await;
    }
}

/// Registry of per-candidate rendezvous signals.
#[derive(Debug, Default)]
pub struct RendezvousRegistry {
    signals: Mutex<HashMap<i64, Arc<RendezvousSignal>>>,
}

impl RendezvousRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a signal for a candidate's session.
    ///
    /// An unfired entry is kept as-is: the video channel may already be
    /// parked on it. An already-fired entry is stale residue from an earlier
    /// session and is replaced with a fresh one.
    pub fn register(&self, candidate_id: i64) {
        let mut signals = self.signals.lock().unwrap();
        match signals.get(&candidate_id) {
            Some(signal) if !signal.set.load(Ordering::SeqCst) => {}
            _ => {
                signals.insert(candidate_id, Arc::new(RendezvousSignal::default()));
            }
        }
        debug!("Registered rendezvous signal for candidate {}", candidate_id);
    }

    /// Fire the signal for a candidate. No-op if none is registered.
    pub fn signal(&self, candidate_id: i64) {
        let signal = {
            let signals = self.signals.lock().unwrap();
            signals.get(&candidate_id).cloned()
        };
        match signal {
            Some(signal) => {
                signal.fire();
                debug!("Fired rendezvous signal for candidate {}", candidate_id);
            }
            None => {
                debug!(
                    "No rendezvous signal registered for candidate {}, ignoring",
                    candidate_id
                );
            }
        }
    }

    /// Remove a candidate's signal without waiting. Used when session setup
    /// fails after registration, so the entry does not linger.
    pub fn remove(&self, candidate_id: i64) {
        let mut signals = self.signals.lock().unwrap();
        signals.remove(&candidate_id);
    }

    /// Wait for a candidate's signal, bounded by `timeout`. A waiter that
    /// arrives before the audio channel has registered creates the entry
    /// itself. The entry is removed once the wait resolves, whatever the
    /// outcome.
    pub async fn wait(&self, candidate_id: i64, timeout: Duration) -> WaitOutcome {
        let signal = {
            let mut signals = self.signals.lock().unwrap();
            signals.entry(candidate_id).or_default().clone()
        };

        let outcome = match tokio::time::timeout(timeout, signal.wait()).await {
            Ok(()) => WaitOutcome::Signalled,
            Err(_) => WaitOutcome::TimedOut,
        };
        self.remove(candidate_id);
        outcome
    }

    /// Number of sessions whose video channel has not yet consumed its
    /// signal. Surfaced through the health endpoint.
    pub fn pending(&self) -> usize {
        self.signals.lock().unwrap().len()
    }

    #[cfg(test)]
    fn contains(&self, candidate_id: i64) -> bool {
        self.signals.lock().unwrap().contains_key(&candidate_id)
    }
}
