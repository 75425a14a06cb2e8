//! Rendezvous between the sender awaiting an acknowledgment and the receive
//! loop reporting it.
//!
//! Only a single frame can be outstanding, so the tracker holds at most one
//! waiter. Outcomes for any other sequence number are stale and dropped.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::channel::oneshot;

use crate::hdlc::SeqNo;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Acked,
    Nacked,
    TimedOut,
}


struct Waiter {
    id: u64,
    seq: SeqNo,
    sender: oneshot::Sender<Outcome>,
}

#[derive(Default)]
struct Slot {
    waiter: Option<Waiter>,
    next_id: u64,
}


#[derive(Default)]
pub struct AckTracker {
    slot: Mutex<Slot>,
}

impl AckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in the outcome for `seq`.
    ///
    /// Must be called before the frame is written so that an early
    /// acknowledgment cannot slip past. Replaces any previous waiter.
    pub fn expect(&self, seq: SeqNo) -> Pending<'_> {
        let (sender, receiver) = oneshot::channel();

        let mut slot = self.lock();
        let id = slot.next_id;
        slot.next_id = slot.next_id.wrapping_add(1);

        if let Some(old) = slot.waiter.replace(Waiter { id, seq, sender }) {
            tracing::trace!("replacing waiter for frame {}", old.seq);
        }

        Pending { tracker: self, id, seq, receiver }
    }

    /// Report the outcome for `seq`. Returns `false` if nobody awaits it.
    pub fn resolve(&self, seq: SeqNo, outcome: Outcome) -> bool {
        let mut slot = self.lock();

        match slot.waiter.take() {
            Some(waiter) if waiter.seq == seq => {
                // the sender may have given up in the meantime
                let _ = waiter.sender.send(outcome);
                true
            },
            other => {
                slot.waiter = other;
                false
            },
        }
    }

    pub fn clear(&self) {
        self.lock().waiter = None;
    }

    pub fn is_pending(&self) -> bool {
        self.lock().waiter.is_some()
    }

    fn remove(&self, id: u64) {
        let mut slot = self.lock();

        if slot.waiter.as_ref().is_some_and(|w| w.id == id) {
            slot.waiter = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}


/// Registered interest in one acknowledgment. Unregisters itself on drop.
pub struct Pending<'a> {
    tracker: &'a AckTracker,
    id: u64,
    seq: SeqNo,
    receiver: oneshot::Receiver<Outcome>,
}

impl Pending<'_> {
    pub async fn wait(mut self, timeout: Duration) -> Outcome {
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(oneshot::Canceled)) => Outcome::TimedOut,
            Err(_) => {
                tracing::trace!("no outcome for frame {} within {:?}", self.seq, timeout);
                self.tracker.remove(self.id);

                // the receive loop may have resolved us just after the deadline
                match self.receiver.try_recv() {
                    Ok(Some(outcome)) => outcome,
                    _ => Outcome::TimedOut,
                }
            },
        }
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        self.tracker.remove(self.id);
    }
}
