//! # Bounded input queues
//!
//! Producers never block. Every item is stamped with the stop epoch current when it was queued,
//! so consumers can drop anything which was queued before a STOP.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};

use log::warn;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An item tagged with the stop epoch it was queued in.
#[derive(Debug, Clone)]
pub struct Stamped<T> {
    pub epoch: u64,
    pub item: T,
}

/// Sending half of a bounded queue.
pub struct QueueSender<T> {
    name: &'static str,
    sender: SyncSender<Stamped<T>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T> QueueSender<T> {
    /// Queue an item without blocking.
    ///
    /// Returns `false` if the queue is full, in which case the new item is dropped, or if the
    /// consumer has gone away.
    pub fn try_push(&self, item: T, epoch: u64) -> bool {
        match self.sender.try_send(Stamped { epoch, item }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("The {} queue is full, dropping the newest item", self.name);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("The {} queue is closed", self.name);
                false
            }
        }
    }
}

// Derived Clone would require T: Clone
impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            sender: self.sender.clone(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create a queue holding at most `len` items.
pub fn bounded<T>(name: &'static str, len: usize) -> (QueueSender<T>, Receiver<Stamped<T>>) {
    let (sender, receiver) = sync_channel(len);
    (QueueSender { name, sender }, receiver)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_full_drops_newest() {
        let (tx, rx) = bounded("test", 2);

        assert!(tx.try_push(1, 0));
        assert!(tx.clone().try_push(2, 0));
        assert!(!tx.try_push(3, 1));

        let items: Vec<_> = rx.try_iter().map(|s| s.item).collect();
        assert_eq!(items, vec![1, 2]);
    }

    #[test]
    fn test_disconnected() {
        let (tx, rx) = bounded("test", 2);
        drop(rx);
        assert!(!tx.try_push(1u8, 0));
    }
}
