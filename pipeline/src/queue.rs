// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Bounded stage queues.
//!
//! Thin wrappers over `crossbeam-channel` giving the stages the contract
//! they reason about: `send` blocks when the queue is full (back-pressure)
//! and reports [`Closed`] when the consumer is gone; `recv` blocks when
//! empty and reports [`Closed`] once the queue is drained and every sender
//! has been dropped. Closing is dropping the last sender clone, which is
//! idempotent by construction and wakes all waiters.

use crossbeam_channel as chan;

/// The queue's other side is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("queue closed")]
pub struct Closed;

/// The producing end of a bounded queue.
#[derive(Debug)]
pub struct Tx<T>(chan::Sender<T>);

/// The consuming end of a bounded queue.
#[derive(Debug)]
pub struct Rx<T>(chan::Receiver<T>);

// manual impls: deriving Clone would bound T: Clone for no reason
impl<T> Clone for Tx<T> {
    fn clone(&self) -> Self {
        Tx(self.0.clone())
    }
}

impl<T> Clone for Rx<T> {
    fn clone(&self) -> Self {
        Rx(self.0.clone())
    }
}

/// Create a bounded queue of the given capacity.
#[must_use]
pub fn bounded<T>(capacity: usize) -> (Tx<T>, Rx<T>) {
    let (tx, rx) = chan::bounded(capacity);
    (Tx(tx), Rx(rx))
}

impl<T> Tx<T> {
    /// Push an item, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] when every receiver has been dropped.
    pub fn send(&self, item: T) -> Result<(), Closed> {
        self.0.send(item).map_err(|_| Closed)
    }
}

impl<T> Rx<T> {
    /// Pop an item, blocking while the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] once the queue is empty and every sender has
    /// been dropped.
    pub fn recv(&self) -> Result<T, Closed> {
        self.0.recv().map_err(|_| Closed)
    }
}
