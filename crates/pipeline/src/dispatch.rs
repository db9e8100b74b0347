//! Demand fan-out between pipeline stages.
//!
//! A producer owns a `DemandDispatcher`; each subscriber attaches with a
//! fixed demand budget, realized as the capacity of a bounded channel. An
//! item is offered to subscribers in arrival order and goes to the first
//! one with outstanding demand (work-conserving). When every subscriber's
//! demand is exhausted the dispatch awaits capacity, which is what pushes
//! backpressure up into the OS socket queue.

use crossfire::{AsyncRx, MAsyncTx, TrySendError};
use thiserror::Error;

/// All subscribers have disconnected; the owning stage should hold demand
/// at zero and stop emitting.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("all subscribers have disconnected")]
pub struct Unsubscribed;

pub struct DemandDispatcher<T> {
    subscribers: Vec<MAsyncTx<T>>,
}

impl<T: Unpin> Clone for DemandDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: self.subscribers.clone(),
        }
    }
}

impl<T> Default for DemandDispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DemandDispatcher<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Attach a subscriber with a demand budget of `demand` items and
    /// return its consuming end. Subscription order is dispatch order.
    ///
    /// # Panics
    ///
    /// Panics if `demand` is zero; a subscriber with no demand would never
    /// receive anything.
    pub fn subscribe(&mut self, demand: usize) -> AsyncRx<T>
    where
        T: Send + Unpin + 'static,
    {
        assert!(demand > 0, "demand budget must be positive");
        let (tx, rx) = crossfire::mpsc::bounded_async(demand);
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver one item to the first subscriber with outstanding demand.
    ///
    /// Blocks while every subscriber's demand is exhausted. Disconnected
    /// subscribers are pruned; if none remain the item is returned as
    /// undeliverable via `Unsubscribed`. An item accepted by a subscriber
    /// that disconnects mid-wait counts as delivered-then-dropped, which
    /// the cancellation contract allows.
    pub async fn dispatch(&mut self, item: T) -> Result<(), Unsubscribed>
    where
        T: Send + Unpin + 'static,
    {
        let mut item = item;
        let mut index = 0;
        while index < self.subscribers.len() {
            match self.subscribers[index].try_send(item) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(returned)) => {
                    item = returned;
                    index += 1;
                }
                Err(TrySendError::Disconnected(returned)) => {
                    item = returned;
                    self.subscribers.remove(index);
                }
            }
        }

        if self.subscribers.is_empty() {
            return Err(Unsubscribed);
        }

        // Every subscriber is out of demand: wait on the first one in
        // arrival order.
        match self.subscribers[0].send(item).await {
            Ok(()) => Ok(()),
            Err(_) => {
                // The subscriber went away while we were blocked; the item
                // went with it, which the cancellation contract allows.
                self.subscribers.remove(0);
                if self.subscribers.is_empty() {
                    Err(Unsubscribed)
                } else {
                    tracing::debug!("subscriber disconnected mid-dispatch, item dropped");
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod dispatch_test;
