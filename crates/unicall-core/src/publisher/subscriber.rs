//! Subscriber contract and the adapters shipped with the crate

use std::fmt;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::publisher::subscription::Subscription;
use crate::{Error, Result};

/// Number of values a subscriber is willing to receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Demand {
    Max(usize),
    Unlimited,
}

impl Demand {
    pub const NONE: Demand = Demand::Max(0);

    pub fn max(count: usize) -> Self {
        Demand::Max(count)
    }

    pub fn unlimited() -> Self {
        Demand::Unlimited
    }

    pub fn is_none(&self) -> bool {
        *self == Demand::NONE
    }
}

/// Terminal signal sent after the single emission
#[derive(Debug)]
pub enum Completion {
    Finished,
    Failed(Error),
}

impl Completion {
    pub fn is_finished(&self) -> bool {
        matches!(self, Completion::Finished)
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Completion::Failed(error) => Some(error),
            Completion::Finished => None,
        }
    }
}

/// Downstream consumer of a [`RequestPublisher`](crate::RequestPublisher)
///
/// `receive_subscription` runs synchronously inside `subscribe`. Requesting
/// demand from there is allowed; the request is honoured once the subscriber
/// is attached. The other two callbacks may run on a runtime worker thread.
pub trait Subscriber: Send + 'static {
    fn receive_subscription(&mut self, subscription: &Subscription);

    /// Returned demand is ignored: a request publisher emits at most once
    fn receive(&mut self, value: Bytes) -> Demand;

    fn receive_completion(&mut self, completion: Completion);
}

/// Closure-backed subscriber that requests unlimited demand on attach
pub struct Sink<V, C> {
    on_value: V,
    on_completion: Option<C>,
}

impl<V, C> Sink<V, C>
where
    V: FnMut(Bytes) + Send + 'static,
    C: FnOnce(Completion) + Send + 'static,
{
    pub fn new(on_value: V, on_completion: C) -> Self {
        Self {
            on_value,
            on_completion: Some(on_completion),
        }
    }
}

impl<V, C> Subscriber for Sink<V, C>
where
    V: FnMut(Bytes) + Send + 'static,
    C: FnOnce(Completion) + Send + 'static,
{
    fn receive_subscription(&mut self, subscription: &Subscription) {
        subscription.request(Demand::unlimited());
    }

    fn receive(&mut self, value: Bytes) -> Demand {
        (self.on_value)(value);
        Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion) {
        if let Some(on_completion) = self.on_completion.take() {
            on_completion(completion);
        }
    }
}

impl<V, C> fmt::Debug for Sink<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("completed", &self.on_completion.is_none())
            .finish()
    }
}

/// Forwards the single outcome into a oneshot channel
///
/// Demand is requested by the caller, not on attach.
#[derive(Debug)]
pub(crate) struct OneShot {
    sender: Option<oneshot::Sender<Result<Bytes>>>,
    value: Option<Bytes>,
}

impl OneShot {
    pub(crate) fn new(sender: oneshot::Sender<Result<Bytes>>) -> Self {
        Self {
            sender: Some(sender),
            value: None,
        }
    }
}

impl Subscriber for OneShot {
    fn receive_subscription(&mut self, _subscription: &Subscription) {}

    fn receive(&mut self, value: Bytes) -> Demand {
        self.value = Some(value);
        Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion) {
        let result = match completion {
            Completion::Finished => self.value.take().ok_or(Error::Cancelled),
            Completion::Failed(error) => Err(error),
        };
        if let Some(sender) = self.sender.take() {
            // Receiver gone means the caller stopped waiting
            let _ = sender.send(result);
        }
    }
}
