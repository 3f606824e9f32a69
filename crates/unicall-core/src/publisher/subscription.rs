//! Lifecycle of one in-flight request bound to one subscriber
//!
//! A subscription moves `Pending -> Armed -> Terminated`. The subscriber is
//! taken out of the shared stage when demand arms the subscription, so a
//! cancel racing with completion can never reach it twice. Whichever of
//! cancel or completion swaps the stage out of `Armed` first wins; the other
//! sees `Terminated` and does nothing. Subscriber callbacks never run while
//! the stage lock is held.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

use crate::http::builder::ErrorDelivery;
use crate::http::classifier::{classify, Outcome};
use crate::http::error::{TransportCode, TransportError};
use crate::http::transport::TransportResponse;
use crate::publisher::subscriber::{Completion, Demand, Subscriber};
use crate::Error;

enum Stage {
    /// `subscriber` is `None` while `receive_subscription` is running
    Pending {
        subscriber: Option<Box<dyn Subscriber>>,
        requested: bool,
        call: JoinHandle<TransportResponse>,
    },
    Armed,
    Terminated,
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Pending { .. } => "pending",
            Stage::Armed => "armed",
            Stage::Terminated => "terminated",
        }
    }
}

struct Inner {
    stage: Mutex<Stage>,
    abort: Option<AbortHandle>,
    runtime: Option<Handle>,
    delivery: ErrorDelivery,
}

impl Inner {
    fn lock_stage(&self) -> MutexGuard<'_, Stage> {
        self.stage.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `Armed -> Terminated`; false when a cancel got there first
    fn finish(&self) -> bool {
        let mut stage = self.lock_stage();
        if matches!(*stage, Stage::Armed) {
            *stage = Stage::Terminated;
            true
        } else {
            false
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Last handle gone: nobody can arm the call any more
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }
}

/// Demand and cancellation handle for one request
///
/// Cheap to clone; all clones control the same request. A subscriber that
/// keeps a clone forms a cycle with it until the subscription arms or is
/// cancelled.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<Inner>,
}

impl Subscription {
    pub(crate) fn new(
        call: JoinHandle<TransportResponse>,
        runtime: Handle,
        delivery: ErrorDelivery,
    ) -> Self {
        let abort = call.abort_handle();
        Self {
            inner: Arc::new(Inner {
                stage: Mutex::new(Stage::Pending {
                    subscriber: None,
                    requested: false,
                    call,
                }),
                abort: Some(abort),
                runtime: Some(runtime),
                delivery,
            }),
        }
    }

    /// Inert subscription handed out when nothing was issued
    pub(crate) fn terminated() -> Self {
        Self {
            inner: Arc::new(Inner {
                stage: Mutex::new(Stage::Terminated),
                abort: None,
                runtime: None,
                delivery: ErrorDelivery::default(),
            }),
        }
    }

    /// Store the subscriber once `receive_subscription` has returned
    pub(crate) fn attach(&self, subscriber: Box<dyn Subscriber>) {
        let armed = {
            let mut stage = self.inner.lock_stage();
            match std::mem::replace(&mut *stage, Stage::Armed) {
                Stage::Pending {
                    subscriber: None,
                    requested: true,
                    call,
                } => Some(call),
                Stage::Pending {
                    subscriber: None,
                    requested: false,
                    call,
                } => {
                    *stage = Stage::Pending {
                        subscriber: Some(subscriber),
                        requested: false,
                        call,
                    };
                    return;
                }
                other => {
                    // Cancelled from inside receive_subscription
                    *stage = other;
                    None
                }
            }
        };

        if let Some(call) = armed {
            self.arm(subscriber, call);
        }
    }

    /// Authorize the single emission; ignored once armed or terminated
    ///
    /// # Panics
    ///
    /// Panics if `demand` is zero while the request is still pending.
    pub fn request(&self, demand: Demand) {
        let armed = {
            let mut stage = self.inner.lock_stage();
            if !matches!(*stage, Stage::Pending { .. }) {
                return;
            }
            if demand.is_none() {
                drop(stage);
                panic!("demand must be greater than zero");
            }
            match std::mem::replace(&mut *stage, Stage::Armed) {
                Stage::Pending {
                    subscriber: Some(subscriber),
                    call,
                    ..
                } => Some((subscriber, call)),
                Stage::Pending {
                    subscriber: None,
                    call,
                    ..
                } => {
                    *stage = Stage::Pending {
                        subscriber: None,
                        requested: true,
                        call,
                    };
                    None
                }
                other => {
                    *stage = other;
                    None
                }
            }
        };

        if let Some((subscriber, call)) = armed {
            self.arm(subscriber, call);
        }
    }

    /// Abort the call and drop the subscriber; idempotent
    pub fn cancel(&self) {
        let previous = std::mem::replace(&mut *self.inner.lock_stage(), Stage::Terminated);
        if matches!(previous, Stage::Terminated) {
            return;
        }

        if let Some(abort) = &self.inner.abort {
            abort.abort();
        }
        debug!(stage = previous.name(), "request cancelled");
    }

    pub fn is_terminated(&self) -> bool {
        matches!(*self.inner.lock_stage(), Stage::Terminated)
    }

    fn arm(&self, subscriber: Box<dyn Subscriber>, call: JoinHandle<TransportResponse>) {
        let Some(runtime) = self.inner.runtime.clone() else {
            return;
        };
        debug!("subscription armed");

        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            let response = match call.await {
                Ok(response) => response,
                Err(e) if e.is_cancelled() => return,
                Err(e) => TransportResponse::failed(TransportError::new(
                    TransportCode::Unknown,
                    format!("transport task failed: {}", e),
                )),
            };

            let outcome = classify(&response);
            if inner.finish() {
                emit(subscriber, outcome, inner.delivery);
            }
        });
    }
}

/// Deliver exactly one value-or-failure followed by completion
fn emit(mut subscriber: Box<dyn Subscriber>, outcome: Outcome, delivery: ErrorDelivery) {
    let model = match outcome {
        Outcome::Success(body) => {
            subscriber.receive(body);
            subscriber.receive_completion(Completion::Finished);
            return;
        }
        Outcome::Failure(model) => model,
    };

    warn!(status = model.status, message = %model.message, "request failed");
    match delivery {
        ErrorDelivery::Failure => {
            subscriber.receive_completion(Completion::Failed(Error::Api(model)));
        }
        ErrorDelivery::Value => match model.to_bytes() {
            Ok(bytes) => {
                subscriber.receive(bytes);
                subscriber.receive_completion(Completion::Finished);
            }
            Err(e) => subscriber.receive_completion(Completion::Failed(e)),
        },
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("stage", &self.inner.lock_stage().name())
            .field("delivery", &self.inner.delivery)
            .finish()
    }
}
