//! Request publisher: the subscribe-triggered entry point

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::http::builder::RequestConfig;
use crate::publisher::subscriber::{Completion, Demand, OneShot, Subscriber};
use crate::publisher::subscription::Subscription;
use crate::{Error, Result};

/// Cold publisher of a single HTTP response body
///
/// Holds an immutable [`RequestConfig`]; cloning the publisher shares the
/// configuration, never an in-flight call.
#[derive(Debug, Clone)]
pub struct RequestPublisher {
    config: RequestConfig,
}

impl RequestPublisher {
    pub fn new(config: RequestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Issue the request and bind it to `subscriber`
    ///
    /// A URL that cannot be encoded fails the subscriber immediately and no
    /// call is made. Must run inside a tokio runtime; without one the
    /// subscriber is failed with a configuration error.
    pub fn subscribe<S: Subscriber>(&self, subscriber: S) -> Subscription {
        self.subscribe_boxed(Box::new(subscriber))
    }

    fn subscribe_boxed(&self, mut subscriber: Box<dyn Subscriber>) -> Subscription {
        let url = match self.config.encoded_url() {
            Ok(url) => url,
            Err(e) => {
                warn!(url = %self.config.url(), "invalid URL or unable to percent encode");
                subscriber.receive_completion(Completion::Failed(e));
                return Subscription::terminated();
            }
        };

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                subscriber.receive_completion(Completion::Failed(Error::Configuration {
                    message: "subscribing requires a tokio runtime".to_string(),
                    source: Some(anyhow::Error::new(e)),
                }));
                return Subscription::terminated();
            }
        };

        let request = self.config.transport_request(url);
        debug!(
            method = %request.method,
            url = %request.url,
            encoding = ?request.encoding,
            "issuing request"
        );
        let call = runtime.spawn(self.config.transport().execute(request));

        let subscription = Subscription::new(call, runtime, self.config.error_delivery());
        subscriber.receive_subscription(&subscription);
        subscription.attach(subscriber);
        subscription
    }

    /// Subscribe, request the single value and wait for it
    ///
    /// Dropping the returned future cancels the request.
    pub async fn value(&self) -> Result<Bytes> {
        let (sender, receiver) = oneshot::channel();
        let guard = CancelOnDrop(self.subscribe(OneShot::new(sender)));
        guard.0.request(Demand::max(1));

        receiver.await.unwrap_or(Err(Error::Cancelled))
    }

    /// Like [`value`](Self::value), decoding the body as JSON
    pub async fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let body = self.value().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

struct CancelOnDrop(Subscription);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}
