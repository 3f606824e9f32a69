//! Transport seam between publishers and the network
//!
//! A [`Transport`] turns one [`TransportRequest`] into a future that resolves
//! exactly once. Dropping or aborting that future cancels the call.
//! [`ReqwestTransport`] is the default implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client as ReqwestClient, Method, Url};
use serde_json::{Map, Value};
use tracing::debug;

use crate::http::builder::ParameterEncoding;
use crate::http::error::TransportError;
use crate::http::timeout::TimeoutConfig;
use crate::Result;

/// Boxed single-shot future returned by a transport
pub type TransportFuture = Pin<Box<dyn Future<Output = TransportResponse> + Send + 'static>>;

/// Everything a transport needs to perform one call
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub parameters: Option<Map<String, Value>>,
    pub encoding: ParameterEncoding,
    /// Per-request override of the transport's request timeout
    pub timeout: Option<Duration>,
}

/// Completion of one transport call
///
/// `status` is absent when the call failed before a response arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: Option<u16>,
    pub body: Option<Bytes>,
    pub error: Option<TransportError>,
}

impl TransportResponse {
    pub fn completed(status: u16, body: Bytes) -> Self {
        Self {
            status: Some(status),
            body: Some(body),
            error: None,
        }
    }

    pub fn failed(error: TransportError) -> Self {
        Self {
            status: None,
            body: None,
            error: Some(error),
        }
    }
}

/// HTTP client collaborator
pub trait Transport: Send + Sync + fmt::Debug {
    /// Issue the call; the returned future must resolve at most once
    fn execute(&self, request: TransportRequest) -> TransportFuture;
}

/// Transport backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    timeouts: TimeoutConfig,
}

impl ReqwestTransport {
    pub fn new(timeouts: TimeoutConfig) -> Result<Self> {
        timeouts.validate().map_err(|message| crate::Error::Configuration {
            message,
            source: None,
        })?;

        let client = ReqwestClient::builder()
            .connect_timeout(timeouts.connect_timeout)
            .timeout(timeouts.request_timeout)
            .pool_idle_timeout(timeouts.keepalive_timeout)
            .build()
            .map_err(|e| crate::Error::Transport {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(Box::new(e)),
            })?;

        Ok(Self { client, timeouts })
    }

    /// Create with default configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(TimeoutConfig::default())
    }

    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: TransportRequest) -> TransportFuture {
        let client = self.client.clone();

        Box::pin(async move {
            debug!(method = %request.method, url = %request.url, "sending request");

            let mut builder = client.request(request.method.clone(), request.url.clone());
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }

            for (key, value) in &request.headers {
                builder = builder.header(key.as_str(), value.as_str());
            }

            if let Some(parameters) = &request.parameters {
                builder = match request.encoding {
                    ParameterEncoding::Query => builder.query(&ParameterEncoding::query_pairs(parameters)),
                    ParameterEncoding::JsonBody => builder.json(parameters),
                };
            }

            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) => return TransportResponse::failed(TransportError::from_reqwest(&e)),
            };

            let status = response.status().as_u16();
            match response.bytes().await {
                Ok(body) => TransportResponse::completed(status, body),
                Err(e) => TransportResponse {
                    status: Some(status),
                    body: None,
                    error: Some(TransportError::from_reqwest(&e)),
                },
            }
        })
    }
}
