//! Shared factory for request publishers
//!
//! Holds one pooled transport and the defaults every request starts from,
//! and hands out fresh builders so no configuration is shared between calls.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::builder::{default_headers, ErrorDelivery, RequestConfigBuilder};
use crate::http::timeout::TimeoutConfig;
use crate::http::transport::{ReqwestTransport, Transport};
use crate::publisher::RequestPublisher;
use crate::Result;

/// Configuration for the factory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiFactoryConfig {
    /// Timeouts for the pooled transport
    pub timeouts: TimeoutConfig,
    /// Headers every request starts with
    pub headers: BTreeMap<String, String>,
    /// Per-request timeout override applied to every builder
    pub request_timeout: Option<Duration>,
    pub error_delivery: ErrorDelivery,
}

impl Default for ApiFactoryConfig {
    fn default() -> Self {
        Self {
            timeouts: TimeoutConfig::default(),
            headers: default_headers(),
            request_timeout: None,
            error_delivery: ErrorDelivery::default(),
        }
    }
}

/// Factory of request builders sharing one transport
#[derive(Debug, Clone)]
pub struct ApiFactory {
    transport: Arc<dyn Transport>,
    config: ApiFactoryConfig,
}

impl ApiFactory {
    /// Create a factory with its own pooled reqwest transport
    pub fn new(config: ApiFactoryConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(config.timeouts.clone())?);
        Ok(Self { transport, config })
    }

    /// Create with default configuration
    pub fn with_default_config() -> Result<Self> {
        Self::new(ApiFactoryConfig::default())
    }

    /// Create around an existing transport; `config.timeouts` is unused
    pub fn with_transport(transport: Arc<dyn Transport>, config: ApiFactoryConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ApiFactoryConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Fresh builder seeded with the factory defaults
    pub fn request(&self) -> RequestConfigBuilder {
        let builder = RequestConfigBuilder::new()
            .transport(Arc::clone(&self.transport))
            .headers(self.config.headers.clone())
            .error_delivery(self.config.error_delivery);

        match self.config.request_timeout {
            Some(timeout) => builder.request_timeout(timeout),
            None => builder,
        }
    }

    pub fn get(&self, url: impl Into<String>) -> Result<RequestPublisher> {
        Ok(self.request().url(url).build()?.publisher())
    }

    pub fn send(
        &self,
        method: Method,
        url: impl Into<String>,
        parameters: Map<String, Value>,
    ) -> Result<RequestPublisher> {
        Ok(self
            .request()
            .method(method)
            .url(url)
            .parameters(parameters)
            .build()?
            .publisher())
    }
}
