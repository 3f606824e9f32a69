//! Request configuration and its fluent builder
//!
//! [`RequestConfigBuilder`] collects options and produces an immutable
//! [`RequestConfig`]; each publisher owns one. URL validity is checked
//! lazily when a subscriber attaches, not at build time.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::timeout::TimeoutConfig;
use crate::http::transport::{ReqwestTransport, Transport, TransportRequest};
use crate::publisher::RequestPublisher;
use crate::Result;

/// Characters escaped before the URL is parsed
///
/// Everything outside the query-allowed set, except `%` so already encoded
/// URLs pass through untouched and `#[]` so fragments and IPv6 hosts survive.
const URL_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

pub const DEFAULT_CONTENT_TYPE: (&str, &str) = ("Content-Type", "application/json");

pub fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([(
        DEFAULT_CONTENT_TYPE.0.to_string(),
        DEFAULT_CONTENT_TYPE.1.to_string(),
    )])
}

/// How request parameters are attached to the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterEncoding {
    /// Appended to the URL as a query string
    Query,
    /// Sent as a JSON object body
    JsonBody,
}

impl ParameterEncoding {
    /// GET encodes into the query string, every other method into the body
    pub fn for_method(method: &Method) -> Self {
        if *method == Method::GET {
            ParameterEncoding::Query
        } else {
            ParameterEncoding::JsonBody
        }
    }

    /// Flatten a parameter object into query pairs
    ///
    /// Keys come out sorted. Arrays use `key[]`, nested objects `key[sub]`,
    /// booleans encode as `1`/`0` and null as an empty value.
    pub fn query_pairs(parameters: &Map<String, Value>) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in parameters {
            flatten_query(key, value, &mut pairs);
        }
        pairs
    }
}

fn flatten_query(key: &str, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (sub, nested) in map {
                flatten_query(&format!("{}[{}]", key, sub), nested, pairs);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten_query(&format!("{}[]", key), item, pairs);
            }
        }
        Value::Bool(flag) => pairs.push((key.to_string(), if *flag { "1" } else { "0" }.to_string())),
        Value::Null => pairs.push((key.to_string(), String::new())),
        Value::String(s) => pairs.push((key.to_string(), s.clone())),
        Value::Number(n) => pairs.push((key.to_string(), n.to_string())),
    }
}

/// How classified failures reach the subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorDelivery {
    /// Terminal `Completion::Failed(Error::Api(model))`
    #[default]
    Failure,
    /// Serialized `ErrorModel` delivered as a value, then `Finished`
    Value,
}

/// Immutable description of one request
#[derive(Clone)]
pub struct RequestConfig {
    transport: Arc<dyn Transport>,
    url: String,
    method: Method,
    headers: BTreeMap<String, String>,
    parameters: Option<Map<String, Value>>,
    request_timeout: Option<Duration>,
    error_delivery: ErrorDelivery,
}

impl RequestConfig {
    pub fn builder() -> RequestConfigBuilder {
        RequestConfigBuilder::new()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn parameters(&self) -> Option<&Map<String, Value>> {
        self.parameters.as_ref()
    }

    pub fn encoding(&self) -> ParameterEncoding {
        ParameterEncoding::for_method(&self.method)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn error_delivery(&self) -> ErrorDelivery {
        self.error_delivery
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Percent-encode and parse the configured URL
    pub fn encoded_url(&self) -> Result<Url> {
        let encoded = utf8_percent_encode(&self.url, URL_ESCAPE).to_string();
        let url = Url::parse(&encoded).map_err(|e| crate::Error::BadUrl {
            url: self.url.clone(),
            source: Some(e),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(crate::Error::BadUrl {
                url: self.url.clone(),
                source: None,
            }),
        }
    }

    /// Describe the call for the transport
    pub fn transport_request(&self, url: Url) -> TransportRequest {
        TransportRequest {
            method: self.method.clone(),
            url,
            headers: self.headers.clone(),
            parameters: self.parameters.clone(),
            encoding: self.encoding(),
            timeout: self.request_timeout,
        }
    }

    /// Cold publisher for this request
    pub fn publisher(self) -> RequestPublisher {
        RequestPublisher::new(self)
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("parameters", &self.parameters)
            .field("request_timeout", &self.request_timeout)
            .field("error_delivery", &self.error_delivery)
            .finish_non_exhaustive()
    }
}

/// Fluent builder for [`RequestConfig`]
#[derive(Debug, Clone)]
pub struct RequestConfigBuilder {
    transport: Option<Arc<dyn Transport>>,
    timeouts: TimeoutConfig,
    url: String,
    method: Method,
    headers: BTreeMap<String, String>,
    parameters: Option<Map<String, Value>>,
    request_timeout: Option<Duration>,
    error_delivery: ErrorDelivery,
}

impl Default for RequestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestConfigBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            timeouts: TimeoutConfig::default(),
            url: String::new(),
            method: Method::GET,
            headers: default_headers(),
            parameters: None,
            request_timeout: None,
            error_delivery: ErrorDelivery::default(),
        }
    }

    /// Use a specific transport instead of building a default one
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Timeouts for the default transport; ignored when a transport is set
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Replace all headers, including the default `Content-Type`
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn error_delivery(mut self, delivery: ErrorDelivery) -> Self {
        self.error_delivery = delivery;
        self
    }

    /// Freeze the configuration
    ///
    /// Only fails when no transport was supplied and the default one
    /// cannot be constructed.
    pub fn build(self) -> Result<RequestConfig> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.timeouts)?),
        };

        Ok(RequestConfig {
            transport,
            url: self.url,
            method: self.method,
            headers: self.headers,
            parameters: self.parameters,
            request_timeout: self.request_timeout,
            error_delivery: self.error_delivery,
        })
    }
}
