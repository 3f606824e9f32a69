//! HTTP side of the request pipeline
//!
//! This module provides:
//! - Immutable request configuration built fluently
//! - The transport seam and its reqwest implementation
//! - Classification of responses into success or a uniform error model
//! - Timeout configuration and a factory sharing one transport

pub mod builder;
pub mod classifier;
pub mod client;
pub mod error;
pub mod timeout;
pub mod transport;

pub use builder::{ErrorDelivery, ParameterEncoding, RequestConfig, RequestConfigBuilder};
pub use classifier::{classify, classify_status, is_hard_failure, Outcome};
pub use client::{ApiFactory, ApiFactoryConfig};
pub use error::{ErrorModel, ResponseModel, TransportCode, TransportError};
pub use timeout::TimeoutConfig;
pub use transport::{ReqwestTransport, Transport, TransportFuture, TransportRequest, TransportResponse};

// Re-export commonly used types
pub use reqwest::{Method, StatusCode, Url};
