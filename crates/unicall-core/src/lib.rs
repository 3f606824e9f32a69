//! Unicall Core - one HTTP request as a single-value publisher
//!
//! A [`RequestPublisher`] is cold: nothing is sent until a [`Subscriber`]
//! attaches. Each subscription issues exactly one transport call, classifies
//! the outcome and delivers exactly one value or failure, unless cancelled.
//!
//! # Main Components
//!
//! - **Error Handling**: [`Error`] using `thiserror`, with [`ErrorModel`] as
//!   the uniform `{status, message}` failure record
//! - **Configuration**: [`RequestConfigBuilder`] producing an immutable
//!   [`RequestConfig`], and [`ApiFactory`] sharing one pooled transport
//! - **Classification**: [`classify`] mapping transport responses to outcomes
//! - **Publishing**: [`RequestPublisher`], [`Subscription`], [`Subscriber`]
//!
//! # Example
//!
//! ```no_run
//! use unicall_core::{ApiFactory, Result};
//!
//! async fn example() -> Result<()> {
//!     let factory = ApiFactory::with_default_config()?;
//!     let body = factory.get("https://api.example.com/users")?.value().await?;
//!     println!("{} bytes", body.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod http;
pub mod publisher;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use http::{
    classify, ApiFactory, ApiFactoryConfig, ErrorDelivery, ErrorModel, Method, Outcome,
    ParameterEncoding, RequestConfig, RequestConfigBuilder, ReqwestTransport, TimeoutConfig,
    Transport, TransportCode, TransportError, TransportFuture, TransportRequest,
    TransportResponse,
};
pub use publisher::{Completion, Demand, RequestPublisher, Sink, Subscriber, Subscription};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
