//! Cold single-value publisher over one HTTP request
//!
//! Nothing happens until a [`Subscriber`] attaches. Each subscription issues
//! exactly one transport call and delivers exactly one terminal emission,
//! unless it is cancelled first.

pub mod request;
pub mod subscriber;
pub mod subscription;

pub use request::RequestPublisher;
pub use subscriber::{Completion, Demand, Sink, Subscriber};
pub use subscription::Subscription;
