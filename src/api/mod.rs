//! Transport adapter, failure classification and session state.

pub mod client;
pub mod envelope;
pub mod error;
pub mod failure;
pub mod session;

pub use client::{HttpTransport, RequestConfig, Transport};
pub use error::ApiError;
pub use failure::{ClassifiedFailure, Severity};
pub use session::Session;
