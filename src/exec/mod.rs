//! Remote worker execution.
//!
//! [`http::HttpDispatcher`] is the production [`crate::orchestration::RemoteDispatcher`].

pub mod http;

pub use http::HttpDispatcher;
