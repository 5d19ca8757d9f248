//! Remote dispatcher contract.
//!
//! The dispatcher is the only component of a run that performs network I/O.
//! Implementations make exactly one attempt per call and never retry; any
//! transport problem (including a timeout) comes back as `success = false`.
//! One dispatcher instance is shared by all concurrent runs, so
//! implementations must be safe under concurrent use.

use async_trait::async_trait;
use serde_json::Value;

use super::types::DispatchResult;

#[async_trait]
pub trait RemoteDispatcher: Send + Sync {
    async fn dispatch(&self, worker_id: &str, args: &Value) -> DispatchResult;
}
