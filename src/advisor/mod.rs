//! Advisor Module
//!
//! The consumer of the cache: the advisory service and the remote advisor it
//! fronts.

mod remote;
mod service;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::models::{AdvisoryRequest, AdvisoryResponse};

pub use remote::RemoteAdvisor;
pub use service::{AdvisoryService, ServiceSettings};

// == Advisor Port ==
/// The expensive computation the cache sits in front of.
#[async_trait]
pub trait Advisor: Send + Sync + 'static {
    /// One-time setup run as part of service initialization.
    async fn prepare(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Produces an answer for the request.
    async fn compute(&self, request: &AdvisoryRequest) -> Result<AdvisoryResponse, ServiceError>;
}
