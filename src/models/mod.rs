//! Request and Response models for the advisory service
//!
//! This module defines the advisor payloads and the DTOs used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{AdvisoryRequest, ChatRequest, ChatTurn, RecommendationRequest};
pub use responses::{
    AdviseResponse, AdvisoryResponse, HealthResponse, InvalidateResponse, PruneResponse,
    RecommendationItem, StatsResponse,
};
