//! API Module
//!
//! HTTP handlers and routing for the advisory service.
//!
//! # Endpoints
//! - `POST /advise` - Answer an advisory request through the cache
//! - `DELETE /cache/users/:user_id` - Invalidate a user's entries
//! - `DELETE /cache/pattern/:pattern` - Invalidate entries by key substring
//! - `DELETE /cache` - Clear the cache
//! - `POST /cache/prune` - Remove expired entries
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
