//! API Module
//!
//! HTTP handlers and routing for the order query API.
//!
//! # Endpoints
//! - `GET /order/:id` - Retrieve a cached order by id
//! - `GET /order?id=` - Retrieve a cached order by query parameter
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
