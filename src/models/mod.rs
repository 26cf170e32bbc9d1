//! Domain and response models for the order service
//!
//! This module defines the cached order payload and the DTOs used for
//! serializing HTTP response bodies.

pub mod order;
pub mod responses;

// Re-export commonly used types
pub use order::{is_valid_order_id, Delivery, Item, Order, Payment};
pub use responses::{HealthResponse, StatsResponse};
