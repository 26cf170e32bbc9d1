//! Order model
//!
//! The business object held by the cache, as stored by the order service and
//! served by the query API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::Cacheable;

/// Delivery recipient details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

/// Payment details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub transaction: String,
    #[serde(default)]
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i64,
    /// Unix seconds
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    #[serde(default)]
    pub custom_fee: i64,
}

/// One line item of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i64,
    pub rid: String,
    pub name: String,
    pub sale: i64,
    pub size: String,
    pub total_price: i64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i64,
}

// == Order ==
/// A customer order, keyed by `order_uid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    #[serde(default)]
    pub items: Vec<Item>,
    pub locale: String,
    #[serde(default)]
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i64,
    pub date_created: DateTime<Utc>,
    pub oof_shard: String,
}

impl Cacheable for Order {
    fn cache_key(&self) -> &str {
        &self.order_uid
    }
}

impl Order {
    // == Validate ==
    /// Checks the fields the service relies on.
    ///
    /// Returns an error message describing the first problem found.
    pub fn validate(&self) -> Option<String> {
        if !is_valid_order_id(&self.order_uid) {
            return Some(format!("invalid order_uid '{}'", self.order_uid));
        }
        if self.track_number.trim().is_empty() {
            return Some(format!("order {} has no track_number", self.order_uid));
        }
        if self.payment.transaction.trim().is_empty() {
            return Some(format!("order {} has no payment transaction", self.order_uid));
        }
        None
    }
}

/// Order ids are non-empty and consist of ASCII letters, digits and `-`.
pub fn is_valid_order_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
