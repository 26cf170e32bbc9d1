//! Test payload shared by the cache unit and property tests.

use crate::cache::Cacheable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: String,
    pub value: String,
}

impl Item {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

impl Cacheable for Item {
    fn cache_key(&self) -> &str {
        &self.key
    }
}
