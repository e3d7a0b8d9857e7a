//! Synthetic e-commerce events.
//!
//! Events follow the ingestion pipeline's schema: an id, an event type, the
//! acting user, a UTC timestamp and a flat metadata map of scalar values.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of user interaction an event represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ViewProduct,
    AddToCart,
    Checkout,
}

impl EventType {
    pub const ALL: [EventType; 3] = [
        EventType::ViewProduct,
        EventType::AddToCart,
        EventType::Checkout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ViewProduct => "view_product",
            EventType::AddToCart => "add_to_cart",
            EventType::Checkout => "checkout",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single synthetic event. Each job owns its own value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub event_type: EventType,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: BTreeMap<String, Value>,
}

impl Event {
    /// Creates an event with a fresh id and the current time.
    pub fn new(event_type: EventType, user_id: String, metadata: BTreeMap<String, Value>) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            event_type,
            user_id,
            timestamp: Utc::now(),
            metadata,
        }
    }
}

const USERS: [&str; 5] = ["user1", "user2", "user3", "user4", "user5"];
const PRODUCTS: [&str; 4] = ["prod1", "prod2", "prod3", "prod4"];

/// Produces randomized events from fixed pools of users and products.
pub struct EventSynthesizer {
    rng: StdRng,
}

impl EventSynthesizer {
    /// Synthesizer seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Synthesizer with a fixed seed, producing a reproducible field sequence.
    /// Event ids and timestamps are still unique per event.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn synthesize(&mut self) -> Event {
        let event_type = EventType::ALL[self.rng.gen_range(0..EventType::ALL.len())];
        let user_id = USERS.choose(&mut self.rng).copied().unwrap_or(USERS[0]);
        let product_id = PRODUCTS.choose(&mut self.rng).copied().unwrap_or(PRODUCTS[0]);

        // Price in [0, 100) rounded to cents.
        let price = (self.rng.gen::<f64>() * 100.0 * 100.0).round() / 100.0;

        let mut metadata = BTreeMap::new();
        metadata.insert("product_id".to_string(), Value::from(product_id));
        metadata.insert("price".to_string(), Value::from(price));

        Event::new(event_type, user_id.to_string(), metadata)
    }
}

impl Default for EventSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}
