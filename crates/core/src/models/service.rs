//! Service model - a bookable offering

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default length of a service and of a slot, in minutes
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub title: String,
    /// Price in minor currency units
    pub price: i64,
    /// Length in minutes; zero means "not set"
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub description: String,
    pub image: Option<String>,
}

impl Service {
    pub fn new(title: String, price: i64, duration_minutes: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            price,
            duration_minutes,
            categories: Vec::new(),
            description: String::new(),
            image: None,
        }
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = description;
        self
    }

    /// Duration used for slot fitting; a missing duration counts as the default
    pub fn effective_duration(&self) -> u32 {
        if self.duration_minutes == 0 {
            DEFAULT_DURATION_MINUTES
        } else {
            self.duration_minutes
        }
    }
}
