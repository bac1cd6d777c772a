//! Staff model - a person who can be booked

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schedule::WeeklySchedule;

/// A bookable staff member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: Uuid,
    pub name: String,
    /// Role label shown to clients (e.g. "Barbero", "Estilista")
    pub role: String,
    pub image: Option<String>,
    /// Argon2 hash of the staff member's PIN, if they may log in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_hash: Option<String>,
    #[serde(default)]
    pub schedule: WeeklySchedule,
    pub created_at: DateTime<Utc>,
}

impl Staff {
    /// New staff member with the default weekly schedule
    pub fn new(name: String, role: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            role,
            image: None,
            pin_hash: None,
            schedule: WeeklySchedule::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_schedule(mut self, schedule: WeeklySchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_image(mut self, image: String) -> Self {
        self.image = Some(image);
        self
    }
}
