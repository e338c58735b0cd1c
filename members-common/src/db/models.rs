//! Database models

use serde::{Deserialize, Serialize};
use std::fmt;

/// A member keyed by unique phone number and unique client member id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscriber {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub client_member_id: String,
}

/// Human-readable summary: `id,first_name,last_name,phone_number,client_member_id`
impl fmt::Display for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.id, self.first_name, self.last_name, self.phone_number, self.client_member_id
        )
    }
}

/// Subscriber fields supplied by a caller, before the store assigns an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscriber {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub client_member_id: String,
}

/// Link between a subscriber and an external account id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Provider {
    pub id: i64,
    pub subscriber_id: i64,
    pub account_id: String,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.account_id)
    }
}

/// Processing status of an event message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Complete,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Complete => "complete",
        }
    }
}

/// Event message row as consumed by the retention sweeper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventMessage {
    pub id: i64,
    pub status: String,
    /// Unix seconds (UTC)
    pub created_at: i64,
}
