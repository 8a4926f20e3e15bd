//! Room naming conventions for the realtime fanout.
//!
//! A room is a named group of connections. Every connection joins its own
//! `user:{id}` room and one `role:{role}` room per role on registration;
//! `equipment:{id}` rooms are joined on explicit subscription.

use std::fmt;

use crate::types::DbId;

const USER_PREFIX: &str = "user:";
const ROLE_PREFIX: &str = "role:";
const EQUIPMENT_PREFIX: &str = "equipment:";

/// Build the personal room name for a user.
pub fn user_room(user_id: DbId) -> String {
    format!("{USER_PREFIX}{user_id}")
}

/// Build the room name shared by every connection holding `role`.
pub fn role_room(role: &str) -> String {
    format!("{ROLE_PREFIX}{role}")
}

/// Build the room name dashboards join to follow one device.
pub fn equipment_room(equipment_id: &str) -> String {
    format!("{EQUIPMENT_PREFIX}{equipment_id}")
}

/// Addressing mode for a single delivery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeliveryTarget {
    /// One user across all of their live connections. Buffered when the
    /// user has none.
    User(DbId),
    /// Every connection holding the role.
    Role(String),
    /// Every connection subscribed to the equipment.
    Equipment(String),
}

impl DeliveryTarget {
    /// The room this target resolves to.
    pub fn room(&self) -> String {
        match self {
            Self::User(id) => user_room(*id),
            Self::Role(role) => role_room(role),
            Self::Equipment(id) => equipment_room(id),
        }
    }
}

impl fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.room())
    }
}
