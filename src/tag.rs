use serde::{Deserialize, Serialize};

use crate::ids::TagId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
    pub display_order: i32,
}

/// `entity_type` is a closed tag at the moment: notifications are the only
/// taggable entity the core defines. Kept as a string, not an enum, so the
/// join table's uniqueness constraint (`tag_id`, `entity_type`,
/// `entity_id`) generalizes to future entity kinds without a migration.
pub const NOTIFICATION_ENTITY_TYPE: &str = "notification";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagAssignment {
    pub tag_id: TagId,
    pub entity_type: String,
    pub entity_id: uuid::Uuid,
}
