use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::ids::TagId;

/// One step of a `Rule`'s action list (§4.9) or a candidate mutation for
/// the action-hint predictor (§4.6). `archive`/`mute`/... pairs are the
/// reciprocal actions the predictor tests; `Rule`s may use any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Archive,
    Unarchive,
    MarkRead,
    Mute,
    Unmute,
    Star,
    Filter,
    Unfilter,
    Snooze,
    Unsnooze,
    AssignTag,
}

/// A single action within a rule's ordered action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleAction {
    Archive,
    MarkRead,
    Mute,
    Star,
    Filter,
    Snooze {
        #[serde(with = "duration_seconds")]
        duration: Duration,
    },
    AssignTag {
        tag_id: TagId,
    },
}

/// The action names the predictor is allowed to test. `read`/`unread` and
/// `star`/`unstar` are excluded by policy (§4.6).
pub const PREDICTOR_CANDIDATES: &[ActionKind] = &[
    ActionKind::Archive,
    ActionKind::Unarchive,
    ActionKind::Mute,
    ActionKind::Unmute,
    ActionKind::Snooze,
    ActionKind::Unsnooze,
    ActionKind::Filter,
    ActionKind::Unfilter,
];

mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(d)?;
        Ok(Duration::seconds(secs))
    }
}
