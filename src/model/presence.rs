//! Presence heartbeats and the live-occupancy count derived from them.

use chrono::{DateTime, Duration, Utc};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use super::SpaceId;

/// One user's latest heartbeat in a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub space_id: SpaceId,
    pub last_seen_at: DateTime<Utc>,
}

impl PresenceRecord {
    pub fn new(space_id: impl Into<SpaceId>, last_seen_at: DateTime<Utc>) -> Self {
        Self { space_id: space_id.into(), last_seen_at }
    }

    /// Seen within `window` of `now` (inclusive). Heartbeats stamped in the
    /// future count as live.
    pub fn is_live(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.last_seen_at <= window
    }
}

/// Count live presence records per space.
///
/// Spaces with no live records are absent from the map; callers treat a
/// missing entry as zero.
pub fn active_user_counts(
    records: &[PresenceRecord],
    now: DateTime<Utc>,
    window: Duration,
) -> HashMap<SpaceId, u32> {
    let mut counts: HashMap<SpaceId, u32> = HashMap::new();
    for record in records.iter().filter(|r| r.is_live(now, window)) {
        *counts.entry(record.space_id.clone()).or_default() += 1;
    }
    counts
}
