use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Column holding the legacy primary key on every source collection.
pub const PRIMARY_KEY_COLUMN: &str = "id";
/// Column holding the owning user on every source collection.
pub const OWNER_COLUMN: &str = "user_id";

/// The five entity types carried over from the legacy store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Profiles,
    CheckIns,
    SessionReflections,
    CompetitionReports,
    ReviewEntries,
}

impl Entity {
    /// Processing order. Profiles go first so progress output reads top-down;
    /// nothing downstream depends on them being present.
    pub const ALL: [Entity; 5] = [
        Entity::Profiles,
        Entity::CheckIns,
        Entity::SessionReflections,
        Entity::CompetitionReports,
        Entity::ReviewEntries,
    ];

    /// Key used in summaries, logs and the target store's `entity` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Entity::Profiles => "profiles",
            Entity::CheckIns => "check_ins",
            Entity::SessionReflections => "session_reflections",
            Entity::CompetitionReports => "competition_reports",
            Entity::ReviewEntries => "review_entries",
        }
    }

    /// Name of the legacy collection this entity is read from.
    pub fn source_collection(self) -> &'static str {
        match self {
            Entity::Profiles => "profiles",
            Entity::CheckIns => "daily_checkins",
            Entity::SessionReflections => "session_reflections",
            Entity::CompetitionReports => "competition_reports",
            Entity::ReviewEntries => "review_entries",
        }
    }

    /// Profiles are upserted by owner; everything else is keyed by `legacyId`.
    pub fn keyed_by_owner(self) -> bool {
        matches!(self, Entity::Profiles)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Entity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Entity::ALL
            .into_iter()
            .find(|entity| entity.as_str() == s)
            .ok_or_else(|| format!("unknown entity: {s}"))
    }
}
