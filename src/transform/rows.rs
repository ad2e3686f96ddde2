//! Typed views over legacy source rows.
//!
//! Columns whose encoding is consistent decode straight into Rust types.
//! Columns the legacy store encodes inconsistently (ratings stored as text or
//! numbers, attempt weights, bests, primary keys) stay as raw JSON scalars and
//! are coerced by the mapping functions.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// The literal string the legacy store writes instead of a real null.
pub const NULL_SENTINEL: &str = "NULL";

/// Decode an optional text column, folding a true null and the `"NULL"`
/// sentinel into `None`. Every other string passes through untouched;
/// numbers and booleans keep their JSON rendering.
pub(crate) fn sentinel_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(text) if text == NULL_SENTINEL => Ok(None),
        Value::String(text) => Ok(Some(text)),
        scalar @ (Value::Number(_) | Value::Bool(_)) => Ok(Some(scalar.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected a text scalar, found {other}"
        ))),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRow {
    pub id: Value,
    pub user_id: String,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub sport: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub training_days_per_week: Value,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub next_competition: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub next_competition_date: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub goals: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckInRow {
    pub id: Value,
    pub user_id: String,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub check_in_date: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub physical_strength: Value,
    #[serde(default)]
    pub mental_strength: Value,
    #[serde(default)]
    pub recovery: Value,
    #[serde(default)]
    pub confidence: Value,
    #[serde(default)]
    pub sleep_quality: Value,
    #[serde(default)]
    pub energy: Value,
    #[serde(default)]
    pub stress: Value,
    #[serde(default)]
    pub soreness: Value,
    #[serde(default)]
    pub readiness_score: Value,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub goal: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub concerns: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionReflectionRow {
    pub id: Value,
    pub user_id: String,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub session_date: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub session_rpe: Value,
    #[serde(default)]
    pub movement_quality: Value,
    #[serde(default)]
    pub focus: Value,
    #[serde(default)]
    pub confidence: Value,
    #[serde(default)]
    pub misses: Value,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub training_type: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub time_of_day: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub what_went_well: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub frustrations: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub notes: Option<String>,
}

/// Three positional attempt columns plus the recorded best for one movement.
#[derive(Debug, Clone, Default)]
pub struct MovementColumns {
    pub attempts: [Value; 3],
    pub best: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompetitionReportRow {
    pub id: Value,
    pub user_id: String,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub meet_name: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub meet_date: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub meet_type: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub bodyweight: Option<String>,
    #[serde(default)]
    pub performance_rating: Value,
    #[serde(default)]
    pub preparedness_rating: Value,
    #[serde(default)]
    pub snatch1: Value,
    #[serde(default)]
    pub snatch2: Value,
    #[serde(default)]
    pub snatch3: Value,
    #[serde(default)]
    pub snatch_best: Value,
    #[serde(default)]
    pub clean_jerk1: Value,
    #[serde(default)]
    pub clean_jerk2: Value,
    #[serde(default)]
    pub clean_jerk3: Value,
    #[serde(default)]
    pub clean_jerk_best: Value,
    #[serde(default)]
    pub squat1: Value,
    #[serde(default)]
    pub squat2: Value,
    #[serde(default)]
    pub squat3: Value,
    #[serde(default)]
    pub squat_best: Value,
    #[serde(default)]
    pub bench1: Value,
    #[serde(default)]
    pub bench2: Value,
    #[serde(default)]
    pub bench3: Value,
    #[serde(default)]
    pub bench_best: Value,
    #[serde(default)]
    pub deadlift1: Value,
    #[serde(default)]
    pub deadlift2: Value,
    #[serde(default)]
    pub deadlift3: Value,
    #[serde(default)]
    pub deadlift_best: Value,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub did_well: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub needs_work: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub good_from_training: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub cues: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub focus: Option<String>,
}

impl CompetitionReportRow {
    /// Split the flat attempt columns into per-movement groups, in the
    /// order snatch, clean & jerk, squat, bench, deadlift.
    pub fn take_movements(&mut self) -> [MovementColumns; 5] {
        fn take(slot: &mut Value) -> Value {
            std::mem::take(slot)
        }
        [
            MovementColumns {
                attempts: [
                    take(&mut self.snatch1),
                    take(&mut self.snatch2),
                    take(&mut self.snatch3),
                ],
                best: take(&mut self.snatch_best),
            },
            MovementColumns {
                attempts: [
                    take(&mut self.clean_jerk1),
                    take(&mut self.clean_jerk2),
                    take(&mut self.clean_jerk3),
                ],
                best: take(&mut self.clean_jerk_best),
            },
            MovementColumns {
                attempts: [
                    take(&mut self.squat1),
                    take(&mut self.squat2),
                    take(&mut self.squat3),
                ],
                best: take(&mut self.squat_best),
            },
            MovementColumns {
                attempts: [
                    take(&mut self.bench1),
                    take(&mut self.bench2),
                    take(&mut self.bench3),
                ],
                best: take(&mut self.bench_best),
            },
            MovementColumns {
                attempts: [
                    take(&mut self.deadlift1),
                    take(&mut self.deadlift2),
                    take(&mut self.deadlift3),
                ],
                best: take(&mut self.deadlift_best),
            },
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewEntryRow {
    pub id: Value,
    pub user_id: String,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub review_type: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "sentinel_text")]
    pub tags: Option<String>,
}
