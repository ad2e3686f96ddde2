use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptResult {
    Good,
    NoLift,
    Pass,
}

/// One try at a movement. `result` is never known for migrated data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiftAttempt {
    pub weight: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AttemptResult>,
}

impl LiftAttempt {
    pub fn new(weight: impl Into<String>) -> Self {
        Self {
            weight: weight.into(),
            result: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub legacy_id: i64,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
    pub training_days_per_week: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_competition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_competition_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRecord {
    pub legacy_id: i64,
    pub user_id: String,
    pub check_in_date: String,
    pub physical_strength: i64,
    pub mental_strength: i64,
    pub recovery: i64,
    pub confidence: i64,
    pub sleep_quality: i64,
    pub energy: i64,
    pub stress: i64,
    pub soreness: i64,
    pub readiness_score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concerns: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReflectionRecord {
    pub legacy_id: i64,
    pub user_id: String,
    pub session_date: String,
    pub session_rpe: i64,
    pub movement_quality: i64,
    pub focus: i64,
    pub confidence: i64,
    pub misses: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub what_went_well: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frustrations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionReportRecord {
    pub legacy_id: i64,
    pub user_id: String,
    pub meet_name: String,
    pub meet_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meet_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bodyweight: Option<String>,
    pub performance_rating: i64,
    pub preparedness_rating: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snatch_attempts: Option<Vec<LiftAttempt>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snatch_best: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_jerk_attempts: Option<Vec<LiftAttempt>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_jerk_best: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub squat_attempts: Option<Vec<LiftAttempt>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub squat_best: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bench_attempts: Option<Vec<LiftAttempt>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bench_best: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadlift_attempts: Option<Vec<LiftAttempt>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadlift_best: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did_well: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_work: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good_from_training: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cues: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntryRecord {
    pub legacy_id: i64,
    pub user_id: String,
    pub entry_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

/// A normalized record ready for the target store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TargetRecord {
    Profile(ProfileRecord),
    CheckIn(CheckInRecord),
    SessionReflection(SessionReflectionRecord),
    CompetitionReport(CompetitionReportRecord),
    ReviewEntry(ReviewEntryRecord),
}

impl TargetRecord {
    pub fn entity(&self) -> Entity {
        match self {
            TargetRecord::Profile(_) => Entity::Profiles,
            TargetRecord::CheckIn(_) => Entity::CheckIns,
            TargetRecord::SessionReflection(_) => Entity::SessionReflections,
            TargetRecord::CompetitionReport(_) => Entity::CompetitionReports,
            TargetRecord::ReviewEntry(_) => Entity::ReviewEntries,
        }
    }

    pub fn legacy_id(&self) -> i64 {
        match self {
            TargetRecord::Profile(r) => r.legacy_id,
            TargetRecord::CheckIn(r) => r.legacy_id,
            TargetRecord::SessionReflection(r) => r.legacy_id,
            TargetRecord::CompetitionReport(r) => r.legacy_id,
            TargetRecord::ReviewEntry(r) => r.legacy_id,
        }
    }

    pub fn owner_id(&self) -> &str {
        match self {
            TargetRecord::Profile(r) => &r.user_id,
            TargetRecord::CheckIn(r) => &r.user_id,
            TargetRecord::SessionReflection(r) => &r.user_id,
            TargetRecord::CompetitionReport(r) => &r.user_id,
            TargetRecord::ReviewEntry(r) => &r.user_id,
        }
    }

    /// The JSON document persisted by the target store.
    pub fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
