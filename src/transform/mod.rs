//! Pure mapping from legacy source rows to target records.
//!
//! Each entity has one function taking the raw JSON row and returning its
//! typed record. None of them touch I/O; the existence check for `legacyId`
//! belongs to the importer.

pub mod records;
pub mod rows;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::entity::Entity;
use crate::error::TransformError;

pub use records::{
    AttemptResult, CheckInRecord, CompetitionReportRecord, LiftAttempt, ProfileRecord,
    ReviewEntryRecord, SessionReflectionRecord, TargetRecord,
};
pub use rows::NULL_SENTINEL;
use rows::{
    CheckInRow, CompetitionReportRow, MovementColumns, ProfileRow, ReviewEntryRow,
    SessionReflectionRow,
};

/// A row as returned by the source store: a flat JSON object of scalars.
pub type SourceRow = Value;

pub const DEFAULT_RATING: i64 = 3;
pub const DEFAULT_COUNT: i64 = 0;

const DATE_LEN: usize = 10;
const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn transform_row(entity: Entity, row: &SourceRow) -> Result<TargetRecord, TransformError> {
    Ok(match entity {
        Entity::Profiles => TargetRecord::Profile(transform_profile(row)?),
        Entity::CheckIns => TargetRecord::CheckIn(transform_check_in(row)?),
        Entity::SessionReflections => {
            TargetRecord::SessionReflection(transform_session_reflection(row)?)
        }
        Entity::CompetitionReports => {
            TargetRecord::CompetitionReport(transform_competition_report(row)?)
        }
        Entity::ReviewEntries => TargetRecord::ReviewEntry(transform_review_entry(row)?),
    })
}

pub fn transform_profile(row: &SourceRow) -> Result<ProfileRecord, TransformError> {
    let row = ProfileRow::deserialize(row)?;
    Ok(ProfileRecord {
        legacy_id: legacy_id(&row.id)?,
        user_id: row.user_id,
        first_name: row.first_name,
        last_name: row.last_name,
        email: row.email,
        sport: row.sport,
        experience_level: row.experience_level,
        training_days_per_week: count(&row.training_days_per_week),
        next_competition: row.next_competition,
        next_competition_date: optional_date(
            "next_competition_date",
            row.next_competition_date.as_deref(),
        )?,
        goals: row.goals,
        created_at: optional_date("created_at", row.created_at.as_deref())?,
    })
}

pub fn transform_check_in(row: &SourceRow) -> Result<CheckInRecord, TransformError> {
    let row = CheckInRow::deserialize(row)?;
    Ok(CheckInRecord {
        legacy_id: legacy_id(&row.id)?,
        check_in_date: date_with_fallback(
            ("check_in_date", row.check_in_date.as_deref()),
            row.created_at.as_deref(),
        )?,
        user_id: row.user_id,
        physical_strength: rating(&row.physical_strength),
        mental_strength: rating(&row.mental_strength),
        recovery: rating(&row.recovery),
        confidence: rating(&row.confidence),
        sleep_quality: rating(&row.sleep_quality),
        energy: rating(&row.energy),
        stress: rating(&row.stress),
        soreness: rating(&row.soreness),
        readiness_score: count(&row.readiness_score),
        goal: row.goal,
        concerns: row.concerns,
    })
}

pub fn transform_session_reflection(
    row: &SourceRow,
) -> Result<SessionReflectionRecord, TransformError> {
    let row = SessionReflectionRow::deserialize(row)?;
    Ok(SessionReflectionRecord {
        legacy_id: legacy_id(&row.id)?,
        session_date: date_with_fallback(
            ("session_date", row.session_date.as_deref()),
            row.created_at.as_deref(),
        )?,
        user_id: row.user_id,
        session_rpe: rating(&row.session_rpe),
        movement_quality: rating(&row.movement_quality),
        focus: rating(&row.focus),
        confidence: rating(&row.confidence),
        misses: count(&row.misses),
        training_type: row.training_type,
        time_of_day: row.time_of_day,
        what_went_well: row.what_went_well,
        frustrations: row.frustrations,
        notes: row.notes,
    })
}

pub fn transform_competition_report(
    row: &SourceRow,
) -> Result<CompetitionReportRecord, TransformError> {
    let mut row = CompetitionReportRow::deserialize(row)?;
    let legacy_id = legacy_id(&row.id)?;
    let meet_date = date_with_fallback(
        ("meet_date", row.meet_date.as_deref()),
        row.created_at.as_deref(),
    )?;
    let meet_name = required_text("meet_name", row.meet_name.take())?;

    let [snatch, clean_jerk, squat, bench, deadlift] = row.take_movements();
    let (snatch_attempts, snatch_best) = movement("snatch_best", &snatch)?;
    let (clean_jerk_attempts, clean_jerk_best) = movement("clean_jerk_best", &clean_jerk)?;
    let (squat_attempts, squat_best) = movement("squat_best", &squat)?;
    let (bench_attempts, bench_best) = movement("bench_best", &bench)?;
    let (deadlift_attempts, deadlift_best) = movement("deadlift_best", &deadlift)?;

    Ok(CompetitionReportRecord {
        legacy_id,
        user_id: row.user_id,
        meet_name,
        meet_date,
        meet_type: row.meet_type,
        bodyweight: row.bodyweight,
        performance_rating: rating(&row.performance_rating),
        preparedness_rating: rating(&row.preparedness_rating),
        snatch_attempts,
        snatch_best,
        clean_jerk_attempts,
        clean_jerk_best,
        squat_attempts,
        squat_best,
        bench_attempts,
        bench_best,
        deadlift_attempts,
        deadlift_best,
        did_well: row.did_well,
        needs_work: row.needs_work,
        good_from_training: row.good_from_training,
        cues: row.cues,
        focus: row.focus,
    })
}

/// Review entries carry no date column of their own; the entry date is the
/// day the row was created.
pub fn transform_review_entry(row: &SourceRow) -> Result<ReviewEntryRecord, TransformError> {
    let row = ReviewEntryRow::deserialize(row)?;
    let created_at = row
        .created_at
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .ok_or(TransformError::MissingField("created_at"))?;
    Ok(ReviewEntryRecord {
        legacy_id: legacy_id(&row.id)?,
        entry_date: normalize_date("created_at", created_at)?,
        user_id: row.user_id,
        review_type: row.review_type,
        title: row.title,
        body: required_text("body", row.body)?,
        tags: row.tags,
    })
}

/// Best-effort primary-key extraction for logging rows that fail to decode.
pub fn raw_legacy_id(row: &SourceRow) -> Option<i64> {
    row.get(crate::entity::PRIMARY_KEY_COLUMN)
        .and_then(|id| legacy_id(id).ok())
}

pub(crate) fn legacy_id(raw: &Value) -> Result<i64, TransformError> {
    let parsed = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| TransformError::InvalidPrimaryKey(raw.to_string()))
}

fn coerce_integer(raw: &Value) -> Option<i64> {
    fn from_float(f: f64) -> Option<i64> {
        f.is_finite().then(|| f.trunc() as i64)
    }
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(from_float)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(from_float))
        }
        _ => None,
    }
}

/// Rating-like scales default to the midpoint when unusable.
pub(crate) fn rating(raw: &Value) -> i64 {
    coerce_integer(raw).unwrap_or(DEFAULT_RATING)
}

pub(crate) fn count(raw: &Value) -> i64 {
    coerce_integer(raw).unwrap_or(DEFAULT_COUNT)
}

/// A recorded best: absent when the source has nothing, otherwise a number.
pub(crate) fn best(field: &'static str, raw: &Value) -> Result<Option<f64>, TransformError> {
    let invalid = || TransformError::InvalidNumber {
        field,
        value: raw.to_string(),
    };
    match raw {
        Value::Null => Ok(None),
        Value::String(s) if s == NULL_SENTINEL || s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Some)
            .ok_or_else(invalid),
        Value::Number(n) => n.as_f64().map(Some).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

fn attempt_weight(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty() && trimmed != NULL_SENTINEL).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Merge positional attempt columns into an ordered sequence. Blank slots are
/// dropped; an all-blank triple yields `None`, never an empty sequence.
pub(crate) fn attempts(slots: &[Value]) -> Option<Vec<LiftAttempt>> {
    let merged: Vec<LiftAttempt> = slots
        .iter()
        .filter_map(attempt_weight)
        .map(LiftAttempt::new)
        .collect();
    (!merged.is_empty()).then_some(merged)
}

fn movement(
    best_field: &'static str,
    columns: &MovementColumns,
) -> Result<(Option<Vec<LiftAttempt>>, Option<f64>), TransformError> {
    Ok((attempts(&columns.attempts), best(best_field, &columns.best)?))
}

/// Keep the calendar date of a date or timestamp string.
pub(crate) fn normalize_date(field: &'static str, raw: &str) -> Result<String, TransformError> {
    let date: String = raw.trim().chars().take(DATE_LEN).collect();
    // chrono accepts signed years and unpadded fields; only the canonical
    // rendering is kept.
    let valid = date.len() == DATE_LEN
        && NaiveDate::parse_from_str(&date, DATE_FORMAT)
            .is_ok_and(|parsed| parsed.format(DATE_FORMAT).to_string() == date);
    if valid {
        Ok(date)
    } else {
        Err(TransformError::InvalidDate {
            field,
            value: raw.to_string(),
        })
    }
}

fn optional_date(field: &'static str, raw: Option<&str>) -> Result<Option<String>, TransformError> {
    raw.filter(|value| !value.trim().is_empty())
        .map(|value| normalize_date(field, value))
        .transpose()
}

/// Use the primary date column when it carries a value, otherwise the date
/// part of `created_at`.
pub(crate) fn date_with_fallback(
    primary: (&'static str, Option<&str>),
    created_at: Option<&str>,
) -> Result<String, TransformError> {
    let (field, value) = primary;
    if let Some(date) = optional_date(field, value)? {
        return Ok(date);
    }
    optional_date("created_at", created_at)?.ok_or(TransformError::MissingField(field))
}

fn required_text(field: &'static str, raw: Option<String>) -> Result<String, TransformError> {
    raw.filter(|value| !value.trim().is_empty())
        .ok_or(TransformError::MissingField(field))
}
