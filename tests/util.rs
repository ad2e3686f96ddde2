#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use journal_migrate::{SourceClient, SqliteTargetStore};
use serde_json::{json, Map, Value};

pub const SERVICE_KEY: &str = "test-service-key";

#[derive(Default)]
struct SourceState {
    collections: HashMap<String, Vec<Value>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    requests: Vec<String>,
}

type Shared = Arc<Mutex<SourceState>>;

/// In-process stand-in for the legacy REST source, listening on an
/// ephemeral localhost port.
#[derive(Clone)]
pub struct FakeSource {
    state: Shared,
    pub base_url: String,
}

impl FakeSource {
    pub async fn start() -> Self {
        let state: Shared = Arc::default();
        let app = Router::new()
            .route("/:collection", get(serve_collection))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake source");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            state,
            base_url: format!("http://{addr}"),
        }
    }

    pub fn set_rows(&self, collection: &str, rows: Vec<Value>) {
        self.state
            .lock()
            .unwrap()
            .collections
            .insert(collection.to_string(), rows);
    }

    pub fn fail(&self, collection: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(collection.to_string());
    }

    pub fn delay_responses(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    /// Offsets requested so far for `collection`, in arrival order.
    pub fn page_offsets(&self, collection: &str) -> Vec<usize> {
        let prefix = format!("{collection}@");
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter_map(|r| r.strip_prefix(&prefix))
            .filter_map(|offset| offset.parse().ok())
            .collect()
    }

    pub fn client(&self, page_size: usize) -> SourceClient {
        self.client_with_timeout(page_size, Duration::from_secs(5))
    }

    pub fn client_with_timeout(&self, page_size: usize, timeout: Duration) -> SourceClient {
        SourceClient::new(&self.base_url, SERVICE_KEY, page_size, timeout).unwrap()
    }
}

fn project(row: Value, select: &str) -> Value {
    if select == "*" {
        return row;
    }
    let columns: Vec<&str> = select.split(',').map(str::trim).collect();
    let projected: Map<String, Value> = row
        .as_object()
        .map(|object| {
            object
                .iter()
                .filter(|(key, _)| columns.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default();
    Value::Object(projected)
}

async fn serve_collection(
    State(state): State<Shared>,
    Path(collection): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let delay = state.lock().unwrap().delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let authorized = headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(SERVICE_KEY)
        && headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {SERVICE_KEY}"));
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "missing service key").into_response();
    }

    let mut state = state.lock().unwrap();
    let offset: usize = params
        .get("offset")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let limit: usize = params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(usize::MAX);
    state.requests.push(format!("{collection}@{offset}"));

    if state.failing.contains(&collection) {
        return (StatusCode::SERVICE_UNAVAILABLE, "upstream down").into_response();
    }
    let Some(rows) = state.collections.get(&collection) else {
        return (StatusCode::NOT_FOUND, "relation does not exist").into_response();
    };

    let mut rows = rows.clone();
    rows.sort_by_key(|row| row.get("id").and_then(Value::as_i64).unwrap_or(i64::MAX));
    let total = rows.len();
    let select = params.get("select").map(String::as_str).unwrap_or("*");
    let page: Vec<Value> = rows
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|row| project(row, select))
        .collect();

    let exact = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("count=exact"));
    let range = if page.is_empty() {
        format!("*/{total}")
    } else {
        format!("{}-{}/{}", offset, offset + page.len() - 1, total)
    };

    let mut response = Json(page).into_response();
    if exact {
        if let Ok(value) = range.parse() {
            response.headers_mut().insert(header::CONTENT_RANGE, value);
        }
    }
    response
}

pub async fn memory_store() -> SqliteTargetStore {
    SqliteTargetStore::connect("sqlite::memory:")
        .await
        .expect("open in-memory target store")
}

pub fn profile_row(id: i64, user: &str, first_name: &str) -> Value {
    json!({
        "id": id,
        "user_id": user,
        "first_name": first_name,
        "last_name": "Lifter",
        "email": format!("{user}@example.com"),
        "sport": "weightlifting",
        "experience_level": "intermediate",
        "training_days_per_week": "4",
        "next_competition": "NULL",
        "next_competition_date": "NULL",
        "goals": null,
        "created_at": "2024-11-02T08:15:00+00:00",
    })
}

pub fn check_in_row(id: i64, user: &str) -> Value {
    json!({
        "id": id,
        "user_id": user,
        "check_in_date": null,
        "created_at": "2025-02-20T10:00:00Z",
        "physical_strength": 4,
        "mental_strength": "5",
        "recovery": "NULL",
        "confidence": 3,
        "sleep_quality": 2,
        "energy": 4,
        "stress": 2,
        "soreness": 3,
        "readiness_score": 72,
        "goal": "Hit opener",
        "concerns": "NULL",
    })
}

pub fn session_reflection_row(id: i64, user: &str) -> Value {
    json!({
        "id": id,
        "user_id": user,
        "session_date": "2025-01-10",
        "created_at": "2025-01-10T19:30:00Z",
        "session_rpe": "8",
        "movement_quality": 4,
        "focus": 3,
        "confidence": 4,
        "misses": 1,
        "training_type": "technique",
        "what_went_well": "Fast turnover",
        "frustrations": "NULL",
    })
}

pub fn competition_report_row(id: i64, user: &str) -> Value {
    json!({
        "id": id,
        "user_id": user,
        "meet_name": "Spring Open",
        "meet_date": "2025-03-15",
        "created_at": "2025-03-16T09:00:00Z",
        "performance_rating": 4,
        "preparedness_rating": "3",
        "snatch1": "90", "snatch2": "94", "snatch3": "", "snatch_best": 94,
        "clean_jerk1": "115", "clean_jerk2": "", "clean_jerk3": "", "clean_jerk_best": "115",
        "squat1": "", "squat2": "", "squat3": "", "squat_best": null,
        "bench1": "", "bench2": "", "bench3": "", "bench_best": null,
        "deadlift1": "", "deadlift2": "", "deadlift3": "", "deadlift_best": null,
    })
}

pub fn review_entry_row(id: i64, user: &str) -> Value {
    json!({
        "id": id,
        "user_id": user,
        "review_type": "weekly",
        "title": "Week 3",
        "body": "Week went well",
        "tags": "NULL",
        "created_at": "2024-12-31T23:00:00.000Z",
    })
}

/// Two owners with a few rows in every collection.
pub fn seed_all(source: &FakeSource) {
    source.set_rows(
        "profiles",
        vec![profile_row(1, "user-a", "Ada"), profile_row(2, "user-b", "Bo")],
    );
    source.set_rows(
        "daily_checkins",
        vec![
            check_in_row(10, "user-a"),
            check_in_row(11, "user-a"),
            check_in_row(12, "user-b"),
        ],
    );
    source.set_rows(
        "session_reflections",
        vec![session_reflection_row(20, "user-a"), session_reflection_row(21, "user-b")],
    );
    source.set_rows("competition_reports", vec![competition_report_row(30, "user-b")]);
    source.set_rows(
        "review_entries",
        vec![review_entry_row(40, "user-a"), review_entry_row(41, "user-b")],
    );
}
