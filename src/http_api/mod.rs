use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::calendar::BlockCalendarConfig;
use crate::timemap::{TimeMapSet, TimeMapSetConfig};
use crate::{ForecastSummary, Schedule, SchedulerConfig, Task};

#[derive(Clone)]
pub struct AppState {
    schedule: Arc<RwLock<Schedule>>,
}

impl AppState {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule: Arc::new(RwLock::new(schedule)),
        }
    }

    pub fn with_shared(schedule: Arc<RwLock<Schedule>>) -> Self {
        Self { schedule }
    }

    fn schedule(&self) -> Arc<RwLock<Schedule>> {
        self.schedule.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<polars::prelude::PolarsError> for ApiError {
    fn from(value: polars::prelude::PolarsError) -> Self {
        ApiError::Invalid(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ForecastPayload {
    /// Fixed reference instant; defaults to the current wall clock.
    #[serde(default)]
    now: Option<NaiveDateTime>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/config", get(get_config).put(update_config))
        .route("/time_maps", get(get_time_maps).put(update_time_maps))
        .route("/calendar", get(get_calendar).put(update_calendar))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/forecast", post(run_forecast))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, schedule: Schedule) -> std::io::Result<()> {
    let state = AppState::new(schedule);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_config(State(state): State<AppState>) -> Json<SchedulerConfig> {
    let schedule = state.schedule();
    let config = {
        let guard = schedule.read();
        guard.config().clone()
    };
    Json(config)
}

async fn update_config(
    State(state): State<AppState>,
    Json(config): Json<SchedulerConfig>,
) -> Result<Json<SchedulerConfig>, ApiError> {
    let schedule = state.schedule();
    {
        let mut guard = schedule.write();
        guard.set_config(config).map_err(ApiError::from)?;
    }
    let current = {
        let guard = schedule.read();
        guard.config().clone()
    };
    Ok(Json(current))
}

async fn get_time_maps(State(state): State<AppState>) -> Json<TimeMapSetConfig> {
    let schedule = state.schedule();
    let config = {
        let guard = schedule.read();
        guard.time_maps().to_config()
    };
    Json(config)
}

async fn update_time_maps(
    State(state): State<AppState>,
    Json(config): Json<TimeMapSetConfig>,
) -> Result<Json<TimeMapSetConfig>, ApiError> {
    let time_maps =
        TimeMapSet::from_config(&config).map_err(|err| ApiError::invalid(err.to_string()))?;
    let schedule = state.schedule();
    let current = {
        let mut guard = schedule.write();
        guard.set_time_maps(time_maps);
        guard.time_maps().to_config()
    };
    Ok(Json(current))
}

async fn get_calendar(State(state): State<AppState>) -> Json<BlockCalendarConfig> {
    let schedule = state.schedule();
    let config = {
        let guard = schedule.read();
        guard.calendar().to_config()
    };
    Json(config)
}

async fn update_calendar(
    State(state): State<AppState>,
    Json(config): Json<BlockCalendarConfig>,
) -> Json<BlockCalendarConfig> {
    let schedule = state.schedule();
    let current = {
        let mut guard = schedule.write();
        guard.set_calendar_from_config(&config);
        guard.calendar().to_config()
    };
    Json(current)
}

async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    let schedule = state.schedule();
    let tasks = {
        let guard = schedule.read();
        guard.tasks()?
    };
    Ok(Json(tasks))
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
) -> Result<Json<Task>, ApiError> {
    let schedule = state.schedule();
    let result = {
        let guard = schedule.read();
        guard.find_task(task_id)?
    };
    match result {
        Some(task) => Ok(Json(task)),
        None => Err(ApiError::not_found(format!("task {task_id} not found"))),
    }
}

async fn create_task(
    State(state): State<AppState>,
    Json(task): Json<Task>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let schedule = state.schedule();
    {
        let mut guard = schedule.write();
        if guard.find_task(task.id)?.is_some() {
            return Err(ApiError::Conflict(format!(
                "task {} already exists",
                task.id
            )));
        }
        guard
            .upsert_task_record(task.clone())
            .map_err(ApiError::from)?;
    }
    let created = {
        let guard = schedule.read();
        guard
            .find_task(task.id)?
            .ok_or_else(|| ApiError::internal("task not found after creation"))?
    };
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
    Json(task): Json<Task>,
) -> Result<Json<Task>, ApiError> {
    if task.id != task_id {
        return Err(ApiError::invalid(
            "task id in payload does not match path parameter",
        ));
    }
    let schedule = state.schedule();
    {
        let mut guard = schedule.write();
        if guard.find_task(task_id)?.is_none() {
            return Err(ApiError::not_found(format!("task {task_id} not found")));
        }
        guard
            .upsert_task_record(task.clone())
            .map_err(ApiError::from)?;
    }
    let updated = {
        let guard = schedule.read();
        guard
            .find_task(task_id)?
            .ok_or_else(|| ApiError::internal("task not found after update"))?
    };
    Ok(Json(updated))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let schedule = state.schedule();
    let removed = {
        let mut guard = schedule.write();
        guard.delete_task(task_id)?
    };
    if !removed {
        return Err(ApiError::not_found(format!("task {task_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn run_forecast(
    State(state): State<AppState>,
    payload: Option<Json<ForecastPayload>>,
) -> Result<Json<ForecastSummary>, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let schedule = state.schedule();
    let summary = {
        let mut guard = schedule.write();
        match payload.now {
            Some(now) => guard.refresh_at(now).map_err(ApiError::from)?,
            None => guard.refresh().map_err(ApiError::from)?,
        }
    };
    Ok(Json(summary))
}
