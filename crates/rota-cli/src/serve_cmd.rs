use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use rota_core::instances::NewAdHocInstance;
use rota_core::store::InstanceFilter;
use rota_core::{RescheduleReport, RescheduleScope, ScheduleError, Scheduler};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        let status = match &err {
            ScheduleError::Validation(_) => StatusCode::BAD_REQUEST,
            ScheduleError::NotFound(_) => StatusCode::NOT_FOUND,
            ScheduleError::Conflict(_) | ScheduleError::PartialCascade { .. } => {
                StatusCode::CONFLICT
            }
            ScheduleError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ListInstancesQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub plan_id: Option<Uuid>,
    #[serde(default)]
    pub include_hidden: bool,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    pub new_date: NaiveDate,
    #[serde(default = "default_scope")]
    pub scope: RescheduleScope,
}

fn default_scope() -> RescheduleScope {
    RescheduleScope::ThisWeek
}

/// A reschedule report plus one human-readable line per failed cascade.
#[derive(Debug, Serialize)]
pub struct RescheduleResponse {
    #[serde(flatten)]
    pub report: RescheduleReport,
    pub warnings: Vec<String>,
}

impl From<RescheduleReport> for RescheduleResponse {
    fn from(report: RescheduleReport) -> Self {
        let warnings = report
            .failed
            .iter()
            .map(|f| format!("instance {} was not moved: {}", f.instance_id, f.error))
            .collect();
        Self { report, warnings }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(scheduler: Scheduler) -> Router {
    Router::new()
        .route("/api/plans", get(list_plans))
        .route("/api/plans/{id}", get(get_plan))
        .route("/api/plans/{id}/generate", post(generate))
        .route("/api/instances", get(list_instances).post(create_instance))
        .route(
            "/api/instances/{id}",
            get(get_instance).delete(delete_instance),
        )
        .route("/api/instances/{id}/reschedule", post(reschedule))
        .route("/api/instances/{id}/complete", post(complete))
        .route("/api/instances/{id}/incomplete", post(incomplete))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(scheduler)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(scheduler: Scheduler, bind: &str, port: u16) -> Result<()> {
    let app = build_router(scheduler);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("rota serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("rota serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for Ctrl+C; shutting down");
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_plans(State(scheduler): State<Scheduler>) -> Result<Response, AppError> {
    let plans = scheduler.list_plans().await?;
    Ok(Json(plans).into_response())
}

async fn get_plan(
    State(scheduler): State<Scheduler>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let plan = scheduler.get_plan(id).await?;
    Ok(Json(plan).into_response())
}

async fn generate(
    State(scheduler): State<Scheduler>,
    Path(id): Path<Uuid>,
    Json(req): Json<GenerateRequest>,
) -> Result<Response, AppError> {
    let report = scheduler.ensure_generated(id, req.from, req.to).await?;
    Ok(Json(report).into_response())
}

async fn list_instances(
    State(scheduler): State<Scheduler>,
    Query(query): Query<ListInstancesQuery>,
) -> Result<Response, AppError> {
    let filter = InstanceFilter {
        workout_plan_id: query.plan_id,
        exercise_id: None,
        include_hidden: query.include_hidden,
    };
    let instances = scheduler
        .list_instances(query.from, query.to, &filter)
        .await?;
    Ok(Json(instances).into_response())
}

async fn create_instance(
    State(scheduler): State<Scheduler>,
    Json(req): Json<NewAdHocInstance>,
) -> Result<Response, AppError> {
    let instance = scheduler.create_ad_hoc(req).await?;
    Ok((StatusCode::CREATED, Json(instance)).into_response())
}

async fn get_instance(
    State(scheduler): State<Scheduler>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let instance = scheduler.get_instance(id).await?;
    Ok(Json(instance).into_response())
}

async fn delete_instance(
    State(scheduler): State<Scheduler>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    scheduler.delete_instance(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn reschedule(
    State(scheduler): State<Scheduler>,
    Path(id): Path<Uuid>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Response, AppError> {
    let report = scheduler.reschedule(id, req.new_date, req.scope).await?;
    Ok(Json(RescheduleResponse::from(report)).into_response())
}

async fn complete(
    State(scheduler): State<Scheduler>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let instance = scheduler.mark_completed(id).await?;
    Ok(Json(instance).into_response())
}

async fn incomplete(
    State(scheduler): State<Scheduler>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let instance = scheduler.mark_incomplete(id).await?;
    Ok(Json(instance).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
