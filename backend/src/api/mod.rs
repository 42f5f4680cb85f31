use axum::Json;
use axum::extract::Path;
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Decision, DraftUpdate, LoginTab};
use crate::services::{SessionStatus, WorkspaceView};
use crate::state::AppState;

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    tab: LoginTab,
    login_id: String,
}

#[derive(Serialize)]
struct WorkspaceCreated {
    workspace_id: Uuid,
}

#[derive(Serialize)]
struct Submitted {
    id: String,
    #[serde(flatten)]
    view: WorkspaceView,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session", get(session))
        .route("/workspaces", post(open_workspace))
        .route("/workspaces/{id}", get(show_workspace).delete(close_workspace))
        .route("/workspaces/{id}/login", post(login))
        .route("/workspaces/{id}/logout", post(logout))
        .route("/workspaces/{id}/draft", put(edit_draft))
        .route("/workspaces/{id}/submit", post(submit))
        .route("/workspaces/{id}/requests/{request_id}/{decision}", post(decide))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> StatusCode {
    if state.desk.is_connected() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn session(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(SessionStatus::from(&state.desk.session_state()))
}

async fn open_workspace(State(state): State<AppState>) -> (StatusCode, Json<WorkspaceCreated>) {
    let workspace_id = state.open_workspace().await;
    (StatusCode::CREATED, Json(WorkspaceCreated { workspace_id }))
}

async fn close_workspace(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.close_workspace(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn show_workspace(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkspaceView>, AppError> {
    let workspace = state.workspace(id).await?;
    let workspace = workspace.lock().await;
    Ok(Json(state.desk.view(&workspace).await))
}

async fn login(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<WorkspaceView>, AppError> {
    let workspace = state.workspace(id).await?;
    let mut workspace = workspace.lock().await;
    state.desk.login(&mut workspace, req.tab, &req.login_id)?;
    Ok(Json(state.desk.view(&workspace).await))
}

async fn logout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkspaceView>, AppError> {
    let workspace = state.workspace(id).await?;
    let mut workspace = workspace.lock().await;
    state.desk.logout(&mut workspace);
    Ok(Json(state.desk.view(&workspace).await))
}

async fn edit_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<DraftUpdate>,
) -> Result<Json<WorkspaceView>, AppError> {
    let workspace = state.workspace(id).await?;
    let mut workspace = workspace.lock().await;
    state.desk.edit_draft(&mut workspace, req)?;
    Ok(Json(state.desk.view(&workspace).await))
}

async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Submitted>), AppError> {
    let workspace = state.workspace(id).await?;
    let mut workspace = workspace.lock().await;
    let id = state.desk.submit(&mut workspace).await?;
    let view = state.desk.view(&workspace).await;
    Ok((StatusCode::CREATED, Json(Submitted { id, view })))
}

async fn decide(
    State(state): State<AppState>,
    Path((id, request_id, decision)): Path<(Uuid, String, Decision)>,
) -> Result<Json<WorkspaceView>, AppError> {
    let workspace = state.workspace(id).await?;
    let mut workspace = workspace.lock().await;
    state.desk.decide(&mut workspace, &request_id, decision).await?;
    Ok(Json(state.desk.view(&workspace).await))
}
