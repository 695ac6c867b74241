use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        GenerateRequest, ListQuery, PlagiarismRequest, PlagiarismResponse, RefineRequest,
        RefineResponse, SeoRequest, SeoResponse, UpdateContentRequest,
    },
    repo_types::Content,
    services,
};
use crate::{
    auth::jwt::AuthUser,
    error::{ApiJson, ApiPath, ApiQuery, AppError},
    state::AppState,
};

// --- public routers ---

pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/content/generate", post(generate))
        .route("/content/projects", get(list_projects))
        .route(
            "/content/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
}

pub fn agent_routes() -> Router<AppState> {
    Router::new()
        .route("/content/refine", post(refine))
        .route("/content/seo", post(optimize_seo))
        .route("/content/plagiarism", post(check_plagiarism))
}

// --- handlers ---

#[instrument(skip(state, payload))]
pub async fn generate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<GenerateRequest>,
) -> Result<(StatusCode, Json<Content>), AppError> {
    let content = services::generate(&state, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(content)))
}

#[instrument(skip(state))]
pub async fn list_projects(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> Result<Json<Vec<Content>>, AppError> {
    Ok(Json(services::list(&state, user_id, q).await?))
}

#[instrument(skip(state))]
pub async fn get_project(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Content>, AppError> {
    Ok(Json(services::get(&state, user_id, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_project(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateContentRequest>,
) -> Result<Json<Content>, AppError> {
    Ok(Json(services::update(&state, user_id, id, payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_project(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn refine(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    ApiJson(payload): ApiJson<RefineRequest>,
) -> Result<Json<RefineResponse>, AppError> {
    Ok(Json(services::refine(&state, payload).await?))
}

#[instrument(skip(state, payload))]
pub async fn optimize_seo(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    ApiJson(payload): ApiJson<SeoRequest>,
) -> Result<Json<SeoResponse>, AppError> {
    Ok(Json(services::optimize_seo(&state, payload).await?))
}

#[instrument(skip(state, payload))]
pub async fn check_plagiarism(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    ApiJson(payload): ApiJson<PlagiarismRequest>,
) -> Result<Json<PlagiarismResponse>, AppError> {
    Ok(Json(services::check_plagiarism(&state, payload).await?))
}
