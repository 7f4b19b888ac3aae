//! Shop profiles ("projects") owned by the signed-in user.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use validator::Validate;

use shopreel_models::{ProjectPatch, ShopProfile};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::JsonBody;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ShopProfile>,
}

pub async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ProjectListResponse>> {
    let projects = state.projects.list(&user.id).await?;
    Ok(Json(ProjectListResponse { projects }))
}

pub async fn get_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ShopProfile>> {
    state
        .projects
        .get(&user.id, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Project not found"))
}

pub async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(profile): JsonBody<ShopProfile>,
) -> ApiResult<(StatusCode, Json<ShopProfile>)> {
    profile
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let created = state.projects.create(&user.id, &profile).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<ProjectPatch>,
) -> ApiResult<Json<ShopProfile>> {
    patch
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    if patch.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }
    state
        .projects
        .update(&user.id, &id, &patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Project not found"))
}

pub async fn delete_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.projects.delete(&user.id, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Project not found"))
    }
}
