//! Provider CRUD handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};

use super::{parse_id, AppState};
use crate::api::error::ApiError;
use crate::models::{Provider, ProviderPayload};
use crate::store::UpdateMode;

pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Provider>>, ApiError> {
    Ok(Json(state.store.list_providers().await?))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProviderPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Provider>), ApiError> {
    let Json(payload) = payload?;
    let provider = state.store.create_provider(payload).await?;
    Ok((StatusCode::CREATED, Json(provider)))
}

pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Provider>, ApiError> {
    let id = parse_id("Provider", &id)?;
    Ok(Json(state.store.get_provider(id).await?))
}

pub async fn replace(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ProviderPayload>, JsonRejection>,
) -> Result<Json<Provider>, ApiError> {
    update(state, id, payload, UpdateMode::Replace).await
}

pub async fn partial_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ProviderPayload>, JsonRejection>,
) -> Result<Json<Provider>, ApiError> {
    update(state, id, payload, UpdateMode::Partial).await
}

async fn update(
    state: Arc<AppState>,
    id: String,
    payload: Result<Json<ProviderPayload>, JsonRejection>,
    mode: UpdateMode,
) -> Result<Json<Provider>, ApiError> {
    let id = parse_id("Provider", &id)?;

    // Unknown ids are reported before body errors
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            state.store.get_provider(id).await?;
            return Err(rejection.into());
        }
    };

    Ok(Json(state.store.update_provider(id, payload, mode).await?))
}

pub async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id("Provider", &id)?;
    state.store.delete_provider(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
