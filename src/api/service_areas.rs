//! Service area CRUD handlers and the point-in-area lookup.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use super::{parse_id, AppState};
use crate::api::error::ApiError;
use crate::models::{ProviderInArea, ServiceArea, ServiceAreaPayload};
use crate::store::UpdateMode;
use crate::validation::{FieldErrors, INVALID_NUMBER, REQUIRED};

pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ServiceArea>>, ApiError> {
    Ok(Json(state.store.list_service_areas().await?))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ServiceAreaPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<ServiceArea>), ApiError> {
    let Json(payload) = payload?;
    let area = state.store.create_service_area(payload).await?;
    Ok((StatusCode::CREATED, Json(area)))
}

pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ServiceArea>, ApiError> {
    let id = parse_id("ServiceArea", &id)?;
    Ok(Json(state.store.get_service_area(id).await?))
}

pub async fn replace(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ServiceAreaPayload>, JsonRejection>,
) -> Result<Json<ServiceArea>, ApiError> {
    update(state, id, payload, UpdateMode::Replace).await
}

pub async fn partial_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ServiceAreaPayload>, JsonRejection>,
) -> Result<Json<ServiceArea>, ApiError> {
    update(state, id, payload, UpdateMode::Partial).await
}

async fn update(
    state: Arc<AppState>,
    id: String,
    payload: Result<Json<ServiceAreaPayload>, JsonRejection>,
    mode: UpdateMode,
) -> Result<Json<ServiceArea>, ApiError> {
    let id = parse_id("ServiceArea", &id)?;

    // Unknown ids are reported before body errors
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            state.store.get_service_area(id).await?;
            return Err(rejection.into());
        }
    };

    Ok(Json(state.store.update_service_area(id, payload, mode).await?))
}

pub async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id("ServiceArea", &id)?;
    state.store.delete_service_area(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct LookupQueryParams {
    /// Point latitude
    lat: Option<String>,
    /// Point longitude
    long: Option<String>,
}

impl LookupQueryParams {
    /// Parse both coordinates as `(lon, lat)`, collecting errors for each.
    fn coordinates(&self) -> Result<(f64, f64), FieldErrors> {
        let mut errors = FieldErrors::new();
        let lat = parse_coordinate(&mut errors, "lat", self.lat.as_deref());
        let lon = parse_coordinate(&mut errors, "long", self.long.as_deref());

        match (lon, lat) {
            (Some(lon), Some(lat)) => Ok((lon, lat)),
            _ => Err(errors),
        }
    }
}

fn parse_coordinate(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<f64> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        errors.add(field, REQUIRED);
        return None;
    };

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            errors.add(field, INVALID_NUMBER);
            None
        }
    }
}

/// Point-in-area lookup: every service area containing `(lat, long)`
pub async fn providers_in_the_area(
    State(state): State<Arc<AppState>>,
    params: Result<Query<LookupQueryParams>, QueryRejection>,
) -> Result<Json<Vec<ProviderInArea>>, ApiError> {
    let Query(params) = params?;
    let (lon, lat) = params.coordinates()?;

    let results = state.store.providers_in_area(lon, lat).await?;
    Ok(Json(results))
}
