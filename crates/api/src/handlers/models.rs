//! Handler for the model catalog.

use axum::extract::Query;
use axum::Json;
use serde::Deserialize;
use weave_core::catalog::{self, Modality, ModelSpec};
use weave_core::error::CoreError;

use crate::error::AppResult;
use crate::middleware::auth::Principal;
use crate::response::DataResponse;

#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    pub modality: Option<String>,
}

/// GET /api/v1/models?modality=text-to-image
pub async fn list(
    _principal: Principal,
    Query(params): Query<ModelsQuery>,
) -> AppResult<Json<DataResponse<Vec<&'static ModelSpec>>>> {
    let modality = match &params.modality {
        Some(raw) => Some(
            raw.parse::<Modality>()
                .map_err(|msg| CoreError::validation("modality", msg))?,
        ),
        None => None,
    };
    Ok(Json(DataResponse {
        data: catalog::list_models(modality),
    }))
}
