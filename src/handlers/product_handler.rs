use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::models::product::{CreateProduct, UpdateProduct};
use crate::models::user::Claims;
use crate::AppState;

// Ids start at 1, so zero and negatives are rejected like unparsable ones.
fn product_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    match path {
        Ok(Path(id)) if id > 0 => Ok(id),
        _ => Err(ApiError::BadRequest("Invalid product ID".into())),
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|e| {
        tracing::debug!("rejected product payload: {}", e);
        ApiError::BadRequest("Invalid request payload".into())
    })
}

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Product {} not found", id))
}

pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state.store.list_products().await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = product_id(path)?;
    let product = state.store.find_product(id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<CreateProduct>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(body)?;
    payload.validate()?;

    let product = state
        .store
        .insert_product(payload)
        .await
        .map_err(|e| ApiError::internal("Failed to create product", e))?;

    tracing::info!("{} created product {} ({})", claims.sub, product.id, product.code);
    Ok((StatusCode::CREATED, Json(product)))
}

/// Partial update: only the fields present in the body change.
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateProduct>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = product_id(path)?;
    let changes = json_body(body)?;
    changes.validate()?;

    let product = state
        .store
        .update_product(id, changes)
        .await
        .map_err(|e| ApiError::internal("Failed to update product", e))?
        .ok_or_else(|| not_found(id))?;

    tracing::info!("{} updated product {}", claims.sub, id);
    Ok(Json(product))
}

/// Soft delete. A second delete of the same id is a 404.
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = product_id(path)?;

    let deleted = state
        .store
        .delete_product(id)
        .await
        .map_err(|e| ApiError::internal("Failed to delete product", e))?;

    if !deleted {
        return Err(not_found(id));
    }

    tracing::info!("{} deleted product {}", claims.sub, id);
    Ok(StatusCode::NO_CONTENT)
}
