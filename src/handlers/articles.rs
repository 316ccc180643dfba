use axum::{
    extract::{Path, Query},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::{Article, Criteria, DatabaseManager, Record, TenantScopedRepository};
use crate::error::ApiError;

async fn repository() -> Result<TenantScopedRepository<Article>, ApiError> {
    Ok(TenantScopedRepository::new(DatabaseManager::pool().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub author_id: Option<String>,
}

/// GET /api/articles - list the tenant's articles.
///
/// Note the handler never mentions the tenant: the repository injects the
/// tenant predicate from the request context.
pub async fn list(Query(params): Query<ListParams>) -> Result<Json<Value>, ApiError> {
    let mut criteria = Criteria::new();
    if let Some(author_id) = params.author_id {
        criteria = criteria.eq("author_id", author_id);
    }

    let articles = repository().await?.find_all(criteria).await?;
    Ok(Json(json!({ "success": true, "data": articles })))
}

/// GET /api/articles/:id
pub async fn get(Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let article = repository().await?.find_by_id(&id).await?;
    Ok(Json(json!({ "success": true, "data": article })))
}

/// POST /api/articles - create an article. Tenant and author columns are
/// filled by the auto-population hook.
pub async fn create(Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    let record = Record::from_api_input(body)?;
    let article = repository().await?.insert(record).await?;
    Ok(Json(json!({ "success": true, "data": article })))
}

/// PUT /api/articles/:id - full update. The body must round-trip the
/// `version` read earlier; a stale one is rejected with 409.
pub async fn update(
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let record = Record::from_api_input(body)?;
    let article = repository().await?.update(&id, record).await?;
    Ok(Json(json!({ "success": true, "data": article })))
}

/// PATCH /api/articles/:id - field-level patch, not optimistically locked.
pub async fn patch(
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let record = Record::from_api_input(body)?;
    let article = repository().await?.update_partial(&id, record).await?;
    Ok(Json(json!({ "success": true, "data": article })))
}

/// DELETE /api/articles/:id - soft delete.
pub async fn delete(Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let archived = repository()
        .await?
        .delete(Criteria::new().eq("id", id))
        .await?;

    if archived == 0 {
        return Err(ApiError::not_found("Record not found"));
    }
    Ok(Json(json!({ "success": true, "data": { "archived": archived } })))
}
