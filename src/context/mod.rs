//! Per-request context store.
//!
//! Every request runs inside its own task-local [`RequestContext`] scope,
//! opened once by the outermost middleware. The context is re-attached
//! automatically across every `.await`, so two concurrently handled
//! requests can never observe each other's values. Downstream code
//! (guards, repositories, persistence hooks) reads the context through
//! [`get`] without threading a parameter through every call.

use std::future::Future;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::auth::payload::AccessTokenPayload;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Request context is not initialized, access is only valid within a request scope")]
    NotInitialized,
}

/// Mutable per-request state. Created before any guard runs, written only
/// by the authentication gate and tenant resolver, read by everything
/// downstream.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub jwt_payload: Option<AccessTokenPayload>,
    pub tenant_id: Option<String>,
    pub auth_header: Option<String>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Default::default()
        }
    }
}

tokio::task_local! {
    static REQUEST_CONTEXT: Arc<RwLock<RequestContext>>;
}

/// Run `fut` inside an isolated context scope seeded with `seed`.
///
/// The scope covers the whole dynamic extent of the future, including
/// every task it awaits on the same logical chain.
pub async fn scope<F>(seed: RequestContext, fut: F) -> F::Output
where
    F: Future,
{
    REQUEST_CONTEXT
        .scope(Arc::new(RwLock::new(seed)), fut)
        .await
}

/// Snapshot of the current request's context.
pub fn get() -> Result<RequestContext, ContextError> {
    REQUEST_CONTEXT
        .try_with(|cell| cell.read().unwrap_or_else(|e| e.into_inner()).clone())
        .map_err(|_| ContextError::NotInitialized)
}

/// Mutate the current request's context in place.
fn with_mut<R>(f: impl FnOnce(&mut RequestContext) -> R) -> Result<R, ContextError> {
    REQUEST_CONTEXT
        .try_with(|cell| f(&mut cell.write().unwrap_or_else(|e| e.into_inner())))
        .map_err(|_| ContextError::NotInitialized)
}

/// Record the tenant resolved for this request (may be none on public routes).
pub fn set_tenant_id(tenant_id: Option<String>) -> Result<(), ContextError> {
    with_mut(|ctx| ctx.tenant_id = tenant_id)
}

/// Record the verified identity after authentication succeeds.
pub fn set_authenticated(
    payload: AccessTokenPayload,
    auth_header: String,
    tenant_id: Option<String>,
) -> Result<(), ContextError> {
    with_mut(|ctx| {
        ctx.user_id = Some(payload.sub.clone());
        ctx.jwt_payload = Some(payload);
        ctx.auth_header = Some(auth_header);
        ctx.tenant_id = tenant_id;
    })
}

/// Tenant id of the current request, if one was resolved.
pub fn tenant_id() -> Result<Option<String>, ContextError> {
    REQUEST_CONTEXT
        .try_with(|cell| {
            cell.read()
                .unwrap_or_else(|e| e.into_inner())
                .tenant_id
                .clone()
        })
        .map_err(|_| ContextError::NotInitialized)
}
