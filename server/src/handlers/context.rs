use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::Json;
use uuid::Uuid;

use crate::store::EventScope;
use crate::utils::error::AppError;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Caller identity attached by the gateway in front of this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub tenant_id: Uuid,
    pub actor_id: Uuid,
}

impl RequestContext {
    pub fn scope(&self, event_id: Uuid) -> EventScope {
        EventScope::new(self.tenant_id, event_id)
    }
}

fn header_uuid(parts: &Parts, name: &str) -> Result<Uuid, AppError> {
    let raw = parts
        .headers
        .get(name)
        .ok_or_else(|| AppError::AuthError(format!("Missing {} header", name)))?;
    raw.to_str()
        .ok()
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| AppError::AuthError(format!("Invalid {} header", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            tenant_id: header_uuid(parts, TENANT_HEADER)?,
            actor_id: header_uuid(parts, ACTOR_HEADER)?,
        })
    }
}

/// `Json` whose rejection renders in the API error envelope.
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::ValidationError(rejection.body_text()))?;
        Ok(AppJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    async fn extract(builder: axum::http::request::Builder) -> Result<RequestContext, AppError> {
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        RequestContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_identity_headers_are_required() {
        let err = extract(HttpRequest::builder()).await.unwrap_err();
        assert_eq!(err.code(), "AUTH_ERROR");

        let err = extract(
            HttpRequest::builder()
                .header(TENANT_HEADER, Uuid::new_v4().to_string())
                .header(ACTOR_HEADER, "not-a-uuid"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "AUTH_ERROR");
    }

    #[tokio::test]
    async fn test_scope_uses_tenant_header() {
        let tenant = Uuid::new_v4();
        let event = Uuid::new_v4();
        let context = extract(
            HttpRequest::builder()
                .header(TENANT_HEADER, tenant.to_string())
                .header(ACTOR_HEADER, Uuid::new_v4().to_string()),
        )
        .await
        .unwrap();
        assert_eq!(context.scope(event), EventScope::new(tenant, event));
    }
}
