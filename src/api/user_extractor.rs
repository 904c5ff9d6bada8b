use crate::model::UserContext;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};

/// The caller identifies itself through request headers: `x-user-id` plus
/// optional `x-user-email` and `x-user-name`. Requests without an id get the
/// development default user; production deployments put an authenticating
/// proxy in front that always sets the header.
#[async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(context_from_headers(&parts.headers))
    }
}

fn context_from_headers(headers: &HeaderMap) -> UserContext {
    match header_value(headers, "x-user-id") {
        Some(user_id) => UserContext::with_details(
            user_id,
            header_value(headers, "x-user-email"),
            header_value(headers, "x-user-name"),
        ),
        None => UserContext::default_user(),
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
