use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::ApiError;
use crate::models::user::Role;
use crate::services::token_service::TokenService;

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
pub const ADMIN_OR_STAFF: &[Role] = &[Role::Admin, Role::Staff];

/// Guard state for one route group: the verifier plus the roles let through.
#[derive(Clone)]
pub struct RoleGuard {
    tokens: TokenService,
    allowed: &'static [Role],
}

impl RoleGuard {
    pub fn new(tokens: TokenService, allowed: &'static [Role]) -> Self {
        Self { tokens, allowed }
    }
}

/// Stateless per-request check: bearer token → verify → role in allowed set.
///
/// On success the verified `Claims` are placed in the request extensions.
pub async fn guard(
    State(guard): State<RoleGuard>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(ApiError::Unauthorized(
            "Missing or malformed Authorization header".into(),
        ));
    };

    let claims = guard.tokens.verify(bearer.token())?;

    if !guard.allowed.contains(&claims.role) {
        tracing::warn!(
            "{} ({}) denied on {} {}",
            claims.sub,
            claims.role,
            req.method(),
            req.uri().path()
        );
        return Err(ApiError::Forbidden(
            "You do not have permission to access this resource".into(),
        ));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
