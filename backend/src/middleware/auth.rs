//! Authentication middleware
//!
//! Verifies the bearer JWT issued by the hosted auth service and scopes every
//! request to the establishment named in its claims.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ErrorDetail, ErrorResponse};
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    /// Tenant every query is scoped to
    pub establishment_id: uuid::Uuid,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Check if user has a specific permission
    pub fn has_permission(&self, resource: &str, action: &str) -> bool {
        let permission = format!("{}:{}", resource, action);
        self.permissions.contains(&permission)
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub establishment_id: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: i64,
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token,
        None => return unauthorized_response("Missing or invalid Authorization header"),
    };

    let auth_user = match decode_jwt(token, &state.config.jwt.secret).and_then(auth_user_from) {
        Ok(user) => user,
        Err(msg) => {
            tracing::debug!("Rejected token: {}", msg);
            return unauthorized_response(&msg);
        }
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// Decode and validate JWT token
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

/// Turn verified claims into the request's user
pub fn auth_user_from(claims: Claims) -> Result<AuthUser, String> {
    let user_id = uuid::Uuid::parse_str(&claims.sub)
        .map_err(|_| "Invalid user ID in token".to_string())?;
    let establishment_id = uuid::Uuid::parse_str(&claims.establishment_id)
        .map_err(|_| "Invalid establishment ID in token".to_string())?;

    Ok(AuthUser {
        user_id,
        establishment_id,
        permissions: claims.permissions,
    })
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            field: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message: "Authentication required".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

/// Permission guard for use in handlers
pub fn require_permission(user: &AuthUser, resource: &str, action: &str) -> AppResult<()> {
    if user.has_permission(resource, action) {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions(format!(
            "{}:{}",
            resource, action
        )))
    }
}
