//! Bearer-token authentication boundary.
//!
//! Protected routes run through `auth_middleware`, which validates the
//! `Authorization: Bearer <jwt>` header (HS256) and places a `CurrentUser`
//! into request extensions. Public routes are composed without this layer.

use crate::auth::models::{CurrentUser, JwtClaims};
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use mediabroker_core::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthState {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthState {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Map a bearer token to its claims, or reject.
    pub fn verify(&self, token: &str) -> Result<JwtClaims, AppError> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    if !auth_header.starts_with("Bearer ") {
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    }

    let token = &auth_header[7..]; // Remove "Bearer " prefix
    match auth_state.verify(token) {
        Ok(claims) => {
            request.extensions_mut().insert(CurrentUser {
                user_id: claims.sub,
            });
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            HttpAppError(e).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret-key-0123456789";

    fn token(sub: &str, exp_offset_secs: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = JwtClaims {
            sub: sub.to_string(),
            exp: now + exp_offset_secs,
            iat: Some(now),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_claims() {
        let auth = AuthState::new(SECRET);
        let claims = auth.verify(&token("user-42", 3600)).unwrap();
        assert_eq!(claims.sub, "user-42");
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = AuthState::new(SECRET);
        let err = auth.verify(&token("user-42", -3600)).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let auth = AuthState::new(SECRET);
        assert!(auth.verify("not-a-jwt").is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let auth = AuthState::new("a-completely-different-secret");
        assert!(auth.verify(&token("user-42", 3600)).is_err());
    }
}
