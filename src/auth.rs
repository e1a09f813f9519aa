use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::{errors::ServiceError, AppState};

/// Claims carried by bearer tokens. Tokens are issued by the identity
/// provider; this service only verifies them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiration time (unix seconds)
    pub exp: i64,
}

/// Authenticated buyer or staff member, extracted from the Authorization
/// header. Checkout takes the buyer identity from here — never from the
/// request body.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub name: Option<String>,
    pub email: String,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ServiceError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))
}

/// Issues a token for the given claims. Only used by tests and local tooling.
pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, ServiceError> {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ServiceError::InternalError(format!("failed to sign token: {}", e)))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))?
            .trim();

        let claims = verify_token(token, &state.config.jwt_secret)?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
            roles: claims.roles,
        })
    }
}

/// Extractor for admin-only endpoints.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ServiceError::Forbidden(
                "admin role required".to_string(),
            ));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "a_sufficiently_long_secret_for_testing_purposes";

    fn claims(roles: Vec<String>) -> Claims {
        Claims {
            sub: "user-1".to_string(),
            name: Some("Test User".to_string()),
            email: "buyer@example.com".to_string(),
            roles,
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp(),
        }
    }

    #[test]
    fn round_trips_a_valid_token() {
        let token = issue_token(&claims(vec![]), SECRET).unwrap();
        let decoded = verify_token(&token, SECRET).unwrap();
        assert_eq!(decoded.sub, "user-1");
        assert_eq!(decoded.email, "buyer@example.com");
    }

    #[test]
    fn rejects_a_token_signed_with_the_wrong_secret() {
        let token = issue_token(&claims(vec![]), "another_secret_that_is_also_long_enough").unwrap();
        assert!(verify_token(&token, SECRET).is_err());
    }

    #[test]
    fn admin_role_check() {
        let user = AuthenticatedUser {
            user_id: "u".into(),
            name: None,
            email: "staff@example.com".into(),
            roles: vec!["admin".into()],
        };
        assert!(user.is_admin());
    }
}
