use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::claims::TokenKind;
use super::jwt::JwtKeys;
use crate::{accounts::Role, error::ApiError, ledger::CreditStore};

/// Caller identified by a valid access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header".into()))?;

        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Unauthorized("Invalid or expired token".into())
        })?;

        if claims.kind != TokenKind::Access {
            return Err(ApiError::Unauthorized("Access token required".into()));
        }

        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

/// Caller whose stored account currently has the admin role.
///
/// The role claim in the token is not trusted here, so a demotion takes effect
/// on the next request rather than when the token expires.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
    Arc<dyn CreditStore>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let store = Arc::<dyn CreditStore>::from_ref(state);
        let account = store
            .find_by_id(user.id)
            .await
            .map_err(ApiError::store)?
            .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;
        if account.role != Role::Admin {
            warn!(user_id = %user.id, token_role = user.role.as_str(), "admin route refused");
            return Err(ApiError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(AuthUser {
            id: account.id,
            role: account.role,
        }))
    }
}
