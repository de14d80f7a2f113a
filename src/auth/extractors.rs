use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::dto::{JwtKeys, TokenKind};
use crate::{error::AppError, session::Session, state::AppState};

fn invalid_token() -> AppError {
    AppError::AuthRequired {
        message: "Invalid or expired token".into(),
    }
}

/// Anonymous when no Authorization header is sent; rejects a header that
/// does not carry a valid, unrevoked access token.
#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(auth) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
            return Ok(Session::anonymous());
        };
        let auth = auth.to_str().map_err(|_| invalid_token())?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AppError::AuthRequired {
                message: "Invalid Authorization header".into(),
            })?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            invalid_token()
        })?;

        if claims.kind != TokenKind::Access {
            return Err(AppError::AuthRequired {
                message: "Access token required".into(),
            });
        }
        if state.sessions.is_revoked(claims.sub, claims.sgen) {
            warn!(user_id = %claims.sub, "token used after sign-out");
            return Err(invalid_token());
        }

        Ok(Session::authenticated(claims.sub))
    }
}

/// Session that must belong to a signed-in user.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        Ok(AuthUser(session.require()?))
    }
}
