use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::{AppError, ServiceError},
    state::SharedState,
};

/// Claims carried by a signed session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user identifier.
    pub sub: Uuid,
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
}

/// Identity resolved from a session token and bound to a request or
/// connection for its entire lifetime.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Stable user identifier.
    pub id: Uuid,
    /// Display email from the directory.
    pub email: String,
}

/// Verify a session token and resolve the subject against the user directory.
///
/// Fails closed: a missing/invalid/expired token or a subject the
/// directory no longer knows all reject authentication.
pub async fn authenticate(
    state: &SharedState,
    token: &str,
) -> Result<AuthenticatedUser, ServiceError> {
    let key = DecodingKey::from_secret(state.config().token_secret().as_bytes());
    let data = decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256))
        .map_err(|err| ServiceError::Auth(format!("invalid session token: {err}")))?;

    let user = state
        .directory()
        .find_user(data.claims.sub)
        .await
        .map_err(|err| ServiceError::ExternalUnavailable(err.to_string()))?
        .ok_or_else(|| ServiceError::Auth("user no longer exists".into()))?;

    Ok(AuthenticatedUser {
        id: user.id,
        email: user.email,
    })
}

/// Middleware that authenticates the `Authorization: Bearer` header and
/// injects the resolved [`AuthenticatedUser`] into request extensions.
pub async fn require_user(
    State(state): State<SharedState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

    let user = match authenticate(&state, token).await {
        Ok(user) => user,
        Err(err) => {
            warn!(error = %err, "request authentication failed");
            return Err(err.into());
        }
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Sign a session token for a user, used by tests and operator tooling.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    expires_at: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id,
        exp: expires_at,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use super::*;
    use crate::{
        config::AppConfig,
        external::{StaticTrackSource, StaticUserDirectory, UserRecord},
        state::AppState,
    };

    const SECRET: &str = "test-secret";

    fn state_with_user(user_id: Uuid) -> SharedState {
        let directory = StaticUserDirectory::default();
        directory.insert(UserRecord {
            id: user_id,
            email: "player@example.com".into(),
        });
        AppState::new(
            AppConfig::with_secret(SECRET),
            Arc::new(directory),
            Arc::new(StaticTrackSource::default()),
        )
    }

    fn valid_expiry() -> u64 {
        (SystemTime::now() + Duration::from_secs(3600))
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    #[tokio::test]
    async fn accepts_a_valid_token_for_a_known_user() {
        let user_id = Uuid::new_v4();
        let state = state_with_user(user_id);
        let token = issue_token(SECRET, user_id, valid_expiry()).unwrap();

        let user = authenticate(&state, &token).await.unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.email, "player@example.com");
    }

    #[tokio::test]
    async fn rejects_garbage_and_wrong_secret_tokens() {
        let user_id = Uuid::new_v4();
        let state = state_with_user(user_id);

        let err = authenticate(&state, "not-a-token").await.unwrap_err();
        assert!(matches!(err, ServiceError::Auth(_)));

        let forged = issue_token("other-secret", user_id, valid_expiry()).unwrap();
        let err = authenticate(&state, &forged).await.unwrap_err();
        assert!(matches!(err, ServiceError::Auth(_)));
    }

    #[tokio::test]
    async fn rejects_tokens_for_deleted_users() {
        let user_id = Uuid::new_v4();
        let state = state_with_user(Uuid::new_v4());
        let token = issue_token(SECRET, user_id, valid_expiry()).unwrap();

        let err = authenticate(&state, &token).await.unwrap_err();
        assert!(matches!(err, ServiceError::Auth(_)));
    }

    #[tokio::test]
    async fn rejects_expired_tokens() {
        let user_id = Uuid::new_v4();
        let state = state_with_user(user_id);
        let expired = (SystemTime::now() - Duration::from_secs(3600))
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let token = issue_token(SECRET, user_id, expired).unwrap();

        let err = authenticate(&state, &token).await.unwrap_err();
        assert!(matches!(err, ServiceError::Auth(_)));
    }
}
