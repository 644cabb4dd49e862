use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use super::claims::{Claims, TokenKind};
use crate::{config::JwtConfig, error::ApiError, state::AppState};

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64) * 60),
            refresh_ttl: Duration::from_secs((cfg.refresh_ttl_minutes.max(0) as u64) * 60),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
}

impl JwtKeys {
    fn sign_with_kind(&self, user_id: Uuid, email: &str, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, email, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, email, TokenKind::Refresh)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            anyhow::bail!("not a refresh token");
        }
        Ok(claims)
    }
}

/// Authenticated principal taken from a bearer access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
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
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token.".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token.".into()))?;

        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "invalid or expired token");
                return Err(ApiError::Unauthorized("Invalid or expired token.".into()));
            }
        };

        if claims.kind != TokenKind::Access {
            return Err(ApiError::Unauthorized("Access token required.".into()));
        }
        if claims.email.trim().is_empty() {
            return Err(ApiError::Unauthorized("Invalid token payload.".into()));
        }

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, Request, StatusCode};

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        })
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id, "alice@company.test").expect("sign access");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "alice@company.test");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn sign_and_verify_refresh_token_and_verify_refresh() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let user_id = Uuid::new_v4();
        let token = keys.sign_refresh(user_id, "a@b.test").expect("sign refresh");
        let claims = keys.verify_refresh(&token).expect("verify refresh");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn verify_refresh_rejects_access_token() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.sign_access(Uuid::new_v4(), "a@b.test").expect("sign access");
        let err = keys.verify_refresh(&token).unwrap_err();
        assert!(err.to_string().contains("not a refresh token"));
    }

    #[test]
    fn verify_rejects_wrong_issuer_audience_or_secret() {
        let good = make_keys("same-secret", "good-iss", "good-aud");
        let token = good.sign_access(Uuid::new_v4(), "a@b.test").expect("sign access");
        assert!(make_keys("same-secret", "bad-iss", "good-aud").verify(&token).is_err());
        assert!(make_keys("same-secret", "good-iss", "bad-aud").verify(&token).is_err());
        assert!(make_keys("other-secret", "good-iss", "good-aud").verify(&token).is_err());
    }

    async fn extract(state: &AppState, header: Option<String>) -> Result<AuthUser, ApiError> {
        let mut req = Request::builder().uri("/api/reservations");
        if let Some(h) = header {
            req = req.header(AUTHORIZATION, h);
        }
        let (mut parts, _) = req.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn extractor_yields_identity_from_access_token() {
        let (state, _store) = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let id = Uuid::new_v4();
        let token = keys.sign_access(id, "alice@company.test").unwrap();
        let user = extract(&state, Some(format!("Bearer {token}"))).await.unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "alice@company.test");
    }

    #[tokio::test]
    async fn extractor_rejects_missing_malformed_and_refresh_tokens() {
        let (state, _store) = AppState::fake();
        let keys = JwtKeys::from_ref(&state);

        let err = extract(&state, None).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err = extract(&state, Some("Basic abc".into())).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err = extract(&state, Some("Bearer not-a-jwt".into())).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid or expired token.");

        let refresh = keys.sign_refresh(Uuid::new_v4(), "a@b.test").unwrap();
        let err = extract(&state, Some(format!("Bearer {refresh}"))).await.unwrap_err();
        assert_eq!(err.to_string(), "Access token required.");
    }
}
