use crate::auth::dto::{
    AuthResponse, Claims, JwtKeys, LoginRequest, PublicUser, RegisterRequest, TokenKind,
};
use crate::auth::repo::User;
use crate::config::JwtConfig;
use crate::error::{AppError, RemoteContext};
use crate::session::SessionEvent;
use crate::state::AppState;
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
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

impl JwtKeys {
    fn sign_with_kind(
        &self,
        user_id: Uuid,
        generation: u64,
        kind: TokenKind,
    ) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
            sgen: generation,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: Uuid, generation: u64) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, generation, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user_id: Uuid, generation: u64) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, generation, TokenKind::Refresh)
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

    fn issue_pair(&self, user: &User, generation: u64) -> Result<AuthResponse, AppError> {
        let access_token = self.sign_access(user.id, generation).map_err(|e| {
            error!(error = %e, "jwt sign access failed");
            AppError::remote("failed to issue session", e)
        })?;
        let refresh_token = self.sign_refresh(user.id, generation).map_err(|e| {
            error!(error = %e, "jwt sign refresh failed");
            AppError::remote("failed to issue session", e)
        })?;
        Ok(AuthResponse {
            access_token,
            refresh_token,
            user: PublicUser {
                id: user.id,
                email: user.email.clone(),
            },
        })
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    Ok(email)
}

pub async fn register(st: &AppState, payload: RegisterRequest) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&payload.email)?;
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation("Password too short"));
    }

    if User::find_by_email(&st.db, &email)
        .await
        .remote_ctx("Failed to look up user")?
        .is_some()
    {
        warn!(email = %email, "email already registered");
        return Err(AppError::validation("Email already registered"));
    }

    let hash = hash_password(&payload.password)
        .map_err(|e| AppError::remote("Failed to register user", e))?;
    // a concurrent registration can still win the race to the unique index
    let user = match User::create(&st.db, &email, &hash).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %email, "email registered concurrently");
            return Err(AppError::validation("Email already registered"));
        }
        Err(e) => return Err(AppError::remote("Failed to register user", e)),
    };

    let resp = JwtKeys::from_ref(st).issue_pair(&user, st.sessions.generation(user.id))?;
    st.sessions.publish(SessionEvent::SignedUp(user.id));
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(resp)
}

pub async fn login(st: &AppState, payload: LoginRequest) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&payload.email)?;
    let invalid = || AppError::AuthRequired {
        message: "Invalid credentials".into(),
    };

    let Some(user) = User::find_by_email(&st.db, &email)
        .await
        .remote_ctx("Failed to look up user")?
    else {
        warn!(email = %email, "login unknown email");
        return Err(invalid());
    };

    let ok = verify_password(&payload.password, &user.password_hash)
        .map_err(|e| AppError::remote("Failed to verify credentials", e))?;
    if !ok {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let resp = JwtKeys::from_ref(st).issue_pair(&user, st.sessions.generation(user.id))?;
    st.sessions.publish(SessionEvent::SignedIn(user.id));
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(resp)
}

pub async fn refresh(st: &AppState, refresh_token: &str) -> Result<AuthResponse, AppError> {
    let keys = JwtKeys::from_ref(st);
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::AuthRequired {
            message: "Invalid refresh token".into(),
        }
    })?;
    if st.sessions.is_revoked(claims.sub, claims.sgen) {
        return Err(AppError::AuthRequired {
            message: "Session has been signed out".into(),
        });
    }

    let user = User::find_by_id(&st.db, claims.sub)
        .await
        .remote_ctx("Failed to look up user")?
        .ok_or_else(|| AppError::AuthRequired {
            message: "User not found".into(),
        })?;

    let resp = keys.issue_pair(&user, st.sessions.generation(user.id))?;
    st.sessions.publish(SessionEvent::Refreshed(user.id));
    Ok(resp)
}

pub fn logout(st: &AppState, user_id: Uuid) {
    st.sessions.sign_out(user_id);
    info!(user_id = %user_id, "user logged out");
}

pub async fn current_user(st: &AppState, user_id: Uuid) -> Result<PublicUser, AppError> {
    let user = User::find_by_id(&st.db, user_id)
        .await
        .remote_ctx("Failed to load user")?
        .ok_or_else(|| {
            error!(user_id = %user_id, "user not found");
            AppError::AuthRequired {
                message: "User not found".into(),
            }
        })?;
    Ok(PublicUser {
        id: user.id,
        email: user.email,
    })
}
