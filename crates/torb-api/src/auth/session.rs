// Session tokens carried in cookies
// Decision: Use HS256 JWTs so either node can validate a session without shared storage
// Decision: Users and administrators get separate cookies and a kind claim; one never opens the other

use anyhow::{Context, Result};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use torb_core::AccountKind;

use crate::config::SessionConfig;

pub const USER_COOKIE: &str = "torb_user";
pub const ADMIN_COOKIE: &str = "torb_admin";

/// Cookie holding the session for a principal kind
pub fn cookie_name(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::User => USER_COOKIE,
        AccountKind::Administrator => ADMIN_COOKIE,
    }
}

fn kind_claim(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::User => "user",
        AccountKind::Administrator => "admin",
    }
}

/// JWT claims for a login session
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (principal id)
    pub sub: String,
    /// `user` or `admin`
    pub kind: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Issues and validates session tokens
#[derive(Clone)]
pub struct SessionService {
    config: SessionConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionService {
    pub fn new(config: SessionConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn issue(&self, kind: AccountKind, principal_id: i64) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::from_std(self.config.max_age)?;

        let claims = SessionClaims {
            sub: principal_id.to_string(),
            kind: kind_claim(kind).to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .context("Failed to encode session token")
    }

    /// Principal id carried by a valid token of the given kind
    pub fn validate(&self, kind: AccountKind, token: &str) -> Result<i64> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .context("Invalid session token")?;

        if token_data.claims.kind != kind_claim(kind) {
            anyhow::bail!("Session token kind mismatch");
        }

        token_data
            .claims
            .sub
            .parse()
            .context("Session subject is not a principal id")
    }

    /// Session cookie for a fresh login
    pub fn cookie(&self, kind: AccountKind, token: String) -> Cookie<'static> {
        Cookie::build((cookie_name(kind), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.max_age_secs()))
            .build()
    }

    pub fn max_age_secs(&self) -> i64 {
        self.config.max_age.as_secs() as i64
    }
}
