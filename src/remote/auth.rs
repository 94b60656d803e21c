//! Passwordless sign-in and the persisted session.
//!
//! Sign-in is a two step flow: request a magic link (which also carries a
//! one-time code), then either verify the code or paste the redirect URL
//! the link lands on. The resulting session is stored under the `session`
//! key; its presence is what turns remote sync on.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::remote::client::{check, RemoteClient};
use crate::storage::{LocalStore, SESSION_KEY};

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: SessionUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Token endpoint reply.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: SessionUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_in.and_then(|secs| expiry_after(now, secs)),
            user: self.user,
        }
    }
}

/// `now + secs`, or `None` when the lifetime is out of range.
fn expiry_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    now.checked_add_signed(Duration::try_seconds(secs)?)
}

impl RemoteClient {
    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url(), path)
    }

    /// Email a sign-in link (and one-time code) to `email`.
    pub async fn request_magic_link(&self, email: &str, redirect_to: Option<&str>) -> Result<()> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::InvalidArgument(format!("invalid email '{email}'")));
        }
        let mut request = self
            .http()
            .post(self.auth_url("otp"))
            .header("apikey", self.api_key())
            .json(&json!({ "email": email, "create_user": true }));
        if let Some(redirect) = redirect_to {
            request = request.query(&[("redirect_to", redirect)]);
        }
        check(request.send().await?).await?;
        tracing::debug!(email, "requested magic link");
        Ok(())
    }

    /// Exchange the emailed one-time code for a session.
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<Session> {
        let response = self
            .http()
            .post(self.auth_url("verify"))
            .header("apikey", self.api_key())
            .json(&json!({ "type": "email", "email": email.trim(), "token": code.trim() }))
            .send()
            .await?;
        let token: TokenResponse = check(response).await?.json().await?;
        Ok(token.into_session(Utc::now()))
    }

    /// Build a session from the URL the magic link redirected to.
    pub async fn session_from_redirect(&self, redirect_url: &str) -> Result<Session> {
        let fragment = redirect_fragment(redirect_url)?;
        let access_token = fragment
            .get("access_token")
            .cloned()
            .ok_or_else(|| Error::InvalidArgument("redirect URL has no access_token".to_string()))?;

        let response = self
            .http()
            .get(self.auth_url("user"))
            .header("apikey", self.api_key())
            .bearer_auth(&access_token)
            .send()
            .await?;
        let user: SessionUser = check(response).await?.json().await?;

        let expires_at = fragment
            .get("expires_at")
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .or_else(|| {
                fragment
                    .get("expires_in")
                    .and_then(|v| v.parse::<i64>().ok())
                    .and_then(|secs| expiry_after(Utc::now(), secs))
            });

        Ok(Session {
            access_token,
            refresh_token: fragment.get("refresh_token").cloned(),
            expires_at,
            user,
        })
    }

    /// Trade the refresh token for a new session.
    pub async fn refresh_session(&self, session: &Session) -> Result<Session> {
        let refresh_token = session.refresh_token.as_deref().ok_or(Error::NotSignedIn)?;
        let response = self
            .http()
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", self.api_key())
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let token: TokenResponse = check(response).await?.json().await?;
        Ok(token.into_session(Utc::now()))
    }

    /// Revoke the current session on the server.
    pub async fn sign_out(&self) -> Result<()> {
        self.require_session()?;
        let response = self
            .authed(self.http().post(self.auth_url("logout")))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// Key/value pairs from the redirect URL's fragment (or query).
fn redirect_fragment(redirect_url: &str) -> Result<std::collections::HashMap<String, String>> {
    let url = reqwest::Url::parse(redirect_url.trim())
        .map_err(|err| Error::InvalidArgument(format!("invalid redirect URL: {err}")))?;
    let encoded = url.fragment().or_else(|| url.query()).unwrap_or("");
    let scratch = reqwest::Url::parse(&format!("http://localhost/?{encoded}"))
        .map_err(|err| Error::InvalidArgument(format!("invalid redirect URL: {err}")))?;
    Ok(scratch.query_pairs().into_owned().collect())
}

/// Persisted session, if any.
pub fn load_session(store: &LocalStore) -> Option<Session> {
    store.load(SESSION_KEY, None)
}

pub fn save_session(store: &LocalStore, session: &Session) -> Result<()> {
    store.try_save(SESSION_KEY, session)
}

pub fn clear_session(store: &LocalStore) -> Result<()> {
    store.remove(SESSION_KEY)
}
