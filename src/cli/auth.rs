//! taskdeck auth command implementations.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{load_context, GlobalArgs};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::remote::{self, Session};

pub struct VerifyOptions {
    pub email: Option<String>,
    pub code: Option<String>,
    pub redirect_url: Option<String>,
    pub global: GlobalArgs,
}

/// Session details safe to print; tokens stay on disk.
#[derive(Serialize)]
struct AuthStatus {
    configured: bool,
    signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    expired: bool,
}

impl AuthStatus {
    fn new(configured: bool, session: Option<&Session>) -> Self {
        Self {
            configured,
            signed_in: session.is_some(),
            user_id: session.map(|s| s.user.id.clone()),
            email: session.and_then(|s| s.user.email.clone()),
            expires_at: session.and_then(|s| s.expires_at),
            expired: session.map(|s| s.is_expired(Utc::now())).unwrap_or(false),
        }
    }
}

#[derive(Serialize)]
struct LoginReport {
    email: String,
}

pub async fn run_login(email: String, global: GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let client = ctx.remote()?;
    client
        .request_magic_link(&email, ctx.config.remote.redirect_to.as_deref())
        .await?;

    let email = email.trim().to_string();
    let mut human = HumanOutput::new(format!("Sent a sign-in link to {email}"));
    human.push_next_step(format!("taskdeck auth verify --email {email} --code <code>"));
    human.push_next_step("taskdeck auth verify --redirect-url <url from the link>");
    emit_success(ctx.output, "auth login", &LoginReport { email }, Some(&human))
}

pub async fn run_verify(options: VerifyOptions) -> Result<()> {
    let ctx = load_context(options.global)?;
    let client = ctx.remote()?;

    let session = match (options.redirect_url, options.email, options.code) {
        (Some(url), _, _) => client.session_from_redirect(&url).await?,
        (None, Some(email), Some(code)) => client.verify_code(&email, &code).await?,
        _ => {
            return Err(Error::InvalidArgument(
                "pass --email with --code, or --redirect-url".to_string(),
            ))
        }
    };
    remote::save_session(&ctx.store, &session)?;
    tracing::debug!(user = %session.user.id, "signed in");

    let status = AuthStatus::new(true, Some(&session));
    let mut human = HumanOutput::new("Signed in");
    push_status_summary(&mut human, &status);
    human.push_next_step("taskdeck sync pull");
    emit_success(ctx.output, "auth verify", &status, Some(&human))
}

pub async fn run_logout(global: GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let mut human = HumanOutput::new("Signed out");

    if ctx.session.is_some() {
        match ctx.remote() {
            Ok(client) => {
                if let Err(err) = client.sign_out().await {
                    tracing::warn!(error = %err, "remote sign-out failed");
                    human.push_warning(format!("remote sign-out failed: {err}"));
                }
            }
            Err(err) => human.push_warning(format!("session not revoked remotely: {err}")),
        }
    } else {
        human = HumanOutput::new("Not signed in");
    }
    remote::clear_session(&ctx.store)?;

    let status = AuthStatus::new(ctx.config.remote.credentials().is_some(), None);
    emit_success(ctx.output, "auth logout", &status, Some(&human))
}

pub fn run_status(global: GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let status = AuthStatus::new(
        ctx.config.remote.credentials().is_some(),
        ctx.session.as_ref(),
    );

    let header = if status.signed_in {
        "Signed in"
    } else {
        "Not signed in"
    };
    let mut human = HumanOutput::new(header);
    push_status_summary(&mut human, &status);
    if !status.configured {
        human.push_next_step("set [remote] url and anon_key in .taskdeck.toml");
    } else if !status.signed_in {
        human.push_next_step("taskdeck auth login <email>");
    } else if status.expired {
        human.push_warning("session expired; it is refreshed on the next sync");
    }
    emit_success(ctx.output, "auth status", &status, Some(&human))
}

fn push_status_summary(human: &mut HumanOutput, status: &AuthStatus) {
    human.push_summary("Remote", if status.configured { "configured" } else { "not configured" });
    if let Some(email) = &status.email {
        human.push_summary("Email", email.clone());
    }
    if let Some(user_id) = &status.user_id {
        human.push_summary("User", user_id.clone());
    }
    if let Some(expires_at) = status.expires_at {
        human.push_summary("Expires", expires_at.to_rfc3339());
    }
}
