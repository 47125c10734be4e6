//! Chat webhook notifications.

use clap::ValueEnum;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::context::ConfigContext;
use crate::error::{Error, Result};
use crate::executor::{CommandExecutor, Target};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Slack,
    Teams,
    Telegram,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Slack => "slack",
            Backend::Teams => "teams",
            Backend::Telegram => "telegram",
        }
    }

    fn hook_key(self) -> &'static str {
        match self {
            Backend::Slack => "notify_slack_hook",
            Backend::Teams => "notify_teams_hook",
            Backend::Telegram => "notify_telegram_hook",
        }
    }
}

/// A resolved webhook call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub backend: Backend,
    #[serde(skip_serializing)]
    pub url: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyReport {
    pub backend: Backend,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

pub fn prepare(ctx: &ConfigContext, backend: Backend, message: &str) -> Result<Notification> {
    let url = ctx.require(backend.hook_key())?.trim().to_string();

    let mut payload = json!({ "text": message });
    if backend == Backend::Telegram {
        payload["chat_id"] = json!(ctx.require("notify_telegram_chat_id")?);
    }

    Ok(Notification {
        backend,
        url,
        payload,
    })
}

/// First 25 characters of the hook, enough to tell hooks apart without
/// printing the secret part.
fn url_preview(url: &str) -> String {
    url.chars().take(25).collect()
}

pub fn send(
    executor: &mut CommandExecutor,
    ctx: &ConfigContext,
    backend: Backend,
    message: &str,
) -> Result<NotifyReport> {
    let notification = prepare(ctx, backend, message)?;

    if ctx.is_dry_run() {
        executor.preview(
            &Target::Local,
            &format!("POST {:?} to {}...", message, url_preview(&notification.url)),
        )?;
        return Ok(NotifyReport {
            backend,
            dry_run: true,
            status: None,
        });
    }

    log_status!("notify", "Posting to {}", backend.as_str());
    let status = post(&notification)?;
    Ok(NotifyReport {
        backend,
        dry_run: false,
        status: Some(status),
    })
}

fn post(notification: &Notification) -> Result<u16> {
    let backend = notification.backend.as_str();
    let client = reqwest::blocking::Client::builder()
        .user_agent(format!("shipwright/{}", VERSION))
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| Error::internal_io(e.to_string(), Some("create HTTP client".to_string())))?;

    let response = client
        .post(&notification.url)
        .json(&notification.payload)
        .send()
        .map_err(|e| Error::notify_request_failed(backend, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(Error::notify_request_failed(
            backend,
            format!("HTTP {}: {}", status, body.trim()),
        ));
    }
    Ok(status.as_u16())
}
