//! Outbound notifications.
//!
//! Delivery is best effort and at most once: one POST per message, and any
//! failure (no endpoint, network error, non-2xx) is logged and reported as
//! a simulated send. Nothing here returns an error to the caller.

use serde::{Deserialize, Serialize};

use crate::model::{NotificationSettings, Status};

/// Where a notification goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Slack,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Slack => "slack",
        }
    }
}

/// Body posted to the notification endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub channel: Channel,
    pub to: String,
    pub subject: String,
    pub message: String,
}

/// Endpoint reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyResponse {
    pub ok: bool,
    #[serde(default)]
    pub delivered: bool,
    #[serde(default)]
    pub simulated: bool,
}

/// Outcome of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Delivery {
    /// The endpoint answered with a 2xx body.
    Accepted { channel: Channel, to: String, response: NotifyResponse },
    /// The send failed or could not be attempted; treated as done.
    Simulated { channel: Channel, to: String, reason: String },
    /// No destination configured for the channel.
    Skipped { channel: Channel, reason: String },
}

/// Something the board wants announced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    StatusChanged {
        task_id: String,
        title: String,
        from: Status,
        to: Status,
    },
}

impl Notice {
    pub fn subject(&self) -> String {
        match self {
            Notice::StatusChanged { title, .. } => format!("Task status changed: {title}"),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notice::StatusChanged {
                task_id,
                title,
                from,
                to,
            } => format!("\"{title}\" ({task_id}) moved from {from} to {to}."),
        }
    }
}

/// Stored settings win; unset or blank fields fall back to `defaults`.
pub fn effective_targets(
    stored: &NotificationSettings,
    defaults: &NotificationSettings,
) -> NotificationSettings {
    fn pick(stored: &Option<String>, fallback: &Option<String>) -> Option<String> {
        stored
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| fallback.as_deref().map(str::trim).filter(|v| !v.is_empty()))
            .map(str::to_string)
    }

    NotificationSettings {
        default_email: pick(&stored.default_email, &defaults.default_email),
        default_slack: pick(&stored.default_slack, &defaults.default_slack),
    }
}

/// Posts notifications to the configured endpoint.
#[derive(Debug, Clone)]
pub struct Notifier {
    http: reqwest::Client,
    endpoint: Option<String>,
    targets: NotificationSettings,
}

impl Notifier {
    pub fn new(endpoint: Option<String>, targets: NotificationSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
            targets,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn targets(&self) -> &NotificationSettings {
        &self.targets
    }

    /// Default destination for `channel`.
    pub fn default_destination(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Email => self.targets.default_email.as_deref(),
            Channel::Slack => self.targets.default_slack.as_deref(),
        }
    }

    /// Send a board notice to the messaging channel, or email when no
    /// messaging destination is configured.
    pub async fn announce(&self, notice: &Notice) -> Delivery {
        let channel = if self.targets.default_slack.is_some() {
            Channel::Slack
        } else {
            Channel::Email
        };
        self.send(channel, None, &notice.subject(), &notice.message()).await
    }

    /// Attempt a single POST. `to` overrides the default destination.
    pub async fn send(
        &self,
        channel: Channel,
        to: Option<&str>,
        subject: &str,
        message: &str,
    ) -> Delivery {
        let destination = to
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| self.default_destination(channel));
        let Some(destination) = destination else {
            tracing::debug!(channel = channel.as_str(), "no destination, skipping notification");
            return Delivery::Skipped {
                channel,
                reason: format!("no {} destination configured", channel.as_str()),
            };
        };

        let Some(endpoint) = self.endpoint.as_deref() else {
            tracing::info!(
                channel = channel.as_str(),
                to = destination,
                subject,
                "no notification endpoint, simulating delivery"
            );
            return Delivery::Simulated {
                channel,
                to: destination.to_string(),
                reason: "no endpoint configured".to_string(),
            };
        };

        let request = NotifyRequest {
            channel,
            to: destination.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
        };

        match self.post(endpoint, &request).await {
            Ok(response) => Delivery::Accepted {
                channel,
                to: request.to,
                response,
            },
            Err(reason) => {
                tracing::warn!(
                    channel = channel.as_str(),
                    to = %request.to,
                    %reason,
                    "notification failed, treating as simulated"
                );
                Delivery::Simulated {
                    channel,
                    to: request.to,
                    reason,
                }
            }
        }
    }

    async fn post(&self, endpoint: &str, request: &NotifyRequest) -> Result<NotifyResponse, String> {
        let response = self
            .http
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(|err| err.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("endpoint returned {status}"));
        }
        response
            .json::<NotifyResponse>()
            .await
            .map_err(|err| format!("unreadable endpoint reply: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn targets(email: Option<&str>, slack: Option<&str>) -> NotificationSettings {
        NotificationSettings {
            default_email: email.map(str::to_string),
            default_slack: slack.map(str::to_string),
        }
    }

    #[test]
    fn stored_settings_override_defaults() {
        let stored = targets(Some("me@example.com"), Some("  "));
        let defaults = targets(Some("team@example.com"), Some("#general"));
        let effective = effective_targets(&stored, &defaults);
        assert_eq!(effective.default_email.as_deref(), Some("me@example.com"));
        assert_eq!(effective.default_slack.as_deref(), Some("#general"));
    }

    #[test]
    fn status_notice_mentions_both_states() {
        let notice = Notice::StatusChanged {
            task_id: "t1".to_string(),
            title: "Design mock".to_string(),
            from: Status::Todo,
            to: Status::Done,
        };
        assert!(notice.message().contains("from Todo to Done"));
        assert!(notice.subject().contains("Design mock"));
    }

    #[tokio::test]
    async fn posts_request_and_reads_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/notify"))
            .and(body_json(serde_json::json!({
                "channel": "email",
                "to": "team@example.com",
                "subject": "Hi",
                "message": "Body"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true, "delivered": false, "simulated": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::new(
            Some(format!("{}/api/notify", server.uri())),
            targets(Some("team@example.com"), None),
        );
        let delivery = notifier.send(Channel::Email, None, "Hi", "Body").await;
        match delivery {
            Delivery::Accepted { response, to, .. } => {
                assert!(response.ok);
                assert!(response.simulated);
                assert_eq!(to, "team@example.com");
            }
            other => panic!("unexpected delivery: {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_is_swallowed_as_simulated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::new(Some(server.uri()), targets(None, Some("#ops")));
        let delivery = notifier.send(Channel::Slack, None, "s", "m").await;
        assert!(matches!(delivery, Delivery::Simulated { .. }));
    }

    #[tokio::test]
    async fn missing_destination_skips_send() {
        let notifier = Notifier::new(Some("http://127.0.0.1:9/api/notify".to_string()), targets(None, None));
        let delivery = notifier.send(Channel::Email, None, "s", "m").await;
        assert!(matches!(delivery, Delivery::Skipped { .. }));
    }

    #[tokio::test]
    async fn override_destination_without_endpoint_is_simulated() {
        let notifier = Notifier::new(None, targets(None, None));
        let delivery = notifier
            .send(Channel::Email, Some("x@example.com"), "s", "m")
            .await;
        assert_eq!(
            delivery,
            Delivery::Simulated {
                channel: Channel::Email,
                to: "x@example.com".to_string(),
                reason: "no endpoint configured".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn announce_prefers_slack() {
        let notifier = Notifier::new(None, targets(Some("a@example.com"), Some("#ops")));
        let notice = Notice::StatusChanged {
            task_id: "t".to_string(),
            title: "T".to_string(),
            from: Status::Todo,
            to: Status::Blocked,
        };
        match notifier.announce(&notice).await {
            Delivery::Simulated { channel, to, .. } => {
                assert_eq!(channel, Channel::Slack);
                assert_eq!(to, "#ops");
            }
            other => panic!("unexpected delivery: {other:?}"),
        }
    }
}
