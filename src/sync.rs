//! Fire-and-forget side effects.
//!
//! Board operations commit locally first and describe the remote work they
//! want as [`Effect`]s. The [`Dispatcher`] spawns each one on a `JoinSet`;
//! failures are logged and never fed back into local state. `drain` lets a
//! short-lived process wait for outstanding work before it exits.

use serde::Serialize;
use tokio::task::JoinSet;

use crate::model::{Project, Task};
use crate::notify::{Delivery, Notice, Notifier};
use crate::remote::RemoteClient;

/// A remote mirror operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOp {
    UpsertTask(Task),
    DeleteTask(String),
    UpsertProject(Project),
    DeleteProject(String),
}

impl SyncOp {
    pub fn label(&self) -> &'static str {
        match self {
            SyncOp::UpsertTask(_) => "upsert task",
            SyncOp::DeleteTask(_) => "delete task",
            SyncOp::UpsertProject(_) => "upsert project",
            SyncOp::DeleteProject(_) => "delete project",
        }
    }

    pub fn record_id(&self) -> &str {
        match self {
            SyncOp::UpsertTask(task) => &task.id,
            SyncOp::UpsertProject(project) => &project.id,
            SyncOp::DeleteTask(id) | SyncOp::DeleteProject(id) => id,
        }
    }

    async fn run(self, client: &RemoteClient) -> crate::error::Result<()> {
        match self {
            SyncOp::UpsertTask(task) => client.upsert_task(&task).await,
            SyncOp::DeleteTask(id) => client.delete_task(&id).await,
            SyncOp::UpsertProject(project) => client.upsert_project(&project).await,
            SyncOp::DeleteProject(id) => client.delete_project(&id).await,
        }
    }
}

/// Work requested by a board operation after its local commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Sync(SyncOp),
    Notify(Notice),
}

impl Effect {
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Effect::Notify(notice) => Some(notice),
            Effect::Sync(_) => None,
        }
    }
}

enum Outcome {
    Synced { label: &'static str, id: String },
    SyncFailed { label: &'static str, id: String, error: String },
    Notified(Delivery),
}

/// Summary of everything that finished during a drain.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DrainReport {
    pub synced: usize,
    /// Sync ops dropped because no signed-in remote was available.
    pub sync_skipped: usize,
    pub sync_failures: Vec<String>,
    pub deliveries: Vec<Delivery>,
}

/// Runs effects in the background of the current runtime.
pub struct Dispatcher {
    remote: Option<RemoteClient>,
    notifier: Notifier,
    pending: JoinSet<Outcome>,
    skipped: usize,
}

impl Dispatcher {
    /// `remote` should carry a session; without one sync ops are skipped.
    pub fn new(remote: Option<RemoteClient>, notifier: Notifier) -> Self {
        let remote = remote.filter(|client| client.session().is_some());
        Self {
            remote,
            notifier,
            pending: JoinSet::new(),
            skipped: 0,
        }
    }

    #[cfg(test)]
    fn syncing(&self) -> bool {
        self.remote.is_some()
    }

    /// Spawn each effect. Returns immediately.
    pub fn dispatch(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Sync(op) => {
                    let Some(client) = self.remote.clone() else {
                        tracing::debug!(op = op.label(), id = op.record_id(), "not signed in, local only");
                        self.skipped += 1;
                        continue;
                    };
                    self.pending.spawn(async move {
                        let label = op.label();
                        let id = op.record_id().to_string();
                        match op.run(&client).await {
                            Ok(()) => Outcome::Synced { label, id },
                            Err(err) => Outcome::SyncFailed {
                                label,
                                id,
                                error: err.to_string(),
                            },
                        }
                    });
                }
                Effect::Notify(notice) => {
                    let notifier = self.notifier.clone();
                    self.pending
                        .spawn(async move { Outcome::Notified(notifier.announce(&notice).await) });
                }
            }
        }
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Wait for every spawned effect and report what happened.
    pub async fn drain(&mut self) -> DrainReport {
        let mut report = DrainReport {
            sync_skipped: std::mem::take(&mut self.skipped),
            ..DrainReport::default()
        };
        while let Some(joined) = self.pending.join_next().await {
            match joined {
                Ok(Outcome::Synced { label, id }) => {
                    tracing::debug!(op = label, %id, "remote sync done");
                    report.synced += 1;
                }
                Ok(Outcome::SyncFailed { label, id, error }) => {
                    tracing::warn!(op = label, %id, %error, "remote sync failed, keeping local state");
                    report.sync_failures.push(format!("{label} {id}: {error}"));
                }
                Ok(Outcome::Notified(delivery)) => report.deliveries.push(delivery),
                Err(err) => {
                    tracing::warn!(error = %err, "background effect panicked");
                    report.sync_failures.push(err.to_string());
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NotificationSettings, Status};
    use crate::remote::{Session, SessionUser};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notice() -> Notice {
        Notice::StatusChanged {
            task_id: "t".to_string(),
            title: "T".to_string(),
            from: Status::Todo,
            to: Status::Done,
        }
    }

    fn signed_in(server: &MockServer) -> RemoteClient {
        RemoteClient::new(&server.uri(), "anon", "attachments").with_session(Some(Session {
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_at: None,
            user: SessionUser {
                id: "u".to_string(),
                email: None,
            },
        }))
    }

    #[tokio::test]
    async fn without_session_sync_is_skipped_but_notices_run() {
        let notifier = Notifier::new(
            None,
            NotificationSettings {
                default_email: Some("a@example.com".to_string()),
                default_slack: None,
            },
        );
        let mut dispatcher = Dispatcher::new(None, notifier);
        dispatcher.dispatch(vec![
            Effect::Sync(SyncOp::DeleteTask("t".to_string())),
            Effect::Notify(notice()),
        ]);
        let report = dispatcher.drain().await;
        assert_eq!(report.sync_skipped, 1);
        assert_eq!(report.synced, 0);
        assert_eq!(report.deliveries.len(), 1);
    }

    #[tokio::test]
    async fn remote_failures_are_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/tasks"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/projects"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let notifier = Notifier::new(None, NotificationSettings::default());
        let mut dispatcher = Dispatcher::new(Some(signed_in(&server)), notifier);
        assert!(dispatcher.syncing());
        dispatcher.dispatch(vec![
            Effect::Sync(SyncOp::DeleteTask("t1".to_string())),
            Effect::Sync(SyncOp::UpsertProject(Project::new("Website"))),
        ]);
        let report = dispatcher.drain().await;
        assert_eq!(report.synced, 1);
        assert_eq!(report.sync_failures.len(), 1);
        assert!(report.sync_failures[0].contains("t1"));
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[test]
    fn client_without_session_does_not_sync() {
        let client = RemoteClient::new("http://127.0.0.1:9", "anon", "attachments");
        let dispatcher = Dispatcher::new(Some(client), Notifier::new(None, NotificationSettings::default()));
        assert!(!dispatcher.syncing());
    }
}
