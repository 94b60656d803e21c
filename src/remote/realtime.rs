//! Realtime change feed over the backend's Phoenix websocket.
//!
//! One channel is joined with `postgres_changes` subscriptions on the task
//! and project tables, filtered to the signed-in user's rows. Each change
//! message is decoded into a [`RemoteChange`] and handed to the caller on
//! an mpsc channel. Heartbeats keep the socket open.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{Error, Result};
use crate::reconcile::RecordChange;
use crate::remote::client::RemoteClient;
use crate::remote::row::{ProjectRow, RemoteRow, TaskRow};

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

const CHANNEL_TOPIC: &str = "realtime:taskdeck";
const WATCHED_TABLES: [&str; 2] = [TaskRow::TABLE, ProjectRow::TABLE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row-level change as delivered by the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteChange {
    pub table: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub record: Option<Value>,
    #[serde(default)]
    pub old_record: Option<Value>,
}

impl RemoteChange {
    /// Convert to a local change. `None` for unknown tables or rows that do
    /// not decode.
    pub fn into_record_change(self) -> Option<RecordChange> {
        match (self.table.as_str(), self.kind) {
            ("tasks", ChangeKind::Delete) => deleted_id(self.old_record).map(RecordChange::DeleteTask),
            ("projects", ChangeKind::Delete) => {
                deleted_id(self.old_record).map(RecordChange::DeleteProject)
            }
            ("tasks", _) => decode_row::<TaskRow>(self.record).map(RecordChange::UpsertTask),
            ("projects", _) => {
                decode_row::<ProjectRow>(self.record).map(RecordChange::UpsertProject)
            }
            (table, _) => {
                tracing::debug!(table, "ignoring change for unwatched table");
                None
            }
        }
    }
}

fn deleted_id(old_record: Option<Value>) -> Option<String> {
    old_record?.get("id")?.as_str().map(str::to_string)
}

fn decode_row<R: RemoteRow>(record: Option<Value>) -> Option<R::Local> {
    match serde_json::from_value::<R>(record?) {
        Ok(row) => Some(row.into_local()),
        Err(err) => {
            tracing::warn!(table = R::TABLE, error = %err, "skipping undecodable realtime row");
            None
        }
    }
}

/// Websocket URL for a backend base URL.
pub fn websocket_url(base_url: &str, api_key: &str) -> Result<String> {
    let base = base_url.trim_end_matches('/');
    let socket_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(Error::InvalidConfig(format!(
            "remote url must start with http:// or https://, got '{base_url}'"
        )));
    };
    Ok(format!(
        "{socket_base}/realtime/v1/websocket?apikey={api_key}&vsn=1.0.0"
    ))
}

/// Channel join message for the user's rows.
pub fn join_message(user_id: &str, access_token: &str, msg_ref: u64) -> Value {
    let filter = format!("user_id=eq.{user_id}");
    let changes: Vec<Value> = WATCHED_TABLES
        .iter()
        .map(|table| json!({ "event": "*", "schema": "public", "table": table, "filter": filter }))
        .collect();
    json!({
        "topic": CHANNEL_TOPIC,
        "event": "phx_join",
        "payload": {
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": changes,
            },
            "access_token": access_token,
        },
        "ref": msg_ref.to_string(),
    })
}

pub fn heartbeat_message(msg_ref: u64) -> Value {
    json!({ "topic": "phoenix", "event": "heartbeat", "payload": {}, "ref": msg_ref.to_string() })
}

/// What an inbound frame means to the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Change(RemoteChange),
    /// Join or heartbeat reply. `ok` is false when the server rejected it.
    Reply { ok: bool, detail: String },
    /// The server closed the channel.
    Closed(String),
    Other,
}

/// Classify one text frame from the socket.
pub fn parse_frame(text: &str) -> Frame {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return Frame::Other;
    };
    let event = value.get("event").and_then(Value::as_str).unwrap_or("");
    let payload = value.get("payload").cloned().unwrap_or(Value::Null);
    match event {
        "postgres_changes" => {
            let data = payload.get("data").cloned().unwrap_or(Value::Null);
            match serde_json::from_value::<RemoteChange>(data) {
                Ok(change) => Frame::Change(change),
                Err(err) => {
                    tracing::debug!(error = %err, "unreadable postgres_changes payload");
                    Frame::Other
                }
            }
        }
        "phx_reply" => {
            let status = payload.get("status").and_then(Value::as_str).unwrap_or("");
            Frame::Reply {
                ok: status == "ok",
                detail: payload
                    .get("response")
                    .map(Value::to_string)
                    .unwrap_or_default(),
            }
        }
        "phx_close" | "phx_error" => Frame::Closed(event.to_string()),
        _ => Frame::Other,
    }
}

/// A running feed. Dropping the receiver stops the socket task.
pub struct Subscription {
    pub changes: mpsc::Receiver<RecordChange>,
    pub handle: JoinHandle<Result<()>>,
}

impl RemoteClient {
    /// Connect, join the change channel and start forwarding changes.
    pub async fn subscribe(&self) -> Result<Subscription> {
        let session = self.require_session()?.clone();
        let url = websocket_url(self.base_url(), self.api_key())?;
        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|err| Error::Realtime(format!("connect failed: {err}")))?;
        let (mut sink, mut stream) = socket.split();

        let join = join_message(&session.user.id, &session.access_token, 1);
        sink.send(Message::Text(join.to_string().into()))
            .await
            .map_err(|err| Error::Realtime(format!("join failed: {err}")))?;
        tracing::debug!(user = %session.user.id, "joined realtime channel");

        let (tx, rx) = mpsc::channel(64);
        let handle = tokio::spawn(async move {
            let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
            heartbeat.tick().await;
            let mut next_ref: u64 = 2;

            loop {
                tokio::select! {
                    _ = heartbeat.tick() => {
                        let beat = heartbeat_message(next_ref);
                        next_ref += 1;
                        if sink.send(Message::Text(beat.to_string().into())).await.is_err() {
                            return Err(Error::Realtime("socket closed".to_string()));
                        }
                    }
                    _ = tx.closed() => return Ok(()),
                    frame = stream.next() => {
                        let message = match frame {
                            None => return Err(Error::Realtime("socket closed".to_string())),
                            Some(Err(err)) => return Err(Error::Realtime(err.to_string())),
                            Some(Ok(message)) => message,
                        };
                        let Message::Text(text) = message else { continue };
                        match parse_frame(text.as_str()) {
                            Frame::Change(change) => {
                                let Some(record) = change.into_record_change() else { continue };
                                if tx.send(record).await.is_err() {
                                    return Ok(());
                                }
                            }
                            Frame::Reply { ok: false, detail } => {
                                return Err(Error::Realtime(format!("channel rejected: {detail}")));
                            }
                            Frame::Closed(reason) => {
                                return Err(Error::Realtime(format!("channel closed: {reason}")));
                            }
                            Frame::Reply { .. } | Frame::Other => {}
                        }
                    }
                }
            }
        });

        Ok(Subscription { changes: rx, handle })
    }
}
