//! HTTP client for the hosted table store and object storage.

use std::path::Path;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::model::{Attachment, Project, Task};
use crate::remote::auth::Session;
use crate::remote::row::{ProjectRow, RemoteRow, TaskRow};

/// Handle to one backend project, optionally signed in.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    bucket: String,
    session: Option<Session>,
}

impl RemoteClient {
    pub fn new(base_url: &str, api_key: &str, bucket: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            bucket: bucket.trim().to_string(),
            session: None,
        }
    }

    /// Client for the configured backend.
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let (url, key) = config.credentials().ok_or(Error::RemoteNotConfigured)?;
        Ok(Self::new(url, key, &config.bucket))
    }

    pub fn with_session(mut self, session: Option<Session>) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn require_session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(Error::NotSignedIn)
    }

    /// Attach the api key and the session token (or the anon key).
    pub(crate) fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .as_ref()
            .map(|session| session.access_token.as_str())
            .unwrap_or(self.api_key.as_str());
        builder.header("apikey", &self.api_key).bearer_auth(token)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// All rows of `R`'s table visible to the session, oldest first.
    pub async fn list<R: RemoteRow>(&self) -> Result<Vec<R::Local>> {
        self.require_session()?;
        let response = self
            .authed(self.http.get(self.rest_url(R::TABLE)))
            .query(&[("select", "*"), ("order", "created_at.asc")])
            .send()
            .await?;
        let rows: Vec<R> = check(response).await?.json().await?;
        tracing::debug!(table = R::TABLE, rows = rows.len(), "fetched remote rows");
        Ok(rows.into_iter().map(R::into_local).collect())
    }

    /// Insert or update by id, stamping owner and update time.
    pub async fn upsert<R: RemoteRow>(&self, local: &R::Local) -> Result<()> {
        let session = self.require_session()?;
        let row = R::from_local(local, &session.user.id, Utc::now());
        let response = self
            .authed(self.http.post(self.rest_url(R::TABLE)))
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    pub async fn delete<R: RemoteRow>(&self, id: &str) -> Result<()> {
        self.require_session()?;
        let filter = format!("eq.{id}");
        let response = self
            .authed(self.http.delete(self.rest_url(R::TABLE)))
            .query(&[("id", filter.as_str())])
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.list::<TaskRow>().await
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.list::<ProjectRow>().await
    }

    pub async fn upsert_task(&self, task: &Task) -> Result<()> {
        self.upsert::<TaskRow>(task).await
    }

    pub async fn upsert_project(&self, project: &Project) -> Result<()> {
        self.upsert::<ProjectRow>(project).await
    }

    pub async fn delete_task(&self, id: &str) -> Result<()> {
        self.delete::<TaskRow>(id).await
    }

    pub async fn delete_project(&self, id: &str) -> Result<()> {
        self.delete::<ProjectRow>(id).await
    }

    /// Upload attachment bytes under `{user_id}/{millis}_{file_name}`.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<Attachment> {
        let session = self.require_session()?;
        let name = sanitize_file_name(file_name);
        if name.is_empty() {
            return Err(Error::InvalidArgument("attachment name cannot be empty".to_string()));
        }
        let object_path = format!("{}/{}_{}", session.user.id, Utc::now().timestamp_millis(), name);
        let size = bytes.len() as u64;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type_for(&name)));
        headers.insert("x-upsert", HeaderValue::from_static("false"));

        let response = self
            .authed(self.http.post(format!(
                "{}/storage/v1/object/{}/{}",
                self.base_url, self.bucket, object_path
            )))
            .headers(headers)
            .body(bytes)
            .send()
            .await?;
        check(response).await?;
        tracing::debug!(path = %object_path, size, "uploaded attachment");

        Ok(Attachment {
            name: file_name.trim().to_string(),
            url: self.public_url(&object_path),
            size,
        })
    }

    /// Public URL of an object in the attachments bucket.
    pub fn public_url(&self, object_path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, object_path
        )
    }
}

/// Turn a non-2xx response into `Error::Remote`.
pub(crate) async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Remote {
        status: status.as_u16(),
        message: remote_message(&body),
    })
}

/// Prefer the backend's `message`/`error_description` field over raw text.
fn remote_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error_description", "msg", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    base.chars()
        .map(|ch| if ch.is_control() || ch == '\\' { '_' } else { ch })
        .collect()
}

pub(crate) fn content_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;
    use crate::remote::auth::SessionUser;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session() -> Session {
        Session {
            access_token: "token-1".to_string(),
            refresh_token: None,
            expires_at: None,
            user: SessionUser {
                id: "user-1".to_string(),
                email: Some("me@example.com".to_string()),
            },
        }
    }

    fn client(server: &MockServer) -> RemoteClient {
        RemoteClient::new(&server.uri(), "anon", "attachments").with_session(Some(session()))
    }

    #[tokio::test]
    async fn list_orders_by_creation_and_maps_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/tasks"))
            .and(query_param("order", "created_at.asc"))
            .and(header("apikey", "anon"))
            .and(header("authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "t1", "title": "First", "project_id": "p1", "status": "Done"},
                {"id": "t2", "title": "Second", "project_id": null}
            ])))
            .mount(&server)
            .await;

        let tasks = client(&server).list_tasks().await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].project_id, "p1");
        assert_eq!(tasks[0].status, Status::Done);
        assert_eq!(tasks[1].project_id, "");
    }

    #[tokio::test]
    async fn upsert_stamps_user_and_merges_duplicates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/tasks"))
            .and(query_param("on_conflict", "id"))
            .and(|request: &wiremock::Request| {
                request
                    .headers
                    .get("prefer")
                    .and_then(|value| value.to_str().ok())
                    == Some("resolution=merge-duplicates,return=minimal")
            })
            .and(body_partial_json(serde_json::json!({
                "title": "Ship it",
                "user_id": "user-1",
                "project_id": null
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).upsert_task(&Task::new("Ship it")).await.unwrap();
    }

    #[tokio::test]
    async fn delete_filters_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/projects"))
            .and(query_param("id", "eq.p1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).delete_project("p1").await.unwrap();
    }

    #[tokio::test]
    async fn remote_failure_surfaces_as_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(serde_json::json!({"message": "permission denied"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).upsert_task(&Task::new("x")).await.unwrap_err();
        match err {
            Error::Remote { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "permission denied");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn operations_require_a_session() {
        let client = RemoteClient::new("http://127.0.0.1:9", "anon", "attachments");
        assert!(matches!(client.list_tasks().await, Err(Error::NotSignedIn)));
        assert!(matches!(
            client.upload("a.txt", b"hi".to_vec()).await,
            Err(Error::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn upload_returns_public_url_name_and_size() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("content-type", "text/plain"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"Key": "k"})))
            .expect(1)
            .mount(&server)
            .await;

        let attachment = client(&server)
            .upload("notes.txt", b"hello".to_vec())
            .await
            .unwrap();
        assert_eq!(attachment.name, "notes.txt");
        assert_eq!(attachment.size, 5);
        let prefix = format!("{}/storage/v1/object/public/attachments/user-1/", server.uri());
        assert!(attachment.url.starts_with(&prefix));
        assert!(attachment.url.ends_with("_notes.txt"));
    }

    #[test]
    fn file_names_lose_directories() {
        assert_eq!(sanitize_file_name("/tmp/report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("  plain.txt "), "plain.txt");
        assert_eq!(content_type_for("IMG.PNG"), "image/png");
        assert_eq!(content_type_for("blob"), "application/octet-stream");
    }
}
