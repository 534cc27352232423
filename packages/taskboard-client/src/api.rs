/// HTTP client for the todo backend.
///
/// Wraps the `/todos/` and `/column-settings/` endpoints and implements the
/// core `SettingsBackend` / `TaskSource` traits on top of them.

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use taskboard_core::settings::{RemoteSettings, SettingsPayload};
use taskboard_core::storage::{RemoteError, SettingsBackend, TaskSource};
use taskboard_core::{Photo, Task, TaskId};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not authorized")]
    Unauthorized,

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ApiError> for RemoteError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::NotFound(_) => RemoteError::NotFound,
            ApiError::Unauthorized => RemoteError::Status {
                status: StatusCode::UNAUTHORIZED.as_u16(),
                message: "Not authorized".to_string(),
            },
            ApiError::Status { status, message } => RemoteError::Status { status, message },
            ApiError::Transport(e) if e.is_decode() => RemoteError::Decode(e.to_string()),
            other => RemoteError::Transport(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: String,
    pub is_completed: bool,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: taskboard_core::types::STATUS_TODO.to_string(),
            is_completed: false,
        }
    }
}

/// Partial update; absent fields are left alone by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn list_todos(&self) -> Result<Vec<Task>, ApiError> {
        let response = self.request(Method::GET, "/todos/").send().await?;
        Ok(check(response, "list todos").await?.json().await?)
    }

    pub async fn get_todo(&self, id: TaskId) -> Result<Task, ApiError> {
        let response = self
            .request(Method::GET, &format!("/todos/{}/", id))
            .send()
            .await?;
        Ok(check(response, "get todo").await?.json().await?)
    }

    pub async fn create_todo(&self, task: &NewTask) -> Result<Task, ApiError> {
        let response = self
            .request(Method::POST, "/todos/")
            .json(task)
            .send()
            .await?;
        Ok(check(response, "create todo").await?.json().await?)
    }

    pub async fn update_todo(&self, id: TaskId, update: &TaskUpdate) -> Result<Task, ApiError> {
        let response = self
            .request(Method::PUT, &format!("/todos/{}/", id))
            .json(update)
            .send()
            .await?;
        Ok(check(response, "update todo").await?.json().await?)
    }

    pub async fn delete_todo(&self, id: TaskId) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("/todos/{}", id))
            .send()
            .await?;
        check(response, "delete todo").await?;
        Ok(())
    }

    /// Attach a photo to a task as multipart field `file`.
    pub async fn upload_photo(&self, id: TaskId, path: &Path) -> Result<Photo, ApiError> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("photo")
            .to_string();
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .request(Method::POST, &format!("/todos/{}/photos/", id))
            .multipart(form)
            .send()
            .await?;
        Ok(check(response, "upload photo").await?.json().await?)
    }

    pub async fn delete_photo(&self, id: TaskId, photo_id: i64) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("/todos/{}/photos/{}/", id, photo_id))
            .send()
            .await?;
        check(response, "delete photo").await?;
        Ok(())
    }

    /// `Ok(None)` when the server has no record for this user.
    pub async fn get_column_settings(&self) -> Result<Option<RemoteSettings>, ApiError> {
        let response = self
            .request(Method::GET, "/column-settings/")
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(response, "get column settings").await?.json().await?))
    }

    pub async fn create_column_settings(
        &self,
        settings: &SettingsPayload,
    ) -> Result<RemoteSettings, ApiError> {
        self.send_column_settings(Method::POST, settings).await
    }

    pub async fn update_column_settings(
        &self,
        settings: &SettingsPayload,
    ) -> Result<RemoteSettings, ApiError> {
        self.send_column_settings(Method::PUT, settings).await
    }

    async fn send_column_settings(
        &self,
        method: Method,
        settings: &SettingsPayload,
    ) -> Result<RemoteSettings, ApiError> {
        let response = self
            .request(method, "/column-settings/")
            .json(settings)
            .send()
            .await?;
        Ok(check(response, "save column settings").await?.json().await?)
    }

    pub async fn delete_column_settings(&self) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, "/column-settings/")
            .send()
            .await?;
        check(response, "delete column settings").await?;
        Ok(())
    }

    /// Server-side reset; returns the freshly stored default record.
    pub async fn reset_column_settings(&self) -> Result<RemoteSettings, ApiError> {
        let response = self
            .request(Method::POST, "/column-settings/reset")
            .send()
            .await?;
        Ok(check(response, "reset column settings").await?.json().await?)
    }

    pub async fn default_column_settings(&self) -> Result<RemoteSettings, ApiError> {
        let response = self
            .request(Method::GET, "/column-settings/default")
            .send()
            .await?;
        Ok(check(response, "default column settings").await?.json().await?)
    }
}

/// Map non-success statuses to `ApiError`, logging the server's detail.
async fn check(response: Response, action: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| match b.detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or(body);

    if status.is_server_error() {
        log::error!("[taskboard.api] {} failed ({}): {}", action, status, message);
    } else {
        log::warn!("[taskboard.api] {} failed ({}): {}", action, status, message);
    }

    Err(match status {
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
        _ => ApiError::Status {
            status: status.as_u16(),
            message,
        },
    })
}

impl SettingsBackend for ApiClient {
    async fn fetch(&self) -> Result<Option<RemoteSettings>, RemoteError> {
        Ok(self.get_column_settings().await?)
    }

    /// PUT first; a 404 means no record yet, so POST. Any other PUT failure
    /// gets one POST attempt before the error is surfaced.
    async fn upsert(&self, settings: &SettingsPayload) -> Result<(), RemoteError> {
        match self.update_column_settings(settings).await {
            Ok(_) => Ok(()),
            Err(ApiError::NotFound(_)) => {
                log::info!("[taskboard.api] No column settings on server, creating");
                self.create_column_settings(settings).await?;
                Ok(())
            }
            Err(e) => {
                log::warn!("[taskboard.api] Update failed ({}), retrying as create", e);
                self.create_column_settings(settings).await?;
                Ok(())
            }
        }
    }
}

impl TaskSource for ApiClient {
    async fn list_tasks(&self) -> Result<Vec<Task>, RemoteError> {
        Ok(self.list_todos().await?)
    }

    async fn update_status(
        &self,
        task_id: TaskId,
        status: &str,
        is_completed: bool,
    ) -> Result<Task, RemoteError> {
        let update = TaskUpdate {
            status: Some(status.to_string()),
            is_completed: Some(is_completed),
            ..Default::default()
        };
        Ok(self.update_todo(task_id, &update).await?)
    }
}
