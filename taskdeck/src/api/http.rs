//! HTTP implementation of [`TaskApi`] backed by `reqwest`.
//!
//! Endpoints, all JSON:
//! - `GET /tasks?userId=`
//! - `POST /tasks`
//! - `PATCH /tasks/{id}`
//! - `DELETE /tasks/{id}?userId=`
//! - `PATCH /tasks/{id}/toggle`
//!
//! The base URL may carry a path prefix (`https://host/api`); endpoint
//! segments are appended to it.

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use taskdeck_proto::envelope::{
    ApiResponse, CreateTaskRequest, EmptyResponse, TaskListPayload, TaskPayload,
    ToggleTaskRequest, UpdateTaskRequest,
};
use taskdeck_proto::task::{CreateTaskInput, Task, TaskId, UpdateTaskInput};

use super::{RequestError, TaskApi};

/// Client for the remote task service.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpTaskApi {
    /// Creates a client for `base_url` with a default `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, RequestError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a client reusing an existing `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] if `base_url` is not an absolute http(s) URL.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, RequestError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RequestError::transport(format!("invalid API base URL {base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(RequestError::transport(format!(
                "unsupported API URL scheme: {}",
                base_url.scheme()
            )));
        }
        Ok(Self {
            http,
            base_url,
            token: None,
        })
    }

    /// Attaches `Authorization: Bearer <token>` to every request.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Replaces or clears the bearer token.
    pub fn set_bearer_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// The configured base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `<base>/<segments...>`.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RequestError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RequestError::transport("API base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a request and unwraps the response envelope.
    ///
    /// Returns `Ok(None)` for a 2xx with an empty body or without `data`.
    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<(u16, Option<T>), RequestError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| RequestError::transport(e.to_string()))?;

        let status = resp.status();
        let code = status.as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| RequestError::transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<EmptyResponse>(&body)
                .ok()
                .and_then(|envelope| envelope.error_text())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            tracing::debug!(status = code, error = %message, "task API returned an error");
            return Err(RequestError::http(code, message));
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok((code, None));
        }

        let envelope: ApiResponse<T> = serde_json::from_slice(&body)
            .map_err(|e| RequestError::http(code, format!("invalid response body: {e}")))?;
        if !envelope.success {
            let message = envelope
                .error_text()
                .unwrap_or_else(|| "request failed".to_string());
            return Err(RequestError::http(code, message));
        }
        Ok((code, envelope.data))
    }

    /// Like [`execute`](Self::execute) but requires `data` to be present.
    async fn execute_data<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, RequestError> {
        match self.execute(builder).await? {
            (_, Some(data)) => Ok(data),
            (code, None) => Err(RequestError::http(code, "response is missing data")),
        }
    }
}

impl TaskApi for HttpTaskApi {
    async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, RequestError> {
        let mut url = self.endpoint(&["tasks"])?;
        url.query_pairs_mut().append_pair("userId", user_id);
        tracing::debug!(%url, "GET tasks");

        let payload: TaskListPayload = self.execute_data(self.request(Method::GET, url)).await?;
        Ok(payload.into_tasks())
    }

    async fn create_task(
        &self,
        user_id: &str,
        input: &CreateTaskInput,
    ) -> Result<Task, RequestError> {
        let url = self.endpoint(&["tasks"])?;
        tracing::debug!(%url, "POST task");

        let body = CreateTaskRequest::new(user_id, input);
        let payload: TaskPayload = self
            .execute_data(self.request(Method::POST, url).json(&body))
            .await?;
        Ok(payload.into_task())
    }

    async fn update_task(
        &self,
        user_id: &str,
        id: TaskId,
        input: &UpdateTaskInput,
    ) -> Result<Task, RequestError> {
        let id = id.to_string();
        let url = self.endpoint(&["tasks", &id])?;
        tracing::debug!(%url, "PATCH task");

        let body = UpdateTaskRequest::new(user_id, input);
        let payload: TaskPayload = self
            .execute_data(self.request(Method::PATCH, url).json(&body))
            .await?;
        Ok(payload.into_task())
    }

    async fn delete_task(&self, user_id: &str, id: TaskId) -> Result<(), RequestError> {
        let id = id.to_string();
        let mut url = self.endpoint(&["tasks", &id])?;
        url.query_pairs_mut().append_pair("userId", user_id);
        tracing::debug!(%url, "DELETE task");

        let _: (u16, Option<serde_json::Value>) =
            self.execute(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn toggle_complete(&self, user_id: &str, id: TaskId) -> Result<Task, RequestError> {
        let id = id.to_string();
        let url = self.endpoint(&["tasks", &id, "toggle"])?;
        tracing::debug!(%url, "PATCH task toggle");

        let body = ToggleTaskRequest {
            user_id: user_id.to_string(),
        };
        let payload: TaskPayload = self
            .execute_data(self.request(Method::PATCH, url).json(&body))
            .await?;
        Ok(payload.into_task())
    }
}
