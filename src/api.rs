// taskdesk/src/api.rs

use async_trait::async_trait;
use reqwest::{Method, header};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::ApiError;
use crate::session::SessionStore;
use crate::task::{Task, TaskDraft, TaskList, TaskPatch};

/// What the task board needs from the backend.
///
/// A 2xx from `create_task`/`update_task` is success; the echoed record is
/// returned when it decodes and is `None` otherwise.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError>;
    async fn create_task(&self, draft: &TaskDraft) -> Result<Option<Task>, ApiError>;
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>, ApiError>;
    async fn delete_task(&self, id: &str) -> Result<(), ApiError>;
}

/// JSON-over-HTTP client. Reads the credential from the session store on
/// every call and never retries.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(base_url: &str, session: SessionStore) -> anyhow::Result<Self> {
        Self::with_client(reqwest::Client::new(), base_url, session)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str, session: SessionStore) -> anyhow::Result<Self> {
        // Trailing slash so relative joins keep the base path (".../api/" + "tasks").
        let mut base = Url::parse(base_url).map_err(|e| anyhow::anyhow!("invalid API base url '{base_url}': {e}"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { http, base, session })
    }

    pub fn base_url(&self) -> &Url { &self.base }
    pub fn session(&self) -> &SessionStore { &self.session }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Validation(format!("invalid request path '{path}': {e}")))
    }

    fn task_url(&self, id: &str) -> Result<Url, ApiError> {
        let mut url = self.url("tasks")?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Validation("API base url cannot carry a path".into()))?
            .push(id);
        Ok(url)
    }

    /// Issues one request. An empty 2xx body comes back as `Value::Null`.
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        self.send(method, url, body).await
    }

    async fn send(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Value, ApiError> {
        let path = url.path().to_owned();
        let mut req = self.http.request(method.clone(), url).header(header::ACCEPT, "application/json");
        if let Some(token) = self.session.token() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        debug!(%method, %path, "api request");
        let resp = req.send().await.inspect_err(|e| warn!(%method, %path, error = %e, "api request failed"))?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!(%method, %path, status = status.as_u16(), "api response");
        if !status.is_success() {
            return Err(ApiError::from_response(status, &text));
        }
        if text.trim().is_empty() { return Ok(Value::Null); }
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let v = self.request(Method::GET, path, None).await?;
        Ok(serde_json::from_value(v)?)
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let v = self.request(Method::POST, path, Some(&serde_json::to_value(body)?)).await?;
        Ok(serde_json::from_value(v)?)
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let v = self.request(Method::PUT, path, Some(&serde_json::to_value(body)?)).await?;
        Ok(serde_json::from_value(v)?)
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request(Method::DELETE, path, None).await.map(|_| ())
    }
}

// Some backends wrap single records as `{ data: {...} }`; accept both.
// The request already succeeded, so a body that is not a task is only logged.
fn unwrap_record(v: Value) -> Option<Task> {
    let record = match v {
        Value::Object(mut obj) if obj.contains_key("data") && !obj.contains_key("title") => {
            obj.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    match serde_json::from_value(record) {
        Ok(task) => Some(task),
        Err(e) => { debug!(error = %e, "response body is not a task record"); None }
    }
}

#[async_trait]
impl TaskApi for ApiClient {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let list: TaskList = self.get("tasks").await?;
        Ok(list.data)
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Option<Task>, ApiError> {
        draft.validate()?;
        let v = self.request(Method::POST, "tasks", Some(&serde_json::to_value(draft.to_request())?)).await?;
        Ok(unwrap_record(v))
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>, ApiError> {
        let url = self.task_url(id)?;
        let v = self.send(Method::PUT, url, Some(&serde_json::to_value(patch)?)).await?;
        Ok(unwrap_record(v))
    }

    async fn delete_task(&self, id: &str) -> Result<(), ApiError> {
        let url = self.task_url(id)?;
        self.send(Method::DELETE, url, None).await.map(|_| ())
    }
}
