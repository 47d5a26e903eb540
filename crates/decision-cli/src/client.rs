use crate::config::DecisionConfig;
use async_trait::async_trait;
use decision_core::ports::TaskQueue;
use decision_core::task::TaskRecord;
use decision_core::{Error, Event, Result, TaskId};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// HTTP client for the queue service.
pub struct QueueClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl QueueClient {
    pub fn new(config: &DecisionConfig) -> Result<Self> {
        let root = Url::parse(&config.queue_root_url)
            .map_err(|e| Error::Network(format!("invalid queue root URL: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(request_error)?;

        Ok(Self {
            client,
            base_url: root.as_str().trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/api/queue/v1{}", self.base_url, path);
        let mut req = self.client.request(method, &url);

        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        req
    }

    /// Fetch a task definition and return the event embedded in its
    /// `extra.github_event`, which may be either a JSON string or an object.
    /// Returns `None` when the task carries no event.
    pub async fn fetch_task_event(&self, task_id: &str) -> Result<Option<Event>> {
        debug!(task_id = %task_id, "Fetching task definition");
        let res = self
            .request(Method::GET, &format!("/task/{}", task_id))
            .send()
            .await
            .map_err(request_error)?;

        let status = res.status();
        if status != StatusCode::OK {
            let message = res.text().await.unwrap_or_default();
            return Err(Error::Queue {
                task_id: task_id.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let task: Value = res.json().await.map_err(request_error)?;
        match task.pointer("/extra/github_event") {
            Some(Value::String(raw)) if !raw.is_empty() => Event::from_json_str(raw).map(Some),
            Some(value @ Value::Object(_)) => Event::from_value(value.clone()).map(Some),
            Some(Value::String(_)) | Some(Value::Null) | None => Ok(None),
            Some(other) => Err(Error::InvalidEvent(format!(
                "task {} has a non-object github_event: {}",
                task_id, other
            ))),
        }
    }
}

#[async_trait]
impl TaskQueue for QueueClient {
    async fn create_task(&self, task_id: &TaskId, task: &TaskRecord) -> Result<()> {
        let res = self
            .request(Method::PUT, &format!("/task/{}", task_id))
            .json(task)
            .send()
            .await
            .map_err(request_error)?;

        match res.status() {
            StatusCode::OK => Ok(()),
            status => {
                let message = res.text().await.unwrap_or_default();
                warn!(task_id = %task_id, status = status.as_u16(), "Task creation rejected");
                Err(Error::Queue {
                    task_id: task_id.to_string(),
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

fn request_error(err: reqwest::Error) -> Error {
    Error::Network(err.to_string())
}
