/// Task API client — the single point of entry for backend task calls.
///
/// Every request carries `Authorization: Bearer <token>` with a token the
/// caller fetched for that request alone. No retries: a failed call is
/// reported once and left to the user to repeat.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::ClientError;
use crate::models::{decode_list, CompleteTaskRequest, ListItem, ListKind, TaskActionRequest};
use crate::planner::reconcile::Action;

/// Remote task operations. `HttpTaskApi` is the production implementation.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list(&self, kind: ListKind, token: &str) -> Result<Vec<ListItem>, ClientError>;

    async fn mutate(&self, action: Action, item_id: &str, token: &str) -> Result<(), ClientError>;
}

/// FastAPI-style error body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Clone)]
pub struct HttpTaskApi {
    client: Client,
    base_url: String,
}

impl HttpTaskApi {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list(&self, kind: ListKind, token: &str) -> Result<Vec<ListItem>, ClientError> {
        let response = self
            .client
            .get(self.url(kind.endpoint()))
            .bearer_auth(token)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let body = response.text().await?;
        let items = decode_list(kind, &body)?;

        debug!("Fetched {} {}", items.len(), kind.label());
        Ok(items)
    }

    async fn mutate(&self, action: Action, item_id: &str, token: &str) -> Result<(), ClientError> {
        let request = self
            .client
            .post(self.url(action.endpoint()))
            .bearer_auth(token);

        let request = match action {
            Action::ToggleComplete { completed } => request.json(&CompleteTaskRequest {
                task_id: item_id,
                completed,
            }),
            Action::Accept | Action::Dismiss | Action::Snooze => {
                request.json(&TaskActionRequest { task_id: item_id })
            }
        };

        ensure_success(request.send().await?).await?;
        debug!("{} confirmed for task {item_id}", action.label());
        Ok(())
    }
}

/// Turns a non-2xx response into `ClientError::Status`, preferring the
/// backend's `detail` message over the raw body.
async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("Task API returned {}: {}", status, body);
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.detail)
        .unwrap_or(body);

    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}
