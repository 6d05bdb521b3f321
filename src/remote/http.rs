use super::{HttpRemoteConfig, RemoteResource};
use crate::core::{Entity, RemoteError, RemoteResult, Result, StoreError};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use tracing::debug;

/// Error body returned by the backend, `{"error": "...", "code": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Collection responses may be a bare array or wrapped in `{"data": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<E> {
    Bare(Vec<E>),
    Wrapped { data: Vec<E> },
}

/// JSON-over-HTTP implementation of `RemoteResource`.
pub struct HttpRemote<E> {
    client: Client,
    config: HttpRemoteConfig,
    _entity: PhantomData<fn() -> E>,
}

impl<E> HttpRemote<E> {
    pub fn new(config: HttpRemoteConfig) -> Result<Self> {
        config.validate().map_err(StoreError::Config)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| StoreError::Config(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            config,
            _entity: PhantomData,
        })
    }

    pub fn config(&self) -> &HttpRemoteConfig {
        &self.config
    }

    fn collection_url(&self) -> RemoteResult<Url> {
        Url::parse(&self.config.collection_url())
            .map_err(|err| RemoteError::Transport(format!("invalid URL: {err}")))
    }

    fn item_url(&self, id: &str) -> RemoteResult<Url> {
        let mut url = self.collection_url()?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::Transport("base URL cannot take a path".to_string()))?
            .push(id);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "remote request");
        let request = self.client.request(method, url);
        match &self.config.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, subject: &str) -> RemoteResult<Response> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(status_error(status, response, subject).await)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        subject: &str,
    ) -> RemoteResult<T> {
        let response = self.send(request, subject).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))
    }
}

#[async_trait]
impl<E> RemoteResource<E> for HttpRemote<E>
where
    E: Entity + DeserializeOwned,
    E::Draft: Serialize,
    E::Patch: Serialize,
{
    async fn fetch_all(&self) -> RemoteResult<Vec<E>> {
        let url = self.collection_url()?;
        let subject = self.config.resource_path.clone();
        let body: ListBody<E> = self
            .send_json(self.request(Method::GET, url), &subject)
            .await?;
        Ok(match body {
            ListBody::Bare(items) | ListBody::Wrapped { data: items } => items,
        })
    }

    async fn fetch_one(&self, id: &str) -> RemoteResult<E> {
        let url = self.item_url(id)?;
        self.send_json(self.request(Method::GET, url), id).await
    }

    async fn create(&self, draft: &E::Draft) -> RemoteResult<E> {
        let url = self.collection_url()?;
        let subject = self.config.resource_path.clone();
        self.send_json(self.request(Method::POST, url).json(draft), &subject)
            .await
    }

    async fn update(&self, id: &str, patch: &E::Patch) -> RemoteResult<E> {
        let url = self.item_url(id)?;
        self.send_json(self.request(Method::PATCH, url).json(patch), id)
            .await
    }

    async fn delete(&self, id: &str) -> RemoteResult<bool> {
        let url = self.item_url(id)?;
        let response = self.send(self.request(Method::DELETE, url), id).await?;
        let text = response
            .text()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))?;
        Ok(delete_confirmed(&text))
    }
}

/// Reads a 2xx delete response.
///
/// An empty body or any JSON body confirms the delete unless it carries
/// `"success": false`. A non-empty body that is not JSON does not confirm
/// it: the entity is restored and the next load settles what the server
/// really holds.
fn delete_confirmed(body: &str) -> bool {
    if body.trim().is_empty() {
        return true;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value
            .get("success")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true),
        Err(err) => {
            debug!(%err, "unreadable delete response, treating as unconfirmed");
            false
        }
    }
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Transport("the request timed out".to_string())
    } else if err.is_connect() {
        RemoteError::Transport("connection refused".to_string())
    } else {
        RemoteError::Transport(err.to_string())
    }
}

async fn status_error(status: StatusCode, response: Response, subject: &str) -> RemoteError {
    if status == StatusCode::UNAUTHORIZED {
        return RemoteError::Unauthorized;
    }
    if status == StatusCode::NOT_FOUND {
        return RemoteError::NotFound(subject.to_string());
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);

    match status {
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            RemoteError::Rejected(message)
        }
        _ => RemoteError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if !parsed.error.trim().is_empty() {
            return parsed.error;
        }
    }
    status
        .canonical_reason()
        .map(|reason| reason.to_lowercase())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
