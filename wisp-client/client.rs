use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
  Response,
  StatusCode,
};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;
use wisp_lib::language::Language;

use crate::{
  error::{
    ClientError,
    Result,
  },
  protocol::{
    ChatRequest,
    ChatResponse,
    CompletionRequest,
    CompletionResponse,
    HealthResponse,
    MessageResponse,
    RunRequest,
    RunResponse,
    SessionInfo,
    SessionList,
  },
};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(5);
/// Above the execution service's own 10 second limit, so its timeout report
/// reaches us instead of a transport timeout.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(15);
/// Chat replies come from a full LLM round trip.
pub const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(120);

/// Source of inline completions. The coordinator only depends on this.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
  /// Fetches a completion. Must resolve to [`ClientError::Cancelled`] soon
  /// after `cancel` fires.
  async fn complete(
    &self,
    request: CompletionRequest,
    cancel: CancellationToken,
  ) -> Result<CompletionResponse>;
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
  pub base_url:           Url,
  pub completion_timeout: Duration,
  pub run_timeout:        Duration,
  pub chat_timeout:       Duration,
}

impl ClientOptions {
  pub fn new(base_url: Url) -> Self {
    Self {
      base_url,
      completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
      run_timeout: DEFAULT_RUN_TIMEOUT,
      chat_timeout: DEFAULT_CHAT_TIMEOUT,
    }
  }
}

/// HTTP client for the completion, execution, chat and health endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
  http:    reqwest::Client,
  options: ClientOptions,
}

impl ApiClient {
  pub fn new(mut options: ClientOptions) -> Result<Self> {
    // `Url::join` replaces the last segment unless the base ends in a slash
    if !options.base_url.path().ends_with('/') {
      let path = format!("{}/", options.base_url.path());
      options.base_url.set_path(&path);
    }
    let http = reqwest::Client::builder()
      .user_agent(concat!("wisp/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { http, options })
  }

  pub fn options(&self) -> &ClientOptions {
    &self.options
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    Ok(self.options.base_url.join(path)?)
  }

  /// `api/sessions/<id>[/<action>]` with `id` percent-encoded as one segment.
  fn session_endpoint(&self, id: &str, action: Option<&str>) -> Result<Url> {
    let mut url = self.endpoint("api/sessions")?;
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.push(id).extend(action);
    }
    Ok(url)
  }

  /// `POST /api/complete`. Non-success statuses are errors.
  pub async fn complete(
    &self,
    request: &CompletionRequest,
    cancel: &CancellationToken,
  ) -> Result<CompletionResponse> {
    if cancel.is_cancelled() {
      return Err(ClientError::Cancelled);
    }
    let url = self.endpoint("api/complete")?;
    log::trace!(
      "requesting completion at {} ({} bytes, cursor {})",
      url,
      request.content.len(),
      request.cursor_position
    );

    let send = self
      .http
      .post(url)
      .timeout(self.options.completion_timeout)
      .json(request)
      .send();
    let response = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(ClientError::Cancelled),
      response = send => response?,
    };

    let status = response.status();
    let bytes = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(ClientError::Cancelled),
      bytes = response.bytes() => bytes?,
    };
    if !status.is_success() {
      return Err(ClientError::Status {
        status,
        body: String::from_utf8_lossy(&bytes).into_owned(),
      });
    }
    Ok(serde_json::from_slice(&bytes)?)
  }

  /// `POST /api/run`. Error statuses whose body still decodes as a run
  /// response are returned as `Ok`, they carry the message to show.
  pub async fn run(&self, code: &str, language: Language) -> Result<RunResponse> {
    let url = self.endpoint("api/run")?;
    log::debug!("running {} bytes of {} at {}", code.len(), language, url);
    let response = self
      .http
      .post(url)
      .timeout(self.options.run_timeout)
      .json(&RunRequest { code, language })
      .send()
      .await?;
    decode_reported(response, |report: &RunResponse| report.error.is_some()).await
  }

  /// `POST /api/chat`. Like [`ApiClient::run`], failures that come with an
  /// `error` body are returned as `Ok`.
  pub async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse> {
    let url = self.endpoint("api/chat")?;
    log::debug!(
      "chat in session '{}' with {} files at {}",
      request.session_id,
      request.uploaded_files.len(),
      url
    );
    let response = self
      .http
      .post(url)
      .timeout(self.options.chat_timeout)
      .json(request)
      .send()
      .await?;
    decode_reported(response, |reply: &ChatResponse| reply.error.is_some()).await
  }

  /// `GET /api/sessions`.
  pub async fn sessions(&self) -> Result<SessionList> {
    let url = self.endpoint("api/sessions")?;
    let response = self
      .http
      .get(url)
      .timeout(self.options.completion_timeout)
      .send()
      .await?;
    decode(response).await
  }

  /// `GET /api/sessions/<id>`. `None` if the server does not know `id`.
  pub async fn session(&self, id: &str) -> Result<Option<SessionInfo>> {
    let response = self
      .http
      .get(self.session_endpoint(id, None)?)
      .timeout(self.options.completion_timeout)
      .send()
      .await?;
    if response.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    decode(response).await.map(Some)
  }

  /// `DELETE /api/sessions/<id>`. Returns whether the session existed.
  pub async fn delete_session(&self, id: &str) -> Result<bool> {
    let response = self
      .http
      .delete(self.session_endpoint(id, None)?)
      .timeout(self.options.completion_timeout)
      .send()
      .await?;
    if response.status() == StatusCode::NOT_FOUND {
      return Ok(false);
    }
    let ack: MessageResponse = decode(response).await?;
    log::debug!("{}", ack.message);
    Ok(true)
  }

  /// `POST /api/sessions/<id>/clear`. The server creates unknown sessions,
  /// so this always succeeds against a healthy backend.
  pub async fn clear_session(&self, id: &str) -> Result<MessageResponse> {
    let response = self
      .http
      .post(self.session_endpoint(id, Some("clear"))?)
      .timeout(self.options.completion_timeout)
      .send()
      .await?;
    decode(response).await
  }

  /// `GET /`.
  pub async fn health(&self) -> Result<HealthResponse> {
    let url = self.endpoint("")?;
    let response = self
      .http
      .get(url)
      .timeout(self.options.completion_timeout)
      .send()
      .await?;
    decode(response).await
  }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
  let status = response.status();
  let bytes = response.bytes().await?;
  if !status.is_success() {
    return Err(ClientError::Status {
      status,
      body: String::from_utf8_lossy(&bytes).into_owned(),
    });
  }
  Ok(serde_json::from_slice(&bytes)?)
}

/// Like [`decode`], but an error status whose body decodes and is
/// `reported` is returned as `Ok`.
async fn decode_reported<T: DeserializeOwned>(
  response: Response,
  reported: impl Fn(&T) -> bool,
) -> Result<T> {
  let status = response.status();
  let url = response.url().clone();
  let bytes = response.bytes().await?;
  if status.is_success() {
    return Ok(serde_json::from_slice(&bytes)?);
  }
  match serde_json::from_slice::<T>(&bytes) {
    Ok(body) if reported(&body) => {
      log::debug!("{url} answered {status} with an error body");
      Ok(body)
    },
    _ => {
      Err(ClientError::Status {
        status,
        body: String::from_utf8_lossy(&bytes).into_owned(),
      })
    },
  }
}

#[async_trait]
impl CompletionProvider for ApiClient {
  async fn complete(
    &self,
    request: CompletionRequest,
    cancel: CancellationToken,
  ) -> Result<CompletionResponse> {
    ApiClient::complete(self, &request, &cancel).await
  }
}
