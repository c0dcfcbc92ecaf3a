use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
  /// The request was aborted through its cancellation token. Never an error
  /// the user should see.
  #[error("request cancelled")]
  Cancelled,
  #[error("request timed out")]
  Timeout,
  #[error("request failed: {0}")]
  Http(reqwest::Error),
  #[error("server returned {status}: {body}")]
  Status { status: StatusCode, body: String },
  #[error("invalid server url: {0}")]
  Url(#[from] url::ParseError),
  #[error("failed to decode response: {0}")]
  Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ClientError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      Self::Timeout
    } else {
      Self::Http(err)
    }
  }
}

impl ClientError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, Self::Cancelled)
  }
}

pub type Result<T> = std::result::Result<T, ClientError>;
