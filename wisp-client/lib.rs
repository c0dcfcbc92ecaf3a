//! HTTP client for the completion, code execution and chat services.

mod client;
pub mod error;
pub mod protocol;
pub mod run;

pub use client::{
  ApiClient,
  ClientOptions,
  CompletionProvider,
  DEFAULT_CHAT_TIMEOUT,
  DEFAULT_COMPLETION_TIMEOUT,
  DEFAULT_RUN_TIMEOUT,
  DEFAULT_SERVER_URL,
};
pub use error::ClientError;
