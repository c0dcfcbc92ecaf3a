//! Wire types of the completion, execution and chat services.

use std::fmt;

use serde::{
  Deserialize,
  Serialize,
};
use wisp_lib::{
  document::Document,
  language::Language,
};

/// Body of `POST /api/complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
  pub content:         String,
  /// Cursor as a char offset into `content`.
  pub cursor_position: usize,
  pub language:        Language,
  /// Last character the triggering edit inserted, empty if none.
  pub last_char:       String,
}

impl CompletionRequest {
  pub fn from_document(doc: &Document, last_char: impl Into<String>) -> Self {
    Self {
      content:         doc.text().to_string(),
      cursor_position: doc.cursor(),
      language:        doc.language(),
      last_char:       last_char.into(),
    }
  }
}

/// Body returned by `/api/complete`. Every field is optional on the wire; a
/// missing field reads as "no suggestion".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompletionResponse {
  pub completion:     Option<String>,
  pub confidence:     f32,
  pub triggered:      bool,
  pub trigger_reason: Option<String>,
  pub error:          Option<String>,
}

/// Why a response does not produce a suggestion.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
  NotTriggered(Option<String>),
  Empty,
  LowConfidence { confidence: f32, min: f32 },
}

impl fmt::Display for Rejection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NotTriggered(Some(reason)) => write!(f, "not triggered: {reason}"),
      Self::NotTriggered(None) => f.write_str("not triggered"),
      Self::Empty => f.write_str("empty completion"),
      Self::LowConfidence { confidence, min } => {
        write!(f, "confidence {confidence} below {min}")
      },
    }
  }
}

impl CompletionResponse {
  /// The completion text if the response passes every acceptance check.
  /// `min_confidence` itself is accepted.
  pub fn validate(&self, min_confidence: f32) -> Result<&str, Rejection> {
    if !self.triggered {
      return Err(Rejection::NotTriggered(self.trigger_reason.clone()));
    }
    let text = match self.completion.as_deref() {
      Some(text) if !text.is_empty() => text,
      _ => return Err(Rejection::Empty),
    };
    if self.confidence.is_nan() || self.confidence < min_confidence {
      return Err(Rejection::LowConfidence {
        confidence: self.confidence,
        min:        min_confidence,
      });
    }
    Ok(text)
  }
}

/// Body of `POST /api/run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRequest<'a> {
  pub code:     &'a str,
  pub language: Language,
}

/// Body returned by `/api/run`. Error responses carry only `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunResponse {
  pub stdout:    String,
  pub stderr:    String,
  pub exit_code: Option<i32>,
  pub error:     Option<String>,
}

/// Body returned by `GET /`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HealthResponse {
  pub status:  String,
  pub message: String,
  pub version: String,
}

impl HealthResponse {
  pub fn is_ok(&self) -> bool {
    self.status == "ok"
  }
}

/// A file handed to the chat assistant as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
  pub filename: String,
  pub text:     String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Assistant,
  #[serde(other)]
  Unknown,
}

/// One message of a chat conversation, as the assistant records it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
  pub role:      Role,
  #[serde(default)]
  pub content:   String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timestamp: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub intent:    Option<String>,
}

/// Body of `POST /api/chat`. Without `conversation_history` the server
/// continues the history it keeps for `session_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest<'a> {
  pub user_input:           &'a str,
  pub uploaded_files:       &'a [UploadedFile],
  #[serde(skip_serializing_if = "Option::is_none")]
  pub conversation_history: Option<&'a [Turn]>,
  pub session_id:           &'a str,
}

/// Body returned by `/api/chat`. Failures still carry a printable
/// `generated_response` next to `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChatResponse {
  pub intent:               String,
  pub generated_response:   String,
  pub conversation_history: Vec<Turn>,
  pub error:                Option<String>,
}

/// Body returned by `GET /api/sessions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionList {
  pub sessions: Vec<String>,
  pub count:    usize,
}

/// Body returned by `GET /api/sessions/<id>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionInfo {
  pub session_id:           String,
  pub conversation_history: Vec<Turn>,
  pub created_at:           String,
  pub message_count:        usize,
}

/// Acknowledgement returned by the session mutation routes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MessageResponse {
  pub message: String,
}

#[cfg(test)]
mod tests {
  use ropey::Rope;
  use serde_json::json;

  use super::*;

  fn response(completion: &str, confidence: f32, triggered: bool) -> CompletionResponse {
    CompletionResponse {
      completion: Some(completion.to_owned()),
      confidence,
      triggered,
      ..Default::default()
    }
  }

  #[test]
  fn confidence_boundary_is_inclusive() {
    assert_eq!(response("print(", 0.2, true).validate(0.2), Ok("print("));
    assert_eq!(
      response("print(", 0.19, true).validate(0.2),
      Err(Rejection::LowConfidence {
        confidence: 0.19,
        min:        0.2,
      })
    );
  }

  #[test]
  fn not_triggered_or_empty_is_rejected() {
    assert_eq!(
      response("print(", 0.9, false).validate(0.2),
      Err(Rejection::NotTriggered(None))
    );
    assert_eq!(response("", 0.9, true).validate(0.2), Err(Rejection::Empty));

    let missing: CompletionResponse =
      serde_json::from_value(json!({ "confidence": 0.9, "triggered": true })).unwrap();
    assert_eq!(missing.validate(0.2), Err(Rejection::Empty));
  }

  #[test]
  fn nan_confidence_is_rejected() {
    assert!(response("x", f32::NAN, true).validate(0.2).is_err());
  }

  #[test]
  fn decodes_service_payloads() {
    let ok: CompletionResponse = serde_json::from_value(json!({
      "completion": "nt(",
      "confidence": 0.85,
      "triggered": true,
      "trigger_reason": "identifier",
      "context": { "line": 0 },
    }))
    .unwrap();
    assert_eq!(ok.validate(0.2), Ok("nt("));

    let unavailable: CompletionResponse = serde_json::from_value(json!({
      "completion": "",
      "confidence": 0,
      "triggered": false,
      "error": "Completion service not available",
    }))
    .unwrap();
    assert_eq!(unavailable.error.as_deref(), Some("Completion service not available"));

    let rejected: RunResponse =
      serde_json::from_value(json!({ "error": "No code provided" })).unwrap();
    assert_eq!(rejected.exit_code, None);
    assert_eq!(rejected.stdout, "");
  }

  #[test]
  fn request_wire_format() {
    let mut doc = Document::new(Rope::from("pri"), Language::JavaScript);
    doc.set_cursor(3).unwrap();
    let request = CompletionRequest::from_document(&doc, "i");
    assert_eq!(
      serde_json::to_value(&request).unwrap(),
      json!({
        "content": "pri",
        "cursor_position": 3,
        "language": "javascript",
        "last_char": "i",
      })
    );
  }

  #[test]
  fn chat_request_uses_server_history_when_unset() {
    let files = [UploadedFile {
      filename: "main.py".into(),
      text:     "print(1)".into(),
    }];
    let request = ChatRequest {
      user_input:           "explain this",
      uploaded_files:       &files,
      conversation_history: None,
      session_id:           "default",
    };
    assert_eq!(
      serde_json::to_value(&request).unwrap(),
      json!({
        "user_input": "explain this",
        "uploaded_files": [{ "filename": "main.py", "text": "print(1)" }],
        "session_id": "default",
      })
    );
  }

  #[test]
  fn decodes_chat_reply_and_history() {
    let reply: ChatResponse = serde_json::from_value(json!({
      "intent": "explain",
      "generated_response": "It prints 1.",
      "conversation_history": [
        { "role": "user", "content": "explain this", "timestamp": "2024-01-01T00:00:00", "intent": "explain" },
        { "role": "assistant", "content": "It prints 1." },
        { "role": "system", "content": "?" },
      ],
    }))
    .unwrap();
    assert_eq!(reply.error, None);
    assert_eq!(reply.conversation_history.len(), 3);
    assert_eq!(reply.conversation_history[0].intent.as_deref(), Some("explain"));
    assert_eq!(reply.conversation_history[1].role, Role::Assistant);
    assert_eq!(reply.conversation_history[2].role, Role::Unknown);

    let unconfigured: ChatResponse = serde_json::from_value(json!({
      "error": "AI Assistant not configured.",
      "intent": "error",
      "generated_response": "The AI assistant is not configured.",
      "conversation_history": [],
    }))
    .unwrap();
    assert_eq!(unconfigured.intent, "error");
    assert!(unconfigured.error.is_some());
  }
}
