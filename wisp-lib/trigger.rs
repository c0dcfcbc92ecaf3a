//! Local preconditions checked before a completion fetch is scheduled.

use std::fmt;

use crate::document::Document;

/// Minimum document length below which no completion is requested.
pub const DEFAULT_MIN_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerPolicy {
  pub min_chars:        usize,
  /// Only request completions when nothing but whitespace follows the cursor
  /// on its line.
  pub require_line_end: bool,
}

impl Default for TriggerPolicy {
  fn default() -> Self {
    Self {
      min_chars:        DEFAULT_MIN_CHARS,
      require_line_end: true,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
  TooShort { len: usize, min: usize },
  TrailingText,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::TooShort { len, min } => write!(f, "document has {len} chars, need {min}"),
      Self::TrailingText => f.write_str("cursor is not at the end of the line"),
    }
  }
}

impl TriggerPolicy {
  pub fn check(&self, doc: &Document) -> Result<(), SkipReason> {
    let len = doc.len_chars();
    if len < self.min_chars {
      return Err(SkipReason::TooShort {
        len,
        min: self.min_chars,
      });
    }
    if self.require_line_end && doc.line_suffix(doc.cursor()).chars().any(|c| !c.is_whitespace()) {
      return Err(SkipReason::TrailingText);
    }
    Ok(())
  }
}
