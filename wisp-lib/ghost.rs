//! Ghost suggestion state and the accept/dismiss resolver.
//!
//! [`Ghost`] holds at most one [`Suggestion`]. A suggestion is anchored at
//! the cursor offset and document version it was computed for; as soon as
//! either no longer matches the live document the suggestion is stale and
//! behaves exactly like an empty slot.
//!
//! Suggestions are generated from the whole current line, so the text may
//! repeat what the user already typed on that line. [`Suggestion::insertion_text`]
//! strips that typed prefix before anything is inserted:
//!
//! ```
//! use ropey::Rope;
//! use wisp_lib::{
//!   document::Document,
//!   ghost::{
//!     Ghost,
//!     Suggestion,
//!   },
//!   language::Language,
//! };
//!
//! let mut doc = Document::new(Rope::from("pri"), Language::Python);
//! doc.set_cursor(3).unwrap();
//!
//! let mut ghost = Ghost::new();
//! assert!(ghost.show(Suggestion::at_cursor(&doc, "print(", 0.9), &doc));
//!
//! let accepted = ghost.accept(&mut doc).unwrap().unwrap();
//! assert_eq!(accepted.text.as_str(), "nt(");
//! assert_eq!(doc.text(), "print(");
//! assert_eq!(doc.cursor(), 6);
//! ```

use std::borrow::Cow;

use ropey::Rope;

use crate::{
  Tendril,
  document::{
    Document,
    Result,
  },
  transaction::Transaction,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
  /// Suggested text as returned by the completion service.
  pub text:       Tendril,
  pub confidence: f32,
  /// Cursor offset the suggestion was requested for.
  pub anchor:     usize,
  /// Start of the anchor's line at request time.
  pub line_start: usize,
  /// Document version the suggestion was requested for.
  pub version:    u64,
}

impl Suggestion {
  /// A suggestion anchored at the document's current cursor.
  pub fn at_cursor(doc: &Document, text: impl Into<Tendril>, confidence: f32) -> Self {
    let anchor = doc.cursor();
    Self {
      text: text.into(),
      confidence,
      anchor,
      line_start: doc.line_start(anchor),
      version: doc.version(),
    }
  }

  /// Whether the suggestion still applies to `doc` as it is now.
  pub fn is_current(&self, doc: &Document) -> bool {
    self.version == doc.version()
      && self.anchor == doc.cursor()
      && self.anchor <= doc.len_chars()
      && self.line_start <= self.anchor
  }

  /// The text between the anchor line's start and the anchor.
  pub fn typed_prefix<'a>(&self, text: &'a Rope) -> Option<Cow<'a, str>> {
    if self.line_start > self.anchor || self.anchor > text.len_chars() {
      return None;
    }
    Some(text.slice(self.line_start..self.anchor).into())
  }

  /// What accepting inserts at the anchor: the suggestion minus the typed
  /// prefix when it starts with it, otherwise the whole suggestion.
  pub fn insertion_text(&self, text: &Rope) -> Option<&str> {
    let prefix = self.typed_prefix(text)?;
    Some(
      self
        .text
        .strip_prefix(prefix.as_ref())
        .unwrap_or(self.text.as_str()),
    )
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GhostStatus {
  Empty,
  Showing,
  /// A suggestion is stored but no longer matches the document. Rendered and
  /// accepted exactly like `Empty`.
  Stale,
}

/// Result of a successful accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
  /// Text that was inserted at `at`.
  pub text:   Tendril,
  pub at:     usize,
  /// Cursor after the insertion, at the end of the inserted text.
  pub cursor: usize,
}

#[derive(Debug, Default)]
pub struct Ghost {
  current: Option<Suggestion>,
}

impl Ghost {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn status(&self, doc: &Document) -> GhostStatus {
    match &self.current {
      None => GhostStatus::Empty,
      Some(suggestion) if suggestion.is_current(doc) => GhostStatus::Showing,
      Some(_) => GhostStatus::Stale,
    }
  }

  /// The suggestion if it is showing; stale suggestions are hidden.
  pub fn active(&self, doc: &Document) -> Option<&Suggestion> {
    self
      .current
      .as_ref()
      .filter(|suggestion| suggestion.is_current(doc))
  }

  /// Stores `suggestion` if it is anchored at the live cursor and version.
  /// Returns whether it was stored; a refused suggestion leaves the slot
  /// untouched.
  pub fn show(&mut self, suggestion: Suggestion, doc: &Document) -> bool {
    if !suggestion.is_current(doc) {
      log::trace!(
        "refusing stale suggestion anchored at {} (v{}), cursor {} (v{})",
        suggestion.anchor,
        suggestion.version,
        doc.cursor(),
        doc.version()
      );
      return false;
    }
    self.current = Some(suggestion);
    true
  }

  pub fn clear(&mut self) -> Option<Suggestion> {
    self.current.take()
  }

  /// Drops the current suggestion. Returns whether one was showing.
  pub fn dismiss(&mut self, doc: &Document) -> bool {
    let showing = self.status(doc) == GhostStatus::Showing;
    self.current = None;
    showing
  }

  /// Commits the showing suggestion into `doc`.
  ///
  /// Returns `Ok(None)` without touching the document when nothing is
  /// showing, when the suggestion went stale (it is cleared) or when the typed
  /// prefix already covers the whole suggestion.
  pub fn accept(&mut self, doc: &mut Document) -> Result<Option<Accepted>> {
    let Some(suggestion) = self.current.take() else {
      return Ok(None);
    };
    if !suggestion.is_current(doc) {
      log::debug!("dropping stale suggestion on accept");
      return Ok(None);
    }
    let Some(text) = suggestion.insertion_text(doc.text()) else {
      return Ok(None);
    };
    if text.is_empty() {
      return Ok(None);
    }

    let text = Tendril::from(text);
    let at = suggestion.anchor;
    let cursor = at + text.chars().count();
    let tx = Transaction::insert(doc.text(), at, text.clone())?.with_cursor(cursor);
    doc.apply(&tx)?;

    Ok(Some(Accepted { text, at, cursor }))
  }
}
