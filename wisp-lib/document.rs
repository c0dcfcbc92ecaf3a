//! Document state as the editor framework exposes it to the completion core.
//!
//! A [`Document`] owns its text, a single cursor and a version counter that
//! increases with every applied non-empty transaction. It performs no I/O;
//! loading and saving live in the editor integration.
//!
//! ```
//! use ropey::Rope;
//! use wisp_lib::{
//!   document::Document,
//!   language::Language,
//!   transaction::Transaction,
//! };
//!
//! let mut doc = Document::new(Rope::from("pr"), Language::Python);
//! doc.set_cursor(2).unwrap();
//!
//! let tx = Transaction::insert(doc.text(), 2, "i".into()).unwrap();
//! doc.apply(&tx).unwrap();
//! assert_eq!(doc.text(), "pri");
//! assert_eq!(doc.cursor(), 3);
//! assert_eq!(doc.version(), 1);
//! ```

use std::path::{
  Path,
  PathBuf,
};

use ropey::{
  Rope,
  RopeSlice,
};
use thiserror::Error;

use crate::{
  language::Language,
  transaction::{
    Assoc,
    Transaction,
    TransactionError,
  },
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
  #[error("cursor {pos} is out of bounds for document length {len}")]
  CursorOutOfBounds { pos: usize, len: usize },
  #[error(transparent)]
  Transaction(#[from] TransactionError),
}

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Debug, Clone)]
pub struct Document {
  text:     Rope,
  cursor:   usize,
  version:  u64,
  language: Language,
  path:     Option<PathBuf>,
}

impl Document {
  pub fn new(text: Rope, language: Language) -> Self {
    Self {
      text,
      cursor: 0,
      version: 0,
      language,
      path: None,
    }
  }

  pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
    self.path = Some(path.into());
    self
  }

  pub fn text(&self) -> &Rope {
    &self.text
  }

  pub fn len_chars(&self) -> usize {
    self.text.len_chars()
  }

  /// Cursor position as a char offset.
  pub fn cursor(&self) -> usize {
    self.cursor
  }

  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn language(&self) -> Language {
    self.language
  }

  pub fn set_language(&mut self, language: Language) {
    self.language = language;
  }

  pub fn path(&self) -> Option<&Path> {
    self.path.as_deref()
  }

  pub fn set_path(&mut self, path: impl Into<PathBuf>) {
    self.path = Some(path.into());
  }

  /// Char offset of the start of the line containing `offset`.
  pub fn line_start(&self, offset: usize) -> usize {
    let offset = offset.min(self.text.len_chars());
    self.text.line_to_char(self.text.char_to_line(offset))
  }

  /// The text between `offset` and the end of its line, line ending
  /// excluded.
  pub fn line_suffix(&self, offset: usize) -> RopeSlice<'_> {
    let offset = offset.min(self.text.len_chars());
    let line_idx = self.text.char_to_line(offset);
    let line = self.text.line(line_idx);
    let line_start = self.text.line_to_char(line_idx);
    let mut end = line.len_chars();
    while end > 0 && matches!(line.char(end - 1), '\n' | '\r') {
      end -= 1;
    }
    let from = (offset - line_start).min(end);
    line.slice(from..end)
  }

  pub fn set_cursor(&mut self, pos: usize) -> Result<()> {
    let len = self.text.len_chars();
    if pos > len {
      return Err(DocumentError::CursorOutOfBounds { pos, len });
    }
    self.cursor = pos;
    Ok(())
  }

  /// Applies `transaction` to the text and moves the cursor: to the
  /// transaction's explicit cursor if it carries one, otherwise the old cursor
  /// mapped through the changes.
  pub fn apply(&mut self, transaction: &Transaction) -> Result<()> {
    let changes = transaction.changes();
    // map before mutating, the changeset is expressed against the old text
    let mapped = changes.map_pos(self.cursor, Assoc::After)?;
    transaction.apply(&mut self.text)?;

    let cursor = transaction.cursor().unwrap_or(mapped);
    let len = self.text.len_chars();
    if cursor > len {
      return Err(DocumentError::CursorOutOfBounds { pos: cursor, len });
    }
    self.cursor = cursor;

    if !changes.is_empty() {
      self.version = self.version.saturating_add(1);
    }
    Ok(())
  }
}
