//! A single open document wired to the ghost handler.

use wisp_lib::{
  document::{
    Document,
    Result,
  },
  ghost::Accepted,
  render::{
    GhostDecoration,
    GhostStyle,
  },
  transaction::Transaction,
};

use crate::handlers::GhostHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
  Char(char),
  Newline,
  Backspace,
  MoveTo(usize),
  /// Accepts the suggestion if one is showing, otherwise indents.
  Tab,
  Escape,
}

pub struct Session {
  doc:   Document,
  ghost: GhostHandler,
  style: GhostStyle,
}

impl Session {
  pub fn new(doc: Document, ghost: GhostHandler, style: GhostStyle) -> Self {
    Self { doc, ghost, style }
  }

  pub fn doc(&self) -> &Document {
    &self.doc
  }

  pub fn handler(&self) -> &GhostHandler {
    &self.ghost
  }

  pub fn into_document(self) -> Document {
    self.doc
  }

  /// Routes one input. Returns what was accepted when Tab committed a
  /// suggestion.
  pub fn handle(&mut self, input: Input) -> Result<Option<Accepted>> {
    let result = match input {
      Input::Char(c) => self.insert(c.encode_utf8(&mut [0; 4])),
      Input::Newline => self.insert("\n"),
      Input::Backspace => self.backspace(),
      Input::MoveTo(pos) => {
        self.doc.set_cursor(pos)?;
        self.ghost.on_selection_change(&self.doc);
        Ok(())
      },
      Input::Tab => {
        if let Some(accepted) = self.ghost.accept(&mut self.doc)? {
          return Ok(Some(accepted));
        }
        self.insert(self.doc.language().indent_unit())
      },
      Input::Escape => {
        self.ghost.dismiss(&self.doc);
        Ok(())
      },
    };
    result.map(|()| None)
  }

  /// Accepts the showing suggestion, never falls back to indenting.
  pub fn accept(&mut self) -> Result<Option<Accepted>> {
    self.ghost.accept(&mut self.doc)
  }

  /// Re-types the character before the cursor so the edit goes through the
  /// completion pipeline. Returns `false` at the start of the document.
  pub fn replay_last_char(&mut self) -> Result<bool> {
    let cursor = self.doc.cursor();
    if cursor == 0 {
      return Ok(false);
    }
    let c = self.doc.text().char(cursor - 1);
    let tx = Transaction::delete(self.doc.text(), [(cursor - 1, cursor)])?;
    self.doc.apply(&tx)?;
    self.handle(Input::Char(c))?;
    Ok(true)
  }

  /// Waits for the next fetch result and applies it. Returns whether a
  /// suggestion is showing afterwards.
  pub async fn settle(&mut self) -> bool {
    match self.ghost.next_outcome().await {
      Some(outcome) => self.ghost.apply_outcome(outcome, &self.doc),
      None => false,
    }
  }

  /// Applies results that already arrived without waiting.
  pub fn poll(&mut self) -> bool {
    self.ghost.drain_outcomes(&self.doc)
  }

  pub fn decoration(&self) -> Option<GhostDecoration> {
    self.ghost.decoration(&self.doc, &self.style)
  }

  fn insert(&mut self, text: &str) -> Result<()> {
    let tx = Transaction::insert(self.doc.text(), self.doc.cursor(), text.into())?;
    self.doc.apply(&tx)?;
    self.ghost.on_document_change(&self.doc, tx.changes());
    Ok(())
  }

  fn backspace(&mut self) -> Result<()> {
    let cursor = self.doc.cursor();
    if cursor == 0 {
      return Ok(());
    }
    let tx = Transaction::delete(self.doc.text(), [(cursor - 1, cursor)])?;
    self.doc.apply(&tx)?;
    self.ghost.on_document_change(&self.doc, tx.changes());
    Ok(())
  }
}
