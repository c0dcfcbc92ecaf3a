//! Classification of a single edit, independent of any live editor.

use ropey::Rope;

use crate::transaction::ChangeSet;

/// What an edit did to the document, as far as completion triggering cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditSummary {
  pub inserted_chars: usize,
  pub deleted_chars:  usize,
  /// Last character of the last insertion, in document order.
  pub last_inserted:  Option<char>,
}

impl EditSummary {
  pub fn from_changes(changes: &ChangeSet) -> Self {
    let mut summary = Self::default();
    for (from, to, text) in changes.changes_iter() {
      summary.deleted_chars += to - from;
      let Some(text) = text else {
        continue;
      };
      summary.inserted_chars += text.chars().count();
      if let Some(c) = text.chars().next_back() {
        summary.last_inserted = Some(c);
      }
    }
    summary
  }

  /// Summarizes the edit that turns `old` into `new` as one replacement of
  /// the span between their common prefix and common suffix.
  pub fn between(old: &Rope, new: &Rope) -> Self {
    let prefix = old
      .chars()
      .zip(new.chars())
      .take_while(|(a, b)| a == b)
      .count();
    let max_suffix = old.len_chars().min(new.len_chars()) - prefix;
    let suffix = old
      .chars_at(old.len_chars())
      .reversed()
      .zip(new.chars_at(new.len_chars()).reversed())
      .take(max_suffix)
      .take_while(|(a, b)| a == b)
      .count();

    let inserted_end = new.len_chars() - suffix;
    Self {
      inserted_chars: inserted_end - prefix,
      deleted_chars:  old.len_chars() - suffix - prefix,
      last_inserted:  (inserted_end > prefix).then(|| new.char(inserted_end - 1)),
    }
  }

  pub fn is_pure_deletion(&self) -> bool {
    self.inserted_chars == 0 && self.deleted_chars > 0
  }

  /// Only edits that insert text ask for a new suggestion.
  pub fn should_fetch(&self) -> bool {
    self.inserted_chars > 0
  }

  /// `last_char` as sent on the wire: zero or one character.
  pub fn last_char(&self) -> String {
    self.last_inserted.map(String::from).unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use quickcheck::TestResult;

  use super::*;
  use crate::transaction::Transaction;

  fn summarize(text: &str, changes: Vec<(usize, usize, Option<&str>)>) -> EditSummary {
    let doc = Rope::from(text);
    let tx = Transaction::change(
      &doc,
      changes
        .into_iter()
        .map(|(from, to, text)| (from, to, text.map(Into::into))),
    )
    .unwrap();
    EditSummary::from_changes(tx.changes())
  }

  #[test]
  fn typed_character() {
    let summary = summarize("pr", vec![(2, 2, Some("i"))]);
    assert_eq!(summary.last_inserted, Some('i'));
    assert_eq!(summary.last_char(), "i");
    assert!(summary.should_fetch());
    assert!(!summary.is_pure_deletion());
  }

  #[test]
  fn backspace_is_pure_deletion() {
    let summary = summarize("pri", vec![(2, 3, None)]);
    assert!(summary.is_pure_deletion());
    assert!(!summary.should_fetch());
    assert_eq!(summary.last_char(), "");
  }

  #[test]
  fn replacement_counts_as_insertion() {
    let summary = summarize("foo bar", vec![(4, 7, Some("baz"))]);
    assert_eq!(summary.inserted_chars, 3);
    assert_eq!(summary.deleted_chars, 3);
    assert_eq!(summary.last_inserted, Some('z'));
    assert!(summary.should_fetch());
  }

  #[test]
  fn last_insertion_in_document_order() {
    let summary = summarize("a b c", vec![(1, 1, Some("x")), (3, 3, Some("(y"))]);
    assert_eq!(summary.last_inserted, Some('y'));
  }

  #[test]
  fn paste_reports_last_char() {
    let summary = summarize("", vec![(0, 0, Some("def main():\n"))]);
    assert_eq!(summary.last_inserted, Some('\n'));
  }

  #[test]
  fn empty_edit_does_not_fetch() {
    let summary = summarize("abc", vec![]);
    assert!(!summary.should_fetch());
    assert!(!summary.is_pure_deletion());
  }

  #[test]
  fn between_detects_typing() {
    let summary = EditSummary::between(&Rope::from("pr"), &Rope::from("pri"));
    assert_eq!(summary.inserted_chars, 1);
    assert_eq!(summary.deleted_chars, 0);
    assert_eq!(summary.last_inserted, Some('i'));
  }

  #[test]
  fn between_repeated_chars() {
    // "aa" -> "aaa" is ambiguous, any single insertion of 'a' is correct
    let summary = EditSummary::between(&Rope::from("aa"), &Rope::from("aaa"));
    assert_eq!(summary.inserted_chars, 1);
    assert_eq!(summary.last_inserted, Some('a'));
  }

  #[test]
  fn between_detects_deletion() {
    let summary = EditSummary::between(&Rope::from("print"), &Rope::from("prnt"));
    assert!(summary.is_pure_deletion());
    assert_eq!(summary.deleted_chars, 1);
  }

  quickcheck::quickcheck! {
      fn between_agrees_with_changeset(text: String, at: usize, insert: String, delete: usize) -> TestResult {
          let old = Rope::from(text.as_str());
          let len = old.len_chars();
          let from = if len == 0 { 0 } else { at % (len + 1) };
          let to = from + if len == from { 0 } else { delete % (len - from + 1) };
          let tx = Transaction::change(&old, [(from, to, Some(insert.as_str().into()))]).unwrap();
          let mut new = old.clone();
          tx.apply(&mut new).unwrap();
          if new == old {
              return TestResult::discard();
          }

          let exact = EditSummary::from_changes(tx.changes());
          let diffed = EditSummary::between(&old, &new);
          TestResult::from_bool(
            exact.should_fetch() == diffed.should_fetch()
              || (diffed.is_pure_deletion() && insert.chars().all(|c| text.contains(c)))
          )
      }
  }
}
