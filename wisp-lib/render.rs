//! Projection of the ghost suggestion into an inline decoration.
//!
//! Everything here is read-only: [`ghost_decoration`] looks at the ghost and
//! the document and describes what a frontend should paint. The only
//! interactive part is the optional [`AcceptHint`], whose action is always
//! [`GhostAction::Accept`] and is routed back through the resolver.

use crate::{
  Tendril,
  document::Document,
  ghost::Ghost,
};

#[derive(Debug, Clone, PartialEq)]
pub struct GhostStyle {
  /// Opacity of the ghost text relative to regular text, in `0.0..=1.0`.
  pub opacity:    f32,
  pub show_hint:  bool,
  pub hint_label: Tendril,
}

impl Default for GhostStyle {
  fn default() -> Self {
    Self {
      opacity:    0.4,
      show_hint:  true,
      hint_label: "Tab".into(),
    }
  }
}

/// Virtual text drawn inside a line at `char_idx`. Never contains line breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineGhost {
  pub char_idx: usize,
  pub text:     Tendril,
}

impl InlineGhost {
  pub fn new(char_idx: usize, text: impl Into<Tendril>) -> Self {
    let text = text.into();
    debug_assert!(
      !text.contains('\n') && !text.contains('\r'),
      "inline ghost text must not contain line breaks"
    );
    Self { char_idx, text }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GhostAction {
  Accept,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptHint {
  pub label:  Tendril,
  pub action: GhostAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GhostDecoration {
  /// First line of the remainder, at the suggestion's anchor.
  pub inline:        InlineGhost,
  /// Remaining lines, drawn as virtual lines below the anchor line.
  pub virtual_lines: Vec<Tendril>,
  pub opacity:       f32,
  pub hint:          Option<AcceptHint>,
}

impl GhostDecoration {
  /// Full text the decoration previews, line breaks normalized to `\n`.
  pub fn text(&self) -> String {
    let mut text = String::from(self.inline.text.as_str());
    for line in &self.virtual_lines {
      text.push('\n');
      text.push_str(line);
    }
    text
  }
}

/// Decoration for the ghost's showing suggestion, if any. Stale suggestions
/// and suggestions the user has already typed out produce nothing.
pub fn ghost_decoration(
  ghost: &Ghost,
  doc: &Document,
  style: &GhostStyle,
) -> Option<GhostDecoration> {
  let suggestion = ghost.active(doc)?;
  let remainder = suggestion.insertion_text(doc.text())?;
  if remainder.is_empty() {
    return None;
  }

  let mut lines = remainder.split('\n').map(|line| line.trim_end_matches('\r'));
  let first = lines.next().unwrap_or_default();

  Some(GhostDecoration {
    inline:        InlineGhost::new(suggestion.anchor, first),
    virtual_lines: lines.map(Tendril::from).collect(),
    opacity:       style.opacity.clamp(0.0, 1.0),
    hint:          style.show_hint.then(|| {
      AcceptHint {
        label:  style.hint_label.clone(),
        action: GhostAction::Accept,
      }
    }),
  })
}
