use std::{
  fmt,
  path::Path,
  str::FromStr,
};

use serde::{
  Deserialize,
  Serialize,
};

/// Languages the completion and execution services understand.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
  #[default]
  Python,
  JavaScript,
}

/// File extensions that may be opened, and the language each maps to.
/// TypeScript sources are treated as JavaScript.
pub const EXTENSIONS: &[(&str, Language)] = &[
  ("py", Language::Python),
  ("pyw", Language::Python),
  ("js", Language::JavaScript),
  ("mjs", Language::JavaScript),
  ("cjs", Language::JavaScript),
  ("jsx", Language::JavaScript),
  ("ts", Language::JavaScript),
  ("tsx", Language::JavaScript),
];

impl Language {
  pub const fn name(self) -> &'static str {
    match self {
      Self::Python => "python",
      Self::JavaScript => "javascript",
    }
  }

  pub fn from_extension(ext: &str) -> Option<Self> {
    EXTENSIONS
      .iter()
      .find(|(candidate, _)| candidate.eq_ignore_ascii_case(ext))
      .map(|(_, language)| *language)
  }

  /// Language for an openable file, `None` if the extension is not on the
  /// allow-list.
  pub fn from_path(path: &Path) -> Option<Self> {
    path
      .extension()
      .and_then(|ext| ext.to_str())
      .and_then(Self::from_extension)
  }

  /// Extension used when saving a buffer of this language.
  pub const fn file_extension(self) -> &'static str {
    match self {
      Self::Python => "py",
      Self::JavaScript => "js",
    }
  }

  /// Text inserted by Tab when there is no suggestion to accept.
  pub const fn indent_unit(self) -> &'static str {
    match self {
      Self::Python => "    ",
      Self::JavaScript => "  ",
    }
  }
}

impl fmt::Display for Language {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language '{0}', expected python or javascript")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
  type Err = UnknownLanguage;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "python" | "py" => Ok(Self::Python),
      "javascript" | "js" => Ok(Self::JavaScript),
      _ => Err(UnknownLanguage(s.to_owned())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn allow_list() {
    assert_eq!(Language::from_path(Path::new("main.py")), Some(Language::Python));
    assert_eq!(Language::from_path(Path::new("app.JSX")), Some(Language::JavaScript));
    assert_eq!(Language::from_path(Path::new("index.ts")), Some(Language::JavaScript));
    assert_eq!(Language::from_path(Path::new("notes.txt")), None);
    assert_eq!(Language::from_path(Path::new("Makefile")), None);
  }

  #[test]
  fn wire_names() {
    assert_eq!(serde_json::to_string(&Language::JavaScript).unwrap(), "\"javascript\"");
    assert_eq!(
      serde_json::from_str::<Language>("\"python\"").unwrap(),
      Language::Python
    );
    assert_eq!("JS".parse::<Language>(), Ok(Language::JavaScript));
    assert!("rust".parse::<Language>().is_err());
  }

  #[test]
  fn save_extension() {
    assert_eq!(Language::Python.file_extension(), "py");
    assert_eq!(Language::JavaScript.file_extension(), "js");
  }
}
