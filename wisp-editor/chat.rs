//! Glue between local files and the chat assistant.

use std::{
  fmt::Write as _,
  fs,
  path::Path,
};

use wisp_client::protocol::{
  Role,
  Turn,
  UploadedFile,
};

use crate::file::{
  FileError,
  Result,
};

/// Reads `path` as chat context. Any text file is accepted, the assistant
/// only sees its name and contents.
pub fn read_upload(path: &Path) -> Result<UploadedFile> {
  let text = fs::read_to_string(path).map_err(|source| {
    FileError::Io {
      path: path.to_path_buf(),
      source,
    }
  })?;
  let filename = path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string());
  log::debug!("uploading {} ({} bytes)", filename, text.len());
  Ok(UploadedFile { filename, text })
}

/// Plain-text rendering of a conversation, one block per turn.
pub fn transcript(history: &[Turn]) -> String {
  let mut out = String::new();
  for turn in history {
    let who = match turn.role {
      Role::User => "you",
      Role::Assistant => "assistant",
      Role::Unknown => "?",
    };
    match turn.intent.as_deref().filter(|intent| !intent.is_empty()) {
      Some(intent) => {
        let _ = writeln!(out, "[{who}: {intent}]");
      },
      None => {
        let _ = writeln!(out, "[{who}]");
      },
    }
    out.push_str(turn.content.trim_end());
    out.push_str("\n\n");
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn upload_keeps_file_name_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.md");
    fs::write(&path, "# todo\n").unwrap();

    let upload = read_upload(&path).unwrap();
    assert_eq!(upload.filename, "notes.md");
    assert_eq!(upload.text, "# todo\n");
  }

  #[test]
  fn missing_upload_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
      read_upload(&dir.path().join("gone.py")),
      Err(FileError::Io { .. })
    ));
  }

  #[test]
  fn transcript_labels_turns() {
    let history = [
      Turn {
        role:      Role::User,
        content:   "fix this".into(),
        timestamp: None,
        intent:    Some("debug".into()),
      },
      Turn {
        role:      Role::Assistant,
        content:   "Done.\n".into(),
        timestamp: Some("2024-01-01T00:00:00".into()),
        intent:    None,
      },
    ];
    assert_eq!(
      transcript(&history),
      "[you: debug]\nfix this\n\n[assistant]\nDone.\n\n"
    );
    assert_eq!(transcript(&[]), "");
  }
}
