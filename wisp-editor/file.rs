//! Loading and saving documents.
//!
//! Only files on the language allow-list can be opened. Saving picks the
//! extension from the document's language unless the path already has one
//! that maps to it.

use std::{
  fs::{
    self,
    File,
  },
  io::{
    self,
    BufReader,
    BufWriter,
    Write,
  },
  path::{
    Path,
    PathBuf,
  },
};

use ropey::Rope;
use thiserror::Error;
use wisp_lib::{
  document::Document,
  language::Language,
};

#[derive(Debug, Error)]
pub enum FileError {
  #[error("{}: unsupported file type", path.display())]
  Unsupported { path: PathBuf },
  #[error("document has no path")]
  NoPath,
  #[error("{}: {source}", path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: io::Error,
  },
}

pub type Result<T> = std::result::Result<T, FileError>;

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> FileError + '_ {
  move |source| {
    FileError::Io {
      path: path.to_path_buf(),
      source,
    }
  }
}

pub fn open_document(path: &Path) -> Result<Document> {
  let language = Language::from_path(path).ok_or_else(|| {
    FileError::Unsupported {
      path: path.to_path_buf(),
    }
  })?;
  let file = File::open(path).map_err(io_error(path))?;
  let text = Rope::from_reader(BufReader::new(file)).map_err(io_error(path))?;
  log::debug!("opened {} as {}", path.display(), language);
  Ok(Document::new(text, language).with_path(path))
}

/// `path` with the extension `language` saves under.
pub fn save_path(path: &Path, language: Language) -> PathBuf {
  if Language::from_path(path) == Some(language) {
    return path.to_path_buf();
  }
  path.with_extension(language.file_extension())
}

/// Writes `doc` to its own path. Returns where it was written.
pub fn save_document(doc: &Document) -> Result<PathBuf> {
  let path = doc.path().ok_or(FileError::NoPath)?;
  save_document_as(doc, path)
}

pub fn save_document_as(doc: &Document, path: &Path) -> Result<PathBuf> {
  let path = save_path(path, doc.language());
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(io_error(&path))?;
  }
  let file = File::create(&path).map_err(io_error(&path))?;
  let mut writer = BufWriter::new(file);
  doc.text().write_to(&mut writer).map_err(io_error(&path))?;
  writer.flush().map_err(io_error(&path))?;
  log::debug!("wrote {}", path.display());
  Ok(path)
}
