//! Presentation of `/api/run` outcomes.
//!
//! Execution is user-initiated, so every outcome is shown: service errors,
//! transport failures and timeouts all end up in a [`RunReport`] rather than
//! being propagated.

use std::fmt;

use crate::{
  error::ClientError,
  protocol::RunResponse,
};

pub const SUCCESS_PLACEHOLDER: &str = "Program finished with no output.";
pub const STDERR_DIVIDER: &str = "--- stderr ---";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
  pub error:     Option<String>,
  pub stdout:    String,
  pub stderr:    String,
  pub exit_code: Option<i32>,
}

impl From<RunResponse> for RunReport {
  fn from(response: RunResponse) -> Self {
    Self {
      error:     response.error.filter(|error| !error.is_empty()),
      stdout:    response.stdout,
      stderr:    response.stderr,
      exit_code: response.exit_code,
    }
  }
}

impl From<ClientError> for RunReport {
  fn from(err: ClientError) -> Self {
    let error = match err {
      ClientError::Timeout => "Execution request timed out.".to_owned(),
      err => err.to_string(),
    };
    Self {
      error: Some(error),
      ..Self::default()
    }
  }
}

impl RunReport {
  pub fn from_result(result: Result<RunResponse, ClientError>) -> Self {
    match result {
      Ok(response) => response.into(),
      Err(err) => err.into(),
    }
  }

  /// Exit code worth showing: present and non-zero.
  pub fn failed_exit_code(&self) -> Option<i32> {
    self.exit_code.filter(|code| *code != 0)
  }

  pub fn is_failure(&self) -> bool {
    self.error.is_some() || self.failed_exit_code().is_some()
  }

  fn is_empty(&self) -> bool {
    self.error.is_none()
      && self.stdout.is_empty()
      && self.stderr.is_empty()
      && self.failed_exit_code().is_none()
  }
}

impl fmt::Display for RunReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_empty() {
      return writeln!(f, "{SUCCESS_PLACEHOLDER}");
    }

    if let Some(error) = &self.error {
      writeln!(f, "Error: {error}")?;
    }
    if !self.stdout.is_empty() {
      f.write_str(&self.stdout)?;
      if !self.stdout.ends_with('\n') {
        writeln!(f)?;
      }
    }
    if !self.stderr.is_empty() {
      writeln!(f, "{STDERR_DIVIDER}")?;
      f.write_str(&self.stderr)?;
      if !self.stderr.ends_with('\n') {
        writeln!(f)?;
      }
    }
    if let Some(code) = self.failed_exit_code() {
      writeln!(f, "Exit code: {code}")?;
    }
    Ok(())
  }
}
