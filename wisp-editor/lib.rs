//! Editor-side integration of inline completions: the request coordinator,
//! the input session that drives it, configuration, document I/O and the
//! chat assistant glue.

pub mod chat;
pub mod config;
pub mod file;
pub mod handlers;
pub mod session;
