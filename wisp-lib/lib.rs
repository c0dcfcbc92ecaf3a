//! Pure, synchronous core of wisp's inline completion: the document model the
//! editor hands us, edit classification, the single-slot ghost suggestion and
//! its projection into an inline decoration.
//!
//! Nothing in here performs I/O or spawns tasks; the editor integration owns
//! timing and networking and drives these types from its event loop.

use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod document;
pub mod edit;
pub mod ghost;
pub mod language;
pub mod render;
pub mod transaction;
pub mod trigger;

pub type Tendril = SmartString<LazyCompact>;
