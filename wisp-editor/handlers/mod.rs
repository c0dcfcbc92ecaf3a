//! Background handlers driven by editor events.

pub mod ghost;

pub use ghost::{
  GhostHandler,
  GhostSettings,
};
