//! Event plumbing shared by the editor integration: debounced async hooks
//! and cancelable background tasks.

mod cancel;
mod debounce;

pub use cancel::{
  TaskController,
  TaskHandle,
  cancelable_future,
};
pub use debounce::{
  AsyncHook,
  deadline_after,
  send_blocking,
};
