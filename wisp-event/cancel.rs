use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Runs `future` until it completes or `handle` is canceled.
///
/// Returns `None` when the task was canceled; the future is dropped at that
/// point so nothing after its current await point ever executes.
pub async fn cancelable_future<T>(future: impl Future<Output = T>, handle: &TaskHandle) -> Option<T> {
  tokio::select! {
    biased;
    _ = handle.canceled() => None,
    res = future => Some(res),
  }
}

/// Owner side of a restartable background task.
///
/// At most one task is live per controller: [`TaskController::restart`]
/// cancels the previous handle before handing out a new one, so a caller can
/// never hold two running handles from the same controller.
#[derive(Debug, Default)]
pub struct TaskController {
  current: Option<CancellationToken>,
}

impl TaskController {
  pub fn new() -> Self {
    Self::default()
  }

  /// Cancels the current task (if any). Synchronous: every clone of the
  /// handle observes the cancellation as soon as this returns.
  pub fn cancel(&mut self) {
    if let Some(token) = self.current.take() {
      token.cancel();
    }
  }

  /// Forgets the current task without canceling it, once its result has been
  /// consumed.
  pub fn finish(&mut self) {
    self.current = None;
  }

  /// Whether a task was started and has neither been canceled nor finished.
  pub fn is_running(&self) -> bool {
    self
      .current
      .as_ref()
      .is_some_and(|token| !token.is_cancelled())
  }

  /// Cancels the current task and returns the handle for a new one.
  pub fn restart(&mut self) -> TaskHandle {
    self.cancel();
    let token = CancellationToken::new();
    self.current = Some(token.clone());
    TaskHandle { token }
  }
}

impl Drop for TaskController {
  fn drop(&mut self) {
    self.cancel();
  }
}

/// Task side of a [`TaskController`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TaskHandle {
  token: CancellationToken,
}

impl TaskHandle {
  /// Resolves once the controller canceled or restarted this task.
  pub async fn canceled(&self) {
    self.token.cancelled().await
  }

  pub fn is_canceled(&self) -> bool {
    self.token.is_cancelled()
  }

  /// Token for APIs that take a plain cancellation token (HTTP clients).
  pub fn token(&self) -> CancellationToken {
    self.token.clone()
  }
}

#[cfg(test)]
mod tests {
  use std::{
    future::pending,
    time::Duration,
  };

  use super::*;

  #[test]
  fn restart_cancels_previous_handle() {
    let mut controller = TaskController::new();
    assert!(!controller.is_running());

    let first = controller.restart();
    assert!(controller.is_running());
    assert!(!first.is_canceled());

    let second = controller.restart();
    assert!(first.is_canceled());
    assert!(!second.is_canceled());

    controller.cancel();
    assert!(second.is_canceled());
    assert!(!controller.is_running());
  }

  #[test]
  fn finish_keeps_handle_live() {
    let mut controller = TaskController::new();
    let handle = controller.restart();
    controller.finish();
    assert!(!controller.is_running());
    assert!(!handle.is_canceled());

    // nothing left to cancel
    controller.cancel();
    assert!(!handle.is_canceled());
  }

  #[test]
  fn dropping_controller_cancels() {
    let mut controller = TaskController::new();
    let handle = controller.restart();
    drop(controller);
    assert!(handle.is_canceled());
  }

  #[tokio::test]
  async fn canceled_future_yields_none() {
    let mut controller = TaskController::new();
    let handle = controller.restart();
    controller.cancel();
    let res = cancelable_future(pending::<()>(), &handle).await;
    assert_eq!(res, None);
  }

  #[tokio::test(start_paused = true)]
  async fn cancel_interrupts_in_flight_future() {
    let mut controller = TaskController::new();
    let handle = controller.restart();
    let task = tokio::spawn(async move {
      cancelable_future(
        async {
          tokio::time::sleep(Duration::from_secs(10)).await;
          42
        },
        &handle,
      )
      .await
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    controller.cancel();
    assert_eq!(task.await.unwrap(), None);
  }

  #[tokio::test]
  async fn live_future_completes() {
    let mut controller = TaskController::new();
    let handle = controller.restart();
    assert_eq!(cancelable_future(async { 7 }, &handle).await, Some(7));
  }
}
