//! Debounced async hooks.
//!
//! A hook lives on its own tokio task and receives events from the
//! synchronous editor thread through a bounded channel. Each event may move
//! the hook's deadline; once the channel stays quiet until the deadline the
//! hook's [`AsyncHook::finish_debounce`] runs.

use std::time::Duration;

use futures_executor::block_on;
use tokio::{
  sync::mpsc::{
    self,
    Sender,
    error::TrySendError,
  },
  time::Instant,
};

/// Upper bound for blocking the editor thread on a full channel.
const SEND_TIMEOUT_MS: u64 = 2;

/// Channel capacity for hook events. Keystroke bursts are drained quickly,
/// the headroom only matters when the runtime is starved.
const HOOK_CHANNEL_CAPACITY: usize = 128;

pub trait AsyncHook: Sync + Send + 'static + Sized {
  type Event: Sync + Send + 'static;

  /// Called for every received event. Returns the deadline at which
  /// [`AsyncHook::finish_debounce`] should run, `None` clears any deadline.
  /// `timeout` is the currently armed deadline.
  fn handle_event(&mut self, event: Self::Event, timeout: Option<Instant>) -> Option<Instant>;

  /// Called once the armed deadline passes without a new event.
  fn finish_debounce(&mut self);

  fn spawn(self) -> mpsc::Sender<Self::Event> {
    let (tx, rx) = mpsc::channel(HOOK_CHANNEL_CAPACITY);
    // outside a runtime (plain unit tests) the sender is simply never drained
    if tokio::runtime::Handle::try_current().is_ok() {
      tokio::spawn(run(self, rx));
    } else {
      log::debug!("no tokio runtime, async hook not started");
    }
    tx
  }
}

/// Deadline `delay` from now, the usual return value of
/// [`AsyncHook::handle_event`] for a debounced event.
pub fn deadline_after(delay: Duration) -> Instant {
  Instant::now() + delay
}

/// Drives `hook` until every sender is dropped. One timer is reused for the
/// whole lifetime of the hook and only polled while a deadline is armed.
async fn run<Hook: AsyncHook>(mut hook: Hook, mut rx: mpsc::Receiver<Hook::Event>) {
  let timer = tokio::time::sleep_until(Instant::now());
  tokio::pin!(timer);
  let mut armed: Option<Instant> = None;

  loop {
    tokio::select! {
      biased;
      event = rx.recv() => {
        let Some(event) = event else {
          break;
        };
        armed = hook.handle_event(event, armed);
        if let Some(deadline) = armed {
          timer.as_mut().reset(deadline);
        }
      },
      () = &mut timer, if armed.is_some() => {
        armed = None;
        hook.finish_debounce();
      },
    }
  }
  log::trace!("async hook stopped");
}

/// Sends an event from synchronous code. Returns whether it was queued.
///
/// A full channel blocks the caller for at most `SEND_TIMEOUT_MS` before the
/// event is dropped.
pub fn send_blocking<T>(tx: &Sender<T>, data: T) -> bool {
  let data = match tx.try_send(data) {
    Ok(()) => return true,
    Err(TrySendError::Closed(_)) => {
      log::warn!("attempted to send to closed hook channel");
      return false;
    },
    Err(TrySendError::Full(data)) => data,
  };
  let sent = block_on(tx.send_timeout(data, Duration::from_millis(SEND_TIMEOUT_MS))).is_ok();
  if !sent {
    log::warn!("hook channel full, dropping event");
  }
  sent
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{
      AtomicUsize,
      Ordering,
    },
  };

  use super::*;

  struct CountingHook {
    last:     Arc<AtomicUsize>,
    finished: Arc<AtomicUsize>,
    pending:  Option<usize>,
  }

  impl AsyncHook for CountingHook {
    type Event = usize;

    fn handle_event(&mut self, event: usize, _timeout: Option<Instant>) -> Option<Instant> {
      self.pending = Some(event);
      Some(deadline_after(Duration::from_millis(100)))
    }

    fn finish_debounce(&mut self) {
      if let Some(event) = self.pending.take() {
        self.last.store(event, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
      }
    }
  }

  #[tokio::test(start_paused = true)]
  async fn burst_of_events_finishes_once() {
    let last = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let tx = CountingHook {
      last:     last.clone(),
      finished: finished.clone(),
      pending:  None,
    }
    .spawn();

    for event in 1..=5 {
      send_blocking(&tx, event);
      tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(last.load(Ordering::SeqCst), 5);
  }

  #[tokio::test(start_paused = true)]
  async fn quiet_gaps_finish_each_event() {
    let last = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let tx = CountingHook {
      last:     last.clone(),
      finished: finished.clone(),
      pending:  None,
    }
    .spawn();

    send_blocking(&tx, 1);
    tokio::time::sleep(Duration::from_millis(150)).await;
    send_blocking(&tx, 2);
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(finished.load(Ordering::SeqCst), 2);
    assert_eq!(last.load(Ordering::SeqCst), 2);
  }

  /// Event `0` disarms the deadline instead of moving it.
  struct DisarmingHook {
    finished: Arc<AtomicUsize>,
  }

  impl AsyncHook for DisarmingHook {
    type Event = usize;

    fn handle_event(&mut self, event: usize, _timeout: Option<Instant>) -> Option<Instant> {
      (event != 0).then(|| deadline_after(Duration::from_millis(100)))
    }

    fn finish_debounce(&mut self) {
      self.finished.fetch_add(1, Ordering::SeqCst);
    }
  }

  #[tokio::test(start_paused = true)]
  async fn disarmed_deadline_never_fires() {
    let finished = Arc::new(AtomicUsize::new(0));
    let tx = DisarmingHook {
      finished: finished.clone(),
    }
    .spawn();

    assert!(send_blocking(&tx, 1));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(send_blocking(&tx, 0));
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 0);

    assert!(send_blocking(&tx, 2));
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn send_to_closed_channel_reports_failure() {
    let (tx, rx) = mpsc::channel::<usize>(1);
    drop(rx);
    assert!(!send_blocking(&tx, 1));
  }
}
