//! Inline completion coordination.
//!
//! [`GhostHandler`] lives on the editor thread and sees every edit and cursor
//! move. Edits cancel whatever request is outstanding, clear the ghost and,
//! if the edit inserted text, hand a trigger to [`GhostRequestHook`]. The hook
//! debounces triggers on its own task and dispatches only the last one. Fetch
//! results come back over a channel as [`FetchOutcome`]s and are applied on the
//! editor thread, after checking that the request was not superseded and that
//! the document still looks like it did when the request was made.

use std::{
  sync::Arc,
  time::Duration,
};

use tokio::{
  sync::mpsc::{
    self,
    Sender,
    UnboundedReceiver,
    UnboundedSender,
  },
  time::Instant,
};
use wisp_client::{
  ClientError,
  CompletionProvider,
  protocol::{
    CompletionRequest,
    CompletionResponse,
  },
};
use wisp_event::{
  AsyncHook,
  TaskController,
  TaskHandle,
  cancelable_future,
  deadline_after,
  send_blocking,
};
use wisp_lib::{
  document::{
    Document,
    DocumentError,
  },
  edit::EditSummary,
  ghost::{
    Accepted,
    Ghost,
    GhostStatus,
    Suggestion,
  },
  render::{
    GhostDecoration,
    GhostStyle,
    ghost_decoration,
  },
  transaction::ChangeSet,
  trigger::TriggerPolicy,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostSettings {
  pub enable:         bool,
  pub debounce:       Duration,
  pub min_confidence: f32,
  pub trigger:        TriggerPolicy,
}

impl Default for GhostSettings {
  fn default() -> Self {
    Self {
      enable:         true,
      debounce:       Duration::from_millis(400),
      min_confidence: 0.2,
      trigger:        TriggerPolicy::default(),
    }
  }
}

/// Where a request was made: the suggestion it produces is only valid here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOrigin {
  pub anchor:     usize,
  pub line_start: usize,
  pub version:    u64,
}

impl RequestOrigin {
  fn of(doc: &Document) -> Self {
    let anchor = doc.cursor();
    Self {
      anchor,
      line_start: doc.line_start(anchor),
      version: doc.version(),
    }
  }

  fn is_current(&self, doc: &Document) -> bool {
    self.anchor == doc.cursor() && self.version == doc.version()
  }
}

#[derive(Debug)]
pub struct PendingFetch {
  pub request: CompletionRequest,
  pub origin:  RequestOrigin,
  pub handle:  TaskHandle,
}

#[derive(Debug)]
pub enum GhostEvent {
  Trigger(PendingFetch),
  /// Forget the pending trigger without dispatching it.
  Cancel,
}

#[derive(Debug)]
pub struct FetchOutcome {
  pub origin: RequestOrigin,
  pub handle: TaskHandle,
  pub result: Result<CompletionResponse, ClientError>,
}

/// Debounces triggers and dispatches the fetch for the last one.
pub struct GhostRequestHook {
  provider:   Arc<dyn CompletionProvider>,
  debounce:   Duration,
  pending:    Option<PendingFetch>,
  outcome_tx: UnboundedSender<FetchOutcome>,
}

impl GhostRequestHook {
  pub fn new(
    provider: Arc<dyn CompletionProvider>,
    debounce: Duration,
    outcome_tx: UnboundedSender<FetchOutcome>,
  ) -> Self {
    Self {
      provider,
      debounce,
      pending: None,
      outcome_tx,
    }
  }
}

impl AsyncHook for GhostRequestHook {
  type Event = GhostEvent;

  fn handle_event(&mut self, event: Self::Event, _timeout: Option<Instant>) -> Option<Instant> {
    match event {
      GhostEvent::Trigger(fetch) => {
        // an older trigger is already canceled by its controller
        self.pending = Some(fetch);
        Some(deadline_after(self.debounce))
      },
      GhostEvent::Cancel => {
        self.pending = None;
        None
      },
    }
  }

  fn finish_debounce(&mut self) {
    let Some(PendingFetch {
      request,
      origin,
      handle,
    }) = self.pending.take()
    else {
      return;
    };
    if handle.is_canceled() {
      log::trace!("trigger canceled before dispatch");
      return;
    }

    log::debug!(
      "requesting completion at {} (v{})",
      origin.anchor,
      origin.version
    );
    let provider = self.provider.clone();
    let outcome_tx = self.outcome_tx.clone();
    tokio::spawn(async move {
      let fetch = provider.complete(request, handle.token());
      let Some(result) = cancelable_future(fetch, &handle).await else {
        log::trace!("completion request at {} canceled", origin.anchor);
        return;
      };
      // the handler may be gone already
      let _ = outcome_tx.send(FetchOutcome {
        origin,
        handle,
        result,
      });
    });
  }
}

/// Owns the ghost and the in-flight request for one document.
pub struct GhostHandler {
  settings:   GhostSettings,
  event_tx:   Sender<GhostEvent>,
  outcome_rx: UnboundedReceiver<FetchOutcome>,
  controller: TaskController,
  ghost:      Ghost,
}

impl GhostHandler {
  /// Spawns the request hook; must be called inside a tokio runtime for
  /// completions to be fetched.
  pub fn new(provider: Arc<dyn CompletionProvider>, settings: GhostSettings) -> Self {
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
    let event_tx = GhostRequestHook::new(provider, settings.debounce, outcome_tx).spawn();
    Self {
      settings,
      event_tx,
      outcome_rx,
      controller: TaskController::new(),
      ghost: Ghost::new(),
    }
  }

  pub fn settings(&self) -> &GhostSettings {
    &self.settings
  }

  pub fn ghost(&self) -> &Ghost {
    &self.ghost
  }

  pub fn status(&self, doc: &Document) -> GhostStatus {
    self.ghost.status(doc)
  }

  /// Whether a request is scheduled or in flight and its result has not been
  /// applied yet.
  pub fn is_pending(&self) -> bool {
    self.controller.is_running()
  }

  /// Call after `changes` were applied to `doc`.
  pub fn on_document_change(&mut self, doc: &Document, changes: &ChangeSet) {
    self.controller.cancel();
    self.ghost.clear();

    if !self.settings.enable {
      return;
    }
    let summary = EditSummary::from_changes(changes);
    if !summary.should_fetch() {
      if summary.is_pure_deletion() {
        log::trace!("deletion, not requesting completion");
      }
      send_blocking(&self.event_tx, GhostEvent::Cancel);
      return;
    }
    if let Err(reason) = self.settings.trigger.check(doc) {
      log::trace!("not requesting completion: {reason}");
      send_blocking(&self.event_tx, GhostEvent::Cancel);
      return;
    }

    let handle = self.controller.restart();
    let fetch = PendingFetch {
      request: CompletionRequest::from_document(doc, summary.last_char()),
      origin: RequestOrigin::of(doc),
      handle,
    };
    send_blocking(&self.event_tx, GhostEvent::Trigger(fetch));
  }

  /// Call after the cursor moved without an edit. Abandons the pending
  /// request as well: its result belongs to a position the user left, even if
  /// the cursor comes back before it arrives.
  pub fn on_selection_change(&mut self, doc: &Document) {
    if self.controller.is_running() {
      self.controller.cancel();
      send_blocking(&self.event_tx, GhostEvent::Cancel);
      log::trace!("cursor moved to {}, request abandoned", doc.cursor());
    }
    if self.ghost.clear().is_some() {
      log::trace!("cursor moved to {}, ghost cleared", doc.cursor());
    }
  }

  /// Applies a fetch result. Returns whether a suggestion is showing
  /// afterwards, which may be an older one the result did not touch.
  pub fn apply_outcome(&mut self, outcome: FetchOutcome, doc: &Document) -> bool {
    self.resolve(outcome, doc);
    self.ghost.status(doc) == GhostStatus::Showing
  }

  fn resolve(&mut self, outcome: FetchOutcome, doc: &Document) {
    let FetchOutcome {
      origin,
      handle,
      result,
    } = outcome;
    if handle.is_canceled() {
      log::trace!("dropping superseded completion for {}", origin.anchor);
      return;
    }
    // the live request is over, whatever it produced
    self.controller.finish();
    if !origin.is_current(doc) {
      log::trace!(
        "dropping stale completion for {} (v{}), cursor at {} (v{})",
        origin.anchor,
        origin.version,
        doc.cursor(),
        doc.version()
      );
      return;
    }

    let response = match result {
      Ok(response) => response,
      Err(err) if err.is_cancelled() => return,
      Err(err) => {
        log::debug!("completion request failed: {err}");
        self.ghost.clear();
        return;
      },
    };
    let text = match response.validate(self.settings.min_confidence) {
      Ok(text) => text,
      Err(rejection) => {
        log::debug!("no suggestion: {rejection}");
        self.ghost.clear();
        return;
      },
    };

    self.ghost.show(
      Suggestion {
        text:       text.into(),
        confidence: response.confidence,
        anchor:     origin.anchor,
        line_start: origin.line_start,
        version:    origin.version,
      },
      doc,
    );
  }

  /// Waits for the next fetch result. `None` once the request hook is gone.
  pub async fn next_outcome(&mut self) -> Option<FetchOutcome> {
    self.outcome_rx.recv().await
  }

  /// Applies every result that already arrived. Returns whether a suggestion
  /// is showing afterwards.
  pub fn drain_outcomes(&mut self, doc: &Document) -> bool {
    while let Ok(outcome) = self.outcome_rx.try_recv() {
      self.resolve(outcome, doc);
    }
    self.ghost.status(doc) == GhostStatus::Showing
  }

  /// Commits the showing suggestion into `doc`. The edit does not request a
  /// new completion.
  pub fn accept(&mut self, doc: &mut Document) -> Result<Option<Accepted>, DocumentError> {
    let accepted = self.ghost.accept(doc)?;
    if accepted.is_some() {
      self.controller.cancel();
      send_blocking(&self.event_tx, GhostEvent::Cancel);
    }
    Ok(accepted)
  }

  /// Clears the ghost and abandons any outstanding request. Returns whether a
  /// suggestion was showing.
  pub fn dismiss(&mut self, doc: &Document) -> bool {
    self.controller.cancel();
    send_blocking(&self.event_tx, GhostEvent::Cancel);
    self.ghost.dismiss(doc)
  }

  pub fn decoration(&self, doc: &Document, style: &GhostStyle) -> Option<GhostDecoration> {
    ghost_decoration(&self.ghost, doc, style)
  }
}
