//! The wizard driver: operations, side effects and notification timing.
//!
//! [`Wizard`] owns one [`WizardState`] behind a mutex and turns user actions
//! into HTTP calls and reducer events:
//!
//! ```text
//! select_file ──▶ upload_file ──▶ generate_latex ──▶ download_pdf
//!   (local)        POST upload     POST generate       GET render
//!                                  └▶ POST compile
//! ```
//!
//! The lock is never held across an `.await`: an operation reads what it
//! needs, releases the lock, performs the request and reports back with an
//! event tagged with the epoch it started in. A [`Wizard::reset`] in the
//! meantime bumps the epoch, and the late response is dropped on arrival.
//!
//! Cloning a `Wizard` is cheap and yields another handle to the same session,
//! which is how a UI keeps reading state while an operation is in flight.

use crate::config::WizardConfig;
use crate::error::WizardError;
use crate::messages;
use crate::notify::DismissTimer;
use crate::pipeline::api::{CompileOutcome, Endpoints, HealthStatus, HttpWorksheetApi, WorksheetApi};
use crate::pipeline::markup;
use crate::pipeline::select::{self, Picked, Rejection, SelectedFile};
use crate::state::{reduce, Notification, PreviewTab, WizardEvent, WizardState};
use crate::view::{self, select_view, DoneView, View, ViewKind};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info, warn};

/// What happened to a user-initiated action.
#[must_use]
#[derive(Debug)]
pub enum ActionOutcome {
    /// The action ran and succeeded.
    Completed,
    /// Preconditions did not hold (nothing selected, no session, or the same
    /// action already in flight); nothing was sent.
    Skipped,
    /// The response arrived after a reset and was ignored.
    Discarded,
    /// The action failed; the message is also in the state's error slot.
    Failed(WizardError),
}

impl ActionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ActionOutcome::Completed)
    }

    pub fn error(&self) -> Option<&WizardError> {
        match self {
            ActionOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

struct Inner {
    api: Arc<dyn WorksheetApi>,
    config: WizardConfig,
    endpoints: Endpoints,
    state: Mutex<WizardState>,
    timer: DismissTimer,
}

/// Observer callbacks of one reducer step, run after the lock is released.
struct Effects {
    shown: Option<Notification>,
    cleared: bool,
    view: Option<ViewKind>,
}

/// A single upload wizard session.
#[derive(Clone)]
pub struct Wizard {
    inner: Arc<Inner>,
}

impl fmt::Debug for Wizard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wizard")
            .field("config", &self.inner.config)
            .field("state", &*self.lock_state())
            .finish()
    }
}

impl Wizard {
    /// Create a wizard talking HTTP to `config.base_url`.
    pub fn new(config: WizardConfig) -> Result<Self, WizardError> {
        let api = HttpWorksheetApi::new(&config)?;
        Self::with_api(config, Arc::new(api))
    }

    /// Create a wizard on top of a custom [`WorksheetApi`].
    pub fn with_api(config: WizardConfig, api: Arc<dyn WorksheetApi>) -> Result<Self, WizardError> {
        let endpoints = Endpoints::from_config(&config)?;
        Ok(Self {
            inner: Arc::new(Inner {
                api,
                config,
                endpoints,
                state: Mutex::new(WizardState::new()),
                timer: DismissTimer::new(),
            }),
        })
    }

    pub fn config(&self) -> &WizardConfig {
        &self.inner.config
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    // ── State access ──────────────────────────────────────────────────────

    fn lock_state(&self) -> MutexGuard<'_, WizardState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the current state.
    ///
    /// Do not call wizard operations from inside `f`; the state lock is held.
    pub fn inspect<R>(&self, f: impl FnOnce(&WizardState) -> R) -> R {
        f(&self.lock_state())
    }

    /// Run `f` against the current derived view.
    pub fn with_view<R>(&self, f: impl FnOnce(&View<'_>) -> R) -> R {
        let state = self.lock_state();
        f(&select_view(&state, &self.inner.endpoints))
    }

    pub fn view_kind(&self) -> ViewKind {
        self.with_view(|v| v.kind())
    }

    pub fn session(&self) -> Option<String> {
        self.inspect(|s| s.session().map(str::to_string))
    }

    pub fn markup(&self) -> Option<String> {
        self.inspect(|s| s.markup().map(str::to_string))
    }

    pub fn render_ready(&self) -> bool {
        self.inspect(WizardState::render_ready)
    }

    pub fn notification(&self) -> Option<Notification> {
        self.inspect(|s| s.notification().cloned())
    }

    pub fn progress_step(&self) -> usize {
        self.inspect(view::progress_step)
    }

    /// Download link for the rendered document, once it is ready.
    pub fn download_url(&self) -> Option<String> {
        self.with_view(|v| match v {
            View::Done(DoneView::Generated(g)) => g.download_url.clone(),
            _ => None,
        })
    }

    // ── Event plumbing ────────────────────────────────────────────────────

    /// Reduce `event` if `precondition` holds and, when `epoch` is given, the
    /// state is still in that epoch. Returns whether the event was applied.
    fn apply(
        &self,
        epoch: Option<u64>,
        event: WizardEvent,
        precondition: impl FnOnce(&WizardState) -> bool,
    ) -> bool {
        let effects = {
            let mut guard = self.lock_state();
            if let Some(expected) = epoch {
                if guard.epoch() != expected {
                    debug!(
                        "Dropping {:?}: started in epoch {}, now {}",
                        event,
                        expected,
                        guard.epoch()
                    );
                    return false;
                }
            }
            if !precondition(&guard) {
                return false;
            }

            let seq_before = guard.notification_seq();
            let visible_before = guard.notification().is_some();
            let view_before = select_view(&guard, &self.inner.endpoints).kind();
            let reset = matches!(event, WizardEvent::Reset);

            let state = std::mem::take(&mut *guard);
            *guard = reduce(state, event);

            let view_after = select_view(&guard, &self.inner.endpoints).kind();
            let shown = (guard.notification_seq() != seq_before)
                .then(|| guard.notification().cloned())
                .flatten();

            // Timer changes happen under the state lock so they are ordered
            // exactly like the notifications they belong to.
            if reset {
                self.inner.timer.cancel();
            }
            if shown.is_some() {
                self.schedule_dismissal(guard.notification_seq());
            }

            Effects {
                shown,
                cleared: visible_before && guard.notification().is_none(),
                view: (view_after != view_before).then_some(view_after),
            }
        };

        self.notify_observer(effects);
        true
    }

    fn dispatch(&self, event: WizardEvent) {
        self.apply(None, event, |_| true);
    }

    fn schedule_dismissal(&self, seq: u64) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner
            .timer
            .schedule(self.inner.config.notification_ttl, move || {
                if let Some(inner) = weak.upgrade() {
                    Wizard { inner }.dispatch(WizardEvent::NotificationExpired { seq });
                }
            });
    }

    fn notify_observer(&self, effects: Effects) {
        if let Some(kind) = effects.view {
            debug!("View changed to {:?}", kind);
        }
        let Some(obs) = self.inner.config.observer.as_ref() else {
            return;
        };

        if let Some(notification) = &effects.shown {
            obs.on_notification(notification);
        } else if effects.cleared {
            obs.on_notification_cleared();
        }
        if let Some(kind) = effects.view {
            obs.on_view_change(kind);
        }
    }

    // ── Selection ─────────────────────────────────────────────────────────

    /// Offer a candidate file plus the picking mechanism's rejection reasons.
    ///
    /// Any rejection emits one error notification and leaves the selection
    /// unchanged; otherwise the candidate replaces the current file.
    pub fn select_file(&self, candidate: Option<SelectedFile>, rejections: Vec<Rejection>) {
        self.dispatch(WizardEvent::FileSelected {
            candidate,
            rejections,
        });
    }

    /// Offer the result of [`select::pick`].
    pub fn select_picked(&self, picked: Picked) {
        self.select_file(picked.accepted, picked.rejections);
    }

    /// Pick a single path and offer it.
    pub fn select_path(&self, path: impl AsRef<Path>) {
        self.select_picked(select::pick(&[path.as_ref()]));
    }

    /// Clear the selected file and its preview.
    pub fn remove_file(&self) {
        self.dispatch(WizardEvent::FileRemoved);
    }

    /// Switch between the markup and rendered-document tabs.
    pub fn select_tab(&self, tab: PreviewTab) {
        self.dispatch(WizardEvent::TabSelected(tab));
    }

    /// Start over. Responses of requests already in flight will be ignored.
    pub fn reset(&self) {
        info!("Resetting wizard");
        self.dispatch(WizardEvent::Reset);
    }

    // ── Upload ────────────────────────────────────────────────────────────

    /// Upload the selected file and store the returned session.
    pub async fn upload_file(&self) -> ActionOutcome {
        let mut started: Option<(SelectedFile, u64)> = None;
        self.apply(None, WizardEvent::UploadStarted, |state| {
            if !state.can_upload() {
                return false;
            }
            started = state.file().cloned().map(|f| (f, state.epoch()));
            started.is_some()
        });
        let Some((file, epoch)) = started else {
            debug!("Upload skipped: no file selected or upload already running");
            return ActionOutcome::Skipped;
        };

        let _settle = Settle::new(self, epoch, || WizardEvent::UploadSettled);

        match self.inner.api.upload(&file).await {
            Ok(session_id) => {
                info!("Upload of '{}' succeeded: session {}", file.name(), session_id);
                self.finish(epoch, WizardEvent::UploadSucceeded { session_id }, ActionOutcome::Completed)
            }
            Err(e) => {
                warn!("Upload of '{}' failed: {}", file.name(), e);
                let message = Some(e.to_string());
                self.finish(epoch, WizardEvent::UploadFailed { message }, ActionOutcome::Failed(e))
            }
        }
    }

    // ── Generation ────────────────────────────────────────────────────────

    /// Generate worksheet markup for the session, then compile it.
    ///
    /// The generating indicator spans both calls. A compile failure keeps the
    /// markup but leaves the document not ready.
    pub async fn generate_latex(&self) -> ActionOutcome {
        let mut started: Option<(String, u64)> = None;
        self.apply(None, WizardEvent::GenerationStarted, |state| {
            if !state.can_generate() {
                return false;
            }
            started = state.session().map(|s| (s.to_string(), state.epoch()));
            started.is_some()
        });
        let Some((session_id, epoch)) = started else {
            debug!("Generation skipped: no session or generation already running");
            return ActionOutcome::Skipped;
        };

        let _settle = Settle::new(self, epoch, || WizardEvent::GenerationSettled);

        let markup = match self.inner.api.generate_latex(&session_id).await {
            Ok(raw) if self.inner.config.clean_markup => markup::clean_markup(&raw),
            Ok(raw) => raw,
            Err(e) => {
                warn!("Generation for session {} failed: {}", session_id, e);
                let message = Some(e.to_string());
                return self.finish(epoch, WizardEvent::GenerationFailed { message }, ActionOutcome::Failed(e));
            }
        };
        info!("Generated {} bytes of markup for session {}", markup.len(), session_id);

        if !self.apply(
            Some(epoch),
            WizardEvent::GenerationSucceeded {
                markup: markup.clone(),
            },
            |_| true,
        ) {
            return ActionOutcome::Discarded;
        }

        match self.inner.api.compile_pdf(&session_id, &markup).await {
            Ok(CompileOutcome { success: true, .. }) => {
                info!("Compiled PDF for session {}", session_id);
                self.finish(epoch, WizardEvent::CompileSucceeded, ActionOutcome::Completed)
            }
            Ok(CompileOutcome { success: false, error }) => {
                warn!("Compile for session {} reported failure: {:?}", session_id, error);
                let err = WizardError::CompileFailed {
                    message: messages::or_fallback(error.as_deref(), messages::COMPILE_ERROR),
                };
                self.finish(epoch, WizardEvent::CompileFailed { message: error }, ActionOutcome::Failed(err))
            }
            Err(e) => {
                warn!("Compile request for session {} failed: {}", session_id, e);
                let message = Some(e.to_string());
                self.finish(epoch, WizardEvent::CompileFailed { message }, ActionOutcome::Failed(e))
            }
        }
    }

    fn finish(&self, epoch: u64, event: WizardEvent, outcome: ActionOutcome) -> ActionOutcome {
        if self.apply(Some(epoch), event, |_| true) {
            outcome
        } else {
            ActionOutcome::Discarded
        }
    }

    // ── Download ──────────────────────────────────────────────────────────

    /// Fetch the rendered PDF and write it to `path` atomically.
    ///
    /// Returns the number of bytes written.
    pub async fn download_pdf(&self, path: impl AsRef<Path>) -> Result<u64, WizardError> {
        let path = path.as_ref();
        let session_id = self
            .inspect(|s| match (s.session(), s.render_ready()) {
                (Some(id), true) => Some(id.to_string()),
                _ => None,
            })
            .ok_or(WizardError::RenderNotReady)?;

        let bytes = self.inner.api.fetch_pdf(&session_id).await?;
        if !bytes.starts_with(b"%PDF") {
            return Err(WizardError::NotAPdf {
                magic: bytes.iter().take(4).copied().collect(),
            });
        }

        let len = bytes.len() as u64;
        write_atomically(path, bytes).await?;
        info!("Saved {} bytes of PDF to {}", len, path.display());
        Ok(len)
    }

    /// Check that the backend is reachable.
    pub async fn health(&self) -> Result<HealthStatus, WizardError> {
        self.inner.api.health().await
    }
}

/// Clears an operation's in-flight indicator when the operation ends, however
/// it ends (including when its future is dropped mid-request).
struct Settle<'a> {
    wizard: &'a Wizard,
    epoch: u64,
    event: fn() -> WizardEvent,
}

impl<'a> Settle<'a> {
    fn new(wizard: &'a Wizard, epoch: u64, event: fn() -> WizardEvent) -> Self {
        Self { wizard, epoch, event }
    }
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        self.wizard.apply(Some(self.epoch), (self.event)(), |_| true);
    }
}

/// Write `bytes` to `path` through a temp file in the same directory, then
/// rename, so a failed download never leaves a truncated PDF behind.
async fn write_atomically(path: &Path, bytes: Vec<u8>) -> Result<(), WizardError> {
    let target = path.to_path_buf();
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| WizardError::OutputWriteFailed {
            path: target.clone(),
            source: e,
        })?;

    tokio::task::spawn_blocking(move || {
        let write_failed = |source| WizardError::OutputWriteFailed {
            path: target.clone(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_failed)?;
        tmp.write_all(&bytes).map_err(write_failed)?;
        tmp.flush().map_err(write_failed)?;
        tmp.persist(&target).map_err(|e| write_failed(e.error))?;
        Ok::<(), WizardError>(())
    })
    .await
    .map_err(|e| WizardError::Internal(format!("Write task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_atomically_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out/worksheet.pdf");
        write_atomically(&target, b"%PDF-1.5 test".to_vec()).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-1.5 test");
    }

    #[test]
    fn outcome_helpers() {
        assert!(ActionOutcome::Completed.is_completed());
        assert!(ActionOutcome::Skipped.error().is_none());
        let failed = ActionOutcome::Failed(WizardError::RenderNotReady);
        assert!(matches!(failed.error(), Some(WizardError::RenderNotReady)));
    }
}
