//! Wizard state and its pure reducer.
//!
//! [`WizardState`] is the single source of truth of a wizard session. It is
//! only ever changed by [`reduce`], a pure `(state, event) → state` function,
//! which makes every transition testable without a runtime, a server or a
//! timer. Side effects (HTTP calls, the dismissal timer) live in
//! [`crate::wizard`] and feed their outcomes back in as [`WizardEvent`]s.
//!
//! ## Invariants
//!
//! * no file ⇒ no preview
//! * no session ⇒ no markup and not render-ready
//! * render-ready ⇒ markup present
//!
//! [`WizardState::check_invariants`] verifies them; [`reduce`] asserts them in
//! debug builds.

use crate::messages;
use crate::pipeline::preview::PreviewHandle;
use crate::pipeline::select::{Rejection, SelectedFile};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Success or error flavour of a [`Notification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
}

/// A transient user-facing status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub text: String,
}

impl Notification {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            text: text.into(),
        }
    }
}

/// Which representation of the generated worksheet is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewTab {
    /// Raw markup text.
    #[default]
    Markup,
    /// Rendered document (only meaningful once render-ready).
    Document,
}

/// Coarse stage of the wizard, derived from the state fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStage {
    Selecting,
    Uploading,
    Done,
}

/// Everything that can happen to a wizard.
#[derive(Debug)]
pub enum WizardEvent {
    /// The picking mechanism produced a candidate and/or rejection reasons.
    FileSelected {
        candidate: Option<SelectedFile>,
        rejections: Vec<Rejection>,
    },
    /// The user removed the selected file.
    FileRemoved,
    /// An upload request is about to be sent.
    UploadStarted,
    /// The backend accepted the upload.
    UploadSucceeded { session_id: String },
    /// The upload failed; `message` is the fault's text, if any.
    UploadFailed { message: Option<String> },
    /// The upload operation ended (success, failure or abandonment).
    UploadSettled,
    /// A generation request is about to be sent.
    GenerationStarted,
    /// The backend returned generated markup.
    GenerationSucceeded { markup: String },
    /// The generation call failed; compile is skipped.
    GenerationFailed { message: Option<String> },
    /// The compile step produced a renderable document.
    CompileSucceeded,
    /// The compile step failed or reported failure.
    CompileFailed { message: Option<String> },
    /// The generate+compile operation ended.
    GenerationSettled,
    /// The user switched the preview tab.
    TabSelected(PreviewTab),
    /// The dismissal delay of notification `seq` elapsed.
    NotificationExpired { seq: u64 },
    /// Start over from an empty wizard.
    Reset,
}

/// The state of one wizard session.
#[derive(Debug, Default)]
pub struct WizardState {
    file: Option<SelectedFile>,
    preview: Option<PreviewHandle>,
    session: Option<String>,
    markup: Option<String>,
    render_ready: bool,
    uploading: bool,
    generating: bool,
    upload_error: Option<String>,
    generate_error: Option<String>,
    compile_error: Option<String>,
    notification: Option<Notification>,
    notification_seq: u64,
    tab: PreviewTab,
    epoch: u64,
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    pub fn markup(&self) -> Option<&str> {
        self.markup.as_deref()
    }

    pub fn render_ready(&self) -> bool {
        self.render_ready
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn upload_error(&self) -> Option<&str> {
        self.upload_error.as_deref()
    }

    pub fn generate_error(&self) -> Option<&str> {
        self.generate_error.as_deref()
    }

    pub fn compile_error(&self) -> Option<&str> {
        self.compile_error.as_deref()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    /// Sequence number of the most recent notification (0 before the first).
    pub fn notification_seq(&self) -> u64 {
        self.notification_seq
    }

    pub fn tab(&self) -> PreviewTab {
        self.tab
    }

    /// Incremented by every [`WizardEvent::Reset`].
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Coarse stage: uploading while the indicator is set, done once a
    /// session exists, selecting otherwise.
    pub fn stage(&self) -> WizardStage {
        if self.uploading {
            WizardStage::Uploading
        } else if self.session.is_some() {
            WizardStage::Done
        } else {
            WizardStage::Selecting
        }
    }

    /// Whether an upload may start now.
    pub fn can_upload(&self) -> bool {
        self.file.is_some() && !self.uploading
    }

    /// Whether a generation may start now.
    pub fn can_generate(&self) -> bool {
        self.session.is_some() && !self.generating
    }

    /// Return the first violated invariant, if any.
    pub fn check_invariants(&self) -> Result<(), &'static str> {
        if self.file.is_none() && self.preview.is_some() {
            return Err("preview present without a selected file");
        }
        if self.session.is_none() && self.markup.is_some() {
            return Err("markup present without a session");
        }
        if self.session.is_none() && self.render_ready {
            return Err("render-ready without a session");
        }
        if self.render_ready && self.markup.is_none() {
            return Err("render-ready without markup");
        }
        Ok(())
    }

    fn notify(&mut self, notification: Notification) {
        self.notification_seq += 1;
        debug!(
            "Notification #{} ({:?}): {}",
            self.notification_seq, notification.kind, notification.text
        );
        self.notification = Some(notification);
    }
}

/// Apply `event` to `state`.
///
/// Events whose preconditions do not hold (uploading without a file,
/// generating without a session, starting an action that is already in
/// flight) leave the state unchanged.
pub fn reduce(mut state: WizardState, event: WizardEvent) -> WizardState {
    match event {
        WizardEvent::FileSelected {
            candidate,
            rejections,
        } => {
            if !rejections.is_empty() {
                debug!("Selection rejected: {:?}", rejections);
                state.notify(Notification::error(messages::UNSUPPORTED_FORMAT));
            } else if let Some(file) = candidate {
                // Dropping the old handle releases its preview.
                state.preview = PreviewHandle::for_file(&file);
                state.file = Some(file);
                state.upload_error = None;
            }
        }
        WizardEvent::FileRemoved => {
            state.file = None;
            state.preview = None;
            state.upload_error = None;
        }
        WizardEvent::UploadStarted => {
            if state.can_upload() {
                state.uploading = true;
                state.upload_error = None;
            }
        }
        WizardEvent::UploadSucceeded { session_id } => {
            state.uploading = false;
            state.upload_error = None;
            state.session = Some(session_id);
            // A new session invalidates artifacts of the old one.
            state.markup = None;
            state.render_ready = false;
            state.generate_error = None;
            state.compile_error = None;
            state.tab = PreviewTab::Markup;
            state.notify(Notification::success(messages::UPLOAD_SUCCESS));
        }
        WizardEvent::UploadFailed { message } => {
            let text = messages::or_fallback(message.as_deref(), messages::UPLOAD_ERROR);
            state.uploading = false;
            state.upload_error = Some(text.clone());
            state.notify(Notification::error(text));
        }
        WizardEvent::UploadSettled => {
            state.uploading = false;
        }
        WizardEvent::GenerationStarted => {
            if state.can_generate() {
                state.generating = true;
                state.markup = None;
                state.generate_error = None;
                state.render_ready = false;
                state.compile_error = None;
            }
        }
        WizardEvent::GenerationSucceeded { markup } => {
            if state.session.is_some() {
                state.markup = Some(markup);
                state.notify(Notification::success(messages::GENERATION_SUCCESS));
            }
        }
        WizardEvent::GenerationFailed { message } => {
            let text = messages::or_fallback(message.as_deref(), messages::GENERATION_ERROR);
            state.generating = false;
            state.render_ready = false;
            state.generate_error = Some(text.clone());
            state.notify(Notification::error(text));
        }
        WizardEvent::CompileSucceeded => {
            state.generating = false;
            state.render_ready = state.markup.is_some();
            state.compile_error = None;
        }
        WizardEvent::CompileFailed { message } => {
            let text = messages::compile_failed(message.as_deref());
            state.generating = false;
            state.render_ready = false;
            state.compile_error = Some(text.clone());
            state.notify(Notification::error(text));
        }
        WizardEvent::GenerationSettled => {
            state.generating = false;
        }
        WizardEvent::TabSelected(tab) => {
            state.tab = tab;
        }
        WizardEvent::NotificationExpired { seq } => {
            if seq == state.notification_seq && state.notification.is_some() {
                debug!("Notification #{} expired", seq);
                state.notification = None;
            }
        }
        WizardEvent::Reset => {
            state = WizardState {
                epoch: state.epoch + 1,
                notification_seq: state.notification_seq,
                ..WizardState::default()
            };
        }
    }

    debug_assert!(
        state.check_invariants().is_ok(),
        "wizard invariant violated: {:?}",
        state.check_invariants()
    );
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::select::MediaType;

    fn png() -> SelectedFile {
        SelectedFile::from_bytes("sheet.png", MediaType::Png, b"\x89PNG\r\n\x1a\n".to_vec())
    }

    fn pdf() -> SelectedFile {
        SelectedFile::from_bytes("sheet.pdf", MediaType::Pdf, b"%PDF-1.5".to_vec())
    }

    fn select(state: WizardState, file: SelectedFile) -> WizardState {
        reduce(
            state,
            WizardEvent::FileSelected {
                candidate: Some(file),
                rejections: vec![],
            },
        )
    }

    fn uploaded(session: &str) -> WizardState {
        let s = select(WizardState::new(), png());
        let s = reduce(s, WizardEvent::UploadStarted);
        reduce(
            s,
            WizardEvent::UploadSucceeded {
                session_id: session.into(),
            },
        )
    }

    #[test]
    fn rejection_keeps_file_and_emits_one_error() {
        let s = select(WizardState::new(), pdf());
        let before = s.notification_seq();
        let s = reduce(
            s,
            WizardEvent::FileSelected {
                candidate: Some(png()),
                rejections: vec![Rejection::TooManyFiles { count: 2 }],
            },
        );
        assert_eq!(s.file().map(|f| f.name()), Some("sheet.pdf"));
        assert_eq!(s.notification_seq(), before + 1);
        assert_eq!(s.notification().unwrap().kind, NotificationKind::Error);
        assert_eq!(s.notification().unwrap().text, messages::UNSUPPORTED_FORMAT);
    }

    #[test]
    fn image_gets_preview_pdf_does_not() {
        let s = select(WizardState::new(), png());
        assert!(s.preview().is_some());
        let s = select(s, pdf());
        assert!(s.preview().is_none());
        assert_eq!(s.file().unwrap().media_type(), MediaType::Pdf);
    }

    #[test]
    fn replacing_selection_releases_old_preview() {
        let s = select(WizardState::new(), png());
        let watch = s.preview().unwrap().watch();
        let s = select(s, png());
        assert!(watch.is_released());
        assert!(s.preview().is_some());
    }

    #[test]
    fn remove_clears_file_and_preview_only() {
        let s = uploaded("abc123");
        let watch = s.preview().unwrap().watch();
        let s = reduce(s, WizardEvent::FileRemoved);
        assert!(s.file().is_none());
        assert!(s.preview().is_none());
        assert!(watch.is_released());
        assert_eq!(s.session(), Some("abc123"));
    }

    #[test]
    fn remove_on_empty_state_is_harmless() {
        let s = reduce(WizardState::new(), WizardEvent::FileRemoved);
        assert!(s.file().is_none());
        assert!(s.preview().is_none());
    }

    #[test]
    fn upload_start_requires_file() {
        let s = reduce(WizardState::new(), WizardEvent::UploadStarted);
        assert!(!s.is_uploading());
    }

    #[test]
    fn upload_success_moves_to_done() {
        let s = select(WizardState::new(), png());
        let s = reduce(s, WizardEvent::UploadStarted);
        assert_eq!(s.stage(), WizardStage::Uploading);
        let s = reduce(
            s,
            WizardEvent::UploadSucceeded {
                session_id: "abc123".into(),
            },
        );
        assert_eq!(s.session(), Some("abc123"));
        assert_eq!(s.stage(), WizardStage::Done);
        assert!(!s.is_uploading());
        assert_eq!(s.notification(), Some(&Notification::success(messages::UPLOAD_SUCCESS)));
    }

    #[test]
    fn upload_failure_uses_fallback_and_keeps_file() {
        let s = select(WizardState::new(), png());
        let s = reduce(s, WizardEvent::UploadStarted);
        let s = reduce(s, WizardEvent::UploadFailed { message: None });
        assert_eq!(s.stage(), WizardStage::Selecting);
        assert_eq!(s.upload_error(), Some(messages::UPLOAD_ERROR));
        assert!(s.file().is_some());
        assert!(s.session().is_none());
        assert_eq!(s.notification().unwrap().kind, NotificationKind::Error);
    }

    #[test]
    fn generation_start_requires_session() {
        let s = reduce(WizardState::new(), WizardEvent::GenerationStarted);
        assert!(!s.is_generating());
    }

    #[test]
    fn generation_then_compile_success() {
        let s = uploaded("abc123");
        let s = reduce(s, WizardEvent::GenerationStarted);
        let s = reduce(
            s,
            WizardEvent::GenerationSucceeded {
                markup: "\\documentclass{article}".into(),
            },
        );
        assert!(s.is_generating(), "generating spans the compile call");
        let s = reduce(s, WizardEvent::CompileSucceeded);
        assert!(!s.is_generating());
        assert!(s.render_ready());
        assert_eq!(s.markup(), Some("\\documentclass{article}"));
    }

    #[test]
    fn compile_failure_keeps_markup() {
        let s = uploaded("abc123");
        let s = reduce(s, WizardEvent::GenerationStarted);
        let s = reduce(s, WizardEvent::GenerationSucceeded { markup: "m".into() });
        let s = reduce(
            s,
            WizardEvent::CompileFailed {
                message: Some("x".into()),
            },
        );
        assert_eq!(s.markup(), Some("m"));
        assert!(!s.render_ready());
        assert_eq!(s.compile_error(), Some("PDF compilation failed: x"));
    }

    #[test]
    fn regeneration_clears_previous_artifacts() {
        let s = uploaded("abc123");
        let s = reduce(s, WizardEvent::GenerationStarted);
        let s = reduce(s, WizardEvent::GenerationSucceeded { markup: "m".into() });
        let s = reduce(s, WizardEvent::CompileSucceeded);
        let s = reduce(s, WizardEvent::GenerationStarted);
        assert!(s.markup().is_none());
        assert!(!s.render_ready());
        assert!(s.is_generating());
    }

    #[test]
    fn generation_failure_sets_error() {
        let s = uploaded("abc123");
        let s = reduce(s, WizardEvent::GenerationStarted);
        let s = reduce(
            s,
            WizardEvent::GenerationFailed {
                message: Some("Gemini API error".into()),
            },
        );
        assert_eq!(s.generate_error(), Some("Gemini API error"));
        assert!(!s.is_generating());
        assert!(s.markup().is_none());
    }

    #[test]
    fn stale_expiry_does_not_clear_newer_notification() {
        let s = select(WizardState::new(), png());
        let s = reduce(s, WizardEvent::UploadStarted);
        let s = reduce(s, WizardEvent::UploadFailed { message: Some("first".into()) });
        let first = s.notification_seq();
        let s = reduce(s, WizardEvent::UploadStarted);
        let s = reduce(s, WizardEvent::UploadFailed { message: Some("second".into()) });

        let s = reduce(s, WizardEvent::NotificationExpired { seq: first });
        assert_eq!(s.notification().unwrap().text, "second");

        let latest = s.notification_seq();
        let s = reduce(s, WizardEvent::NotificationExpired { seq: latest });
        assert!(s.notification().is_none());
    }

    #[test]
    fn reset_clears_everything_and_bumps_epoch() {
        let s = uploaded("abc123");
        let epoch = s.epoch();
        let seq = s.notification_seq();
        let s = reduce(s, WizardEvent::Reset);
        assert_eq!(s.epoch(), epoch + 1);
        assert_eq!(s.notification_seq(), seq);
        assert!(s.file().is_none());
        assert!(s.session().is_none());
        assert!(s.notification().is_none());
        assert_eq!(s.stage(), WizardStage::Selecting);
    }

    #[test]
    fn tab_can_change_any_time() {
        let s = reduce(WizardState::new(), WizardEvent::TabSelected(PreviewTab::Document));
        assert_eq!(s.tab(), PreviewTab::Document);
    }
}
