//! Derived view selection.
//!
//! The wizard never stores "which screen is showing". [`select_view`] computes
//! it from the canonical state fields as a tagged union, so combinations such
//! as "uploading and showing generated markup" cannot be expressed.

use crate::messages;
use crate::pipeline::api::Endpoints;
use crate::pipeline::preview::PreviewHandle;
use crate::pipeline::select::MediaType;
use crate::state::{PreviewTab, WizardState};
use serde::{Deserialize, Serialize};

/// The screen to show, borrowing from the state it was selected from.
#[derive(Debug)]
pub enum View<'a> {
    /// No file chosen: show the drop/pick affordance.
    SelectingEmpty,
    /// A file is chosen but not uploaded yet.
    SelectingWithFile(SelectionView<'a>),
    /// The upload request is in flight.
    Uploading { name: &'a str },
    /// A session exists.
    Done(DoneView<'a>),
}

/// Details of the "file chosen" screen.
#[derive(Debug)]
pub struct SelectionView<'a> {
    pub name: &'a str,
    pub media_type: MediaType,
    /// Thumbnail for images; `None` means "show a document glyph + name".
    pub preview: Option<&'a PreviewHandle>,
    /// Inline error of the last failed upload.
    pub error: Option<&'a str>,
}

/// Sub-cases of the "done" screen.
#[derive(Debug)]
pub enum DoneView<'a> {
    /// No markup yet: show the generate action.
    AwaitingGeneration {
        session_id: &'a str,
        generating: bool,
        error: Option<&'a str>,
    },
    /// Markup present: show it, the tab switch and the download affordance.
    Generated(GeneratedView<'a>),
}

/// Details of the "worksheet generated" screen.
#[derive(Debug)]
pub struct GeneratedView<'a> {
    pub session_id: &'a str,
    pub markup: &'a str,
    /// Effective tab: `Document` falls back to `Markup` until render-ready.
    pub tab: PreviewTab,
    pub render_ready: bool,
    pub compile_error: Option<&'a str>,
    /// Render endpoint link; `Some` only when the document is ready.
    pub download_url: Option<String>,
    pub download_label: &'static str,
}

/// Copyable discriminant of [`View`], handy for observers and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    SelectingEmpty,
    SelectingWithFile,
    Uploading,
    AwaitingGeneration,
    Generated,
}

impl View<'_> {
    pub fn kind(&self) -> ViewKind {
        match self {
            View::SelectingEmpty => ViewKind::SelectingEmpty,
            View::SelectingWithFile(_) => ViewKind::SelectingWithFile,
            View::Uploading { .. } => ViewKind::Uploading,
            View::Done(DoneView::AwaitingGeneration { .. }) => ViewKind::AwaitingGeneration,
            View::Done(DoneView::Generated(_)) => ViewKind::Generated,
        }
    }
}

/// Select the view for `state`.
pub fn select_view<'a>(state: &'a WizardState, endpoints: &Endpoints) -> View<'a> {
    if state.is_uploading() {
        let name = state.file().map(|f| f.name()).unwrap_or_default();
        return View::Uploading { name };
    }

    if let Some(session_id) = state.session() {
        return View::Done(match state.markup() {
            None => DoneView::AwaitingGeneration {
                session_id,
                generating: state.is_generating(),
                error: state.generate_error(),
            },
            Some(markup) => {
                let render_ready = state.render_ready();
                DoneView::Generated(GeneratedView {
                    session_id,
                    markup,
                    tab: if render_ready { state.tab() } else { PreviewTab::Markup },
                    render_ready,
                    compile_error: state.compile_error(),
                    download_url: render_ready.then(|| endpoints.render(session_id).to_string()),
                    download_label: messages::DOWNLOAD_LABEL,
                })
            }
        });
    }

    match state.file() {
        None => View::SelectingEmpty,
        Some(file) => View::SelectingWithFile(SelectionView {
            name: file.name(),
            media_type: file.media_type(),
            preview: state.preview(),
            error: state.upload_error(),
        }),
    }
}

/// Position (0, 1 or 2) in the Upload / Generate / Download indicator.
pub fn progress_step(state: &WizardState) -> usize {
    match (state.session().is_some(), state.markup().is_some()) {
        (false, _) => 0,
        (true, false) => 1,
        (true, true) => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::select::SelectedFile;
    use crate::state::{reduce, WizardEvent};
    use reqwest::Url;

    fn endpoints() -> Endpoints {
        Endpoints::new(Url::parse("http://localhost:8000").unwrap())
    }

    fn with_file(file: SelectedFile) -> WizardState {
        reduce(
            WizardState::new(),
            WizardEvent::FileSelected {
                candidate: Some(file),
                rejections: vec![],
            },
        )
    }

    fn generated(compile_ok: bool) -> WizardState {
        let s = with_file(SelectedFile::from_bytes("a.pdf", MediaType::Pdf, b"%PDF".to_vec()));
        let s = reduce(s, WizardEvent::UploadStarted);
        let s = reduce(s, WizardEvent::UploadSucceeded { session_id: "abc123".into() });
        let s = reduce(s, WizardEvent::GenerationStarted);
        let s = reduce(s, WizardEvent::GenerationSucceeded { markup: "tex".into() });
        if compile_ok {
            reduce(s, WizardEvent::CompileSucceeded)
        } else {
            reduce(s, WizardEvent::CompileFailed { message: Some("x".into()) })
        }
    }

    #[test]
    fn empty_state_selects_empty_view() {
        let s = WizardState::new();
        assert_eq!(select_view(&s, &endpoints()).kind(), ViewKind::SelectingEmpty);
        assert_eq!(progress_step(&s), 0);
    }

    #[test]
    fn pdf_selection_shows_glyph_not_preview() {
        let s = with_file(SelectedFile::from_bytes("a.pdf", MediaType::Pdf, b"%PDF".to_vec()));
        match select_view(&s, &endpoints()) {
            View::SelectingWithFile(sel) => {
                assert_eq!(sel.name, "a.pdf");
                assert!(sel.preview.is_none());
                assert!(sel.error.is_none());
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn uploading_view_while_in_flight() {
        let s = with_file(SelectedFile::from_bytes("a.png", MediaType::Png, b"png".to_vec()));
        let s = reduce(s, WizardEvent::UploadStarted);
        assert!(matches!(select_view(&s, &endpoints()), View::Uploading { name: "a.png" }));
    }

    #[test]
    fn generated_view_has_download_when_ready() {
        let s = generated(true);
        let s = reduce(s, WizardEvent::TabSelected(PreviewTab::Document));
        match select_view(&s, &endpoints()) {
            View::Done(DoneView::Generated(g)) => {
                assert_eq!(g.markup, "tex");
                assert_eq!(g.tab, PreviewTab::Document);
                assert_eq!(
                    g.download_url.as_deref(),
                    Some("http://localhost:8000/api/render-pdf?session_id=abc123")
                );
            }
            other => panic!("unexpected view {other:?}"),
        }
        assert_eq!(progress_step(&s), 2);
    }

    #[test]
    fn document_tab_falls_back_until_ready() {
        let s = generated(false);
        let s = reduce(s, WizardEvent::TabSelected(PreviewTab::Document));
        match select_view(&s, &endpoints()) {
            View::Done(DoneView::Generated(g)) => {
                assert_eq!(g.tab, PreviewTab::Markup);
                assert!(g.download_url.is_none());
                assert_eq!(g.compile_error, Some("PDF compilation failed: x"));
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn awaiting_generation_after_upload() {
        let s = with_file(SelectedFile::from_bytes("a.png", MediaType::Png, b"png".to_vec()));
        let s = reduce(s, WizardEvent::UploadStarted);
        let s = reduce(s, WizardEvent::UploadSucceeded { session_id: "s".into() });
        assert_eq!(select_view(&s, &endpoints()).kind(), ViewKind::AwaitingGeneration);
        assert_eq!(progress_step(&s), 1);
    }
}
