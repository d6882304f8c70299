//! # worksheet-wizard
//!
//! Client-side engine of a three-step worksheet wizard: upload a worksheet
//! (photo or PDF), have the backend generate LaTeX from it, then compile and
//! download the resulting PDF.
//!
//! ## Flow
//!
//! ```text
//! pick file
//!  │
//!  ├─ 1. Select    type check, single file, image preview
//!  ├─ 2. Upload    POST /api/upload          → session id
//!  ├─ 3. Generate  POST /api/generate-latex  → markup
//!  │               POST /api/compile-pdf     → render-ready
//!  └─ 4. Download  GET  /api/render-pdf      → PDF on disk
//! ```
//!
//! All state lives in one [`WizardState`] changed only by the pure
//! [`reduce`] function; the [`Wizard`] driver performs the HTTP calls and
//! feeds their results back in. What to display is derived by
//! [`select_view`], never stored.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use worksheet_wizard::{Wizard, WizardConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let wizard = Wizard::new(WizardConfig::default())?;
//!     wizard.select_path("worksheet.png");
//!     let _ = wizard.upload_file().await;
//!     let _ = wizard.generate_latex().await;
//!     let bytes = wizard.download_pdf("worksheet.pdf").await?;
//!     eprintln!("saved {bytes} bytes");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `worksheet` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod messages;
pub mod notify;
pub mod observer;
pub mod pipeline;
pub mod state;
pub mod view;
pub mod wizard;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{WizardConfig, WizardConfigBuilder};
pub use error::{ErrorKind, WizardError};
pub use observer::{NoopObserver, SharedObserver, WizardObserver};
pub use pipeline::api::{CompileOutcome, Endpoints, HealthStatus, HttpWorksheetApi, WorksheetApi};
pub use pipeline::preview::PreviewHandle;
pub use pipeline::select::{pick, MediaType, Picked, Rejection, SelectedFile};
pub use state::{
    reduce, Notification, NotificationKind, PreviewTab, WizardEvent, WizardStage, WizardState,
};
pub use view::{progress_step, select_view, DoneView, GeneratedView, SelectionView, View, ViewKind};
pub use wizard::{ActionOutcome, Wizard};
