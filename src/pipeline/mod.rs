//! Building blocks the wizard steps are made of.
//!
//! ## Data Flow
//!
//! ```text
//! select ──▶ preview        api ──▶ markup
//! (pick)    (data URI)    (HTTP)   (cleanup)
//! ```
//!
//! 1. [`select`]  validate picked paths into a single [`select::SelectedFile`]
//! 2. [`preview`] build the thumbnail handle for image selections
//! 3. [`api`]     the remote service contract and its `reqwest` client; the
//!    only module with network I/O
//! 4. [`markup`]  optional cleanup and summary of generated markup

pub mod api;
pub mod markup;
pub mod preview;
pub mod select;
