//! Error types for the worksheet-wizard library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`WizardError`]: a wizard action failed (network fault, non-2xx status,
//!   compile rejected by the backend, bad configuration). Every variant is
//!   non-fatal to the wizard itself: the operation records the message in its
//!   own error slot and the user may retry or back out.
//!
//! * [`Rejection`](crate::pipeline::select::Rejection): a picked file was
//!   refused locally (wrong type, too many files). Rejections never reach the
//!   network and are reported as a list next to the candidate.
//!
//! [`ErrorKind`] groups [`WizardError`] variants into the taxonomy shown to
//! users: validation, transport, remote-reported and local.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by wizard operations and the HTTP client.
#[derive(Debug, Error)]
pub enum WizardError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The picked file is not a JPEG, PNG or PDF.
    #[error("Unsupported file '{name}': only JPG, PNG and PDF files are accepted")]
    UnsupportedFormat { name: String },

    /// More than one file was picked at once.
    #[error("{count} files were picked, but exactly one file is accepted")]
    TooManyFiles { count: usize },

    /// Input file was not found at the given path.
    #[error("File not found: '{}'\nCheck the path exists and is readable.", .path.display())]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{}'\nTry: chmod +r {:?}", .path.display(), .path)]
    PermissionDenied { path: PathBuf },

    // ── Transport errors ──────────────────────────────────────────────────
    /// The request never produced a response (DNS, refused connection, reset).
    #[error("Request to {endpoint} failed: {reason}\nCheck that the backend is running.")]
    Network { endpoint: String, reason: String },

    /// The request exceeded the configured timeout.
    #[error("Request to {endpoint} timed out after {secs}s\nIncrease --timeout.")]
    Timeout { endpoint: String, secs: u64 },

    /// The backend answered with a non-2xx status.
    #[error("{endpoint} returned HTTP {status}{}", detail_suffix(.body))]
    HttpStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The backend answered 2xx but the body did not match the contract.
    #[error("Unexpected response from {endpoint}: {detail}")]
    InvalidResponse { endpoint: String, detail: String },

    // ── Remote-reported errors ────────────────────────────────────────────
    /// The compile endpoint reported `success: false`.
    #[error("PDF compilation failed: {message}")]
    CompileFailed { message: String },

    // ── Local errors ──────────────────────────────────────────────────────
    /// A download was requested before the rendered document is ready.
    #[error("The rendered PDF is not ready yet; generate a worksheet first")]
    RenderNotReady,

    /// The render endpoint returned something that is not a PDF.
    #[error("Downloaded document is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// Could not create or write the downloaded PDF.
    #[error("Failed to write output file '{}': {source}", .path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn detail_suffix(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

/// User-facing error category of a [`WizardError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected locally before any request was sent.
    Validation,
    /// Network fault, timeout, non-2xx status or malformed body.
    Transport,
    /// The backend processed the request and explicitly reported failure.
    RemoteReported,
    /// Client-side failure unrelated to the remote service.
    Local,
}

impl WizardError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WizardError::UnsupportedFormat { .. }
            | WizardError::TooManyFiles { .. }
            | WizardError::FileNotFound { .. }
            | WizardError::PermissionDenied { .. } => ErrorKind::Validation,
            WizardError::Network { .. }
            | WizardError::Timeout { .. }
            | WizardError::HttpStatus { .. }
            | WizardError::InvalidResponse { .. } => ErrorKind::Transport,
            WizardError::CompileFailed { .. } => ErrorKind::RemoteReported,
            WizardError::RenderNotReady
            | WizardError::NotAPdf { .. }
            | WizardError::OutputWriteFailed { .. }
            | WizardError::InvalidConfig(_)
            | WizardError::Internal(_) => ErrorKind::Local,
        }
    }

    /// Map a `reqwest` failure for `endpoint` onto a transport variant.
    pub(crate) fn from_reqwest(endpoint: &str, timeout_secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WizardError::Timeout {
                endpoint: endpoint.to_string(),
                secs: timeout_secs,
            }
        } else {
            WizardError::Network {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_display_includes_body() {
        let e = WizardError::HttpStatus {
            endpoint: "/api/upload".into(),
            status: 500,
            body: "Image not found".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("HTTP 500"), "got: {msg}");
        assert!(msg.ends_with(": Image not found"), "got: {msg}");
    }

    #[test]
    fn http_status_display_without_body() {
        let e = WizardError::HttpStatus {
            endpoint: "/api/generate-latex".into(),
            status: 404,
            body: "   ".into(),
        };
        assert_eq!(e.to_string(), "/api/generate-latex returned HTTP 404");
    }

    #[test]
    fn compile_failed_is_remote_reported() {
        let e = WizardError::CompileFailed {
            message: "Undefined control sequence".into(),
        };
        assert_eq!(e.kind(), ErrorKind::RemoteReported);
        assert!(e.to_string().contains("Undefined control sequence"));
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            WizardError::UnsupportedFormat { name: "a.gif".into() }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            WizardError::Timeout {
                endpoint: "/api/upload".into(),
                secs: 5
            }
            .kind(),
            ErrorKind::Transport
        );
        assert_eq!(WizardError::RenderNotReady.kind(), ErrorKind::Local);
    }
}
