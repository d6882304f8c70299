//! File selection: accepted media types, the selected file, and picking.
//!
//! [`pick`] plays the role of a drop-zone widget: it takes whatever the user
//! offered (zero, one or many paths) and returns at most one accepted
//! [`SelectedFile`] plus the list of [`Rejection`]s. The wizard only ever sees
//! that pair; it never touches the file system itself.
//!
//! The declared media type comes from the file extension, the same way a
//! browser derives `File.type`. Content is not sniffed; the backend treats the
//! upload as opaque bytes.

use crate::error::WizardError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// The three media types the wizard accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "application/pdf")]
    Pdf,
}

impl MediaType {
    /// The MIME essence string, e.g. `image/png`.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Pdf => "application/pdf",
        }
    }

    /// Whether this is an `image/*` type (and therefore gets a preview).
    pub fn is_image(self) -> bool {
        self.as_str().starts_with("image/")
    }

    /// Derive the declared type from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "png" => Some(MediaType::Png),
            "pdf" => Some(MediaType::Pdf),
            _ => None,
        }
    }

    /// Derive the declared type from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user-chosen file.
///
/// Content is reference-counted so handing the file to the upload request
/// does not copy it while the wizard keeps showing it.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    media_type: MediaType,
    bytes: Arc<[u8]>,
}

impl SelectedFile {
    /// Build a candidate from in-memory bytes.
    pub fn from_bytes(name: impl Into<String>, media_type: MediaType, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes: bytes.into(),
        }
    }

    /// Display name (file name without directories).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Why a picked candidate was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// Extension is not one of jpg/jpeg/png/pdf.
    #[error("'{name}' is not a JPG, PNG or PDF file")]
    InvalidType { name: String },

    /// More than one file offered at once.
    #[error("{count} files offered; pick exactly one")]
    TooManyFiles { count: usize },

    /// The file could not be read.
    #[error("'{name}' could not be read: {reason}")]
    Unreadable { name: String, reason: String },
}

impl Rejection {
    /// Convert into the library error type.
    pub fn into_error(self) -> WizardError {
        match self {
            Rejection::InvalidType { name } => WizardError::UnsupportedFormat { name },
            Rejection::TooManyFiles { count } => WizardError::TooManyFiles { count },
            Rejection::Unreadable { name, reason } => {
                WizardError::Internal(format!("could not read '{name}': {reason}"))
            }
        }
    }
}

/// Result of picking: at most one accepted file plus every rejection.
#[derive(Debug, Clone, Default)]
pub struct Picked {
    pub accepted: Option<SelectedFile>,
    pub rejections: Vec<Rejection>,
}

/// Pick from the given candidate paths.
///
/// Mirrors a single-file drop-zone: offering several files rejects all of
/// them with one [`Rejection::TooManyFiles`]; offering none yields an empty
/// result.
pub fn pick<P: AsRef<Path>>(paths: &[P]) -> Picked {
    match paths {
        [] => Picked::default(),
        [single] => pick_one(single.as_ref()),
        many => {
            debug!("Rejecting {} candidates: single-file selection", many.len());
            Picked {
                accepted: None,
                rejections: vec![Rejection::TooManyFiles { count: many.len() }],
            }
        }
    }
}

fn pick_one(path: &Path) -> Picked {
    let name = display_name(path);

    let Some(media_type) = MediaType::from_path(path) else {
        return Picked {
            accepted: None,
            rejections: vec![Rejection::InvalidType { name }],
        };
    };

    match std::fs::read(path) {
        Ok(bytes) => {
            debug!("Picked '{}' ({}, {} bytes)", name, media_type, bytes.len());
            Picked {
                accepted: Some(SelectedFile::from_bytes(name, media_type, bytes)),
                rejections: Vec::new(),
            }
        }
        Err(e) => Picked {
            accepted: None,
            rejections: vec![Rejection::Unreadable {
                name,
                reason: e.to_string(),
            }],
        },
    }
}

/// Read a single file for selection, failing with a typed error.
///
/// Unlike [`pick`] this distinguishes missing files and permission problems,
/// which the CLI reports before a wizard is even started.
pub fn read_candidate(path: &Path) -> Result<SelectedFile, WizardError> {
    let name = display_name(path);
    let media_type =
        MediaType::from_path(path).ok_or_else(|| WizardError::UnsupportedFormat { name: name.clone() })?;

    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => WizardError::FileNotFound {
            path: PathBuf::from(path),
        },
        std::io::ErrorKind::PermissionDenied => WizardError::PermissionDenied {
            path: PathBuf::from(path),
        },
        _ => WizardError::Internal(format!("could not read '{}': {e}", path.display())),
    })?;

    Ok(SelectedFile::from_bytes(name, media_type, bytes))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn media_type_from_extension() {
        assert_eq!(MediaType::from_extension("JPG"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_extension("jpeg"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_extension("png"), Some(MediaType::Png));
        assert_eq!(MediaType::from_extension("Pdf"), Some(MediaType::Pdf));
        assert_eq!(MediaType::from_extension("gif"), None);
        assert_eq!(MediaType::from_extension(""), None);
    }

    #[test]
    fn only_images_are_images() {
        assert!(MediaType::Jpeg.is_image());
        assert!(MediaType::Png.is_image());
        assert!(!MediaType::Pdf.is_image());
    }

    #[test]
    fn media_type_serialises_as_mime() {
        let json = serde_json::to_string(&MediaType::Pdf).unwrap();
        assert_eq!(json, "\"application/pdf\"");
    }

    #[test]
    fn pick_nothing_is_empty() {
        let picked = pick::<&Path>(&[]);
        assert!(picked.accepted.is_none());
        assert!(picked.rejections.is_empty());
    }

    #[test]
    fn pick_accepts_single_png() {
        let mut tmp = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        tmp.write_all(b"\x89PNG\r\n\x1a\nrest").unwrap();

        let picked = pick(&[tmp.path()]);
        assert!(picked.rejections.is_empty());
        let file = picked.accepted.expect("png accepted");
        assert_eq!(file.media_type(), MediaType::Png);
        assert_eq!(file.len(), 12);
    }

    #[test]
    fn pick_rejects_wrong_extension() {
        let tmp = tempfile::Builder::new().suffix(".gif").tempfile().unwrap();
        let picked = pick(&[tmp.path()]);
        assert!(picked.accepted.is_none());
        assert!(matches!(picked.rejections[..], [Rejection::InvalidType { .. }]));
    }

    #[test]
    fn pick_rejects_many() {
        let picked = pick(&["a.png", "b.pdf"]);
        assert!(picked.accepted.is_none());
        assert_eq!(picked.rejections, vec![Rejection::TooManyFiles { count: 2 }]);
    }

    #[test]
    fn pick_reports_unreadable() {
        let picked = pick(&["/definitely/not/here/sheet.pdf"]);
        assert!(picked.accepted.is_none());
        assert!(matches!(picked.rejections[..], [Rejection::Unreadable { .. }]));
    }

    #[test]
    fn read_candidate_missing_file() {
        let err = read_candidate(Path::new("/definitely/not/here/sheet.jpg")).unwrap_err();
        assert!(matches!(err, WizardError::FileNotFound { .. }));
    }

    #[test]
    fn rejections_serialise_with_kind_tag() {
        let all = vec![
            Rejection::InvalidType { name: "notes.txt".into() },
            Rejection::TooManyFiles { count: 3 },
            Rejection::Unreadable {
                name: "sheet.pdf".into(),
                reason: "permission denied".into(),
            },
        ];
        let json = serde_json::to_value(&all).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "kind": "invalid_type", "name": "notes.txt" },
                { "kind": "too_many_files", "count": 3 },
                { "kind": "unreadable", "name": "sheet.pdf", "reason": "permission denied" },
            ])
        );
        let back: Vec<Rejection> = serde_json::from_value(json).unwrap();
        assert_eq!(back, all);
    }

    #[test]
    fn rejection_into_error_keeps_validation_kind() {
        let err = Rejection::InvalidType { name: "x.gif".into() }.into_error();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }
}
