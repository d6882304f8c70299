//! Image previews: `SelectedFile` → base64 `data:` URI.
//!
//! A preview is the local counterpart of a browser object URL. It holds its
//! own copy of the encoded image so a UI can render a thumbnail without
//! reaching back into the wizard, and it is released by dropping it. The
//! wizard drops the previous handle whenever the selection is replaced or
//! removed; [`PreviewHandle::watch`] lets callers (and tests) observe that.

use crate::pipeline::select::SelectedFile;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageReader;
use std::fmt;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

static NEXT_PREVIEW_ID: AtomicU64 = AtomicU64::new(1);

struct PreviewData {
    id: u64,
    data_uri: String,
    dimensions: Option<(u32, u32)>,
}

/// A local reference usable to render a thumbnail of an image selection.
///
/// Not `Clone`: exactly one owner exists, so dropping it releases the
/// encoded bytes.
pub struct PreviewHandle {
    inner: Arc<PreviewData>,
}

impl PreviewHandle {
    /// Create a preview for `file`, or `None` when it is not an image.
    ///
    /// Dimensions are read from the image header only; a header that cannot
    /// be decoded still yields a handle (the browser would show a broken
    /// thumbnail, not refuse the selection).
    pub fn for_file(file: &SelectedFile) -> Option<Self> {
        if !file.media_type().is_image() {
            return None;
        }

        let dimensions = ImageReader::new(Cursor::new(file.bytes()))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok());

        let data_uri = format!(
            "data:{};base64,{}",
            file.media_type().as_str(),
            STANDARD.encode(file.bytes())
        );

        let id = NEXT_PREVIEW_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Created preview #{} for '{}' ({} bytes data URI, dimensions {:?})",
            id,
            file.name(),
            data_uri.len(),
            dimensions
        );

        Some(Self {
            inner: Arc::new(PreviewData {
                id,
                data_uri,
                dimensions,
            }),
        })
    }

    /// Process-unique identifier of this preview.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// `data:<mime>;base64,<...>` URI of the image.
    pub fn data_uri(&self) -> &str {
        &self.inner.data_uri
    }

    /// Pixel dimensions, when the image header could be decoded.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.inner.dimensions
    }

    /// Observe whether this handle has been released.
    pub fn watch(&self) -> PreviewWatch {
        PreviewWatch {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("id", &self.inner.id)
            .field("dimensions", &self.inner.dimensions)
            .field("data_uri_len", &self.inner.data_uri.len())
            .finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        debug!("Released preview #{}", self.inner.id);
    }
}

/// Weak observer of a [`PreviewHandle`].
#[derive(Debug, Clone)]
pub struct PreviewWatch {
    inner: Weak<PreviewData>,
}

impl PreviewWatch {
    /// True once the watched handle has been dropped.
    pub fn is_released(&self) -> bool {
        self.inner.strong_count() == 0
    }
}
