//! User-facing texts for notifications and inline errors.
//!
//! Every string the wizard shows to a user lives here, so wording changes
//! touch exactly one file and tests can assert against the same constants
//! the state machine emits.

/// Shown when the picking mechanism rejected the candidate(s).
pub const UNSUPPORTED_FORMAT: &str = "Unsupported format. Please choose a JPG, PNG or PDF file.";

/// Shown after a successful upload.
pub const UPLOAD_SUCCESS: &str = "File uploaded successfully";

/// Fallback when an upload failed without a usable message.
pub const UPLOAD_ERROR: &str = "Upload error";

/// Shown after the generation endpoint returned markup.
pub const GENERATION_SUCCESS: &str = "Worksheet generated successfully";

/// Fallback when generation failed without a usable message.
pub const GENERATION_ERROR: &str = "Generation error";

/// Fallback when the compile step failed without a usable message.
pub const COMPILE_ERROR: &str = "PDF compilation failed";

/// Label of the download affordance.
pub const DOWNLOAD_LABEL: &str = "Download PDF";

/// Labels of the three-step progress indicator, in order.
pub const PROGRESS_STEPS: [&str; 3] = ["Upload", "Generate", "Download"];

/// Pick the fault's own message, or `fallback` when it has none.
pub fn or_fallback(message: Option<&str>, fallback: &str) -> String {
    match message.map(str::trim) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => fallback.to_string(),
    }
}

/// Error notification text for a failed compile step.
pub fn compile_failed(detail: Option<&str>) -> String {
    match detail.map(str::trim) {
        Some(d) if !d.is_empty() => format!("{COMPILE_ERROR}: {d}"),
        _ => COMPILE_ERROR.to_string(),
    }
}
