//! Remote worksheet service: endpoint layout, client trait, HTTP client.
//!
//! The wizard talks to the backend only through [`WorksheetApi`], so tests can
//! script responses without a server and embedders can add middleware. The
//! production implementation is [`HttpWorksheetApi`], a thin `reqwest`
//! wrapper speaking this contract:
//!
//! | Call | Request | Success response |
//! |------|---------|------------------|
//! | upload | `POST /api/upload`, multipart field `file` | JSON `{ "session_id": "..." }` |
//! | generate | `POST /api/generate-latex`, JSON `{ "session_id" }` | raw markup text |
//! | compile | `POST /api/compile-pdf`, JSON `{ "session_id", "latex" }` | JSON `{ "success": bool, "error"?: string }` |
//! | render | `GET /api/render-pdf?session_id=...` | the PDF |
//! | health | `GET /` | JSON `{ "status": "ok", ... }` |
//!
//! Every call is a single attempt; non-2xx statuses become
//! [`WizardError::HttpStatus`] carrying the response body as detail.

use crate::config::WizardConfig;
use crate::error::WizardError;
use crate::pipeline::select::SelectedFile;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const UPLOAD_PATH: &str = "/api/upload";
pub const GENERATE_PATH: &str = "/api/generate-latex";
pub const COMPILE_PATH: &str = "/api/compile-pdf";
pub const RENDER_PATH: &str = "/api/render-pdf";

/// Absolute URLs of the backend endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// Anchor the endpoint paths at `base`. A path component on `base` is
    /// kept, so `https://host/worksheets` serves `https://host/worksheets/api/...`.
    pub fn new(mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base }
    }

    /// Endpoints for the configured base URL.
    pub fn from_config(config: &WizardConfig) -> Result<Self, WizardError> {
        Ok(Self::new(config.parsed_base_url()?))
    }

    fn join(&self, path: &str) -> Url {
        // `path` is one of the constants above; joining a relative path onto a
        // URL that ends in '/' cannot fail.
        self.base
            .join(path.trim_start_matches('/'))
            .unwrap_or_else(|_| self.base.clone())
    }

    pub fn health(&self) -> Url {
        self.base.clone()
    }

    pub fn upload(&self) -> Url {
        self.join(UPLOAD_PATH)
    }

    pub fn generate(&self) -> Url {
        self.join(GENERATE_PATH)
    }

    pub fn compile(&self) -> Url {
        self.join(COMPILE_PATH)
    }

    /// Render/download URL for `session_id` (query-encoded).
    pub fn render(&self, session_id: &str) -> Url {
        let mut url = self.join(RENDER_PATH);
        url.query_pairs_mut().append_pair("session_id", session_id);
        url
    }
}

/// Parsed body of the compile endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Parsed body of the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    session_id: Option<String>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    session_id: &'a str,
}

#[derive(Serialize)]
struct CompileRequest<'a> {
    session_id: &'a str,
    latex: &'a str,
}

/// The remote worksheet service as seen by the wizard.
#[async_trait]
pub trait WorksheetApi: Send + Sync {
    /// Upload `file`; returns the session identifier.
    async fn upload(&self, file: &SelectedFile) -> Result<String, WizardError>;

    /// Generate worksheet markup for `session_id`.
    async fn generate_latex(&self, session_id: &str) -> Result<String, WizardError>;

    /// Compile `latex` for `session_id`.
    ///
    /// A structured `success: false` answer is `Ok` with the flag unset; only
    /// transport faults are `Err`.
    async fn compile_pdf(&self, session_id: &str, latex: &str) -> Result<CompileOutcome, WizardError>;

    /// Fetch the rendered PDF for `session_id`.
    async fn fetch_pdf(&self, session_id: &str) -> Result<Vec<u8>, WizardError>;

    /// Backend liveness check.
    async fn health(&self) -> Result<HealthStatus, WizardError>;
}

/// `reqwest`-backed [`WorksheetApi`].
#[derive(Debug, Clone)]
pub struct HttpWorksheetApi {
    client: Client,
    endpoints: Endpoints,
    timeout_secs: u64,
}

impl HttpWorksheetApi {
    /// Build a client from the wizard configuration.
    pub fn new(config: &WizardConfig) -> Result<Self, WizardError> {
        let endpoints = Endpoints::from_config(config)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WizardError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoints,
            timeout_secs: config.request_timeout_secs,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn transport(&self, endpoint: &str, err: reqwest::Error) -> WizardError {
        WizardError::from_reqwest(endpoint, self.timeout_secs, err)
    }

    /// Turn a non-2xx response into [`WizardError::HttpStatus`].
    async fn ensure_success(&self, endpoint: &str, response: Response) -> Result<Response, WizardError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(WizardError::HttpStatus {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl WorksheetApi for HttpWorksheetApi {
    async fn upload(&self, file: &SelectedFile) -> Result<String, WizardError> {
        info!("Uploading '{}' ({} bytes)", file.name(), file.len());

        let part = Part::bytes(file.bytes().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.media_type().as_str())
            .map_err(|e| WizardError::Internal(format!("multipart: {e}")))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoints.upload())
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport(UPLOAD_PATH, e))?;
        let response = self.ensure_success(UPLOAD_PATH, response).await?;

        let body: UploadResponse = response.json().await.map_err(|e| WizardError::InvalidResponse {
            endpoint: UPLOAD_PATH.to_string(),
            detail: e.to_string(),
        })?;

        match body.session_id {
            Some(id) if !id.is_empty() => {
                debug!("Upload accepted, session {}", id);
                Ok(id)
            }
            _ => Err(WizardError::InvalidResponse {
                endpoint: UPLOAD_PATH.to_string(),
                detail: "response has no session_id".to_string(),
            }),
        }
    }

    async fn generate_latex(&self, session_id: &str) -> Result<String, WizardError> {
        info!("Requesting worksheet generation for session {}", session_id);

        let response = self
            .client
            .post(self.endpoints.generate())
            .json(&GenerateRequest { session_id })
            .send()
            .await
            .map_err(|e| self.transport(GENERATE_PATH, e))?;
        let response = self.ensure_success(GENERATE_PATH, response).await?;

        let markup = response
            .text()
            .await
            .map_err(|e| self.transport(GENERATE_PATH, e))?;
        debug!("Generated {} bytes of markup", markup.len());
        Ok(markup)
    }

    async fn compile_pdf(&self, session_id: &str, latex: &str) -> Result<CompileOutcome, WizardError> {
        info!("Compiling {} bytes of markup for session {}", latex.len(), session_id);

        let response = self
            .client
            .post(self.endpoints.compile())
            .json(&CompileRequest { session_id, latex })
            .send()
            .await
            .map_err(|e| self.transport(COMPILE_PATH, e))?;
        let response = self.ensure_success(COMPILE_PATH, response).await?;

        response
            .json::<CompileOutcome>()
            .await
            .map_err(|e| WizardError::InvalidResponse {
                endpoint: COMPILE_PATH.to_string(),
                detail: e.to_string(),
            })
    }

    async fn fetch_pdf(&self, session_id: &str) -> Result<Vec<u8>, WizardError> {
        let response = self
            .client
            .get(self.endpoints.render(session_id))
            .send()
            .await
            .map_err(|e| self.transport(RENDER_PATH, e))?;
        let response = self.ensure_success(RENDER_PATH, response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport(RENDER_PATH, e))?;
        debug!("Fetched {} bytes of rendered PDF", bytes.len());
        Ok(bytes.to_vec())
    }

    async fn health(&self) -> Result<HealthStatus, WizardError> {
        let response = self
            .client
            .get(self.endpoints.health())
            .send()
            .await
            .map_err(|e| self.transport("/", e))?;
        let response = self.ensure_success("/", response).await?;
        response
            .json::<HealthStatus>()
            .await
            .map_err(|e| WizardError::InvalidResponse {
                endpoint: "/".to_string(),
                detail: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints(base: &str) -> Endpoints {
        Endpoints::new(Url::parse(base).unwrap())
    }

    #[test]
    fn endpoints_join_onto_root() {
        let e = endpoints("http://localhost:8000");
        assert_eq!(e.upload().as_str(), "http://localhost:8000/api/upload");
        assert_eq!(e.generate().as_str(), "http://localhost:8000/api/generate-latex");
        assert_eq!(e.compile().as_str(), "http://localhost:8000/api/compile-pdf");
        assert_eq!(e.health().as_str(), "http://localhost:8000/");
    }

    #[test]
    fn endpoints_keep_base_path() {
        let e = endpoints("https://example.org/worksheets");
        assert_eq!(e.upload().as_str(), "https://example.org/worksheets/api/upload");
    }

    #[test]
    fn render_url_encodes_session() {
        let e = endpoints("http://localhost:8000/");
        assert_eq!(
            e.render("abc 123").as_str(),
            "http://localhost:8000/api/render-pdf?session_id=abc+123"
        );
    }

    #[test]
    fn compile_outcome_tolerates_extra_fields() {
        let ok: CompileOutcome =
            serde_json::from_str(r#"{"success": true, "pdf_path": "/tmp/x/output.pdf"}"#).unwrap();
        assert_eq!(ok, CompileOutcome { success: true, error: None });

        let failed: CompileOutcome = serde_json::from_str(r#"{"success": false, "error": "x"}"#).unwrap();
        assert_eq!(failed.error.as_deref(), Some("x"));
    }

    #[test]
    fn health_status_ok() {
        let h: HealthStatus =
            serde_json::from_str(r#"{"status": "ok", "service": "worksheet-backend"}"#).unwrap();
        assert!(h.is_ok());
    }

    #[test]
    fn new_rejects_bad_base_url() {
        let mut config = WizardConfig::default();
        config.base_url = "nope".into();
        assert!(HttpWorksheetApi::new(&config).is_err());
    }
}
