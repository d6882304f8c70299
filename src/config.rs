//! Configuration types for a wizard session.
//!
//! All wizard behaviour is controlled through [`WizardConfig`], built via its
//! [`WizardConfigBuilder`]. The builder validates the backend URL and the
//! timing knobs once, so the wizard and the HTTP client can rely on them.

use crate::error::WizardError;
use crate::observer::SharedObserver;
use reqwest::Url;
use std::fmt;
use std::time::Duration;

/// Default backend base URL (local development server).
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default display time of a notification before it is cleared.
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_millis(3500);

/// Configuration for a wizard session.
///
/// Built via [`WizardConfig::builder()`] or using [`WizardConfig::default()`].
///
/// # Example
/// ```rust
/// use worksheet_wizard::WizardConfig;
/// use std::time::Duration;
///
/// let config = WizardConfig::builder()
///     .base_url("https://worksheets.example.org")
///     .notification_ttl(Duration::from_secs(2))
///     .request_timeout_secs(60)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct WizardConfig {
    /// Base URL of the backend; the `/api/...` paths are joined onto it.
    /// Default: `http://localhost:8000`.
    pub base_url: String,

    /// How long a notification stays visible. Default: 3.5 s.
    pub notification_ttl: Duration,

    /// Whole-request timeout in seconds. Default: 180.
    ///
    /// Generation calls a vision model and compile runs a TeX engine; both
    /// routinely take tens of seconds.
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: u64,

    /// Strip surrounding Markdown code fences from generated markup before
    /// storing and compiling it. Default: false.
    pub clean_markup: bool,

    /// Receives notification and view events.
    pub observer: Option<SharedObserver>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
            request_timeout_secs: 180,
            connect_timeout_secs: 10,
            clean_markup: false,
            observer: None,
        }
    }
}

impl fmt::Debug for WizardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardConfig")
            .field("base_url", &self.base_url)
            .field("notification_ttl", &self.notification_ttl)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("clean_markup", &self.clean_markup)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn WizardObserver>"))
            .finish()
    }
}

impl WizardConfig {
    /// Create a new builder for `WizardConfig`.
    pub fn builder() -> WizardConfigBuilder {
        WizardConfigBuilder {
            config: Self::default(),
        }
    }

    /// Parse [`Self::base_url`].
    pub fn parsed_base_url(&self) -> Result<Url, WizardError> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            WizardError::InvalidConfig(format!("base URL '{}' is invalid: {e}", self.base_url))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(WizardError::InvalidConfig(format!(
                "base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }
        Ok(url)
    }
}

/// Builder for [`WizardConfig`].
#[derive(Debug)]
pub struct WizardConfigBuilder {
    config: WizardConfig,
}

impl WizardConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn notification_ttl(mut self, ttl: Duration) -> Self {
        self.config.notification_ttl = ttl;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn clean_markup(mut self, v: bool) -> Self {
        self.config.clean_markup = v;
        self
    }

    pub fn observer(mut self, observer: SharedObserver) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WizardConfig, WizardError> {
        let c = &self.config;
        c.parsed_base_url()?;
        if c.notification_ttl.is_zero() {
            return Err(WizardError::InvalidConfig(
                "Notification display time must be > 0".into(),
            ));
        }
        if c.request_timeout_secs == 0 || c.connect_timeout_secs == 0 {
            return Err(WizardError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
