use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::browser::SessionHandle;

/// Chrome launch settings for the autofill browser.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub chrome_path: Option<String>,
    /// Adds memory-saving Chrome flags for small machines.
    pub low_resource: bool,
    /// Default timeout for element lookups (default: 30s).
    pub default_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            chrome_path: None,
            low_resource: false,
            default_timeout: Duration::from_secs(30),
        }
    }
}

pub struct BrowserBuilder {
    config: BrowserConfig,
}

impl BrowserBuilder {
    pub fn new() -> Self {
        Self {
            config: BrowserConfig::default(),
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<String>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    pub fn low_resource(mut self, low_resource: bool) -> Self {
        self.config.low_resource = low_resource;
        self
    }

    /// Set the default timeout for element lookups.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    pub fn build_config(self) -> BrowserConfig {
        self.config
    }

    /// Build an idle session handle. The browser starts on first use.
    pub fn build(self) -> SessionHandle {
        SessionHandle::new(self.build_config())
    }
}

impl Default for BrowserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Knobs for a single autofill run. Deserialises from the autofill
/// boundary document, so every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutofillOptions {
    /// Hard limit for the initial navigation; exceeding it fails the run.
    #[serde(alias = "navigation_timeout")]
    pub navigation_timeout_ms: u64,
    /// Soft limit for DOM-ready and form-indicator waits.
    #[serde(alias = "load_timeout")]
    pub load_timeout_ms: u64,
    /// Soft limit for each field's visibility wait.
    pub element_timeout_ms: u64,
    pub handle_pagination: bool,
    /// Inclusive `[min, max]` pause between keystrokes; `None` types in bulk.
    pub typing_delay_ms: Option<(u64, u64)>,
    #[serde(alias = "keep_browser_open")]
    pub keep_browser_open: bool,
}

impl AutofillOptions {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }
}

impl Default for AutofillOptions {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 90_000,
            load_timeout_ms: 45_000,
            element_timeout_ms: 5_000,
            handle_pagination: false,
            typing_delay_ms: Some((50, 150)),
            keep_browser_open: true,
        }
    }
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Retry and transport settings for the HTTP scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapeConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub user_agent: String,
}

impl ScrapeConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 2_000,
            request_timeout_ms: 30_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
