use chromiumoxide::browser::{Browser as CrBrowser, BrowserConfig as CrBrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::{BrowserBuilder, BrowserConfig};
use crate::error::{Error, Result};
use crate::page::Page;

/// Chrome flags that improve performance without affecting functionality.
const PERF_ARGS: &[&str] = &[
    "disable-gpu",
    "disable-extensions",
    "metrics-recording-only",
    "mute-audio",
    "no-default-browser-check",
    "disable-client-side-phishing-detection",
    "disable-popup-blocking",
    "disable-prompt-on-repost",
];

/// Additional Chrome flags for low-resource environments.
const LOW_RESOURCE_ARGS: &[&str] = &[
    "disable-dev-shm-usage",
    "disable-software-rasterizer",
    "disable-background-networking",
    "disable-renderer-backgrounding",
    "disable-sync",
    "disable-translate",
    "no-zygote",
];

/// A running Chrome instance.
pub struct Browser {
    browser: CrBrowser,
    default_timeout: std::time::Duration,
    handler_task: tokio::task::JoinHandle<()>,
}

impl Browser {
    /// Launch a browser instance with the given configuration.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut builder = CrBrowserConfig::builder();

        if config.headless {
            builder = builder.new_headless_mode().no_sandbox();
        } else {
            builder = builder.with_head().no_sandbox();
        }

        // chromiumoxide adds the `--` prefix itself
        for arg in PERF_ARGS {
            builder = builder.arg(*arg);
        }
        if config.low_resource {
            for arg in LOW_RESOURCE_ARGS {
                builder = builder.arg(*arg);
            }
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder = builder.viewport(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: false,
            has_touch: false,
        });

        let cr_config = builder
            .build()
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        let (browser, mut handler) = CrBrowser::launch(cr_config)
            .await
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        info!(headless = config.headless, "browser launched");
        Ok(Self {
            browser,
            default_timeout: config.default_timeout,
            handler_task,
        })
    }

    /// Open a new page (tab) navigated to the given URL.
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        let cr_page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(Page::new(cr_page, self.default_timeout))
    }

    /// Close Chrome and stop the event handler.
    pub async fn close(mut self) -> Result<()> {
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!("error waiting for browser exit: {e}");
        }
        self.handler_task.abort();
        closed?;
        info!("browser closed");
        Ok(())
    }
}

struct Session {
    browser: Browser,
    page: Page,
}

/// An explicitly owned browser session that callers pass to each autofill
/// run instead of relying on process-wide state.
///
/// The browser starts lazily. `start` on a running session and `close` on
/// an idle one are no-ops. The page is handed out behind a mutex, so at most
/// one run drives it at a time.
pub struct SessionHandle {
    config: BrowserConfig,
    session: Mutex<Option<Session>>,
}

impl SessionHandle {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    /// Create a BrowserBuilder for configuring a session.
    pub fn builder() -> BrowserBuilder {
        BrowserBuilder::new()
    }

    pub async fn is_running(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Launch the browser and open a blank page unless already running.
    pub async fn start(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        Self::ensure_started(&self.config, &mut session).await
    }

    async fn ensure_started(
        config: &BrowserConfig,
        session: &mut MutexGuard<'_, Option<Session>>,
    ) -> Result<()> {
        if session.is_some() {
            debug!("browser session already running");
            return Ok(());
        }
        let browser = Browser::launch(config).await?;
        let page = browser.new_page("about:blank").await?;
        **session = Some(Session { browser, page });
        Ok(())
    }

    /// Exclusive access to the session's page, starting the browser first
    /// if needed. The session stays locked while the guard lives.
    pub async fn page(&self) -> Result<MappedMutexGuard<'_, Page>> {
        let mut session = self.session.lock().await;
        Self::ensure_started(&self.config, &mut session).await?;
        MutexGuard::try_map(session, |s| s.as_mut().map(|s| &mut s.page))
            .map_err(|_| Error::SessionClosed)
    }

    /// Shut the browser down if it is running.
    pub async fn close(&self) -> Result<()> {
        let session = self.session.lock().await.take();
        match session {
            Some(session) => session.browser.close().await,
            None => Ok(()),
        }
    }
}
