use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::page::Page as CrPage;
use serde::de::DeserializeOwned;

use crate::element::Element;
use crate::error::{Error, Result};
use crate::surface::FormSurface;

/// Polling interval for visibility and readiness waits.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Wrapper around a chromiumoxide Page exposing the form-filling API.
pub struct Page {
    inner: CrPage,
    default_timeout: Duration,
}

impl Page {
    pub(crate) fn new(inner: CrPage, default_timeout: Duration) -> Self {
        Self { inner, default_timeout }
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Navigate to the given URL and wait for the page to load.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.inner
            .goto(url)
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(())
    }

    /// Get the current page URL.
    pub async fn url(&self) -> Result<String> {
        self.inner
            .url()
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?
            .ok_or_else(|| Error::NavigationError("No URL found".into()))
    }

    /// Get the full rendered HTML of the page.
    pub async fn html(&self) -> Result<String> {
        self.inner
            .content()
            .await
            .map_err(|e| Error::JsError(e.to_string()))
    }

    // ── Element Queries ─────────────────────────────────────────────

    /// Find an element matching the given CSS selector.
    pub async fn find_element(&self, selector: &str) -> Result<Element> {
        let el = self
            .inner
            .find_element(selector)
            .await
            .map_err(|e| Error::ElementNotFound(format!("{selector}: {e}")))?;
        Ok(Element::new(el))
    }

    /// Wait for an element matching the selector to be visible.
    /// Polls every 100ms up to the configured default timeout.
    pub async fn wait_for_selector(&self, selector: &str) -> Result<Element> {
        self.wait_visible(selector, self.default_timeout).await?;
        self.find_element(selector).await
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
        let js = with_element(
            selector,
            "const s = window.getComputedStyle(el); \
             const r = el.getBoundingClientRect(); \
             return s.display !== 'none' && s.visibility !== 'hidden' && (r.width > 0 || r.height > 0);",
            "false",
        )?;
        let start = Instant::now();
        loop {
            if self.eval::<bool>(&js).await? {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(Error::Timeout(format!("visible element: {selector}")));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn eval<T: DeserializeOwned>(&self, js: &str) -> Result<T> {
        let result = self
            .inner
            .evaluate(js)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        result
            .into_value::<T>()
            .map_err(|e| Error::JsError(e.to_string()))
    }
}

/// Wrap `body` in an IIFE that binds `el` to the first match of `selector`.
/// When nothing matches the IIFE returns `missing`.
fn with_element(selector: &str, body: &str, missing: &str) -> Result<String> {
    let selector_js = serde_json::to_string(selector).map_err(|e| Error::JsError(e.to_string()))?;
    Ok(format!(
        r#"
        (() => {{
            const el = document.querySelector({selector_js});
            if (!el) return {missing};
            {body}
        }})()
        "#
    ))
}

/// Like [`with_element`] but throws when nothing matches.
fn require_element(selector: &str, body: &str) -> Result<String> {
    let selector_js = serde_json::to_string(selector).map_err(|e| Error::JsError(e.to_string()))?;
    with_element(
        selector,
        body,
        &format!("(() => {{ throw new Error('Element not found: ' + {selector_js}); }})()"),
    )
}

#[async_trait]
impl FormSurface for Page {
    async fn goto(&self, url: &str) -> Result<()> {
        Page::goto(self, url).await
    }

    async fn wait_until_ready(&self, indicator: &str, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        while self.eval::<String>("document.readyState").await? == "loading" {
            if start.elapsed() >= timeout {
                return Err(Error::Timeout("DOM content loaded".into()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        let remaining = timeout.saturating_sub(start.elapsed());
        self.wait_visible(indicator, remaining).await
    }

    async fn wait_for_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.wait_visible(selector, timeout).await
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        self.eval::<bool>(&with_element(selector, "return true;", "false")?)
            .await
    }

    async fn clear(&self, selector: &str) -> Result<()> {
        let el = self.find_element(selector).await?;
        el.click().await?;
        let js = require_element(
            selector,
            "el.focus(); if (typeof el.select === 'function') el.select(); return true;",
        )?;
        self.eval::<bool>(&js).await?;
        el.press_key("Backspace").await
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let el = self.find_element(selector).await?;
        el.focus().await?;
        el.type_text(text).await
    }

    async fn input_value(&self, selector: &str) -> Result<String> {
        let js = require_element(selector, "return String(el.value ?? '');")?;
        self.eval::<String>(&js).await
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        let value_js = serde_json::to_string(value).map_err(|e| Error::JsError(e.to_string()))?;
        let js = require_element(
            selector,
            &format!(
                "el.value = {value_js}; \
                 el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                 el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                 return el.value === {value_js};"
            ),
        )?;
        if self.eval::<bool>(&js).await? {
            Ok(())
        } else {
            Err(Error::ElementNotFound(format!("option '{value}' in {selector}")))
        }
    }

    async fn is_checked(&self, selector: &str) -> Result<bool> {
        let js = require_element(selector, "return !!el.checked;")?;
        self.eval::<bool>(&js).await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let el = self.find_element(selector).await?;
        el.click().await
    }

    async fn set_input_files(&self, selector: &str, paths: &[String]) -> Result<()> {
        let el = self.find_element(selector).await?;
        let params = el.file_input_params(paths)?;
        self.inner.execute(params).await?;
        Ok(())
    }

    async fn click_text(&self, tag: &str, text: &str) -> Result<bool> {
        let tag_js = serde_json::to_string(tag).map_err(|e| Error::JsError(e.to_string()))?;
        let text_js = serde_json::to_string(&text.to_lowercase())
            .map_err(|e| Error::JsError(e.to_string()))?;
        let js = format!(
            r#"
            (() => {{
                const el = Array.from(document.querySelectorAll({tag_js}))
                    .find(e => (e.innerText || e.value || '').toLowerCase().includes({text_js}));
                if (!el) return false;
                el.click();
                return true;
            }})()
            "#
        );
        self.eval::<bool>(&js).await
    }

    async fn current_url(&self) -> Result<String> {
        self.url().await
    }
}
