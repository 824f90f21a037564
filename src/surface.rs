use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// The page operations the autofill executor needs.
///
/// Every method addresses elements by CSS selector; a comma-separated
/// selector list resolves to its first match in document order.
/// Implemented by [`crate::page::Page`] for a live browser tab.
#[async_trait]
pub trait FormSurface: Send + Sync {
    /// Navigate to `url`. The caller bounds this with its own timeout.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Wait for the DOM to finish parsing and `indicator` to become visible.
    async fn wait_until_ready(&self, indicator: &str, timeout: Duration) -> Result<()>;

    async fn wait_for_visible(&self, selector: &str, timeout: Duration) -> Result<()>;

    async fn exists(&self, selector: &str) -> Result<bool>;

    /// Focus the element, select its content and delete it.
    async fn clear(&self, selector: &str) -> Result<()>;

    /// Type `text` into the element at the caret.
    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    async fn input_value(&self, selector: &str) -> Result<String>;

    /// Choose the option whose value equals `value`.
    async fn select_option(&self, selector: &str, value: &str) -> Result<()>;

    async fn is_checked(&self, selector: &str) -> Result<bool>;

    async fn click(&self, selector: &str) -> Result<()>;

    async fn set_input_files(&self, selector: &str, paths: &[String]) -> Result<()>;

    /// Click the first `tag` element whose text contains `text`
    /// (case-insensitive). Returns whether anything was clicked.
    async fn click_text(&self, tag: &str, text: &str) -> Result<bool>;

    async fn current_url(&self) -> Result<String>;
}
