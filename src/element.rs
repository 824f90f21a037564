use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::element::Element as CrElement;

use crate::error::{Error, Result};

/// Wrapper around a chromiumoxide Element, providing the input actions
/// the form filler uses.
pub struct Element {
    inner: CrElement,
}

impl Element {
    pub(crate) fn new(inner: CrElement) -> Self {
        Self { inner }
    }

    /// Click this element (scrolls into view first).
    pub async fn click(&self) -> Result<()> {
        self.inner.click().await?;
        Ok(())
    }

    /// Type text into this element (wraps type_str).
    pub async fn type_text(&self, text: &str) -> Result<()> {
        self.inner.type_str(text).await?;
        Ok(())
    }

    /// Press a key on this element (e.g. "Backspace", "Tab").
    pub async fn press_key(&self, key: &str) -> Result<()> {
        self.inner.press_key(key).await?;
        Ok(())
    }

    /// Focus this element.
    pub async fn focus(&self) -> Result<()> {
        self.inner.focus().await?;
        Ok(())
    }

    /// Build the CDP command attaching `paths` to this file input.
    pub(crate) fn file_input_params(&self, paths: &[String]) -> Result<SetFileInputFilesParams> {
        if paths.is_empty() {
            return Err(Error::ElementNotFound("no files to attach".into()));
        }
        let mut params = SetFileInputFilesParams::new(paths.to_vec());
        params.backend_node_id = Some(self.inner.backend_node_id.clone());
        Ok(params)
    }
}
