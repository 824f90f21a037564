//! Driving a page through a list of fill instructions.

use std::fmt;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::browser::SessionHandle;
use crate::config::AutofillOptions;
use crate::error::{Error, Result};
use crate::field::FieldKind;
use crate::instructions::{FillInstruction, FillMethod};
use crate::surface::FormSurface;

/// Elements whose visibility means a form page has rendered.
pub const FORM_INDICATOR: &str = "form, input[type='text'], input[type='email'], button, a";

/// Elements awaited after moving to the next form page.
pub const NEXT_PAGE_INDICATOR: &str = "form, input[type='text'], input[type='email']";

/// A control that advances a multi-page form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextControl {
    /// First `tag` element whose text contains `text`.
    Text { tag: &'static str, text: &'static str },
    Css(&'static str),
}

/// Probed in order; the first present control is clicked.
pub const NEXT_CONTROLS: &[NextControl] = &[
    NextControl::Text { tag: "button", text: "Next" },
    NextControl::Text { tag: "button", text: "Continue" },
    NextControl::Css("input[type='submit'][value='Next']"),
    NextControl::Css("input[type='submit'][value='Continue']"),
    NextControl::Text { tag: "a", text: "Next" },
    NextControl::Text { tag: "a", text: "Continue" },
    NextControl::Css("button[type='submit']"),
    NextControl::Css("input[type='submit']"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    Navigating,
    /// Filling form page `page`, counted from 1.
    Filling { page: u8 },
    Paginating,
    Done,
    Failed,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionState::Idle => write!(f, "idle"),
            ExecutionState::Navigating => write!(f, "navigating"),
            ExecutionState::Filling { page } => write!(f, "filling page {page}"),
            ExecutionState::Paginating => write!(f, "paginating"),
            ExecutionState::Done => write!(f, "done"),
            ExecutionState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillMetrics {
    pub filled_count: usize,
    pub not_filled_count: usize,
    /// Percentage of attempted fields that were filled, in `[0, 100]`.
    pub fill_rate: f64,
}

impl FillMetrics {
    pub fn new(filled: usize, not_filled: usize) -> Self {
        let attempted = filled + not_filled;
        let fill_rate = if attempted == 0 {
            0.0
        } else {
            (filled as f64 / attempted as f64 * 10_000.0).round() / 100.0
        };
        Self {
            filled_count: filled,
            not_filled_count: not_filled,
            fill_rate,
        }
    }
}

/// Outcome of one autofill run.
///
/// `filled_fields` holds the selectors that were set and
/// `not_filled_fields` the names of fields that were not. Both accumulate
/// across pages, so a field repeated on a second page appears twice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutofillResult {
    pub success: bool,
    pub filled_fields: Vec<String>,
    pub not_filled_fields: Vec<String>,
    pub final_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metrics: FillMetrics,
}

impl AutofillResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Autofill boundary input: the target URL, the instructions and the
/// run options, all in one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutofillRequest {
    #[serde(default, alias = "form_url")]
    pub form_url: String,
    #[serde(default, alias = "form_fields")]
    pub fields: Vec<FillInstruction>,
    #[serde(flatten)]
    pub options: AutofillOptions,
}

/// Runs instructions against one [`FormSurface`].
pub struct Autofiller<'a, S: FormSurface + ?Sized> {
    surface: &'a S,
    options: &'a AutofillOptions,
    state: ExecutionState,
    filled: Vec<String>,
    not_filled: Vec<String>,
}

impl<'a, S: FormSurface + ?Sized> Autofiller<'a, S> {
    pub fn new(surface: &'a S, options: &'a AutofillOptions) -> Self {
        Self {
            surface,
            options,
            state: ExecutionState::Idle,
            filled: Vec::new(),
            not_filled: Vec::new(),
        }
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    fn transition(&mut self, next: ExecutionState) {
        debug!(from = %self.state, to = %next, "autofill state");
        self.state = next;
    }

    /// Navigate to `form_url` and fill every instruction, optionally
    /// following one "next page" control.
    ///
    /// Only a failed navigation makes the run unsuccessful. Per-field
    /// problems are recorded in `not_filled_fields`.
    pub async fn run(mut self, form_url: &str, instructions: &[FillInstruction]) -> AutofillResult {
        self.filled.clear();
        self.not_filled.clear();

        self.transition(ExecutionState::Navigating);
        if let Err(e) = self.navigate(form_url).await {
            self.transition(ExecutionState::Failed);
            warn!(url = form_url, "navigation failed: {e}");
            return AutofillResult::failed(e.to_string());
        }

        self.transition(ExecutionState::Filling { page: 1 });
        self.fill_pass(instructions).await;

        if self.options.handle_pagination {
            self.transition(ExecutionState::Paginating);
            if self.advance_page().await {
                self.transition(ExecutionState::Filling { page: 2 });
                self.fill_pass(instructions).await;
            } else {
                debug!("no next-page control found");
            }
        }

        let final_url = match self.surface.current_url().await {
            Ok(url) => url,
            Err(e) => {
                warn!("could not read final URL: {e}");
                form_url.to_string()
            }
        };

        self.transition(ExecutionState::Done);
        let metrics = FillMetrics::new(self.filled.len(), self.not_filled.len());
        info!(
            filled = metrics.filled_count,
            not_filled = metrics.not_filled_count,
            fill_rate = metrics.fill_rate,
            "autofill finished"
        );
        AutofillResult {
            success: true,
            filled_fields: self.filled,
            not_filled_fields: self.not_filled,
            final_url,
            error: None,
            metrics,
        }
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        info!(url, "opening form");
        match tokio::time::timeout(self.options.navigation_timeout(), self.surface.goto(url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Timeout(format!(
                    "navigation to {url} exceeded {}ms",
                    self.options.navigation_timeout_ms
                )))
            }
        }

        if let Err(e) = self
            .surface
            .wait_until_ready(FORM_INDICATOR, self.options.load_timeout())
            .await
        {
            warn!("page not fully ready, filling anyway: {e}");
        }
        Ok(())
    }

    async fn fill_pass(&mut self, instructions: &[FillInstruction]) {
        for instruction in instructions {
            match self.fill_one(instruction).await {
                Ok(true) => {
                    debug!(field = %instruction.field_name, "filled");
                    self.filled.push(instruction.selector.clone());
                }
                Ok(false) => self.not_filled.push(field_label(instruction)),
                Err(e) => {
                    warn!(field = %instruction.field_name, "fill failed: {e}");
                    self.not_filled.push(field_label(instruction));
                }
            }
        }
    }

    /// Apply one instruction. `Ok(false)` means the field was skipped.
    async fn fill_one(&self, instruction: &FillInstruction) -> Result<bool> {
        let selector = instruction.selector.as_str();
        if selector.is_empty() {
            warn!(field = %instruction.field_name, "instruction has no selector");
            return Ok(false);
        }

        if let Err(e) = self
            .surface
            .wait_for_visible(selector, self.options.element_timeout())
            .await
        {
            debug!(selector, "element not visible: {e}");
        }
        if !self.surface.exists(selector).await? {
            warn!(field = %instruction.field_name, selector, "element not found");
            return Ok(false);
        }

        match instruction.fill_method {
            FillMethod::Fill => {
                let value = instruction.value.as_deref().unwrap_or_default();
                self.surface.clear(selector).await?;
                self.type_paced(selector, value).await?;
                self.verify(selector, value).await;
                Ok(true)
            }
            FillMethod::SelectOption => match instruction.selected_value.as_deref() {
                Some(value) => {
                    self.surface.select_option(selector, value).await?;
                    Ok(true)
                }
                None => {
                    warn!(field = %instruction.field_name, "no option to select");
                    Ok(false)
                }
            },
            FillMethod::Check => {
                let desired = instruction.checked.unwrap_or(true);
                if instruction.kind == FieldKind::Radio {
                    self.surface.click(selector).await?;
                } else if self.surface.is_checked(selector).await? != desired {
                    self.surface.click(selector).await?;
                }
                Ok(true)
            }
            FillMethod::SetInputFiles => {
                if instruction.file_paths.is_empty() {
                    warn!(field = %instruction.field_name, "no files to attach");
                    return Ok(false);
                }
                self.surface
                    .set_input_files(selector, &instruction.file_paths)
                    .await?;
                Ok(true)
            }
            FillMethod::Unsupported => {
                warn!(field = %instruction.field_name, "unsupported fill method");
                Ok(false)
            }
        }
    }

    async fn type_paced(&self, selector: &str, text: &str) -> Result<()> {
        debug!(selector, text, "typing");
        let Some((min, max)) = self.options.typing_delay_ms else {
            return self.surface.type_text(selector, text).await;
        };
        let (low, high) = (min.min(max), min.max(max));
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            self.surface.type_text(selector, ch.encode_utf8(&mut buf)).await?;
            let delay = {
                let mut rng = rand::thread_rng();
                rng.gen_range(low..=high)
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(())
    }

    async fn verify(&self, selector: &str, expected: &str) {
        match self.surface.input_value(selector).await {
            Ok(actual) if actual == expected => {}
            Ok(actual) => warn!(selector, expected, actual = %actual, "value mismatch after fill"),
            Err(e) => debug!(selector, "could not verify value: {e}"),
        }
    }

    /// Click the first present next-page control and wait for the next
    /// page. Returns whether a control was clicked.
    async fn advance_page(&self) -> bool {
        for control in NEXT_CONTROLS {
            let clicked = match control {
                NextControl::Text { tag, text } => self.surface.click_text(tag, text).await,
                NextControl::Css(selector) => match self.surface.exists(selector).await {
                    Ok(true) => self.surface.click(selector).await.map(|()| true),
                    other => other,
                },
            };
            match clicked {
                Ok(true) => {
                    info!(control = ?control, "moved to next form page");
                    if let Err(e) = self
                        .surface
                        .wait_until_ready(NEXT_PAGE_INDICATOR, self.options.load_timeout())
                        .await
                    {
                        warn!("next page not fully ready: {e}");
                    }
                    return true;
                }
                Ok(false) => {}
                Err(e) => debug!(control = ?control, "next-page probe failed: {e}"),
            }
        }
        false
    }
}

fn field_label(instruction: &FillInstruction) -> String {
    if instruction.field_name.is_empty() {
        instruction.selector.clone()
    } else {
        instruction.field_name.clone()
    }
}

/// Run a request on the session's page.
///
/// The session is closed afterwards unless the request keeps it open.
pub async fn autofill(session: &SessionHandle, request: &AutofillRequest) -> AutofillResult {
    let result = {
        match session.page().await {
            Ok(page) => {
                Autofiller::new(&*page, &request.options)
                    .run(&request.form_url, &request.fields)
                    .await
            }
            Err(e) => AutofillResult::failed(e.to_string()),
        }
    };

    if !request.options.keep_browser_open {
        if let Err(e) = session.close().await {
            warn!("failed to close browser: {e}");
        }
    }
    result
}
