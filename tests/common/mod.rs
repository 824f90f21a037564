//! In-memory `FormSurface` over static HTML pages.
//!
//! Each page is re-parsed on every call, so element identity is the node's
//! position in its page. Clicking an element with a `data-goto` attribute
//! switches to the page with that URL.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use form_autofill::{Error, FormSurface, Result};
use scraper::{ElementRef, Html, Selector};

/// Page index and the element's position in that page's tree.
type Key = (usize, usize);

#[derive(Default)]
struct State {
    current: Option<usize>,
    values: HashMap<Key, String>,
    checked: HashMap<Key, bool>,
    files: HashMap<Key, Vec<String>>,
    actions: Vec<String>,
}

pub struct FakeSurface {
    pages: Vec<(String, String)>,
    goto_delay: Option<Duration>,
    state: Mutex<State>,
}

impl FakeSurface {
    pub fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, html)| (url.to_string(), html.to_string()))
                .collect(),
            goto_delay: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Make every navigation take `delay` before it lands.
    pub fn with_goto_delay(mut self, delay: Duration) -> Self {
        self.goto_delay = Some(delay);
        self
    }

    pub fn single(url: &str, body: &str) -> Self {
        let html = page(body);
        Self::new(&[(url, html.as_str())])
    }

    /// Actions performed so far, as `verb:selector` strings.
    pub fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn clicks(&self) -> usize {
        self.actions().iter().filter(|a| a.starts_with("click:")).count()
    }

    /// Current value of the first element matching `selector` on the
    /// current page.
    pub fn value_of(&self, selector: &str) -> Option<String> {
        self.query(selector, |state, key, el| current_value(state, key, el))
            .ok()
            .flatten()
            .flatten()
    }

    pub fn checked_of(&self, selector: &str) -> Option<bool> {
        self.query(selector, |state, key, el| current_checked(state, key, el))
            .ok()
            .flatten()
            .flatten()
    }

    pub fn files_of(&self, selector: &str) -> Option<Vec<String>> {
        self.query(selector, |state, key, _| state.files.get(&key).cloned())
            .ok()
            .flatten()
            .flatten()
    }

    fn record(&self, action: String) {
        self.state.lock().unwrap().actions.push(action);
    }

    /// Run `f` on the first match of `selector` in the current page.
    /// `Ok(None)` when nothing matches.
    fn query<T>(
        &self,
        selector: &str,
        f: impl FnOnce(&mut State, Key, ElementRef<'_>) -> T,
    ) -> Result<Option<T>> {
        let parsed = Selector::parse(selector).map_err(|e| Error::Selector(format!("{selector}: {e}")))?;
        let mut state = self.state.lock().unwrap();
        let Some(index) = state.current else {
            return Err(Error::NavigationError("no page loaded".into()));
        };
        let document = Html::parse_document(&self.pages[index].1);
        let found = document.select(&parsed).next();
        Ok(found.map(|el| f(&mut state, (index, ordinal(&document, el)), el)))
    }

    fn require<T>(
        &self,
        selector: &str,
        f: impl FnOnce(&mut State, Key, ElementRef<'_>) -> T,
    ) -> Result<T> {
        self.query(selector, f)?
            .ok_or_else(|| Error::ElementNotFound(selector.to_string()))
    }

    /// Apply a click to the element: toggle checkboxes, select radios and
    /// follow `data-goto`.
    fn activate(&self, state: &mut State, key: Key, el: ElementRef<'_>) {
        let element = el.value();
        match (element.name(), element.attr("type")) {
            ("input", Some("checkbox")) => {
                let now = current_checked(state, key, el).unwrap_or(false);
                state.checked.insert(key, !now);
            }
            ("input", Some("radio")) => {
                state.checked.insert(key, true);
            }
            _ => {}
        }
        if let Some(target) = element.attr("data-goto") {
            if let Some(index) = self.pages.iter().position(|(url, _)| url == target) {
                state.current = Some(index);
            }
        }
    }

    fn goto_sync(&self, url: &str) -> Result<()> {
        let index = self
            .pages
            .iter()
            .position(|(page_url, _)| page_url == url)
            .ok_or_else(|| Error::NavigationError(format!("net::ERR_NAME_NOT_RESOLVED at {url}")))?;
        let mut state = self.state.lock().unwrap();
        state.current = Some(index);
        state.actions.push(format!("goto:{url}"));
        Ok(())
    }

    fn click_sync(&self, selector: &str) -> Result<()> {
        self.record(format!("click:{selector}"));
        let parsed = Selector::parse(selector).map_err(|e| Error::Selector(e.to_string()))?;
        let mut state = self.state.lock().unwrap();
        let index = state
            .current
            .ok_or_else(|| Error::NavigationError("no page loaded".into()))?;
        let document = Html::parse_document(&self.pages[index].1);
        let el = document
            .select(&parsed)
            .next()
            .ok_or_else(|| Error::ElementNotFound(selector.to_string()))?;
        self.activate(&mut state, (index, ordinal(&document, el)), el);
        Ok(())
    }

    fn click_text_sync(&self, tag: &str, text: &str) -> Result<bool> {
        let selector = Selector::parse(tag).map_err(|e| Error::Selector(format!("{tag}: {e}")))?;
        let wanted = text.to_lowercase();
        let mut state = self.state.lock().unwrap();
        let Some(index) = state.current else {
            return Ok(false);
        };
        let document = Html::parse_document(&self.pages[index].1);
        let found = document.select(&selector).find(|el| {
            let mut content = el.text().collect::<String>();
            content.push_str(el.value().attr("value").unwrap_or_default());
            content.to_lowercase().contains(&wanted)
        });
        match found {
            Some(el) => {
                state.actions.push(format!("click_text:{tag}:{text}"));
                self.activate(&mut state, (index, ordinal(&document, el)), el);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn ordinal(document: &Html, el: ElementRef<'_>) -> usize {
    document
        .tree
        .nodes()
        .position(|node| node.id() == el.id())
        .unwrap_or_default()
}

fn current_value(state: &State, key: Key, el: ElementRef<'_>) -> Option<String> {
    state
        .values
        .get(&key)
        .cloned()
        .or_else(|| el.value().attr("value").map(str::to_string))
        .or(Some(String::new()))
}

fn current_checked(state: &State, key: Key, el: ElementRef<'_>) -> Option<bool> {
    Some(
        state
            .checked
            .get(&key)
            .copied()
            .unwrap_or_else(|| el.value().attr("checked").is_some()),
    )
}

/// Wrap a body fragment in a minimal document.
pub fn page(body: &str) -> String {
    format!("<!DOCTYPE html><html><head><title>Apply</title></head><body>{body}</body></html>")
}

#[async_trait]
impl FormSurface for FakeSurface {
    async fn goto(&self, url: &str) -> Result<()> {
        if let Some(delay) = self.goto_delay {
            tokio::time::sleep(delay).await;
        }
        self.goto_sync(url)
    }

    async fn wait_until_ready(&self, indicator: &str, _timeout: Duration) -> Result<()> {
        match self.query(indicator, |_, _, _| ())? {
            Some(()) => Ok(()),
            None => {
                self.state.lock().unwrap().actions.push(format!("not_ready:{indicator}"));
                Err(Error::Timeout(indicator.to_string()))
            }
        }
    }

    async fn wait_for_visible(&self, selector: &str, _timeout: Duration) -> Result<()> {
        match self.query(selector, |_, _, _| ())? {
            Some(()) => Ok(()),
            None => Err(Error::Timeout(selector.to_string())),
        }
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.query(selector, |_, _, _| ())?.is_some())
    }

    async fn clear(&self, selector: &str) -> Result<()> {
        self.require(selector, |state, key, _| {
            state.values.insert(key, String::new());
        })?;
        self.record(format!("clear:{selector}"));
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.require(selector, |state, key, el| {
            let mut value = current_value(state, key, el).unwrap_or_default();
            value.push_str(text);
            state.values.insert(key, value);
        })?;
        self.record(format!("type:{selector}"));
        Ok(())
    }

    async fn input_value(&self, selector: &str) -> Result<String> {
        self.require(selector, |state, key, el| current_value(state, key, el).unwrap_or_default())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        let option = Selector::parse("option").map_err(|e| Error::Selector(e.to_string()))?;
        let selected = self.require(selector, |state, key, el| {
            let present = el
                .select(&option)
                .any(|o| o.value().attr("value").unwrap_or_default() == value);
            if present {
                state.values.insert(key, value.to_string());
            }
            present
        })?;
        if !selected {
            return Err(Error::ElementNotFound(format!("option '{value}' in {selector}")));
        }
        self.record(format!("select:{selector}"));
        Ok(())
    }

    async fn is_checked(&self, selector: &str) -> Result<bool> {
        self.require(selector, |state, key, el| current_checked(state, key, el).unwrap_or(false))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.click_sync(selector)
    }

    async fn set_input_files(&self, selector: &str, paths: &[String]) -> Result<()> {
        self.require(selector, |state, key, _| {
            state.files.insert(key, paths.to_vec());
        })?;
        self.record(format!("files:{selector}"));
        Ok(())
    }

    async fn click_text(&self, tag: &str, text: &str) -> Result<bool> {
        self.click_text_sync(tag, text)
    }

    async fn current_url(&self) -> Result<String> {
        let state = self.state.lock().unwrap();
        let index = state
            .current
            .ok_or_else(|| Error::NavigationError("no page loaded".into()))?;
        Ok(self.pages[index].0.clone())
    }
}
