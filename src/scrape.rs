//! Fetching a form page and extracting its fields.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ScrapeConfig;
use crate::error::{Error, Result};
use crate::extract::extract_form;
use crate::field::FieldDescriptor;
use crate::page::Page;

/// Scrape boundary output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedForm {
    pub fields: Vec<FieldDescriptor>,
    pub has_pagination: bool,
    pub url: String,
}

impl ScrapedForm {
    fn from_html(html: &str, url: impl Into<String>) -> Self {
        let form = extract_form(html);
        Self {
            fields: form.fields,
            has_pagination: form.has_pagination,
            url: url.into(),
        }
    }
}

/// HTTP scraper with bounded retries on transient failures.
pub struct Scraper {
    client: Client,
    config: ScrapeConfig,
}

impl Scraper {
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Fetch `url` and extract its form fields.
    pub async fn scrape(&self, url: &str) -> Result<ScrapedForm> {
        let html = self.fetch(url).await?;
        let form = ScrapedForm::from_html(&html, url);
        info!(url, fields = form.fields.len(), "scraped form");
        Ok(form)
    }

    /// GET `url`, retrying timeouts, connection failures, 429 and 5xx
    /// responses with a fixed delay. Other HTTP errors fail immediately.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let attempts = self.config.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() => {
                    warn!(url, attempt, attempts, "scrape attempt failed: {e}");
                    last_error = match e {
                        Error::Transport { message, .. } => message,
                        other => other.to_string(),
                    };
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_delay()).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::Transport {
            attempts,
            message: last_error,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await.map_err(classify)?;
        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::Transport {
                attempts: 1,
                message: format!("HTTP {status}"),
            });
        }
        if !status.is_success() {
            return Err(Error::Http(format!("HTTP {status} for {url}")));
        }
        response.text().await.map_err(classify)
    }
}

fn classify(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else if e.is_connect() || e.is_request() || e.is_body() {
        Error::Transport {
            attempts: 1,
            message: e.to_string(),
        }
    } else {
        Error::Http(e.to_string())
    }
}

/// Extract the form from a page already open in the browser, for forms
/// that are built by scripts.
pub async fn scrape_rendered(page: &Page) -> Result<ScrapedForm> {
    let html = page.html().await?;
    let url = page.url().await?;
    let form = ScrapedForm::from_html(&html, url);
    info!(url = %form.url, fields = form.fields.len(), "scraped rendered form");
    Ok(form)
}
