//! JSON-in, JSON-out adapters for each pipeline stage.
//!
//! Every function accepts either a JSON string or an already parsed
//! [`Value`] and always returns a JSON string. Failures come back as
//! `{"success": false, "error": "..."}` instead of an `Err`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::browser::SessionHandle;
use crate::error::{Error, Result};
use crate::executor::{self, AutofillRequest};
use crate::field::FieldDescriptor;
use crate::instructions::generate_instructions;
use crate::mapper::{map_fields, MappingResult};
use crate::profile::UserProfile;
use crate::scrape::Scraper;

/// A boundary input document, parsed or not.
#[derive(Debug, Clone)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    pub fn parse<T: DeserializeOwned>(self) -> Result<T> {
        Ok(match self {
            Payload::Text(text) => serde_json::from_str(&text)?,
            Payload::Json(value) => serde_json::from_value(value)?,
        })
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

/// Mapping input: either `{fields, url?}` as produced by the scrape
/// boundary or a bare list of descriptors.
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldsDocument {
    Form {
        fields: Vec<FieldDescriptor>,
        #[serde(default, alias = "formUrl", alias = "form_url")]
        url: String,
    },
    Bare(Vec<FieldDescriptor>),
}

fn to_json<T: Serialize>(result: Result<T>) -> String {
    let value = result.and_then(|output| Ok(serde_json::to_value(output)?));
    match value {
        Ok(value) => value.to_string(),
        Err(e) => error_json(&e),
    }
}

fn error_json(error: &Error) -> String {
    warn!("boundary call failed: {error}");
    json!({ "success": false, "error": error.to_string() }).to_string()
}

/// URL in, `{fields, hasPagination, url}` out.
pub async fn scrape_form_json(scraper: &Scraper, url: &str) -> String {
    to_json(scraper.scrape(url).await)
}

/// Fields document and profile document in, `{matchedFields,
/// unmappedRequired, formUrl}` out.
///
/// The profile may be nested or already flat; dotted keys pass through
/// flattening unchanged.
pub fn map_fields_json(fields: impl Into<Payload>, profile: impl Into<Payload>) -> String {
    let mapped = (|| -> Result<MappingResult> {
        let fields: Payload = fields.into();
        let profile: Payload = profile.into();
        let (fields, url) = match fields.parse::<FieldsDocument>()? {
            FieldsDocument::Form { fields, url } => (fields, url),
            FieldsDocument::Bare(fields) => (fields, String::new()),
        };
        let profile: UserProfile = profile.parse()?;
        Ok(map_fields(&fields, &profile.flatten(), &url))
    })();
    to_json(mapped)
}

/// Mapping document in, `{formUrl, fields}` out.
pub fn generate_instructions_json(mapping: impl Into<Payload>) -> String {
    let mapping: Payload = mapping.into();
    to_json(
        mapping
            .parse::<MappingResult>()
            .map(|mapping| generate_instructions(&mapping)),
    )
}

/// Autofill document in, AutofillResult out.
pub async fn perform_autofill_json(session: &SessionHandle, request: impl Into<Payload>) -> String {
    let request: Payload = request.into();
    let request: AutofillRequest = match request.parse() {
        Ok(request) => request,
        Err(e) => return error_json(&e),
    };
    if let Err(message) = validate(&request) {
        warn!("rejected autofill request: {message}");
        return json!({ "success": false, "error": message }).to_string();
    }
    to_json(Ok(executor::autofill(session, &request).await))
}

fn validate(request: &AutofillRequest) -> std::result::Result<(), &'static str> {
    if request.form_url.trim().is_empty() {
        return Err("formUrl is required");
    }
    if request.fields.is_empty() {
        return Err("fields must not be empty");
    }
    Ok(())
}
