//! Field-to-profile matching.
//!
//! For each field the mapper looks for a profile value in three tiers,
//! stopping at the first hit:
//!
//! 1. **exact**: an identifier equals a profile key or its last segment;
//! 2. **category**: the identifiers fall in a [`FieldCategory`] whose
//!    preferred profile keys exist;
//! 3. **substring**: an identifier and a profile key contain one another.
//!
//! Within a tier identifiers are tried in the order name, id, label,
//! placeholder. Comparison is on a normalised form: lowercase, with every
//! run of non-alphanumerics collapsed to `_`.
//!
//! Select and radio fields then pick a concrete option for the value; if
//! none fits, the field is unmatched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::field::{FieldDescriptor, FieldKind, FieldOption};
use crate::patterns::{self, CategoryRule, FieldCategory};
use crate::profile::{last_segment, value_to_text, FlatProfile};

/// Identifiers shorter than this never take part in substring matching.
const MIN_SUBSTRING_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Exact,
    Category,
    Substring,
}

/// One field paired with the profile value chosen for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    #[serde(alias = "field_name")]
    pub field_name: String,
    #[serde(default, alias = "field_id", skip_serializing_if = "String::is_empty")]
    pub field_id: String,
    #[serde(alias = "field_type", alias = "fieldType")]
    pub field_kind: FieldKind,
    /// Matched value for scalar kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Chosen option value for select and radio kinds.
    #[serde(
        default,
        alias = "selected_option",
        alias = "selectedOption",
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_option_value: Option<String>,
    #[serde(default = "matched_default")]
    pub matched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MatchSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FieldCategory>,
}

fn matched_default() -> bool {
    true
}

impl FieldMapping {
    fn unmatched(field: &FieldDescriptor) -> Self {
        Self {
            field_name: field.name.clone(),
            field_id: field.id.clone(),
            field_kind: field.kind,
            value: None,
            selected_option_value: None,
            matched: false,
            profile_key: None,
            source: None,
            category: None,
        }
    }
}

/// Output of the mapping stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingResult {
    #[serde(default, alias = "matched_fields")]
    pub matched_fields: Vec<FieldMapping>,
    #[serde(default, alias = "unmapped_required_fields")]
    pub unmapped_required: Vec<String>,
    #[serde(default, alias = "form_url")]
    pub form_url: String,
}

/// Map every field against the profile.
///
/// Fields without a name are skipped: they cannot be targeted later.
/// Output preserves input order; `unmapped_required` lists required
/// fields that got no usable value.
pub fn map_fields(fields: &[FieldDescriptor], profile: &FlatProfile, form_url: &str) -> MappingResult {
    let mut result = MappingResult {
        form_url: form_url.to_string(),
        ..Default::default()
    };

    for field in fields.iter().filter(|f| !f.name.is_empty()) {
        let mapping = map_field(field, profile);
        if mapping.matched {
            result.matched_fields.push(mapping);
        } else if field.required {
            result.unmapped_required.push(field.name.clone());
        }
    }

    debug!(
        matched = result.matched_fields.len(),
        unmapped_required = result.unmapped_required.len(),
        "mapped form fields"
    );
    result
}

/// A value found for a field, before option resolution.
struct Candidate {
    key: Option<String>,
    value: Value,
    source: MatchSource,
    category: Option<FieldCategory>,
}

/// Map a single field. The result has `matched == false` when no value
/// (or no option, for select and radio) could be found.
pub fn map_field(field: &FieldDescriptor, profile: &FlatProfile) -> FieldMapping {
    let mut mapping = FieldMapping::unmatched(field);
    let Some(candidate) = find_candidate(field, profile) else {
        debug!(field = %field.name, "no profile match");
        return mapping;
    };

    if field.kind.has_options() && !field.options.is_empty() {
        let wanted = value_to_text(&candidate.value);
        match resolve_option(&field.options, &wanted) {
            Some(option) => mapping.selected_option_value = Some(option.value.clone()),
            None => {
                debug!(field = %field.name, value = %wanted, "no option matches profile value");
                return mapping;
            }
        }
    } else {
        mapping.value = Some(candidate.value);
    }

    debug!(
        field = %field.name,
        key = candidate.key.as_deref().unwrap_or("<derived>"),
        source = ?candidate.source,
        "matched field"
    );
    mapping.matched = true;
    mapping.profile_key = candidate.key;
    mapping.source = Some(candidate.source);
    mapping.category = candidate.category;
    mapping
}

fn find_candidate(field: &FieldDescriptor, profile: &FlatProfile) -> Option<Candidate> {
    exact_match(field, profile)
        .or_else(|| category_match(field, profile))
        .or_else(|| substring_match(field, profile))
}

fn exact_match(field: &FieldDescriptor, profile: &FlatProfile) -> Option<Candidate> {
    field.identifiers().find_map(|ident| {
        let ident = normalize(ident);
        if ident.is_empty() {
            return None;
        }
        profile
            .iter()
            .find(|(key, _)| normalize(last_segment(key)) == ident || normalize(key) == ident)
            .map(|(key, value)| Candidate {
                key: Some(key.to_string()),
                value: value.clone(),
                source: MatchSource::Exact,
                category: None,
            })
    })
}

fn category_match(field: &FieldDescriptor, profile: &FlatProfile) -> Option<Candidate> {
    let rule = patterns::classify(field.identifiers())?;
    if let Some((key, value)) = lookup_rule(rule, profile) {
        return Some(Candidate {
            key: Some(key.to_string()),
            value: value.clone(),
            source: MatchSource::Category,
            category: Some(rule.category),
        });
    }

    if rule.category == FieldCategory::FullName {
        return synthesize_full_name(profile);
    }
    None
}

fn lookup_rule<'p>(rule: &CategoryRule, profile: &'p FlatProfile) -> Option<(&'p str, &'p Value)> {
    rule.profile_keys.iter().find_map(|entry| {
        profile
            .iter()
            .find(|(key, _)| patterns::key_matches(key, entry))
    })
}

/// "First Last" from the first- and last-name categories.
fn synthesize_full_name(profile: &FlatProfile) -> Option<Candidate> {
    let part = |category: FieldCategory| {
        patterns::CATEGORY_RULES
            .iter()
            .find(|rule| rule.category == category)
            .and_then(|rule| lookup_rule(rule, profile))
            .map(|(_, value)| value_to_text(value))
            .filter(|text| !text.is_empty())
    };
    let first = part(FieldCategory::FirstName)?;
    let last = part(FieldCategory::LastName)?;
    Some(Candidate {
        key: None,
        value: Value::String(format!("{first} {last}")),
        source: MatchSource::Category,
        category: Some(FieldCategory::FullName),
    })
}

fn substring_match(field: &FieldDescriptor, profile: &FlatProfile) -> Option<Candidate> {
    field.identifiers().find_map(|ident| {
        let ident = normalize(ident);
        if ident.len() < MIN_SUBSTRING_LEN {
            return None;
        }
        profile
            .iter()
            .find(|(key, _)| {
                let segment = normalize(last_segment(key));
                let full = normalize(key);
                let by_segment = segment.len() >= MIN_SUBSTRING_LEN
                    && (ident.contains(&segment) || segment.contains(&ident));
                by_segment || full.contains(&ident) || ident.contains(&full)
            })
            .map(|(key, value)| Candidate {
                key: Some(key.to_string()),
                value: value.clone(),
                source: MatchSource::Substring,
                category: None,
            })
    })
}

/// Pick the first option, in list order, whose text or value contains
/// `wanted`. Only when none does, fall back to the first option whose text
/// is contained in `wanted`. Options with an empty value are placeholders
/// and never chosen.
pub fn resolve_option<'a>(options: &'a [FieldOption], wanted: &str) -> Option<&'a FieldOption> {
    let wanted = wanted.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    let usable = || options.iter().filter(|o| !o.value.is_empty());

    usable()
        .find(|o| {
            o.text.to_lowercase().contains(&wanted) || o.value.to_lowercase().contains(&wanted)
        })
        .or_else(|| {
            usable().find(|o| {
                let text = o.text.trim().to_lowercase();
                text.chars().count() >= 2 && wanted.contains(&text)
            })
        })
}

/// Lowercase and collapse every run of non-alphanumerics to one `_`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut gap = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if gap && !out.is_empty() {
                out.push('_');
            }
            gap = false;
            out.extend(ch.to_lowercase());
        } else {
            gap = true;
        }
    }
    out
}
