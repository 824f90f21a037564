//! Turning mapped fields into executable fill instructions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::field::FieldKind;
use crate::mapper::{FieldMapping, MappingResult};
use crate::profile::value_to_text;

/// How the executor sets a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    Fill,
    SelectOption,
    Check,
    SetInputFiles,
    /// A method this crate does not know; executing it records the field
    /// as not filled.
    #[serde(other)]
    Unsupported,
}

impl FillMethod {
    pub fn for_kind(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Select => FillMethod::SelectOption,
            FieldKind::Checkbox | FieldKind::Radio => FillMethod::Check,
            FieldKind::File => FillMethod::SetInputFiles,
            _ => FillMethod::Fill,
        }
    }
}

/// One directive for the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillInstruction {
    #[serde(alias = "field_name")]
    pub field_name: String,
    #[serde(alias = "field_type", alias = "fieldType")]
    pub kind: FieldKind,
    #[serde(default)]
    pub selector: String,
    #[serde(alias = "fill_method")]
    pub fill_method: FillMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, alias = "selected_value", skip_serializing_if = "Option::is_none")]
    pub selected_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default, alias = "file_paths", skip_serializing_if = "Vec::is_empty")]
    pub file_paths: Vec<String>,
}

/// Instructions for one form, in fill order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionSet {
    #[serde(default, alias = "form_url")]
    pub form_url: String,
    #[serde(default, alias = "form_fields")]
    pub fields: Vec<FillInstruction>,
}

/// Build instructions for every matched field, preserving order.
///
/// Fields with an empty resolved value are still emitted; typing an empty
/// string is a valid fill.
pub fn generate_instructions(mapping: &MappingResult) -> InstructionSet {
    let fields: Vec<FillInstruction> = mapping
        .matched_fields
        .iter()
        .filter(|m| m.matched && !m.field_name.is_empty())
        .map(instruction_for)
        .collect();
    info!(count = fields.len(), "generated fill instructions");
    InstructionSet {
        form_url: mapping.form_url.clone(),
        fields,
    }
}

pub fn instruction_for(mapping: &FieldMapping) -> FillInstruction {
    let fill_method = FillMethod::for_kind(mapping.field_kind);
    let option = mapping.selected_option_value.as_deref();
    let selector = build_selector(&mapping.field_name, &mapping.field_id, mapping.field_kind, option);

    let mut instruction = FillInstruction {
        field_name: mapping.field_name.clone(),
        kind: mapping.field_kind,
        selector,
        fill_method,
        value: None,
        selected_value: None,
        checked: None,
        file_paths: Vec::new(),
    };

    let raw = mapping.value.as_ref();
    match fill_method {
        FillMethod::SelectOption => {
            instruction.selected_value = option
                .map(str::to_string)
                .or_else(|| raw.map(value_to_text));
        }
        FillMethod::Check => {
            // A resolved radio option means "select this button".
            instruction.checked = Some(option.is_some() || raw.is_some_and(parse_checked));
        }
        FillMethod::SetInputFiles => {
            instruction.file_paths = raw.map(file_paths).unwrap_or_default();
        }
        FillMethod::Fill | FillMethod::Unsupported => {
            instruction.value = Some(raw.map(value_to_text).unwrap_or_default());
        }
    }

    debug!(field = %instruction.field_name, selector = %instruction.selector, "built instruction");
    instruction
}

/// CSS selector for a field: a kind-scoped attribute selector, then an
/// id-based fallback as a comma-separated alternative.
///
/// The fallback uses `id` when present, otherwise the name. A radio with a
/// chosen option targets that option's button by value and has no fallback,
/// since the group's id names a single button that may be the wrong one.
pub fn build_selector(name: &str, id: &str, kind: FieldKind, radio_value: Option<&str>) -> String {
    let name_q = css_string(name);
    let primary = match kind {
        FieldKind::Radio => match radio_value {
            Some(value) => {
                return format!("input[type='radio'][name={name_q}][value={}]", css_string(value));
            }
            None => format!("input[type='radio'][name={name_q}]"),
        },
        FieldKind::Checkbox => format!("input[type='checkbox'][name={name_q}]"),
        FieldKind::Select => format!("select[name={name_q}]"),
        FieldKind::Textarea => format!("textarea[name={name_q}]"),
        _ => format!("input[name={name_q}]"),
    };

    let fallback_id = if id.is_empty() { name } else { id };
    format!("{primary}, {}", id_selector(fallback_id))
}

/// `#id` when the id is a plain CSS identifier, `[id='...']` otherwise.
fn id_selector(id: &str) -> String {
    let mut chars = id.chars();
    let plain = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        None => false,
    };
    if plain {
        format!("#{id}")
    } else {
        format!("[id={}]", css_string(id))
    }
}

/// Single-quoted CSS string literal.
fn css_string(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Coerce a profile value to a checked state.
///
/// Booleans pass through. Strings are false when empty or one of `false`,
/// `no`, `off`, `0`, `n` (any case); any other string is true. Numbers are
/// true when non-zero, lists when non-empty, null is false.
pub fn parse_checked(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            !matches!(s.as_str(), "" | "false" | "no" | "off" | "0" | "n")
        }
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn file_paths(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|p| !p.is_empty())
            .collect(),
        other => {
            let path = value_to_text(other);
            if path.is_empty() {
                Vec::new()
            } else {
                vec![path]
            }
        }
    }
}
