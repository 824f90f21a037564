//! Field extraction over a parsed HTML document.
//!
//! Everything here is a pure function of the markup: no live DOM, no
//! network. Malformed markup never fails; html5ever repairs what it can
//! and anything unusable is skipped.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::field::{FieldDescriptor, FieldKind, FieldOption};

static OPTION: Lazy<Selector> = Lazy::new(|| parse_static("option"));
static LEGEND: Lazy<Selector> = Lazy::new(|| parse_static("legend"));
static CLICKABLE: Lazy<Selector> = Lazy::new(|| {
    parse_static("button, a, input[type='submit'], input[type='button']")
});
static WITH_CLASS_OR_ID: Lazy<Selector> = Lazy::new(|| parse_static("[class], [id]"));

fn parse_static(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector is valid")
}

/// Result of scanning one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedForm {
    pub fields: Vec<FieldDescriptor>,
    pub has_pagination: bool,
}

/// Parse `html` and extract its fields and pagination signal.
pub fn extract_form(html: &str) -> ExtractedForm {
    let document = Html::parse_document(html);
    let fields = extract_fields(&document);
    let has_pagination = detect_pagination(&document);
    debug!(
        fields = fields.len(),
        has_pagination, "extracted form fields"
    );
    ExtractedForm {
        fields,
        has_pagination,
    }
}

/// A node of interest in document order.
enum Entry<'a> {
    Label { target: Option<String>, element: ElementRef<'a> },
    Control(ElementRef<'a>),
}

/// Extract field descriptors in document order.
///
/// When the document has `<form>` elements only controls inside a form are
/// considered, and each descriptor carries its form's id and name. Without
/// any form every control in the document is used.
pub fn extract_fields(document: &Html) -> Vec<FieldDescriptor> {
    let entries = index_document(document);
    let has_forms = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|el| el.value().name() == "form");

    let mut fields = Vec::new();
    for (position, entry) in entries.iter().enumerate() {
        let Entry::Control(control) = entry else {
            continue;
        };
        let form = owning_form(*control);
        if has_forms && form.is_none() {
            continue;
        }
        let Some(mut field) = describe_control(*control, &entries, position) else {
            continue;
        };
        if let Some(form) = form {
            field.form_id = non_empty_attr(form, "id");
            field.form_name = non_empty_attr(form, "name");
        }
        fields.push((form.map(|form| form.id()), field));
    }

    let mut fields = merge_radio_groups(fields);
    fields.retain(FieldDescriptor::is_addressable);
    fields
}

fn index_document(document: &Html) -> Vec<Entry<'_>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter_map(|el| match el.value().name() {
            "label" => Some(Entry::Label {
                target: non_empty_attr(el, "for"),
                element: el,
            }),
            "input" | "select" | "textarea" => Some(Entry::Control(el)),
            _ => None,
        })
        .collect()
}

fn describe_control(
    control: ElementRef<'_>,
    entries: &[Entry<'_>],
    position: usize,
) -> Option<FieldDescriptor> {
    let el = control.value();
    let kind = match el.name() {
        "input" => FieldKind::from_input_type(el.attr("type"))?,
        "select" => FieldKind::Select,
        "textarea" => FieldKind::Textarea,
        _ => return None,
    };

    let mut field = FieldDescriptor::new(el.attr("name").unwrap_or_default(), kind);
    field.id = el.attr("id").unwrap_or_default().to_string();
    field.placeholder = non_empty_attr(control, "placeholder");
    field.required = el.attr("required").is_some()
        || el
            .attr("aria-required")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    field.label = find_label(control, entries, position);

    match kind {
        FieldKind::Select => field.options = select_options(control),
        FieldKind::Radio => {
            let value = el.attr("value").unwrap_or("on").to_string();
            let text = field.label.take().unwrap_or_else(|| value.clone());
            field.options = vec![FieldOption {
                value,
                text,
                selected: el.attr("checked").is_some(),
            }];
            field.label = fieldset_legend(control);
        }
        _ => {}
    }

    Some(field)
}

/// Resolve the label for a control.
///
/// A `label[for=id]` is searched backward from the control first, then
/// forward. Failing that, an enclosing `<label>` supplies the text.
fn find_label(control: ElementRef<'_>, entries: &[Entry<'_>], position: usize) -> Option<String> {
    if let Some(id) = non_empty_attr(control, "id") {
        let is_for = |entry: &&Entry<'_>| {
            matches!(entry, Entry::Label { target: Some(t), .. } if *t == id)
        };
        let found = entries[..position]
            .iter()
            .rev()
            .find(is_for)
            .or_else(|| entries[position + 1..].iter().find(is_for));
        if let Some(Entry::Label { element, .. }) = found {
            if let Some(text) = label_text(*element) {
                return Some(text);
            }
        }
    }

    control
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "label")
        .and_then(label_text)
}

/// Visible text of a label, leaving out the text of nested controls.
fn label_text(label: ElementRef<'_>) -> Option<String> {
    let mut raw = String::new();
    collect_text(label, &mut raw);
    let text = collapse_whitespace(&raw);
    (!text.is_empty()).then_some(text)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) => {
                if matches!(el.name(), "select" | "textarea" | "script" | "style") {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
            }
            _ => {}
        }
    }
}

fn select_options(select: ElementRef<'_>) -> Vec<FieldOption> {
    select
        .select(&OPTION)
        .filter_map(|option| {
            let text = collapse_whitespace(&option.text().collect::<String>());
            // A missing value attribute submits the option text.
            let value = match option.value().attr("value") {
                Some(value) => value.to_string(),
                None => text.clone(),
            };
            if value.is_empty() && text.is_empty() {
                return None;
            }
            Some(FieldOption {
                value,
                text,
                selected: option.value().attr("selected").is_some(),
            })
        })
        .collect()
}

/// Fold radio inputs sharing a name within the same owning form (the
/// `K` key, `None` outside any form) into a single descriptor whose
/// options are the individual buttons.
fn merge_radio_groups<K: PartialEq>(fields: Vec<(K, FieldDescriptor)>) -> Vec<FieldDescriptor> {
    let mut merged: Vec<(K, FieldDescriptor)> = Vec::with_capacity(fields.len());
    for (form, field) in fields {
        if field.kind == FieldKind::Radio && !field.name.is_empty() {
            let group = merged.iter_mut().find(|(existing_form, existing)| {
                existing.kind == FieldKind::Radio
                    && existing.name == field.name
                    && *existing_form == form
            });
            if let Some((_, group)) = group {
                group.required |= field.required;
                group.options.extend(field.options);
                continue;
            }
        }
        merged.push((form, field));
    }
    merged.into_iter().map(|(_, field)| field).collect()
}

/// Group labels for radio sets come from the enclosing fieldset legend.
fn fieldset_legend(control: ElementRef<'_>) -> Option<String> {
    let fieldset = control
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "fieldset")?;
    let legend = fieldset.select(&LEGEND).next()?;
    let text = collapse_whitespace(&legend.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

/// True when the page shows signs of a multi-page form: an element whose
/// class or id mentions "pagination", or a button or link reading
/// "next" or "continue".
pub fn detect_pagination(document: &Html) -> bool {
    let by_attr = document.select(&WITH_CLASS_OR_ID).any(|el| {
        ["class", "id"].iter().any(|attr| {
            el.value()
                .attr(attr)
                .is_some_and(|v| v.to_lowercase().contains("pagination"))
        })
    });
    if by_attr {
        return true;
    }

    document.select(&CLICKABLE).any(|el| {
        let mut text = el.text().collect::<String>();
        if el.value().name() == "input" {
            text.push_str(el.value().attr("value").unwrap_or_default());
        }
        let text = text.to_lowercase();
        text.contains("next") || text.contains("continue")
    })
}

fn owning_form(control: ElementRef<'_>) -> Option<ElementRef<'_>> {
    control
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "form")
}

fn non_empty_attr(element: ElementRef<'_>, attr: &str) -> Option<String> {
    element
        .value()
        .attr(attr)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
