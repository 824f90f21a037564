use serde::{Deserialize, Serialize};

/// The kind of a fillable form control.
///
/// Documents naming any other kind (`number`, `date`, `search`, ...)
/// deserialize as `Text`, as the extractor treats those inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Email,
    Tel,
    Url,
    Password,
    Select,
    Checkbox,
    Radio,
    Textarea,
    File,
    #[serde(other)]
    Text,
}

impl FieldKind {
    /// Resolve the kind of an `<input>` from its `type` attribute.
    ///
    /// Returns `None` for controls that carry nothing a user fills in
    /// (`hidden`, `submit`, `button`, `reset`, `image`). Other text-like
    /// types such as `number` or `date` are treated as `Text`.
    pub fn from_input_type(input_type: Option<&str>) -> Option<Self> {
        let input_type = input_type.map(|t| t.trim().to_ascii_lowercase());
        let kind = match input_type.as_deref().unwrap_or("text") {
            "hidden" | "submit" | "button" | "reset" | "image" => return None,
            "email" => FieldKind::Email,
            "tel" => FieldKind::Tel,
            "url" => FieldKind::Url,
            "password" => FieldKind::Password,
            "checkbox" => FieldKind::Checkbox,
            "radio" => FieldKind::Radio,
            "file" => FieldKind::File,
            _ => FieldKind::Text,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Email => "email",
            FieldKind::Tel => "tel",
            FieldKind::Url => "url",
            FieldKind::Password => "password",
            FieldKind::Select => "select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Radio => "radio",
            FieldKind::Textarea => "textarea",
            FieldKind::File => "file",
        }
    }

    /// Kinds whose value is one of an enumerated option list.
    pub fn has_options(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Radio)
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a select or radio group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub selected: bool,
}

/// A form control discovered on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(alias = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<FieldOption>,
    #[serde(default, alias = "form_id", skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    #[serde(default, alias = "form_name", skip_serializing_if = "Option::is_none")]
    pub form_name: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            kind,
            label: None,
            placeholder: None,
            required: false,
            options: Vec::new(),
            form_id: None,
            form_name: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }

    /// A descriptor with neither name nor id cannot be targeted or mapped.
    pub fn is_addressable(&self) -> bool {
        !self.name.is_empty() || !self.id.is_empty()
    }

    /// Identifier strings in mapping priority order: name, id, label, placeholder.
    /// Empty strings are skipped.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> + Clone {
        [
            Some(self.name.as_str()),
            Some(self.id.as_str()),
            self.label.as_deref(),
            self.placeholder.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
    }
}
