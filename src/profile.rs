//! User profiles: the nested document, its flattened view, and the JSON
//! file store they live in.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::error::{Error, Result};

pub const DEFAULT_USER_ID: &str = "default_user";
pub const DEFAULT_STORE_PATH: &str = "data/user_profiles.json";

/// The applicant's nested profile document (personal, education[],
/// experience[], skills[], ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(pub Map<String, Value>);

impl UserProfile {
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn flatten(&self) -> FlatProfile {
        FlatProfile::from_profile(self)
    }

    /// Dot-paths of every leaf, in document order.
    pub fn schema(&self) -> Vec<String> {
        self.flatten().keys().map(str::to_string).collect()
    }
}

/// Single-level view of a profile keyed by dot-joined path.
///
/// Lists of objects contribute only their first element, since one flat key
/// cannot hold several entries. Lists of scalars stay whole under the list's
/// own path. Key order follows the source document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatProfile {
    entries: Vec<(String, Value)>,
}

impl FlatProfile {
    pub fn from_profile(profile: &UserProfile) -> Self {
        let mut flat = Self::default();
        flat.flatten_into(&profile.0, "");
        flat
    }

    fn flatten_into(&mut self, map: &Map<String, Value>, prefix: &str) {
        for (key, value) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                Value::Object(inner) => self.flatten_into(inner, &path),
                Value::Array(items) => match items.first() {
                    Some(Value::Object(first)) => self.flatten_into(first, &path),
                    _ => self.entries.push((path, value.clone())),
                },
                _ => self.entries.push((path, value.clone())),
            }
        }
    }

    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self {
            entries: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Last dot-separated segment of a flat key.
pub fn last_segment(key: &str) -> &str {
    key.rsplit('.').next().unwrap_or(key)
}

/// Render a flat value as the text that would be typed into a field.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Profiles persisted as one JSON object keyed by user id.
pub struct ProfileStore {
    path: PathBuf,
    profiles: BTreeMap<String, UserProfile>,
}

impl ProfileStore {
    /// Open the store at `path`. A missing file is an empty store; an
    /// unreadable one is an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let profiles = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let profiles: BTreeMap<String, UserProfile> = serde_json::from_str(&raw)?;
            info!(path = %path.display(), users = profiles.len(), "loaded profiles");
            profiles
        } else {
            warn!(path = %path.display(), "profile store not found, starting empty");
            BTreeMap::new()
        };
        Ok(Self { path, profiles })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn user_ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn get(&self, user_id: &str) -> Option<&UserProfile> {
        self.profiles.get(user_id)
    }

    /// Insert or replace a profile and persist.
    pub fn put(&mut self, user_id: &str, profile: UserProfile) -> Result<()> {
        self.profiles.insert(user_id.to_string(), profile);
        self.save()
    }

    /// Insert a profile, failing if the id is taken.
    pub fn create(&mut self, user_id: &str, profile: UserProfile) -> Result<()> {
        if self.profiles.contains_key(user_id) {
            return Err(Error::Profile(format!("user id '{user_id}' already exists")));
        }
        self.put(user_id, profile)
    }

    /// Merge top-level keys of `patch` into an existing profile.
    pub fn update(&mut self, user_id: &str, patch: UserProfile) -> Result<()> {
        let profile = self
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| Error::Profile(format!("user id '{user_id}' not found")))?;
        for (key, value) in patch.0 {
            profile.0.insert(key, value);
        }
        self.save()
    }

    pub fn delete(&mut self, user_id: &str) -> Result<()> {
        if self.profiles.remove(user_id).is_none() {
            return Err(Error::Profile(format!("user id '{user_id}' not found")));
        }
        self.save()
    }

    /// Dot-paths available for `user_id`, or `None` for an unknown user.
    pub fn schema(&self, user_id: &str) -> Option<Vec<String>> {
        self.get(user_id).map(UserProfile::schema)
    }

    /// Seed the sample profile under [`DEFAULT_USER_ID`] when the store is empty.
    pub fn ensure_default(&mut self) -> Result<()> {
        if self.profiles.is_empty() {
            info!("no profiles found, creating default profile");
            self.create(DEFAULT_USER_ID, sample_profile())?;
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(&self.profiles)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// A complete example applicant, used to seed empty stores.
pub fn sample_profile() -> UserProfile {
    let value = json!({
        "personal": {
            "first_name": "John",
            "last_name": "Doe",
            "email": "john.doe@example.com",
            "phone": "+1 (555) 123-4567",
            "address": "123 Main St",
            "city": "Anytown",
            "state": "CA",
            "zip": "12345",
            "country": "USA",
            "birthdate": "1990-01-01",
            "linkedin": "https://linkedin.com/in/johndoe",
            "github": "https://github.com/johndoe",
            "website": "https://johndoe.com"
        },
        "education": [
            {
                "institution": "University of Example",
                "degree": "Bachelor of Science",
                "field_of_study": "Computer Science",
                "start_date": "2008-09-01",
                "end_date": "2012-05-31",
                "gpa": "3.8"
            }
        ],
        "experience": [
            {
                "company": "Tech Company Inc.",
                "position": "Software Engineer",
                "location": "San Francisco, CA",
                "start_date": "2014-06-15",
                "end_date": "2018-12-31",
                "description": "Developed and maintained web applications."
            }
        ],
        "skills": ["Python", "JavaScript", "Rust", "SQL", "Docker"],
        "languages": [
            {"language": "English", "proficiency": "Native"}
        ]
    });
    match value {
        Value::Object(map) => UserProfile(map),
        _ => UserProfile::default(),
    }
}
