//! Draft model: the in-progress listing being edited in the wizard.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identity of the operator who owns a draft.
///
/// Authenticated operators carry their account identity; pre-login sessions
/// use a device-scoped anonymous identity minted from a UUID v7 so drafts
/// survive reloads before sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a device-scoped anonymous identity (UUID v7, time-sortable).
    #[must_use]
    pub fn anonymous() -> Self {
        Self(format!("anon-{}", Uuid::now_v7()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OwnerId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

/// A single form-field value. The wizard stores strings, numbers, and
/// string lists; the engine never interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    List(Vec<String>),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FieldValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl FieldValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Known wizard field names, with an open fallback for steps added later.
///
/// The engine is field-agnostic; the declared variants only exist so callers
/// get typed accessors for the fields every listing carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Title,
    Price,
    Location,
    Description,
    Amenities,
    ImageUrls,
    Style,
    Custom(String),
}

impl FieldKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Title => "title",
            Self::Price => "price",
            Self::Location => "location",
            Self::Description => "description",
            Self::Amenities => "amenities",
            Self::ImageUrls => "image_urls",
            Self::Style => "style",
            Self::Custom(name) => name,
        }
    }
}

impl From<&str> for FieldKey {
    fn from(name: &str) -> Self {
        match name {
            "title" => Self::Title,
            "price" => Self::Price,
            "location" => Self::Location,
            "description" => Self::Description,
            "amenities" => Self::Amenities,
            "image_urls" => Self::ImageUrls,
            "style" => Self::Style,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Open field bag backing the wizard form.
///
/// Unknown keys are accepted without complaint; validation is the form
/// layer's concern, not this engine's.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftFields(BTreeMap<String, FieldValue>);

impl DraftFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<FieldKey>, value: impl Into<FieldValue>) {
        self.0.insert(key.into().as_str().to_string(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &FieldKey) -> Option<&FieldValue> {
        self.0.get(key.as_str())
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.get(&FieldKey::Title).and_then(FieldValue::as_text)
    }

    #[must_use]
    pub fn price(&self) -> Option<f64> {
        self.get(&FieldKey::Price).and_then(FieldValue::as_number)
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.get(&FieldKey::Location).and_then(FieldValue::as_text)
    }

    #[must_use]
    pub fn amenities(&self) -> Option<&[String]> {
        self.get(&FieldKey::Amenities).and_then(FieldValue::as_list)
    }

    /// Merge `partial` into this bag, later entries overriding earlier ones.
    pub fn merge(&mut self, partial: Self) {
        for (key, value) in partial.0 {
            self.0.insert(key, value);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<FieldKey>, V: Into<FieldValue>> FromIterator<(K, V)> for DraftFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (key, value) in iter {
            fields.set(key, value);
        }
        fields
    }
}

/// The mutable entity being synchronized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// Identity of the owning operator
    pub owner_id: OwnerId,
    /// Open mapping of form-field name to value
    pub fields: DraftFields,
    /// Last mutation timestamp (unix ms), the last-write-wins discriminator
    pub updated_at: i64,
    /// Incremented on every successful local mutation
    pub version: u64,
}

impl Draft {
    /// Create a fresh empty draft for `owner_id` at logical time `now_ms`.
    #[must_use]
    pub fn new(owner_id: OwnerId, now_ms: i64) -> Self {
        Self {
            owner_id,
            fields: DraftFields::new(),
            updated_at: now_ms,
            version: 0,
        }
    }

    /// Apply a partial field update and bump the mutation markers.
    pub fn apply(&mut self, partial: DraftFields, now_ms: i64) {
        self.fields.merge(partial);
        self.updated_at = now_ms;
        self.version += 1;
    }

    /// Last-write-wins comparator: `version` first, `updated_at` tiebreak.
    #[must_use]
    pub fn is_fresher_than(&self, other: &Self) -> bool {
        if self.version != other.version {
            return self.version > other.version;
        }
        self.updated_at > other.updated_at
    }
}
