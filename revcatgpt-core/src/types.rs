//! Core type definitions for revcatgpt.
//!
//! Defines the data that flows through the context pipeline: language tags,
//! query embeddings, and the search hits returned by the catalogue.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::LocaleError;

/// A validated, normalized language tag such as `en`, `de-CH` or `gsw`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageTag(String);

impl LanguageTag {
    /// Parse and normalize a tag. The primary subtag must be 2–3 ASCII
    /// letters; further subtags are 1–8 ASCII alphanumerics. `_` is accepted
    /// as a separator and rewritten to `-`.
    pub fn parse(raw: &str) -> Result<Self, LocaleError> {
        let invalid = || LocaleError::InvalidTag {
            tag: raw.to_string(),
        };
        let mut parts = raw.trim().split(['-', '_']);
        let primary = parts.next().unwrap_or_default();
        if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }
        let mut normalized = primary.to_ascii_lowercase();
        for sub in parts {
            if !(1..=8).contains(&sub.len()) || !sub.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(invalid());
            }
            normalized.push('-');
            // Region subtags are conventionally upper case (de-CH).
            if sub.len() == 2 && sub.chars().all(|c| c.is_ascii_alphabetic()) {
                normalized.push_str(&sub.to_ascii_uppercase());
            } else {
                normalized.push_str(&sub.to_ascii_lowercase());
            }
        }
        Ok(Self(normalized))
    }

    /// English, the fallback when nothing else is configured.
    pub fn english() -> Self {
        Self("en".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The primary language subtag (`de` for `de-CH`).
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LanguageTag {
    type Error = LocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LanguageTag> for String {
    fn from(tag: LanguageTag) -> Self {
        tag.0
    }
}

/// A query embedding in provider-native precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Widen to the precision used by the search call. Every `f32` is exactly
    /// representable as an `f64`, so no value changes.
    pub fn to_f64(&self) -> Vec<f64> {
        self.0.iter().map(|&v| f64::from(v)).collect()
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Cache key derived from the query text (SHA-256 of its UTF-8 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryKey([u8; 32]);

impl QueryKey {
    pub fn for_query(query: &str) -> Self {
        let digest = Sha256::digest(query.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// One language variant of a catalogue text field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiLangFragment {
    pub lang: String,
    pub value: String,
    #[serde(default)]
    pub translated: bool,
}

impl MultiLangFragment {
    pub fn original(lang: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            value: value.into(),
            translated: false,
        }
    }

    pub fn translation(lang: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            value: value.into(),
            translated: true,
        }
    }
}

/// A person credited on a catalogue record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// A media object attached to a catalogue record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaRef {
    pub name: String,
    /// Media class: `image`, `video`, `audio`, `pdf`, ...
    #[serde(rename = "type")]
    pub kind: String,
    pub mimetype: String,
    pub uri: String,
    pub width: i64,
    pub height: i64,
}

/// One ranked document fragment returned by the similarity search.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchHit {
    pub id: String,
    pub signature: String,
    pub title: Vec<MultiLangFragment>,
    pub description: Vec<MultiLangFragment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Language codes of the record's content.
    pub languages: Vec<String>,
    pub persons: Vec<Person>,
    pub tags: Vec<String>,
    pub media: Vec<MediaRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}
