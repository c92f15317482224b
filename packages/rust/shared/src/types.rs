//! Core domain types for document enrichment.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EnrichError, Result};

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A page record about to be indexed or stored.
///
/// Only `uri` and `url` are read by the enrichment steps; every other field
/// is carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier, e.g. `site.com/pages/1`.
    pub uri: String,
    /// Public address, if the page has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Remaining fields, including anything applied from patches.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// Create a document with only a `uri`.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Builder-style setter for the public address.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// Partial-document object to be merged into a final enriched document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(Map<String, Value>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat any JSON value as a patch. Non-objects become the empty patch.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Layer `other` on top of `self`; keys in `other` win.
    pub fn merge(&mut self, other: Patch) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    /// Apply this patch to a document.
    ///
    /// `url: null` removes the document's url. Other keys land in `extra`.
    /// A non-string `uri`, or a `url` that is neither a string nor null, is
    /// rejected before anything is written.
    pub fn apply_to(&self, doc: &mut Document) -> Result<()> {
        for key in ["uri", "url"] {
            match self.0.get(key) {
                None | Some(Value::String(_)) => {}
                Some(Value::Null) if key == "url" => {}
                Some(other) => {
                    return Err(EnrichError::validation(format!(
                        "patch field `{key}` must be a string, got {other}"
                    )));
                }
            }
        }

        for (key, value) in &self.0 {
            match (key.as_str(), value) {
                ("uri", Value::String(uri)) => doc.uri = uri.clone(),
                ("url", Value::String(url)) => doc.url = Some(url.clone()),
                ("url", _) => doc.url = None,
                _ => {
                    doc.extra.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    /// Parse the `publishTime` entry back into an instant.
    pub fn publish_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.0.get("publishTime")?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

impl From<Map<String, Value>> for Patch {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Patch> for Value {
    fn from(patch: Patch) -> Self {
        Value::Object(patch.0)
    }
}

/// Render an instant the way patches carry it (RFC 3339, millisecond precision).
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// Site + schedule
// ---------------------------------------------------------------------------

/// A site as resolved from the site registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDescriptor {
    /// Short identifier written into `siteSlug`.
    pub slug: String,
    /// Human-readable name.
    pub name: String,
    /// Host part of page uris on this site.
    #[serde(default)]
    pub host: String,
}

/// One entry from the site-wide publishing schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// When the publish happens, exactly as the schedule service reports it.
    pub at: Value,
    /// Publish address of the scheduled page.
    pub publish: String,
}
