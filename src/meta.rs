//! Descriptive metadata: model identity and human-readable labels.

use inflector::Inflector;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static URN_INVALID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\-.:]").unwrap());

/// Identity of a synthesized data model as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMeta {
    /// Human-readable title.
    pub title: String,
    /// Short identifier.
    pub slug: String,
    pub namespace: String,
    pub version: String,
}

impl ModelMeta {
    pub fn new(
        title: impl Into<String>,
        slug: impl Into<String>,
        namespace: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            slug: slug.into(),
            namespace: namespace.into(),
            version: version.into(),
        }
    }

    /// The uniform resource name identifying the model.
    ///
    /// `urn:{namespace}:{slug}:{version}`, lowercased, with every character
    /// other than word characters, `-`, `.` and `:` replaced by `_`.
    pub fn urn(&self) -> String {
        let raw = format!("urn:{}:{}:{}", self.namespace, self.slug, self.version);
        URN_INVALID.replace_all(&raw, "_").to_lowercase()
    }
}

/// Human-friendly label for a column (`parcel_id` → `Parcel Id`).
pub fn label_for(column: &str) -> String {
    column.to_title_case()
}
