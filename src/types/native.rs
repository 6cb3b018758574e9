//! Parsing of catalog-reported type strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A native column type as reported by the catalog.
///
/// The base name is normalized (lowercase, single spaces, parameters
/// removed) and is what the [`TypeRegistry`](super::TypeRegistry) keys on.
/// Numeric parameters are kept separately so width/precision/scale can be
/// derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeType {
    /// Normalized base name (e.g. `varchar`, `double precision`).
    pub name: String,
    /// Numeric parameters in declaration order (`NUMERIC(10,2)` → `[10, 2]`).
    pub params: Vec<u32>,
    /// The type text exactly as the catalog reported it.
    pub declared: String,
}

impl NativeType {
    /// Parse a declared type string.
    ///
    /// Unparseable parameters (e.g. `VARCHAR(MAX)`, `geometry(Point,4326)`)
    /// are dropped; the base name is always kept.
    pub fn parse(declared: &str) -> Self {
        let trimmed = declared.trim();
        let (base, params) = match trimmed.find('(') {
            Some(open) => {
                let close = trimmed.rfind(')').unwrap_or(trimmed.len());
                let inner = if close > open {
                    &trimmed[open + 1..close]
                } else {
                    ""
                };
                // Keep anything after the parameter list ("varchar(10) array")
                let tail = trimmed.get(close + 1..).unwrap_or("");
                let base = format!("{} {}", &trimmed[..open], tail);
                (base, parse_params(inner))
            }
            None => (trimmed.to_string(), Vec::new()),
        };

        Self {
            name: normalize_name(&base),
            params,
            declared: trimmed.to_string(),
        }
    }

    /// Check if the catalog reported no type text at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Parameter at `index`, if present.
    pub fn param(&self, index: usize) -> Option<u32> {
        self.params.get(index).copied()
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.declared)
    }
}

impl From<&str> for NativeType {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// Normalize a type name for registry lookup.
pub(crate) fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn parse_params(inner: &str) -> Vec<u32> {
    let parsed: Option<Vec<u32>> = inner
        .split(',')
        .map(|p| p.trim().parse::<u32>().ok())
        .collect();
    parsed.unwrap_or_default()
}
