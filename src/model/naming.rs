//! Table name → model name transform.

use inflector::Inflector;
use serde::{Deserialize, Serialize};

/// Irregular plurals common in table names that inflector gets wrong.
static IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("leaf", "leaves"),
    ("life", "lives"),
    ("half", "halves"),
    ("analysis", "analyses"),
    ("basis", "bases"),
    ("crisis", "crises"),
    ("criterion", "criteria"),
    ("datum", "data"),
    ("medium", "media"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
];

/// How model names are derived from table names.
///
/// Both strategies are pure: the same table name always yields the same
/// model name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    /// `order_items` → `OrderItems`
    #[default]
    Pascal,
    /// `order_items` → `OrderItem`
    PascalSingular,
}

impl NamingStrategy {
    /// Parse a strategy name (as used in configuration files).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "pascal" => Some(Self::Pascal),
            "pascal_singular" | "singular" => Some(Self::PascalSingular),
            _ => None,
        }
    }

    /// Derive a model name from a table name.
    pub fn model_name(&self, table: &str) -> String {
        let base = match self {
            Self::Pascal => table.to_pascal_case(),
            Self::PascalSingular => singularize_last_word(table).to_pascal_case(),
        };
        // Model names must be usable as identifiers.
        if base.is_empty() || base.starts_with(|c: char| c.is_ascii_digit()) {
            format!("T{}", base)
        } else {
            base
        }
    }
}

fn singularize_last_word(table: &str) -> String {
    let snake = table.to_snake_case();
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{}_{}", head, singularize(last)),
        None => singularize(&snake),
    }
}

fn singularize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *plural || lower == *singular {
            return singular.to_string();
        }
    }

    word.to_singular()
}
