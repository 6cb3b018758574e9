//! Table selection for the reader.

use regex::Regex;

use super::snapshot::TableKind;

/// A table-name pattern, either a shell-style glob or a regular expression.
///
/// Both forms match the whole name and are case-sensitive.
#[derive(Debug, Clone)]
pub enum TableNamePattern {
    Glob { source: String, regex: Regex },
    Regex(Regex),
}

impl TableNamePattern {
    /// Compile a glob (`*`, `?`, `[abc]`, `[!abc]`).
    pub fn glob(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&glob_to_regex(pattern))?;
        Ok(Self::Glob {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Compile a regular expression. It is anchored at both ends.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Regex(Regex::new(&format!("^(?:{})$", pattern))?))
    }

    pub fn is_match(&self, name: &str) -> bool {
        match self {
            Self::Glob { regex, .. } | Self::Regex(regex) => regex.is_match(name),
        }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Glob { source, .. } => source,
            Self::Regex(regex) => {
                let s = regex.as_str();
                s.strip_prefix("^(?:")
                    .and_then(|s| s.strip_suffix(")$"))
                    .unwrap_or(s)
            }
        }
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                // Character class; copy through to the closing bracket.
                let mut class = String::new();
                let mut closed = false;
                if chars.peek() == Some(&'!') {
                    chars.next();
                    class.push('^');
                }
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    if c == '\\' || c == '[' {
                        class.push('\\');
                    }
                    class.push(c);
                }
                if closed {
                    out.push('[');
                    out.push_str(&class);
                    out.push(']');
                } else {
                    out.push_str(&regex::escape(&format!("[{}", class)));
                }
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}

/// Which tables the reader includes.
///
/// The default reads every schema, skips views and applies no name pattern.
#[derive(Debug, Clone, Default)]
pub struct ReadFilters {
    /// Restrict reading to one schema.
    pub schema_name: Option<String>,
    pub include_views: bool,
    pub table_name_pattern: Option<TableNamePattern>,
}

impl ReadFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema_name = Some(schema.into());
        self
    }

    pub fn include_views(mut self, include: bool) -> Self {
        self.include_views = include;
        self
    }

    pub fn pattern(mut self, pattern: TableNamePattern) -> Self {
        self.table_name_pattern = Some(pattern);
        self
    }

    /// Check if a table passes the filters.
    pub fn accepts(&self, name: &str, kind: TableKind) -> bool {
        if kind == TableKind::View && !self.include_views {
            return false;
        }
        self.table_name_pattern
            .as_ref()
            .map_or(true, |p| p.is_match(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_matching() {
        let p = TableNamePattern::glob("dim_*").unwrap();
        assert!(p.is_match("dim_users"));
        assert!(!p.is_match("fact_orders"));
        assert!(!p.is_match("xdim_users"));

        let p = TableNamePattern::glob("t?_[ab]").unwrap();
        assert!(p.is_match("t1_a"));
        assert!(!p.is_match("t1_c"));

        let p = TableNamePattern::glob("[!_]*").unwrap();
        assert!(p.is_match("users"));
        assert!(!p.is_match("_internal"));
    }

    #[test]
    fn test_glob_escapes_regex_syntax() {
        let p = TableNamePattern::glob("a.b+").unwrap();
        assert!(p.is_match("a.b+"));
        assert!(!p.is_match("aXbb"));

        let p = TableNamePattern::glob("odd[").unwrap();
        assert!(p.is_match("odd["));
    }

    #[test]
    fn test_regex_is_anchored() {
        let p = TableNamePattern::regex("orders?").unwrap();
        assert!(p.is_match("order"));
        assert!(p.is_match("orders"));
        assert!(!p.is_match("preorders"));
        assert_eq!(p.as_str(), "orders?");
    }

    #[test]
    fn test_views_excluded_by_default() {
        let filters = ReadFilters::new();
        assert!(filters.accepts("users", TableKind::Table));
        assert!(!filters.accepts("active_users", TableKind::View));

        let filters = filters.include_views(true);
        assert!(filters.accepts("active_users", TableKind::View));
    }

    #[test]
    fn test_pattern_filters_names() {
        let filters = ReadFilters::new().pattern(TableNamePattern::glob("orders").unwrap());
        assert!(filters.accepts("orders", TableKind::Table));
        assert!(!filters.accepts("users", TableKind::Table));
    }
}
