//! URL pattern matching for heatmap pattern pages.
//!
//! A pattern page aggregates all concrete URLs matching a template such as
//! `/products/:id` or `/blog/*`. `:param` segments match exactly one path
//! segment; `*` matches the rest of the path.

use regex::Regex;

use crate::error::{Error, Result};
use crate::events::extract_path;

/// A compiled URL pattern.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    raw: String,
    regex: Regex,
}

impl UrlPattern {
    /// True when the string contains dynamic segments and must be compiled
    /// before querying.
    pub fn is_pattern(s: &str) -> bool {
        let path = extract_path(s);
        path.contains('*') || path.split('/').any(|seg| seg.starts_with(':'))
    }

    /// Compiles a pattern into an anchored path regex.
    pub fn compile(pattern: &str) -> Result<Self> {
        let path = extract_path(pattern);
        let mut re = String::from("^");
        for (i, seg) in path.split('/').enumerate() {
            if i > 0 {
                re.push('/');
            }
            if seg == "*" {
                re.push_str(".*");
            } else if let Some(name) = seg.strip_prefix(':') {
                if name.is_empty() {
                    return Err(Error::InvalidPattern(pattern.to_string()));
                }
                re.push_str("[^/]+");
            } else {
                re.push_str(&regex::escape(seg));
            }
        }
        re.push('$');

        let regex = Regex::new(&re).map_err(|_| Error::InvalidPattern(pattern.to_string()))?;
        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    /// Matches a concrete page URL against this pattern by path.
    pub fn matches(&self, page_url: &str) -> bool {
        self.regex.is_match(&extract_path(page_url))
    }

    /// The original pattern string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}
