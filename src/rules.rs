//! Pattern rule sets for blacklisting and priority classification.
//!
//! Rule sources are line-oriented text files. Each line is one of:
//!
//! ```text
//! # a comment
//! regex:^Show HN:
//! string:who is hiring
//! ```
//!
//! `regex:` lines compile as regular expressions; `string:` lines are
//! stored lower-cased and compared case-insensitively. Invalid regexes and
//! unrecognized lines are logged and skipped, and a missing source file
//! degrades the matcher to an empty rule set; rule loading never fails.
//!
//! A [`RuleSet`] is built once at job startup and passed by reference into
//! every pipeline and worker; there is no hot reload. Restart the job to
//! pick up edits.

use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::models::Priority;

/// An ordered collection of regex and substring patterns, evaluated
/// against a story's url and title.
///
/// Precedence is strict: regex patterns are checked before substring
/// patterns, and the first match in a tier wins. Used both as a blacklist
/// ([`RuleSet::matches`]) and as a priority classifier
/// ([`RuleSet::classify`]).
#[derive(Debug, Default)]
pub struct RuleSet {
    regexes: Vec<Regex>,
    substrings: Vec<String>,
}

impl RuleSet {
    /// A matcher with no rules; matches nothing and classifies everything
    /// as [`Priority::Normal`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load and merge rules from one or more source files.
    ///
    /// Missing or unreadable files are logged and skipped, never fatal.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut set = Self::empty();
        for path in paths {
            let path = path.as_ref();
            match fs::read_to_string(path) {
                Ok(text) => set.add_source(&text, &path.display().to_string()),
                Err(e) => warn!(path = %path.display(), error = %e, "rule file not readable; skipping"),
            }
        }
        info!(
            regexes = set.regexes.len(),
            substrings = set.substrings.len(),
            "rule set loaded"
        );
        set
    }

    /// Parse one rule source and append its patterns to this set.
    ///
    /// `origin` is only used for log context.
    pub fn add_source(&mut self, text: &str, origin: &str) {
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(pattern) = line.strip_prefix("regex:") {
                match Regex::new(pattern.trim()) {
                    Ok(re) => self.regexes.push(re),
                    Err(e) => warn!(
                        origin,
                        line = lineno + 1,
                        pattern = pattern.trim(),
                        error = %e,
                        "invalid regex rule; skipping"
                    ),
                }
            } else if let Some(literal) = line.strip_prefix("string:") {
                self.substrings.push(literal.trim().to_lowercase());
            } else {
                warn!(origin, line = lineno + 1, content = line, "unrecognized rule line; skipping");
            }
        }
        debug!(origin, "rule source parsed");
    }

    /// True when the url or title matches any rule.
    ///
    /// Regex patterns are checked first against both fields; substring
    /// patterns compare case-insensitively. Absent fields are treated as
    /// empty strings.
    pub fn matches(&self, url: Option<&str>, title: Option<&str>) -> bool {
        let url = url.unwrap_or("");
        let title = title.unwrap_or("");

        for re in &self.regexes {
            if re.is_match(url) || re.is_match(title) {
                return true;
            }
        }

        let url = url.to_lowercase();
        let title = title.to_lowercase();
        self.substrings
            .iter()
            .any(|s| url.contains(s) || title.contains(s))
    }

    /// Classify a story's priority tier.
    ///
    /// Any regex match yields [`Priority::High`]; otherwise any substring
    /// match yields [`Priority::Medium`]; otherwise [`Priority::Normal`].
    /// Regex precedence holds even when a substring rule would also match.
    pub fn classify(&self, url: Option<&str>, title: Option<&str>) -> Priority {
        let url = url.unwrap_or("");
        let title = title.unwrap_or("");

        for re in &self.regexes {
            if re.is_match(url) || re.is_match(title) {
                return Priority::High;
            }
        }

        let url = url.to_lowercase();
        let title = title.to_lowercase();
        if self.substrings.iter().any(|s| url.contains(s) || title.contains(s)) {
            return Priority::Medium;
        }

        Priority::Normal
    }

    /// Total number of loaded rules.
    pub fn len(&self) -> usize {
        self.regexes.len() + self.substrings.len()
    }

    /// True when no rules are loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
