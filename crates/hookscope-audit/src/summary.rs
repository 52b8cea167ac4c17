//! Install summary scraping.
//!
//! The package manager reports how many packages it added only in a
//! human-readable line. Parsing lives behind [`SummaryParser`] so a change in
//! that wording means swapping one adapter.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AuditError, AuditResult};

/// Pattern for npm's install summary wordings.
pub use hookscope_config::DEFAULT_SUMMARY_PATTERN;

static NPM_SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_SUMMARY_PATTERN).expect("invalid regex"));

/// Extracts the added-package count from install output.
pub trait SummaryParser: std::fmt::Debug + Send + Sync {
    /// Return the number of packages the install added.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::MalformedSummary`] when the output carries no
    /// recognizable count.
    fn added_packages(&self, output: &str) -> AuditResult<u64>;
}

/// A [`SummaryParser`] driven by a regex whose first capture group is the
/// count.
///
/// A match in which the count group did not participate (an `up to date`
/// alternative) means nothing was added.
#[derive(Debug, Clone)]
pub struct RegexSummaryParser {
    pattern: Regex,
}

impl RegexSummaryParser {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidPattern`] if the regex does not compile
    /// or has no capture group.
    pub fn new(pattern: &str) -> AuditResult<Self> {
        let compiled = Regex::new(pattern).map_err(|e| AuditError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        if compiled.captures_len() < 2 {
            return Err(AuditError::InvalidPattern {
                pattern: pattern.to_string(),
                message: "no capture group for the package count".to_string(),
            });
        }
        Ok(Self { pattern: compiled })
    }

    /// Parser for npm's summary wording.
    #[must_use]
    pub fn npm() -> Self {
        Self {
            pattern: NPM_SUMMARY.clone(),
        }
    }
}

impl Default for RegexSummaryParser {
    fn default() -> Self {
        Self::npm()
    }
}

impl SummaryParser for RegexSummaryParser {
    fn added_packages(&self, output: &str) -> AuditResult<u64> {
        let malformed = || AuditError::MalformedSummary {
            pattern: self.pattern.as_str().to_string(),
            output: output.trim().to_string(),
        };
        let caps = self.pattern.captures(output).ok_or_else(malformed)?;
        match caps.get(1) {
            Some(count) => count.as_str().parse().map_err(|_| malformed()),
            None => Ok(0),
        }
    }
}
