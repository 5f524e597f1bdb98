//! Validated semantic values.
//!
//! Each type wraps raw text and can only be obtained through `parse`, so a
//! value that exists is always well formed. `Display` gives back the raw
//! text unchanged.

use std::fmt;
use std::sync::LazyLock;

use regex::{Match, Matches, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::context::ContextStack;
use crate::resolver::ConfigResolver;
use crate::{Error, Result};

/// Config key holding the domain that [`DomainEmailAddress`] values must use.
pub const LOGGING_DOMAIN_KEY: &str = "Logging.domain";

/// A regular expression compiled case-insensitive, with `.` matching
/// newlines and `^`/`$` matching at line boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegularExpression {
    raw: String,
    regex: Regex,
}

impl RegularExpression {
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let regex = RegexBuilder::new(&raw)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .multi_line(true)
            .build()
            .map_err(|e| Error::invalid_format("regular expression", raw.as_str(), e.to_string()))?;
        Ok(Self { raw, regex })
    }

    /// First match anywhere in `text`.
    pub fn search<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        self.regex.find(text)
    }

    /// Match anchored at the start of `text`.
    pub fn match_at_start<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        // Leftmost search: a match starting at 0 is found first if one exists.
        self.regex.find(text).filter(|m| m.start() == 0)
    }

    /// Lazy iterator over all non-overlapping matches. Each call starts over.
    pub fn find_all<'r, 't>(&'r self, text: &'t str) -> Matches<'r, 't> {
        self.regex.find_iter(text)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for RegularExpression {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for RegularExpression {}

impl fmt::Display for RegularExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for RegularExpression {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(raw)
    }
}

impl From<RegularExpression> for String {
    fn from(value: RegularExpression) -> Self {
        value.raw
    }
}

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]+@([^@]+)$").expect("email pattern is valid"));

/// A well formed `local-part@domain` address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress {
    raw: String,
    domain_start: usize,
}

impl EmailAddress {
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let domain_start = EMAIL_REGEX
            .captures(&raw)
            .and_then(|caps| caps.get(1))
            .map(|m| m.start())
            .ok_or_else(|| Error::invalid_format("email address", raw.as_str(), "not well formed"))?;
        Ok(Self { raw, domain_start })
    }

    pub fn domain(&self) -> &str {
        &self.raw[self.domain_start..]
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(raw)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.raw
    }
}

/// Deployment specific email domain policy.
///
/// Snapshot of [`LOGGING_DOMAIN_KEY`] for one context. An empty or absent
/// domain accepts every well formed address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainPolicy {
    required_domain: Option<String>,
}

impl DomainPolicy {
    pub fn new(required_domain: Option<String>) -> Self {
        Self {
            required_domain: required_domain.filter(|d| !d.is_empty()),
        }
    }

    pub fn any() -> Self {
        Self::default()
    }

    /// Read the required domain from configuration for `context`.
    pub fn from_config(config: &dyn ConfigResolver, context: &ContextStack) -> Result<Self> {
        Ok(Self::new(config.get_string(LOGGING_DOMAIN_KEY, context)?))
    }

    pub fn required_domain(&self) -> Option<&str> {
        self.required_domain.as_deref()
    }
}

/// An email address restricted to the configured domain.
///
/// Validation depends on the [`DomainPolicy`] passed in, so the same raw
/// text can be accepted under one configuration and rejected under another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEmailAddress(EmailAddress);

impl DomainEmailAddress {
    pub fn parse(raw: impl Into<String>, policy: &DomainPolicy) -> Result<Self> {
        let email = EmailAddress::parse(raw)?;
        if let Some(required) = policy.required_domain() {
            if email.domain() != required {
                return Err(Error::DomainMismatch {
                    domain: email.domain().to_string(),
                    required: required.to_string(),
                });
            }
        }
        Ok(Self(email))
    }

    pub fn email(&self) -> &EmailAddress {
        &self.0
    }

    pub fn domain(&self) -> &str {
        self.0.domain()
    }
}

impl fmt::Display for DomainEmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
