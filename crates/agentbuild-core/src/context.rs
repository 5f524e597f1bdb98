//! Context tags and the ordered context stack.
//!
//! A context stack is threaded through every configuration lookup. Tags
//! appended later are more specific and win over earlier ones when both
//! scope an override for the same key.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// An opaque tag naming a build or deploy scenario, e.g. `Platform:Linux`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(transparent)]
pub struct ContextTag(String);

impl ContextTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a `Prefix:Value` tag into its two halves.
    pub fn split(&self) -> Option<(&str, &str)> {
        self.0.split_once(':')
    }
}

impl From<&str> for ContextTag {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl From<String> for ContextTag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

impl PartialEq<str> for ContextTag {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ContextTag {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Ordered, append-only list of context tags for one invocation.
///
/// The stack is built once before any configuration is resolved and then
/// only ever handed out by shared reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextStack {
    tags: Vec<ContextTag>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tag. Duplicates are allowed; the last occurrence counts.
    pub fn push(&mut self, tag: impl Into<ContextTag>) {
        self.tags.push(tag.into());
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, tag: impl Into<ContextTag>) -> Self {
        self.push(tag);
        self
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContextTag> {
        self.tags.iter()
    }

    pub fn tags(&self) -> &[ContextTag] {
        &self.tags
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Position of the most recent occurrence of `tag`. Higher is more specific.
    pub fn rank(&self, tag: &str) -> Option<usize> {
        self.tags.iter().rposition(|t| t == tag)
    }

    /// Value half of the most specific tag carrying `prefix`.
    ///
    /// `Arch:amd64` yields `amd64` for prefix `Arch`.
    pub fn value_of(&self, prefix: &str) -> Option<&str> {
        self.tags
            .iter()
            .rev()
            .filter_map(ContextTag::split)
            .find(|(p, _)| *p == prefix)
            .map(|(_, v)| v)
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.to_string()).collect()
    }
}

impl<T: Into<ContextTag>> FromIterator<T> for ContextStack {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for ContextStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.to_strings().join(", "))
    }
}
