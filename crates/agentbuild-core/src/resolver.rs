//! Configuration resolver contract.
//!
//! Builders and deployers only ever see configuration through
//! [`ConfigResolver`], always together with the context stack of the
//! current invocation.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::context::ContextStack;
use crate::{Error, Result};

/// A resolved configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    String(String),
    List(Vec<String>),
}

impl ConfigValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::String(_) => "string",
            Self::List(_) => "list",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Lists as-is; a single string becomes a one element list.
    pub fn into_list(self) -> Option<Vec<String>> {
        match self {
            Self::List(items) => Some(items),
            Self::String(s) => Some(vec![s]),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => f.write_str(s),
            Self::List(items) => write!(f, "{}", items.join(" ")),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Context sensitive configuration lookup.
///
/// Implementations must be pure: the same key and stack always resolve to
/// the same value. Overrides scoped to tags later in the stack win over
/// earlier ones, and any applicable override wins over the default.
pub trait ConfigResolver {
    /// Resolve `key` for `context`. `Ok(None)` means the key is not set.
    fn resolve(&self, key: &str, context: &ContextStack) -> Result<Option<ConfigValue>>;

    /// Every key known to this resolver, sorted.
    fn keys(&self) -> Vec<String>;

    fn get_string(&self, key: &str, context: &ContextStack) -> Result<Option<String>> {
        match self.resolve(key, context)? {
            None => Ok(None),
            Some(ConfigValue::String(s)) => Ok(Some(s)),
            Some(other) => Ok(Some(other.to_string())),
        }
    }

    fn require_string(&self, key: &str, context: &ContextStack) -> Result<String> {
        self.get_string(key, context)?
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::ConfigMissing(key.to_string()))
    }

    fn get_list(&self, key: &str, context: &ContextStack) -> Result<Vec<String>> {
        match self.resolve(key, context)? {
            None => Ok(Vec::new()),
            Some(value) => {
                let kind = value.kind();
                value.into_list().ok_or_else(|| Error::InvalidConfig {
                    key: key.to_string(),
                    message: format!("expected a list, found {kind}"),
                })
            }
        }
    }

    fn get_bool(&self, key: &str, context: &ContextStack) -> Result<Option<bool>> {
        match self.resolve(key, context)? {
            None => Ok(None),
            Some(ConfigValue::Bool(b)) => Ok(Some(b)),
            Some(other) => Err(Error::InvalidConfig {
                key: key.to_string(),
                message: format!("expected a bool, found {}", other.kind()),
            }),
        }
    }

    fn get_path(&self, key: &str, context: &ContextStack) -> Result<Option<PathBuf>> {
        Ok(self
            .get_string(key, context)?
            .filter(|s| !s.is_empty())
            .map(PathBuf::from))
    }

    fn require_path(&self, key: &str, context: &ContextStack) -> Result<PathBuf> {
        self.require_string(key, context).map(PathBuf::from)
    }

    /// Resolve every known key for `context`, skipping unset ones.
    fn resolve_all(&self, context: &ContextStack) -> Result<BTreeMap<String, ConfigValue>> {
        let mut resolved = BTreeMap::new();
        for key in self.keys() {
            if let Some(value) = self.resolve(&key, context)? {
                resolved.insert(key, value);
            }
        }
        Ok(resolved)
    }
}
