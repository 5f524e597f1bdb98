//! Configuration table with context-scoped overrides.
//!
//! A [`ConfigTable`] is mutable and only used while loading configuration
//! and applying command line overrides. [`ConfigTable::freeze`] turns it
//! into a [`ConfigSnapshot`], the only type that can resolve values, so no
//! write can ever race a read within one invocation.

use std::collections::BTreeMap;

use agentbuild_core::{ConfigResolver, ConfigValue, ContextStack, ContextTag};
use tracing::debug;

use crate::variables::Interpolator;

/// A value that only applies when every tag of `predicate` is in the stack.
#[derive(Debug, Clone, PartialEq)]
struct Override {
    predicate: Vec<ContextTag>,
    value: ConfigValue,
    /// Definition order across the whole table, used as the last tie break.
    order: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Entry {
    default: Option<ConfigValue>,
    overrides: Vec<Override>,
    /// Set at runtime; beats every scoped override.
    runtime: Option<ConfigValue>,
}

/// Mutable configuration table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTable {
    entries: BTreeMap<String, Entry>,
    next_order: usize,
}

impl ConfigTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unscoped default for `key`, replacing any previous default.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.entries.entry(key.into()).or_default().default = Some(value.into());
    }

    /// Add a value scoped to `predicate`. An empty predicate sets the default.
    pub fn add_override<I, T>(&mut self, predicate: I, key: impl Into<String>, value: impl Into<ConfigValue>)
    where
        I: IntoIterator<Item = T>,
        T: Into<ContextTag>,
    {
        let predicate: Vec<ContextTag> = predicate.into_iter().map(Into::into).collect();
        if predicate.is_empty() {
            self.set_default(key, value);
            return;
        }
        let order = self.next_order;
        self.next_order += 1;
        self.entries
            .entry(key.into())
            .or_default()
            .overrides
            .push(Override {
                predicate,
                value: value.into(),
                order,
            });
    }

    /// Runtime override that wins over every context, e.g. from a flag.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        let key = key.into();
        let value = value.into();
        debug!(key = %key, value = %value, "Runtime configuration override");
        self.entries.entry(key).or_default().runtime = Some(value);
    }

    /// Fold `other` into this table. Values from `other` count as defined later.
    pub fn merge(&mut self, other: ConfigTable) {
        let base = self.next_order;
        for (key, entry) in other.entries {
            let target = self.entries.entry(key).or_default();
            if entry.default.is_some() {
                target.default = entry.default;
            }
            if entry.runtime.is_some() {
                target.runtime = entry.runtime;
            }
            target
                .overrides
                .extend(entry.overrides.into_iter().map(|mut o| {
                    o.order += base;
                    o
                }));
        }
        self.next_order = base + other.next_order;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stop accepting writes and start resolving.
    pub fn freeze(self) -> ConfigSnapshot {
        ConfigSnapshot {
            entries: self.entries,
        }
    }
}

/// Read-only view of a configuration table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSnapshot {
    entries: BTreeMap<String, Entry>,
}

impl ConfigSnapshot {
    /// Select the raw, uninterpolated value of `key` for `context`.
    ///
    /// Order of precedence: runtime value, then the applicable override
    /// whose most specific tag sits latest in the stack (ties: more tags,
    /// then later definition), then the default.
    pub fn select(&self, key: &str, context: &ContextStack) -> Option<&ConfigValue> {
        let entry = self.entries.get(key)?;
        if let Some(runtime) = &entry.runtime {
            return Some(runtime);
        }

        entry
            .overrides
            .iter()
            .filter_map(|o| specificity(o, context).map(|rank| (rank, o)))
            .max_by_key(|(rank, o)| (*rank, o.predicate.len(), o.order))
            .map(|(_, o)| &o.value)
            .or(entry.default.as_ref())
    }
}

/// Rank of the latest predicate tag in the stack, or `None` if any tag is absent.
fn specificity(o: &Override, context: &ContextStack) -> Option<usize> {
    o.predicate
        .iter()
        .map(|tag| context.rank(tag.as_str()))
        .try_fold(0usize, |best, rank| rank.map(|r| best.max(r)))
}

impl ConfigResolver for ConfigSnapshot {
    fn resolve(
        &self,
        key: &str,
        context: &ContextStack,
    ) -> agentbuild_core::Result<Option<ConfigValue>> {
        match self.select(key, context) {
            None => Ok(None),
            Some(value) => Ok(Some(
                Interpolator::new(self, context).interpolate_value(key, value)?,
            )),
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
