//! Variable interpolation for configuration values.
//!
//! String values (and list items) may reference:
//! - `${Section.key}` - another configuration key, resolved in the same context
//! - `${env.VAR_NAME}` - a process environment variable
//! - `${context.Prefix}` - value half of the most specific `Prefix:value` tag,
//!   e.g. `${context.Arch}` expands to `amd64`

use std::sync::LazyLock;

use agentbuild_core::{ConfigValue, ContextStack};
use regex::Regex;

use crate::table::ConfigSnapshot;
use crate::{ConfigError, ConfigResult};

// Regex for matching ${...} variables
static VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\}").unwrap()
});

/// Expands references for one resolution, tracking the chain of keys being
/// expanded so reference cycles are reported instead of recursing forever.
pub struct Interpolator<'a> {
    config: &'a ConfigSnapshot,
    context: &'a ContextStack,
    chain: Vec<String>,
}

impl<'a> Interpolator<'a> {
    pub fn new(config: &'a ConfigSnapshot, context: &'a ContextStack) -> Self {
        Self {
            config,
            context,
            chain: Vec::new(),
        }
    }

    /// Interpolate `value`, which was selected for `key`.
    pub fn interpolate_value(&mut self, key: &str, value: &ConfigValue) -> ConfigResult<ConfigValue> {
        if self.chain.iter().any(|k| k == key) {
            let mut cycle = self.chain.clone();
            cycle.push(key.to_string());
            return Err(ConfigError::CycleDetected(cycle.join(" -> ")));
        }

        self.chain.push(key.to_string());
        let result = match value {
            ConfigValue::String(s) => self.interpolate(key, s).map(ConfigValue::String),
            ConfigValue::List(items) => items
                .iter()
                .map(|item| self.interpolate(key, item))
                .collect::<ConfigResult<Vec<_>>>()
                .map(ConfigValue::List),
            other => Ok(other.clone()),
        };
        self.chain.pop();
        result
    }

    /// Interpolate all variables in a string.
    pub fn interpolate(&mut self, key: &str, input: &str) -> ConfigResult<String> {
        let mut output = String::with_capacity(input.len());
        let mut last = 0;
        for caps in VAR_REGEX.captures_iter(input) {
            let Some(whole) = caps.get(0) else { continue };
            output.push_str(&input[last..whole.start()]);
            output.push_str(&self.lookup(key, &caps[1])?);
            last = whole.end();
        }
        output.push_str(&input[last..]);
        Ok(output)
    }

    fn lookup(&mut self, key: &str, name: &str) -> ConfigResult<String> {
        let unknown = || ConfigError::InvalidReference {
            key: key.to_string(),
            reference: name.to_string(),
        };

        match name.split_once('.') {
            Some(("env", var)) => std::env::var(var).map_err(|_| unknown()),
            Some(("context", prefix)) => self
                .context
                .value_of(prefix)
                .map(str::to_string)
                .ok_or_else(unknown),
            _ => {
                let (config, context) = (self.config, self.context);
                let value = config.select(name, context).ok_or_else(unknown)?;
                Ok(self.interpolate_value(name, value)?.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigTable;
    use agentbuild_core::ConfigResolver;

    fn linux_amd64() -> ContextStack {
        ContextStack::new().with("Platform:Linux").with("Arch:amd64")
    }

    #[test]
    fn test_key_reference() {
        let mut table = ConfigTable::new();
        table.set_default("Client.name", "agent");
        table.set_default("ClientBuilder.output_dir", "/tmp/out");
        table.set_default(
            "ClientBuilder.template_path",
            "${ClientBuilder.output_dir}/${Client.name}_${context.Arch}.zip",
        );
        let config = table.freeze();

        assert_eq!(
            config
                .get_string("ClientBuilder.template_path", &linux_amd64())
                .unwrap(),
            Some("/tmp/out/agent_amd64.zip".to_string())
        );
    }

    #[test]
    fn test_reference_follows_context() {
        let mut table = ConfigTable::new();
        table.set_default("Client.name", "agent");
        table.add_override(["Platform:Linux"], "Client.name", "agent-linux");
        table.set_default("Client.binary_name", "${Client.name}d");
        let config = table.freeze();

        assert_eq!(
            config.get_string("Client.binary_name", &linux_amd64()).unwrap(),
            Some("agent-linuxd".to_string())
        );
        assert_eq!(
            config
                .get_string("Client.binary_name", &ContextStack::new())
                .unwrap(),
            Some("agentd".to_string())
        );
    }

    #[test]
    fn test_list_items_interpolated() {
        let mut table = ConfigTable::new();
        table.set_default("Client.name", "agent");
        table.set_default(
            "ClientBuilder.build_command",
            vec!["make".to_string(), "NAME=${Client.name}".to_string()],
        );
        let config = table.freeze();

        assert_eq!(
            config
                .get_list("ClientBuilder.build_command", &linux_amd64())
                .unwrap(),
            vec!["make", "NAME=agent"]
        );
    }

    #[test]
    fn test_unknown_reference() {
        let mut table = ConfigTable::new();
        table.set_default("a", "${does.not_exist}");
        let config = table.freeze();

        let err = config.resolve("a", &linux_amd64()).unwrap_err();
        assert!(matches!(err, agentbuild_core::Error::InvalidConfig { ref key, .. } if key == "a"));
    }

    #[test]
    fn test_cycle_detected() {
        let mut table = ConfigTable::new();
        table.set_default("a", "${b}");
        table.set_default("b", "x${a}");
        let config = table.freeze();

        let ctx = ContextStack::new();
        let mut interpolator = Interpolator::new(&config, &ctx);
        let err = interpolator
            .interpolate_value("a", &ConfigValue::from("${b}"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::CycleDetected(ref chain) if chain == "a -> b -> a"));
    }

    #[test]
    fn test_missing_context_prefix() {
        let mut table = ConfigTable::new();
        table.set_default("a", "${context.Target}");
        let config = table.freeze();
        assert!(config.resolve("a", &linux_amd64()).is_err());
    }
}
