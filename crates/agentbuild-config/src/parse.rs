//! KDL configuration parsing.
//!
//! ```kdl
//! Client.name "agent"
//! Client.plugins "base.py" "extra.py"
//!
//! context "Platform:Linux" {
//!     ClientBuilder.template_path "linux.zip"
//!     context "Target:LinuxRpm" {
//!         ClientBuilder.template_path "centos.zip"
//!     }
//! }
//! ```
//!
//! Top-level nodes set defaults. `context` blocks scope the nodes inside
//! them; nested blocks (or several tags on one block) require all tags.
//! A node with several arguments, or none, is a list.

use std::path::Path;

use agentbuild_core::{ConfigValue, ContextTag};
use kdl::{KdlDocument, KdlNode, KdlValue};
use tracing::debug;

use crate::table::ConfigTable;
use crate::{ConfigError, ConfigResult};

const CONTEXT_NODE: &str = "context";

/// Parse a configuration table from KDL text.
pub fn parse_config(kdl: &str) -> ConfigResult<ConfigTable> {
    let doc: KdlDocument = kdl.parse()?;
    let mut table = ConfigTable::new();
    let mut scope = Vec::new();
    parse_nodes(&doc, &mut scope, &mut table)?;
    Ok(table)
}

/// Read and parse a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ConfigTable> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = parse_config(&content)?;
    debug!(path = %path.display(), keys = table.len(), "Loaded configuration");
    Ok(table)
}

fn parse_nodes(
    doc: &KdlDocument,
    scope: &mut Vec<ContextTag>,
    table: &mut ConfigTable,
) -> ConfigResult<()> {
    for node in doc.nodes() {
        let name = node.name().value();
        if name == CONTEXT_NODE {
            let tags = get_all_string_args(node);
            if tags.is_empty() {
                return Err(ConfigError::MissingField("context tag".to_string()));
            }
            let depth = scope.len();
            scope.extend(tags.into_iter().map(ContextTag::from));
            if let Some(children) = node.children() {
                parse_nodes(children, scope, table)?;
            }
            scope.truncate(depth);
        } else {
            if node.children().is_some() {
                return Err(ConfigError::InvalidValue {
                    field: name.to_string(),
                    message: "only context blocks may have children".to_string(),
                });
            }
            let value = node_value(node)?;
            table.add_override(scope.iter().cloned(), name, value);
        }
    }
    Ok(())
}

fn node_value(node: &KdlNode) -> ConfigResult<ConfigValue> {
    let field = node.name().value();
    let args: Vec<&KdlValue> = node
        .entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| e.value())
        .collect();

    if node.entries().iter().any(|e| e.name().is_some()) {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: "properties are not supported on configuration keys".to_string(),
        });
    }

    match args.as_slice() {
        [single] => scalar_value(field, single),
        many => many
            .iter()
            .map(|v| list_item(field, v))
            .collect::<ConfigResult<Vec<_>>>()
            .map(ConfigValue::List),
    }
}

fn scalar_value(field: &str, value: &KdlValue) -> ConfigResult<ConfigValue> {
    if let Some(s) = value.as_string() {
        return Ok(ConfigValue::String(s.to_string()));
    }
    if let Some(b) = value.as_bool() {
        return Ok(ConfigValue::Bool(b));
    }
    if let Some(i) = value.as_integer() {
        let i = i64::try_from(i).map_err(|_| ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("integer {i} out of range"),
        })?;
        return Ok(ConfigValue::Integer(i));
    }
    Err(ConfigError::InvalidValue {
        field: field.to_string(),
        message: format!("unsupported value {value:?}"),
    })
}

fn list_item(field: &str, value: &KdlValue) -> ConfigResult<String> {
    match scalar_value(field, value)? {
        ConfigValue::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

// Helper functions for extracting values from KDL nodes

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentbuild_core::{ConfigResolver, ContextStack};

    const SAMPLE: &str = r#"
        Client.name "agent"
        Client.plugins "base.py" "extra.py"
        Client.poll_max 600
        Client.debug #false

        ClientBuilder.template_path "default.zip"

        context "Platform:Linux" {
            ClientBuilder.template_path "linux.zip"
            context "Target:LinuxRpm" {
                ClientBuilder.template_path "centos.zip"
            }
        }

        context "Platform:Windows" "Arch:i386" {
            Client.name "agent32"
        }
    "#;

    #[test]
    fn test_parse_defaults() {
        let config = parse_config(SAMPLE).unwrap().freeze();
        let ctx = ContextStack::new();
        assert_eq!(config.get_string("Client.name", &ctx).unwrap().unwrap(), "agent");
        assert_eq!(
            config.get_list("Client.plugins", &ctx).unwrap(),
            vec!["base.py", "extra.py"]
        );
        assert_eq!(
            config.resolve("Client.poll_max", &ctx).unwrap(),
            Some(ConfigValue::Integer(600))
        );
        assert_eq!(config.get_bool("Client.debug", &ctx).unwrap(), Some(false));
    }

    #[test]
    fn test_parse_nested_context() {
        let config = parse_config(SAMPLE).unwrap().freeze();

        let rpm = ContextStack::new()
            .with("Platform:Linux")
            .with("Target:LinuxRpm")
            .with("Arch:amd64");
        assert_eq!(
            config
                .get_string("ClientBuilder.template_path", &rpm)
                .unwrap()
                .unwrap(),
            "centos.zip"
        );

        // The nested block needs both tags.
        let rpm_only = ContextStack::new().with("Target:LinuxRpm");
        assert_eq!(
            config
                .get_string("ClientBuilder.template_path", &rpm_only)
                .unwrap()
                .unwrap(),
            "default.zip"
        );
    }

    #[test]
    fn test_parse_multi_tag_context() {
        let config = parse_config(SAMPLE).unwrap().freeze();
        let win64 = ContextStack::new().with("Platform:Windows").with("Arch:amd64");
        let win32 = ContextStack::new().with("Platform:Windows").with("Arch:i386");
        assert_eq!(config.get_string("Client.name", &win64).unwrap().unwrap(), "agent");
        assert_eq!(config.get_string("Client.name", &win32).unwrap().unwrap(), "agent32");
    }

    #[test]
    fn test_empty_node_is_empty_list() {
        let config = parse_config("Client.plugins").unwrap().freeze();
        assert_eq!(
            config.resolve("Client.plugins", &ContextStack::new()).unwrap(),
            Some(ConfigValue::List(vec![]))
        );
    }

    #[test]
    fn test_context_without_tag() {
        let result = parse_config("context { Client.name \"x\" }");
        assert!(matches!(result.unwrap_err(), ConfigError::MissingField(_)));
    }

    #[test]
    fn test_children_on_key_rejected() {
        let result = parse_config("Client.name \"x\" { nested 1 }");
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_syntax_error() {
        let result = parse_config("Client.name \"unterminated");
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(dir.path().join("missing.kdl"));
        assert!(matches!(result.unwrap_err(), ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agentbuild.kdl");
        std::fs::write(&path, SAMPLE).unwrap();
        let table = load_config(&path).unwrap();
        let config = table.freeze();
        assert!(config
            .select("ClientBuilder.template_path", &ContextStack::new())
            .is_some());
    }
}
