//! CLI command implementations.

pub mod build;
pub mod config;
pub mod deploy;

use std::path::{Path, PathBuf};

use agentbuild_config::{ConfigSnapshot, ConfigTable, keys, load_config, validate_config};
use agentbuild_core::artifact::ArtifactRef;
use agentbuild_core::{ContextStack, Variant};
use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info};

/// Read when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG_FILE: &str = "agentbuild.kdl";

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Target platform: darwin, windows or linux [default: host]
    #[arg(long, global = true)]
    pub platform: Option<String>,

    /// Target architecture: amd64 or i386 [default: host]
    #[arg(long, global = true)]
    pub arch: Option<String>,

    /// Linux package format: deb or rpm [default: deb]
    #[arg(long = "package_format", global = true)]
    pub package_format: Option<String>,

    /// Extra context tag, applied before the target's own tags
    #[arg(long = "context", value_name = "TAG", global = true)]
    pub contexts: Vec<String>,

    /// Configuration file; repeat to layer site files over a base file
    #[arg(long, env = "AGENTBUILD_CONFIG", global = true)]
    pub config: Vec<PathBuf>,
}

impl GlobalArgs {
    pub fn variant(&self) -> Result<Variant> {
        let variant = Variant::from_flags(
            self.platform.as_deref(),
            self.arch.as_deref(),
            self.package_format.as_deref(),
        )?;
        Ok(variant)
    }

    /// User supplied tags, least specific first.
    pub fn base_context(&self) -> ContextStack {
        self.contexts.iter().map(String::as_str).collect()
    }

    /// Load every `--config` file in order. Values from later files win
    /// ties against earlier ones.
    pub fn load_table(&self) -> Result<ConfigTable> {
        let paths = if !self.config.is_empty() {
            self.config.clone()
        } else if Path::new(DEFAULT_CONFIG_FILE).is_file() {
            vec![PathBuf::from(DEFAULT_CONFIG_FILE)]
        } else {
            debug!("No configuration file, using an empty configuration");
            Vec::new()
        };

        let mut table = ConfigTable::new();
        for path in &paths {
            let layer = load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            table.merge(layer);
        }
        Ok(table)
    }

    /// Load and freeze the configuration, applying `plugins` (when given)
    /// as the runtime value of `Client.plugins` first.
    pub fn snapshot(&self, plugins: &[PathBuf]) -> Result<ConfigSnapshot> {
        let mut table = self.load_table()?;
        if !plugins.is_empty() {
            let list: Vec<String> = plugins
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            debug!(plugins = ?list, "Overriding plugin list");
            table.set(keys::CLIENT_PLUGINS, list);
        }
        Ok(table.freeze())
    }
}

/// Parse typed keys for `context`, failing on the first bad value.
pub(crate) fn check_typed_keys(config: &ConfigSnapshot, context: &ContextStack) -> Result<()> {
    let checked = validate_config(config, context).context("Invalid configuration")?;
    debug!(keys = ?checked, "Typed configuration keys validated");
    Ok(())
}

pub(crate) fn report(artifact: &ArtifactRef) {
    info!(
        kind = ?artifact.kind,
        path = %artifact.path.display(),
        sha256 = %artifact.checksum,
        "Done"
    );
    println!(
        "{} ({} bytes, sha256 {})",
        artifact.path.display(),
        artifact.size,
        artifact.checksum
    );
}
