//! `agentbuild repack` and `agentbuild deploy`

use std::path::{Path, PathBuf};

use agentbuild_config::keys;
use agentbuild_core::ConfigResolver;
use agentbuild_core::artifact::{ArtifactRef, read_artifact};
use agentbuild_deployer::ClientDeployer;
use anyhow::{Context, Result};
use tracing::info;

use super::{GlobalArgs, check_typed_keys, report};

/// Lay out an existing template as an unconfigured installer.
pub fn repack(args: &GlobalArgs, package: Option<&Path>, output: Option<&Path>) -> Result<ArtifactRef> {
    let deployer = ClientDeployer::select(args.variant()?, args.base_context());
    let config = args.snapshot(&[])?;

    let package = match package {
        Some(path) => path.to_path_buf(),
        None => config.require_path(keys::BUILDER_TEMPLATE_PATH, deployer.context())?,
    };
    let output = deployer.output_path(output, &config)?;
    info!(package = %package.display(), flavor = %deployer.flavor(), "Repacking");

    let template = read_artifact(&package)?;
    let artifact = deployer
        .repack_installer(&template, &output)
        .with_context(|| format!("Failed to repack {}", package.display()))?;
    report(&artifact);
    Ok(artifact)
}

/// Assemble a configured installer, embedding the resolved configuration
/// and plugins.
pub fn deploy(
    args: &GlobalArgs,
    template: Option<&Path>,
    output: Option<&Path>,
    plugins: &[PathBuf],
) -> Result<ArtifactRef> {
    let deployer = ClientDeployer::select(args.variant()?, args.base_context());
    let config = args.snapshot(plugins)?;
    check_typed_keys(&config, deployer.context())?;

    let template = deployer.template_path(template, &config)?;
    let output = deployer.output_path(output, &config)?;

    let artifact = deployer
        .make_deployable_binary(&template, &output, &config)
        .with_context(|| format!("Failed to deploy {}", template.display()))?;
    report(&artifact);
    Ok(artifact)
}
