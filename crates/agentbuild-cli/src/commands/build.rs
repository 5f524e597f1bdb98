//! `agentbuild build`

use agentbuild_builder::ClientBuilder;
use agentbuild_core::Platform;
use agentbuild_core::artifact::ArtifactRef;
use anyhow::{Context, Result};

use super::{GlobalArgs, check_typed_keys, report};

pub fn build(args: &GlobalArgs) -> Result<ArtifactRef> {
    build_on(args, Platform::host())
}

/// Build as if running on `host`.
pub fn build_on(args: &GlobalArgs, host: Option<Platform>) -> Result<ArtifactRef> {
    let variant = args.variant()?;
    let builder = ClientBuilder::select(variant, args.base_context(), host)?;
    let config = args.snapshot(&[])?;
    check_typed_keys(&config, builder.context())?;

    let artifact = builder
        .make_executable_template(&config)
        .with_context(|| format!("Failed to build {} template", builder.flavor()))?;
    report(&artifact);
    Ok(artifact)
}
