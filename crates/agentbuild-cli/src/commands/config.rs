//! `agentbuild validate` and `agentbuild show-config`

use agentbuild_core::{ConfigResolver, bind};
use anyhow::Result;
use serde_json::{Value, json};

use super::{GlobalArgs, check_typed_keys};

/// Check the configuration file and every typed key for the target's context.
pub fn validate(args: &GlobalArgs) -> Result<()> {
    let binding = bind(args.variant()?, args.base_context());
    let config = args.snapshot(&[])?;
    check_typed_keys(&config, &binding.context)?;
    // Every key must also resolve, which catches broken references.
    config.resolve_all(&binding.context)?;
    println!("Configuration is valid for {} ({})", binding.flavor, binding.context);
    Ok(())
}

/// Resolved configuration for the target's context.
pub fn show_config(args: &GlobalArgs) -> Result<Value> {
    let binding = bind(args.variant()?, args.base_context());
    let config = args.snapshot(&[])?;
    let resolved = config.resolve_all(&binding.context)?;
    Ok(json!({
        "flavor": binding.flavor,
        "context": binding.context.to_strings(),
        "config": resolved,
    }))
}
