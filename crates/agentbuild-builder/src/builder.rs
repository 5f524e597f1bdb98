//! Builder dispatch and template builds.

use std::path::PathBuf;

use agentbuild_config::keys;
use agentbuild_core::artifact::{ArtifactKind, ArtifactRef, TemplateManifest, atomic_write};
use agentbuild_core::semantic::RegularExpression;
use agentbuild_core::{
    Binding, ConfigResolver, ContextStack, Error, Flavor, Platform, Result, Variant, bind,
};
use chrono::Utc;
use tracing::{info, warn};

use crate::command::run_build_command;
use crate::template::{collect_payload, write_template};

/// Builds client templates for one flavor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientBuilder {
    binding: Binding,
}

/// Everything a build reads from configuration, resolved up front.
#[derive(Debug)]
struct BuildPlan {
    client_name: String,
    source_dir: PathBuf,
    build_dir: PathBuf,
    build_command: Vec<String>,
    exclude: Option<RegularExpression>,
    template_path: PathBuf,
}

impl ClientBuilder {
    /// Select the builder for `variant`, appending its tags to `base`.
    ///
    /// Building needs the target platform's toolchain, so selecting a
    /// flavor that `host` cannot build fails with
    /// [`Error::CrossBuildUnsupported`].
    pub fn select(variant: Variant, base: ContextStack, host: Option<Platform>) -> Result<Self> {
        let binding = bind(variant, base);
        let target = binding.flavor.platform();
        if host != Some(target) {
            return Err(Error::CrossBuildUnsupported {
                target: target.to_string(),
                host: host
                    .map(|h| h.to_string())
                    .unwrap_or_else(|| std::env::consts::OS.to_string()),
            });
        }
        Ok(Self { binding })
    }

    pub fn flavor(&self) -> Flavor {
        self.binding.flavor
    }

    pub fn context(&self) -> &ContextStack {
        &self.binding.context
    }

    pub fn variant(&self) -> &Variant {
        &self.binding.variant
    }

    /// Name of the client executable inside the payload.
    pub fn executable_name(&self, client_name: &str) -> String {
        match self.binding.flavor {
            Flavor::Windows => format!("{client_name}.exe"),
            Flavor::Darwin | Flavor::Linux | Flavor::Centos => client_name.to_string(),
        }
    }

    /// Compile (via the configured build command) and package a template.
    pub fn make_executable_template(&self, config: &dyn ConfigResolver) -> Result<ArtifactRef> {
        let plan = self.plan(config)?;
        info!(
            flavor = %self.flavor(),
            context = %self.context(),
            source = %plan.source_dir.display(),
            "Building client template"
        );

        if !plan.build_command.is_empty() {
            run_build_command(&plan.build_command, &plan.source_dir, &self.build_env())?;
        }

        let files = collect_payload(
            &plan.build_dir,
            plan.exclude.as_ref(),
            Some(&plan.template_path),
        )?;
        let executable = self.executable_name(&plan.client_name);
        if !files.iter().any(|f| f.path == executable) {
            warn!(executable = %executable, "Client executable not found in build output");
        }

        let manifest = TemplateManifest {
            flavor: self.flavor(),
            variant: *self.variant(),
            client_name: plan.client_name,
            context: self.context().to_strings(),
            built_at: Utc::now(),
        };
        let bytes = write_template(&manifest, &files)?;
        let artifact = atomic_write(&plan.template_path, &bytes, ArtifactKind::Template)?;

        info!(
            path = %artifact.path.display(),
            files = files.len(),
            size = artifact.size,
            "Template written"
        );
        Ok(artifact)
    }

    fn plan(&self, config: &dyn ConfigResolver) -> Result<BuildPlan> {
        let ctx = self.context();
        let source_dir = config.require_path(keys::BUILDER_SOURCE_DIR, ctx)?;
        let build_dir = config
            .get_path(keys::BUILDER_BUILD_DIR, ctx)?
            .unwrap_or_else(|| source_dir.clone());
        let exclude = config
            .get_string(keys::BUILDER_EXCLUDE_PATTERN, ctx)?
            .map(RegularExpression::parse)
            .transpose()?;

        Ok(BuildPlan {
            client_name: config
                .get_string(keys::CLIENT_NAME, ctx)?
                .unwrap_or_else(|| keys::DEFAULT_CLIENT_NAME.to_string()),
            build_command: config.get_list(keys::BUILDER_BUILD_COMMAND, ctx)?,
            template_path: config.require_path(keys::BUILDER_TEMPLATE_PATH, ctx)?,
            source_dir,
            build_dir,
            exclude,
        })
    }

    fn build_env(&self) -> Vec<(&'static str, String)> {
        let variant = self.variant();
        vec![
            ("AGENTBUILD_PLATFORM", variant.platform.to_string()),
            ("AGENTBUILD_ARCH", variant.arch.to_string()),
            ("AGENTBUILD_PACKAGE_FORMAT", variant.package_format.to_string()),
            ("AGENTBUILD_FLAVOR", self.flavor().to_string()),
        ]
    }
}
