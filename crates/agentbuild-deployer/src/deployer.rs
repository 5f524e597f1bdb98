//! Deployer dispatch: repacking and deploying installers.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use agentbuild_config::keys;
use agentbuild_core::artifact::{ArtifactKind, ArtifactRef, atomic_write, read_artifact};
use agentbuild_core::{
    Binding, ConfigResolver, ContextStack, Error, Flavor, Result, Variant, bind,
};
use chrono::Utc;
use tracing::{debug, info};

use crate::installer::{INSTALLER_MANIFEST, InstallerManifest, InstallerWriter, Template};
use crate::layout::Layout;

/// Turns templates into installers for one flavor.
///
/// Unlike building, repacking needs no platform toolchain, so every flavor
/// can be deployed from any host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDeployer {
    binding: Binding,
}

/// Extra content a deploy adds on top of a plain repack.
struct Deployment {
    config: serde_json::Value,
    plugins: Vec<(String, Vec<u8>)>,
}

impl ClientDeployer {
    pub fn select(variant: Variant, base: ContextStack) -> Self {
        Self {
            binding: bind(variant, base),
        }
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

    /// Template to deploy: `explicit` if given, else
    /// `ClientBuilder.template_path` resolved in this deployer's context.
    pub fn template_path(
        &self,
        explicit: Option<&Path>,
        config: &dyn ConfigResolver,
    ) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => config.require_path(keys::BUILDER_TEMPLATE_PATH, self.context()),
        }
    }

    /// Installer destination: `explicit` if given, else
    /// `ClientBuilder.output_path` resolved in this deployer's context.
    pub fn output_path(
        &self,
        explicit: Option<&Path>,
        config: &dyn ConfigResolver,
    ) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => config.require_path(keys::BUILDER_OUTPUT_PATH, self.context()),
        }
    }

    /// Re-lay-out a template as an unconfigured installer.
    pub fn repack_installer(&self, template: &[u8], output: &Path) -> Result<ArtifactRef> {
        let template = self.open(template)?;
        info!(
            flavor = %self.flavor(),
            output = %output.display(),
            "Repacking installer"
        );
        let bytes = self.assemble(&template, None)?;
        let artifact = atomic_write(output, &bytes, ArtifactKind::Installer)?;
        info!(path = %artifact.path.display(), size = artifact.size, "Installer written");
        Ok(artifact)
    }

    /// Assemble a configured installer from the template at `template_path`.
    ///
    /// The configuration is resolved for this deployer's context and
    /// embedded, along with every file listed in `Client.plugins`.
    pub fn make_deployable_binary(
        &self,
        template_path: &Path,
        output: &Path,
        config: &dyn ConfigResolver,
    ) -> Result<ArtifactRef> {
        let deployment = self.deployment(config)?;
        let template = self.open(&read_artifact(template_path)?)?;
        info!(
            flavor = %self.flavor(),
            template = %template_path.display(),
            plugins = deployment.plugins.len(),
            output = %output.display(),
            "Deploying installer"
        );
        let bytes = self.assemble(&template, Some(&deployment))?;
        let artifact = atomic_write(output, &bytes, ArtifactKind::Installer)?;
        info!(path = %artifact.path.display(), size = artifact.size, "Installer written");
        Ok(artifact)
    }

    fn open(&self, bytes: &[u8]) -> Result<Template> {
        let template = Template::parse(bytes)?;
        template
            .manifest
            .check_compatible(self.flavor(), self.variant())?;
        Ok(template)
    }

    fn deployment(&self, config: &dyn ConfigResolver) -> Result<Deployment> {
        let ctx = self.context();

        // Build-host settings stay behind.
        let mut resolved = BTreeMap::new();
        for key in config.keys() {
            if key.starts_with(keys::BUILDER_SECTION) {
                continue;
            }
            if let Some(value) = config.resolve(&key, ctx)? {
                resolved.insert(key, value);
            }
        }
        let config_json = serde_json::to_value(&resolved)
            .map_err(|e| Error::BuildFailed(format!("embedded configuration: {e}")))?;

        let invalid = |message: String| Error::InvalidConfig {
            key: keys::CLIENT_PLUGINS.to_string(),
            message,
        };
        let mut names = HashSet::new();
        let mut sources = Vec::new();
        for plugin in config.get_list(keys::CLIENT_PLUGINS, ctx)? {
            let path = PathBuf::from(&plugin);
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| invalid(format!("plugin path {plugin} has no file name")))?;
            if !names.insert(name.clone()) {
                return Err(invalid(format!("more than one plugin is named {name}")));
            }
            sources.push((name, path));
        }

        let mut plugins = Vec::with_capacity(sources.len());
        for (name, path) in sources {
            debug!(plugin = %path.display(), "Embedding plugin");
            plugins.push((name, read_artifact(&path)?));
        }

        Ok(Deployment {
            config: config_json,
            plugins,
        })
    }

    fn assemble(&self, template: &Template, deployment: Option<&Deployment>) -> Result<Vec<u8>> {
        let layout = Layout::for_flavor(self.flavor(), &template.manifest.client_name);
        let mut writer = InstallerWriter::new();

        // Generated entries replace payload files at the same path.
        let mut generated = HashSet::new();
        if let Some(deployment) = deployment {
            generated.insert(layout.config_path().to_string());
            for (name, _) in &deployment.plugins {
                generated.insert(layout.plugin_entry(name));
            }
        }

        for file in &template.files {
            let entry = layout.payload_entry(&file.path);
            if generated.contains(&entry) {
                debug!(entry = %entry, "Replacing template file");
                continue;
            }
            writer.add(&entry, &file.data, file.mode)?;
        }

        let mut plugin_names = Vec::new();
        if let Some(deployment) = deployment {
            for (name, data) in &deployment.plugins {
                writer.add(&layout.plugin_entry(name), data, None)?;
                plugin_names.push(name.clone());
            }
            writer.add_json(layout.config_path(), &deployment.config)?;
        }

        let manifest = InstallerManifest {
            flavor: self.flavor(),
            variant: *self.variant(),
            client_name: template.manifest.client_name.clone(),
            template_checksum: template.checksum.clone(),
            context: self.context().to_strings(),
            config_path: deployment.map(|_| layout.config_path().to_string()),
            plugins: plugin_names,
            assembled_at: Utc::now(),
        };
        writer.add_json(INSTALLER_MANIFEST, &manifest)?;
        writer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::SIGNING_MANIFEST;
    use agentbuild_config::ConfigTable;
    use agentbuild_core::artifact::{TEMPLATE_MANIFEST, TemplateManifest};
    use agentbuild_core::{Arch, PackageFormat, Platform};
    use std::collections::BTreeMap;
    use std::fs;
    use std::io::{Cursor, Read, Write};
    use zip::ZipArchive;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn variant(platform: Platform, format: PackageFormat) -> Variant {
        Variant::new(platform, Arch::Amd64, format)
    }

    fn template_for(flavor: Flavor, variant: Variant) -> Vec<u8> {
        template_with(flavor, variant, &[("agent", b"binary".as_slice())])
    }

    fn template_with(flavor: Flavor, variant: Variant, payload: &[(&str, &[u8])]) -> Vec<u8> {
        let manifest = TemplateManifest {
            flavor,
            variant,
            client_name: "agent".to_string(),
            context: Vec::new(),
            built_at: Utc::now(),
        };
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(TEMPLATE_MANIFEST, SimpleFileOptions::default())
            .unwrap();
        zip.write_all(&serde_json::to_vec(&manifest).unwrap()).unwrap();
        for (name, data) in payload {
            zip.start_file(format!("payload/{name}"), SimpleFileOptions::default())
                .unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut out = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_select_is_host_independent() {
        for platform in Platform::ALL {
            let deployer = ClientDeployer::select(
                variant(platform, PackageFormat::Deb),
                ContextStack::new().with("Site:Lab"),
            );
            assert_eq!(deployer.flavor().platform(), platform);
            assert_eq!(deployer.context().tags()[0], "Site:Lab");
        }
    }

    #[test]
    fn test_repack_centos() {
        let dir = tempfile::tempdir().unwrap();
        let rpm = variant(Platform::Linux, PackageFormat::Rpm);
        let deployer = ClientDeployer::select(rpm, ContextStack::new());
        let output = dir.path().join("agent.rpm.zip");

        let artifact = deployer
            .repack_installer(&template_for(Flavor::Centos, rpm), &output)
            .unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Installer);

        let mut archive = ZipArchive::new(Cursor::new(fs::read(&output).unwrap())).unwrap();
        assert!(archive.by_name("usr/lib64/agent/agent").is_ok());
        let manifest: InstallerManifest =
            serde_json::from_str(&entry(&mut archive, INSTALLER_MANIFEST)).unwrap();
        assert_eq!(manifest.flavor, Flavor::Centos);
        assert_eq!(manifest.config_path, None);
        assert_eq!(
            manifest.context,
            vec!["Platform:Linux", "Target:LinuxRpm", "Arch:amd64"]
        );

        let digests: BTreeMap<String, String> =
            serde_json::from_str(&entry(&mut archive, SIGNING_MANIFEST)).unwrap();
        assert!(digests.contains_key("usr/lib64/agent/agent"));
        assert!(digests.contains_key(INSTALLER_MANIFEST));
    }

    #[test]
    fn test_repack_rejects_other_flavor() {
        let dir = tempfile::tempdir().unwrap();
        let deb = variant(Platform::Linux, PackageFormat::Deb);
        let deployer = ClientDeployer::select(deb, ContextStack::new());
        let output = dir.path().join("out.zip");

        let template = template_for(Flavor::Windows, variant(Platform::Windows, PackageFormat::Deb));
        let err = deployer.repack_installer(&template, &output).unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_repack_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let deployer =
            ClientDeployer::select(variant(Platform::Darwin, PackageFormat::Deb), ContextStack::new());
        let output = dir.path().join("out.zip");
        let err = deployer.repack_installer(b"not a zip", &output).unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_deploy_embeds_config_and_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let windows = variant(Platform::Windows, PackageFormat::Deb);
        let template_path = dir.path().join("windows.zip");
        fs::write(&template_path, template_for(Flavor::Windows, windows)).unwrap();
        let plugin = dir.path().join("inventory.py");
        fs::write(&plugin, b"print('hi')").unwrap();

        let mut table = ConfigTable::new();
        table.set_default("Client.name", "agent");
        table.set_default("Client.server", "https://default.example");
        table.add_override(["Platform:Windows"], "Client.server", "https://win.example");
        table.set(
            keys::CLIENT_PLUGINS,
            vec![plugin.to_string_lossy().into_owned()],
        );
        let config = table.freeze();

        let deployer = ClientDeployer::select(windows, ContextStack::new());
        let output = dir.path().join("installer.zip");
        deployer
            .make_deployable_binary(&template_path, &output, &config)
            .unwrap();

        let mut archive = ZipArchive::new(Cursor::new(fs::read(&output).unwrap())).unwrap();
        assert_eq!(entry(&mut archive, "agent/plugins/inventory.py"), "print('hi')");
        let embedded: serde_json::Value =
            serde_json::from_str(&entry(&mut archive, "agent/config.json")).unwrap();
        assert_eq!(embedded["Client.server"], "https://win.example");

        let manifest: InstallerManifest =
            serde_json::from_str(&entry(&mut archive, INSTALLER_MANIFEST)).unwrap();
        assert_eq!(manifest.plugins, vec!["inventory.py"]);
        assert_eq!(manifest.config_path.as_deref(), Some("agent/config.json"));
    }

    #[test]
    fn test_deploy_replaces_template_config_and_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let windows = variant(Platform::Windows, PackageFormat::Deb);
        let template_path = dir.path().join("windows.zip");
        fs::write(
            &template_path,
            template_with(
                Flavor::Windows,
                windows,
                &[
                    ("agent.exe", b"MZ".as_slice()),
                    ("config.json", br#"{"stale": true}"#.as_slice()),
                    ("plugins/inventory.py", b"old".as_slice()),
                ],
            ),
        )
        .unwrap();
        let plugin = dir.path().join("inventory.py");
        fs::write(&plugin, b"new").unwrap();

        let mut table = ConfigTable::new();
        table.set(
            keys::CLIENT_PLUGINS,
            vec![plugin.to_string_lossy().into_owned()],
        );
        let output = dir.path().join("installer.zip");
        ClientDeployer::select(windows, ContextStack::new())
            .make_deployable_binary(&template_path, &output, &table.freeze())
            .unwrap();

        let mut archive = ZipArchive::new(Cursor::new(fs::read(&output).unwrap())).unwrap();
        assert_eq!(entry(&mut archive, "agent/agent.exe"), "MZ");
        assert_eq!(entry(&mut archive, "agent/plugins/inventory.py"), "new");
        let embedded: serde_json::Value =
            serde_json::from_str(&entry(&mut archive, "agent/config.json")).unwrap();
        assert!(embedded.get("stale").is_none());
    }

    #[test]
    fn test_deploy_duplicate_plugin_names() {
        let dir = tempfile::tempdir().unwrap();
        let darwin = variant(Platform::Darwin, PackageFormat::Deb);
        let template_path = dir.path().join("darwin.zip");
        fs::write(&template_path, template_for(Flavor::Darwin, darwin)).unwrap();
        for sub in ["a", "b"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
            fs::write(dir.path().join(sub).join("x.py"), b"x").unwrap();
        }

        let mut table = ConfigTable::new();
        table.set(
            keys::CLIENT_PLUGINS,
            vec![
                dir.path().join("a/x.py").to_string_lossy().into_owned(),
                dir.path().join("b/x.py").to_string_lossy().into_owned(),
            ],
        );
        let output = dir.path().join("out.zip");
        let err = ClientDeployer::select(darwin, ContextStack::new())
            .make_deployable_binary(&template_path, &output, &table.freeze())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { ref key, .. } if key == keys::CLIENT_PLUGINS));
        assert!(!output.exists());
    }

    #[test]
    fn test_deploy_leaves_builder_settings_behind() {
        let dir = tempfile::tempdir().unwrap();
        let deb = variant(Platform::Linux, PackageFormat::Deb);
        let template_path = dir.path().join("deb.zip");
        fs::write(&template_path, template_for(Flavor::Linux, deb)).unwrap();

        let mut table = ConfigTable::new();
        table.set_default("Client.server", "https://example.net");
        table.set_default(keys::BUILDER_SOURCE_DIR, "/home/builder/src");
        // Unresolvable, but never embedded.
        table.set_default(keys::BUILDER_BUILD_DIR, "${env.AGENTBUILD_UNSET_FOR_TEST}");
        let output = dir.path().join("out.zip");
        ClientDeployer::select(deb, ContextStack::new())
            .make_deployable_binary(&template_path, &output, &table.freeze())
            .unwrap();

        let mut archive = ZipArchive::new(Cursor::new(fs::read(&output).unwrap())).unwrap();
        let embedded: serde_json::Value =
            serde_json::from_str(&entry(&mut archive, "etc/agent/config.json")).unwrap();
        assert_eq!(embedded["Client.server"], "https://example.net");
        assert!(embedded.get(keys::BUILDER_SOURCE_DIR).is_none());
        assert!(embedded.get(keys::BUILDER_BUILD_DIR).is_none());
    }

    #[test]
    fn test_deploy_missing_plugin() {
        let dir = tempfile::tempdir().unwrap();
        let darwin = variant(Platform::Darwin, PackageFormat::Deb);
        let template_path = dir.path().join("darwin.zip");
        fs::write(&template_path, template_for(Flavor::Darwin, darwin)).unwrap();

        let mut table = ConfigTable::new();
        table.set(
            keys::CLIENT_PLUGINS,
            vec![dir.path().join("gone.py").to_string_lossy().into_owned()],
        );
        let output = dir.path().join("out.zip");
        let err = ClientDeployer::select(darwin, ContextStack::new())
            .make_deployable_binary(&template_path, &output, &table.freeze())
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_template_path_fallback() {
        let mut table = ConfigTable::new();
        table.add_override(
            ["Target:LinuxRpm"],
            keys::BUILDER_TEMPLATE_PATH,
            "centos.zip",
        );
        let config = table.freeze();

        let rpm = ClientDeployer::select(variant(Platform::Linux, PackageFormat::Rpm), ContextStack::new());
        assert_eq!(
            rpm.template_path(None, &config).unwrap(),
            PathBuf::from("centos.zip")
        );
        assert_eq!(
            rpm.template_path(Some(Path::new("given.zip")), &config).unwrap(),
            PathBuf::from("given.zip")
        );

        let deb = ClientDeployer::select(variant(Platform::Linux, PackageFormat::Deb), ContextStack::new());
        let err = deb.template_path(None, &config).unwrap_err();
        assert!(matches!(err, Error::ConfigMissing(ref k) if k == keys::BUILDER_TEMPLATE_PATH));
        assert!(matches!(
            deb.output_path(None, &config).unwrap_err(),
            Error::ConfigMissing(_)
        ));
    }
}
