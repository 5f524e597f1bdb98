//! Where each flavor puts things inside an installer.

use agentbuild_core::Flavor;

/// Installer layout for one client on one flavor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: String,
    config_path: String,
}

impl Layout {
    pub fn for_flavor(flavor: Flavor, client_name: &str) -> Self {
        let (root, config_dir) = match flavor {
            Flavor::Linux => (
                format!("usr/lib/{client_name}/"),
                format!("etc/{client_name}/"),
            ),
            Flavor::Centos => (
                format!("usr/lib64/{client_name}/"),
                format!("etc/{client_name}/"),
            ),
            Flavor::Darwin => {
                let root = format!("Library/{client_name}/");
                (root.clone(), root)
            }
            Flavor::Windows => {
                let root = format!("{client_name}/");
                (root.clone(), root)
            }
        };
        Self {
            root,
            config_path: format!("{config_dir}config.json"),
        }
    }

    /// Directory the payload is installed into, with a trailing `/`.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Installer entry for a payload file.
    pub fn payload_entry(&self, relative: &str) -> String {
        format!("{}{relative}", self.root)
    }

    /// Installer entry for a plugin file.
    pub fn plugin_entry(&self, file_name: &str) -> String {
        format!("{}plugins/{file_name}", self.root)
    }

    /// Installer entry holding the embedded configuration.
    pub fn config_path(&self) -> &str {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linux_layouts() {
        let deb = Layout::for_flavor(Flavor::Linux, "agent");
        assert_eq!(deb.payload_entry("bin/agent"), "usr/lib/agent/bin/agent");
        assert_eq!(deb.config_path(), "etc/agent/config.json");

        let rpm = Layout::for_flavor(Flavor::Centos, "agent");
        assert_eq!(rpm.root(), "usr/lib64/agent/");
        assert_eq!(rpm.plugin_entry("x.py"), "usr/lib64/agent/plugins/x.py");
    }

    #[test]
    fn test_config_beside_payload() {
        let windows = Layout::for_flavor(Flavor::Windows, "agent");
        assert_eq!(windows.config_path(), "agent/config.json");
        let darwin = Layout::for_flavor(Flavor::Darwin, "agent");
        assert_eq!(darwin.config_path(), "Library/agent/config.json");
    }
}
