//! Variant to implementation binding.
//!
//! Both the builder and the deployer dispatch tables go through [`bind`], so
//! they always agree on which flavor a variant selects and on the context
//! tags it contributes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::ContextStack;
use crate::variant::{PackageFormat, Platform, Variant};

/// Context tag appended for RPM based Linux targets.
pub const LINUX_RPM_TARGET: &str = "Target:LinuxRpm";

/// The closed set of builder/deployer implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    Darwin,
    Windows,
    /// Debian style Linux packages.
    Linux,
    /// RPM style Linux packages.
    Centos,
}

impl Flavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Centos => "centos",
        }
    }

    /// Platform whose toolchain is needed to build this flavor.
    pub fn platform(&self) -> Platform {
        match self {
            Self::Darwin => Platform::Darwin,
            Self::Windows => Platform::Windows,
            Self::Linux | Self::Centos => Platform::Linux,
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of binding a variant: the flavor and the full context stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub variant: Variant,
    pub flavor: Flavor,
    pub context: ContextStack,
}

/// Map a variant to its flavor, appending the variant's tags to `base`.
///
/// Tags are appended platform first, then the RPM target (Linux/rpm only),
/// then the architecture.
pub fn bind(variant: Variant, base: ContextStack) -> Binding {
    let mut context = base;
    context.push(variant.platform.context_tag());

    let flavor = match variant.platform {
        Platform::Darwin => Flavor::Darwin,
        Platform::Windows => Flavor::Windows,
        Platform::Linux => match variant.package_format {
            PackageFormat::Deb => Flavor::Linux,
            PackageFormat::Rpm => {
                context.push(LINUX_RPM_TARGET);
                Flavor::Centos
            }
        },
    };

    context.push(variant.arch.context_tag());

    Binding {
        variant,
        flavor,
        context,
    }
}
