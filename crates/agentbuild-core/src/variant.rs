//! Target platform, architecture and package format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Operating system a client is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Darwin,
    Windows,
    Linux,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Darwin, Platform::Windows, Platform::Linux];

    /// The platform this process is running on, if it is one we support.
    pub fn host() -> Option<Self> {
        match std::env::consts::OS {
            "macos" => Some(Self::Darwin),
            "windows" => Some(Self::Windows),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }

    /// Lower-case flag spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::Windows => "windows",
            Self::Linux => "linux",
        }
    }

    /// Context tag this platform contributes.
    pub fn context_tag(&self) -> &'static str {
        match self {
            Self::Darwin => "Platform:Darwin",
            Self::Windows => "Platform:Windows",
            Self::Linux => "Platform:Linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "darwin" => Ok(Self::Darwin),
            "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            other => Err(Error::UnsupportedPlatform(other.to_string())),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Amd64,
    I386,
}

impl Arch {
    /// Derived from the native pointer width of this build.
    pub fn host() -> Self {
        if cfg!(target_pointer_width = "32") {
            Self::I386
        } else {
            Self::Amd64
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::I386 => "i386",
        }
    }

    pub fn context_tag(&self) -> &'static str {
        match self {
            Self::Amd64 => "Arch:amd64",
            Self::I386 => "Arch:i386",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "amd64" => Ok(Self::Amd64),
            "i386" => Ok(Self::I386),
            other => Err(Error::UnsupportedPlatform(format!(
                "unknown architecture '{other}'"
            ))),
        }
    }
}

/// Linux packaging format. Ignored for other platforms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageFormat {
    #[default]
    Deb,
    Rpm,
}

impl PackageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deb => "deb",
            Self::Rpm => "rpm",
        }
    }
}

impl fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deb" => Ok(Self::Deb),
            "rpm" => Ok(Self::Rpm),
            other => Err(Error::UnsupportedPlatform(format!(
                "unknown package format '{other}'"
            ))),
        }
    }
}

/// A concrete (platform, architecture, package format) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    pub platform: Platform,
    pub arch: Arch,
    pub package_format: PackageFormat,
}

impl Variant {
    pub fn new(platform: Platform, arch: Arch, package_format: PackageFormat) -> Self {
        Self {
            platform,
            arch,
            package_format,
        }
    }

    /// Build a variant from raw flag values, falling back to the host
    /// platform and word size where a flag is absent.
    pub fn from_flags(
        platform: Option<&str>,
        arch: Option<&str>,
        package_format: Option<&str>,
    ) -> Result<Self> {
        let platform = match platform {
            Some(p) => p.parse()?,
            None => Platform::host()
                .ok_or_else(|| Error::UnsupportedPlatform(std::env::consts::OS.to_string()))?,
        };
        let arch = match arch {
            Some(a) => a.parse()?,
            None => Arch::host(),
        };
        let package_format = match package_format {
            Some(f) => f.parse()?,
            None => PackageFormat::default(),
        };
        Ok(Self::new(platform, arch, package_format))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.platform {
            Platform::Linux => write!(f, "{}/{}/{}", self.platform, self.arch, self.package_format),
            _ => write!(f, "{}/{}", self.platform, self.arch),
        }
    }
}
