//! Artifact files: templates and installers.
//!
//! Every artifact is written through [`atomic_write`], so an output path
//! either holds a complete artifact or is left untouched.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::binding::Flavor;
use crate::variant::Variant;
use crate::{Error, Result};

/// What an artifact file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Unconfigured, platform specific output of `build`.
    Template,
    /// Fully assembled output of `repack` or `deploy`.
    Installer,
}

/// Reference to an artifact written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub kind: ArtifactKind,
    /// Where the artifact was written.
    pub path: PathBuf,
    /// Hex encoded SHA-256 of the contents.
    pub checksum: String,
    /// Size in bytes.
    pub size: u64,
    /// When the artifact was written.
    pub created_at: DateTime<Utc>,
}

/// Name of the manifest entry at the root of every template archive.
pub const TEMPLATE_MANIFEST: &str = "template.json";

/// Directory inside a template archive holding the client files.
pub const TEMPLATE_PAYLOAD_DIR: &str = "payload/";

/// Describes what a template was built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateManifest {
    pub flavor: Flavor,
    pub variant: Variant,
    pub client_name: String,
    /// Context stack the template was built under.
    pub context: Vec<String>,
    pub built_at: DateTime<Utc>,
}

impl TemplateManifest {
    /// Reject templates built for a different flavor or architecture.
    pub fn check_compatible(&self, flavor: Flavor, variant: &Variant) -> Result<()> {
        if self.flavor != flavor || self.variant.arch != variant.arch {
            return Err(Error::InvalidTemplate(format!(
                "template was built for {} ({}), not {} ({})",
                self.flavor, self.variant, flavor, variant
            )));
        }
        Ok(())
    }
}

/// Hex encoded SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Read an artifact fully into memory.
pub fn read_artifact(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| Error::io(path, e))
}

/// Write `content` to `path` via a temporary sibling file and a rename.
pub fn atomic_write(path: impl AsRef<Path>, content: &[u8], kind: ArtifactKind) -> Result<ArtifactRef> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.is_dir() {
        fs::create_dir_all(&parent).map_err(|e| Error::io(&parent, e))?;
    }

    let tmp_path = parent.join(format!(".tmp.{}.agentbuild", uuid::Uuid::new_v4()));
    debug!(tmp = %tmp_path.display(), target = %path.display(), "Writing artifact");

    fs::write(&tmp_path, content).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        Error::io(&tmp_path, e)
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        Error::io(path, e)
    })?;

    Ok(ArtifactRef {
        kind,
        path: path.to_path_buf(),
        checksum: sha256_hex(content),
        size: content.len() as u64,
        created_at: Utc::now(),
    })
}
