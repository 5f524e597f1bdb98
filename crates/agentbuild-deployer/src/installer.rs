//! Reading templates and writing installer archives.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use agentbuild_core::artifact::{
    TEMPLATE_MANIFEST, TEMPLATE_PAYLOAD_DIR, TemplateManifest, sha256_hex,
};
use agentbuild_core::{Error, Flavor, Result, Variant};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Name of the installer manifest entry.
pub const INSTALLER_MANIFEST: &str = "installer.json";

/// Name of the checksum manifest entry, always written last.
pub const SIGNING_MANIFEST: &str = "signing/manifest.json";

/// A file from a template payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Path relative to the payload directory.
    pub path: String,
    pub data: Vec<u8>,
    pub mode: Option<u32>,
}

/// A parsed template archive.
#[derive(Debug, Clone)]
pub struct Template {
    pub manifest: TemplateManifest,
    pub files: Vec<TemplateFile>,
    /// SHA-256 of the raw template bytes.
    pub checksum: String,
}

impl Template {
    /// Parse template bytes. Anything that is not a well-formed template
    /// archive is an [`Error::InvalidTemplate`].
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let invalid = |e: zip::result::ZipError| Error::InvalidTemplate(e.to_string());
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(invalid)?;

        let manifest: TemplateManifest = {
            let mut entry = archive.by_name(TEMPLATE_MANIFEST).map_err(|_| {
                Error::InvalidTemplate(format!("missing {TEMPLATE_MANIFEST}"))
            })?;
            let mut raw = Vec::new();
            entry
                .read_to_end(&mut raw)
                .map_err(|e| Error::InvalidTemplate(e.to_string()))?;
            serde_json::from_slice(&raw)
                .map_err(|e| Error::InvalidTemplate(format!("bad {TEMPLATE_MANIFEST}: {e}")))?
        };

        let mut files = Vec::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(invalid)?;
            if entry.is_dir() {
                continue;
            }
            let Some(relative) = entry.name().strip_prefix(TEMPLATE_PAYLOAD_DIR) else {
                continue;
            };
            if entry.enclosed_name().is_none() || relative.split('/').any(|c| c == "..") {
                return Err(Error::InvalidTemplate(format!(
                    "unsafe entry name {}",
                    entry.name()
                )));
            }
            let path = relative.to_string();
            let mode = entry.unix_mode().map(|m| m & 0o777);
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|e| Error::InvalidTemplate(e.to_string()))?;
            files.push(TemplateFile { path, data, mode });
        }

        debug!(files = files.len(), flavor = %manifest.flavor, "Parsed template");
        Ok(Self {
            manifest,
            files,
            checksum: sha256_hex(bytes),
        })
    }
}

/// Written at the root of every installer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerManifest {
    pub flavor: Flavor,
    pub variant: Variant,
    pub client_name: String,
    /// Checksum of the template this installer was assembled from.
    pub template_checksum: String,
    pub context: Vec<String>,
    /// Entry holding the embedded configuration, for deployed installers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,
    pub assembled_at: DateTime<Utc>,
}

/// Accumulates installer entries in memory.
///
/// Every entry's checksum is recorded and written to [`SIGNING_MANIFEST`]
/// by [`InstallerWriter::finish`].
pub struct InstallerWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    digests: BTreeMap<String, String>,
}

impl InstallerWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            digests: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, name: &str, data: &[u8], mode: Option<u32>) -> Result<()> {
        if self.digests.contains_key(name) {
            return Err(Error::BuildFailed(format!("duplicate installer entry {name}")));
        }
        let options = match mode {
            Some(mode) => SimpleFileOptions::default().unix_permissions(mode),
            None => SimpleFileOptions::default(),
        };
        self.zip.start_file(name, options).map_err(archive_error)?;
        self.zip
            .write_all(data)
            .map_err(|e| Error::BuildFailed(format!("installer archive: {e}")))?;
        self.digests.insert(name.to_string(), sha256_hex(data));
        Ok(())
    }

    pub fn add_json<T: Serialize>(&mut self, name: &str, value: &T) -> Result<()> {
        let data = serde_json::to_vec_pretty(value)
            .map_err(|e| Error::BuildFailed(format!("{name}: {e}")))?;
        self.add(name, &data, None)
    }

    /// Write the checksum manifest and return the archive bytes.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let digests = std::mem::take(&mut self.digests);
        let data = serde_json::to_vec_pretty(&digests)
            .map_err(|e| Error::BuildFailed(format!("{SIGNING_MANIFEST}: {e}")))?;
        self.zip
            .start_file(SIGNING_MANIFEST, SimpleFileOptions::default())
            .map_err(archive_error)?;
        self.zip
            .write_all(&data)
            .map_err(|e| Error::BuildFailed(format!("installer archive: {e}")))?;
        Ok(self.zip.finish().map_err(archive_error)?.into_inner())
    }
}

impl Default for InstallerWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn archive_error(e: zip::result::ZipError) -> Error {
    Error::BuildFailed(format!("installer archive: {e}"))
}
