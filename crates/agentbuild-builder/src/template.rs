//! Template archive packaging.
//!
//! A template is a zip archive with a `template.json` manifest at its root
//! and the client files under `payload/`.

use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use agentbuild_core::artifact::{TEMPLATE_MANIFEST, TEMPLATE_PAYLOAD_DIR, TemplateManifest};
use agentbuild_core::semantic::RegularExpression;
use agentbuild_core::{Error, Result};
use tracing::debug;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// A file headed for the template payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadFile {
    /// Path relative to the build directory, `/` separated.
    pub path: String,
    pub data: Vec<u8>,
    /// Unix permission bits, where the filesystem has them.
    pub mode: Option<u32>,
}

/// Collect every regular file below `root`, sorted by path.
///
/// Files whose relative path matches `exclude` are skipped, as is `skip`
/// (the template's own output path, when it lives inside `root`).
/// Symlinks are followed and stored as the file they point to; a dangling
/// link is an [`Error::Io`].
pub fn collect_payload(
    root: &Path,
    exclude: Option<&RegularExpression>,
    skip: Option<&Path>,
) -> Result<Vec<PayloadFile>> {
    if !root.is_dir() {
        return Err(Error::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "build directory not found"),
        ));
    }

    let skip = skip.and_then(|p| fs::canonicalize(p).ok());
    let mut files = Vec::new();
    let mut visited = HashSet::new();
    walk(root, root, exclude, skip.as_deref(), &mut visited, &mut files)?;
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn walk(
    root: &Path,
    dir: &Path,
    exclude: Option<&RegularExpression>,
    skip: Option<&Path>,
    visited: &mut HashSet<PathBuf>,
    files: &mut Vec<PayloadFile>,
) -> Result<()> {
    // Directory symlinks may point back up the tree.
    let real = fs::canonicalize(dir).map_err(|e| Error::io(dir, e))?;
    if !visited.insert(real) {
        debug!(path = %dir.display(), "Directory already collected");
        return Ok(());
    }

    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        let relative = relative_name(root, &path);
        if exclude.is_some_and(|re| re.search(&relative).is_some()) {
            debug!(path = %relative, "Excluded from template");
            continue;
        }

        let metadata = fs::metadata(&path).map_err(|e| Error::io(&path, e))?;

        if metadata.is_dir() {
            walk(root, &path, exclude, skip, visited, files)?;
        } else if metadata.is_file() {
            if skip.is_some() && fs::canonicalize(&path).ok().as_deref() == skip {
                continue;
            }
            let data = fs::read(&path).map_err(|e| Error::io(&path, e))?;
            files.push(PayloadFile {
                path: relative,
                data,
                mode: unix_mode(&metadata),
            });
        } else {
            debug!(path = %relative, "Skipping non-regular file");
        }
    }
    Ok(())
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative: PathBuf = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn unix_mode(metadata: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn unix_mode(_metadata: &fs::Metadata) -> Option<u32> {
    None
}

/// Serialize a template archive.
pub fn write_template(manifest: &TemplateManifest, files: &[PayloadFile]) -> Result<Vec<u8>> {
    let archive_err = |e: zip::result::ZipError| Error::BuildFailed(format!("template archive: {e}"));
    let io_err = |e: std::io::Error| Error::BuildFailed(format!("template archive: {e}"));

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let manifest_json = serde_json::to_vec_pretty(manifest)
        .map_err(|e| Error::BuildFailed(format!("template manifest: {e}")))?;
    zip.start_file(TEMPLATE_MANIFEST, options).map_err(archive_err)?;
    zip.write_all(&manifest_json).map_err(io_err)?;

    for file in files {
        let file_options = match file.mode {
            Some(mode) => options.unix_permissions(mode),
            None => options,
        };
        zip.start_file(format!("{TEMPLATE_PAYLOAD_DIR}{}", file.path), file_options)
            .map_err(archive_err)?;
        zip.write_all(&file.data).map_err(io_err)?;
    }

    Ok(zip.finish().map_err(archive_err)?.into_inner())
}
