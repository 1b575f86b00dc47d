// src/recipe/prep.rs

//! Source tree preparation
//!
//! Upstream bundles copies of its third-party dependencies under a vendor
//! directory. Those copies must go: the host package manager supplies the
//! same libraries, and installing both produces colliding artifacts (the
//! vendored binaries also break install-name rewriting on macOS). One child
//! of the vendor directory has to survive, because upstream moved headers
//! the build still includes into it.

use crate::error::{Error, Result};
use crate::recipe::format::SourceSection;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What source preparation did
#[derive(Debug, Default, Clone)]
pub struct PrepOutcome {
    /// Paths that were deleted, in the order they were removed
    pub removed: Vec<PathBuf>,
}

/// Work out which vendor entries would be removed, without touching anything
///
/// Fails if the vendor directory or the kept subtree does not exist: that
/// means upstream changed its layout and the recipe's assumptions no
/// longer hold. Also fails if the vendor directory resolves to a place
/// outside the source tree (through `..` or a symlink).
pub fn plan_source_preparation(source_root: &Path, section: &SourceSection) -> Result<Vec<PathBuf>> {
    section.check()?;

    let vendor = source_root.join(&section.vendor_dir);
    if !vendor.is_dir() {
        return Err(Error::SourceLayout {
            path: vendor,
            reason: "vendored dependency directory is missing".to_string(),
        });
    }

    let root = fs::canonicalize(source_root)?;
    let resolved = fs::canonicalize(&vendor)?;
    if resolved == root || !resolved.starts_with(&root) {
        return Err(Error::SourceLayout {
            path: vendor,
            reason: format!("resolves to {}, outside the source tree", resolved.display()),
        });
    }

    let keep = vendor.join(&section.keep);
    if !keep.is_dir() {
        return Err(Error::SourceLayout {
            path: keep,
            reason: "vendored headers directory is missing".to_string(),
        });
    }

    let mut doomed: Vec<PathBuf> = fs::read_dir(&vendor)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name() != section.keep.as_str())
        .map(|e| e.path())
        .collect();
    doomed.sort();

    Ok(doomed)
}

/// Delete every child of the vendor directory except the kept subtree
///
/// Running this on an already prepared tree is a no-op.
pub fn prepare_source(source_root: &Path, section: &SourceSection) -> Result<PrepOutcome> {
    let doomed = plan_source_preparation(source_root, section)?;

    for path in &doomed {
        debug!("Removing vendored {}", path.display());
        let meta = fs::symlink_metadata(path)?;
        if meta.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
    }

    verify_prepared(source_root, section)?;

    info!(
        "Pruned {} vendored entr{} from {}",
        doomed.len(),
        if doomed.len() == 1 { "y" } else { "ies" },
        source_root.join(&section.vendor_dir).display()
    );

    Ok(PrepOutcome { removed: doomed })
}

/// Check that the vendor directory holds exactly the kept subtree
pub fn verify_prepared(source_root: &Path, section: &SourceSection) -> Result<()> {
    let vendor = source_root.join(&section.vendor_dir);
    let mut children: Vec<String> = fs::read_dir(&vendor)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    children.sort();

    if children != [section.keep.as_str()] {
        return Err(Error::SourceLayout {
            path: vendor,
            reason: format!(
                "expected only '{}' after preparation, found [{}]",
                section.keep,
                children.join(", ")
            ),
        });
    }

    Ok(())
}

/// Extract a source archive into `dest`
///
/// Supports `.tar.gz`, `.tgz` and `.tar`. Returns the source root: the
/// single top-level directory if the archive has one, otherwise `dest`.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<PathBuf> {
    let filename = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    fs::create_dir_all(dest)?;
    let file = File::open(archive)
        .map_err(|e| Error::NotFound(format!("{}: {}", archive.display(), e)))?;

    let unpacked = if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
        tar::Archive::new(GzDecoder::new(file)).unpack(dest)
    } else if filename.ends_with(".tar") {
        tar::Archive::new(file).unpack(dest)
    } else {
        return Err(Error::ParseError(format!(
            "Unknown archive format: {}",
            filename
        )));
    };
    unpacked
        .map_err(|e| Error::IoError(format!("Failed to extract {}: {}", archive.display(), e)))?;

    info!("Extracted {} to {}", archive.display(), dest.display());

    // Archives usually wrap everything in one top-level directory
    let entries: Vec<_> = fs::read_dir(dest)?.filter_map(|e| e.ok()).collect();
    if entries.len() == 1 && entries[0].file_type().map(|t| t.is_dir()).unwrap_or(false) {
        let root = entries[0].path();
        debug!("Source directory: {}", root.display());
        return Ok(root);
    }

    Ok(dest.to_path_buf())
}
