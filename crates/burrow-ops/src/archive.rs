//! Archive extraction capability.
//!
//! Extraction is compiled in through the `archive` feature and switched on
//! at startup through [`StoreConfig::archives_enabled`]. When either is
//! missing, `decompress` reports [`StoreError::Unsupported`].
//!
//! [`StoreConfig::archives_enabled`]: burrow_core::StoreConfig::archives_enabled

use std::fs;
use std::path::{Path, PathBuf};

use burrow_core::StoreError;
use tracing::{debug, warn};

use crate::conflict::claim_free_path;

/// Archive formats the engine knows how to recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarXz,
    TarBz2,
}

/// Compound suffixes come before the plain ones.
const SUFFIXES: &[(&str, ArchiveFormat)] = &[
    (".tar.bz2", ArchiveFormat::TarBz2),
    (".tar.gz", ArchiveFormat::TarGz),
    (".tar.xz", ArchiveFormat::TarXz),
    (".tbz2", ArchiveFormat::TarBz2),
    (".tgz", ArchiveFormat::TarGz),
    (".txz", ArchiveFormat::TarXz),
    (".zip", ArchiveFormat::Zip),
    (".tar", ArchiveFormat::Tar),
];

impl ArchiveFormat {
    /// Detect the format from a file name, case-insensitively.
    ///
    /// Returns the format and the name with the archive suffix stripped.
    /// A name that is nothing but a suffix keeps its full name as the stem.
    pub fn detect(name: &str) -> Option<(Self, &str)> {
        SUFFIXES.iter().find_map(|&(suffix, format)| {
            let split = name.len().checked_sub(suffix.len())?;
            if !name.is_char_boundary(split) || !name[split..].eq_ignore_ascii_case(suffix) {
                return None;
            }
            let stem = if split == 0 { name } else { &name[..split] };
            Some((format, stem))
        })
    }
}

/// Whether archive extraction is available at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSupport {
    enabled: bool,
}

impl ArchiveSupport {
    /// Combine the config flag with the compiled-in capability.
    pub fn detect(config_enabled: bool) -> Self {
        Self {
            enabled: config_enabled && cfg!(feature = "archive"),
        }
    }

    /// Extraction switched off.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_available(&self) -> bool {
        self.enabled
    }
}

/// Extract `archive` into a new folder next to it.
///
/// The folder takes the archive's name minus its suffix, or the first free
/// `name (n)` variant. A failed extraction removes the folder again.
pub(crate) fn extract_archive(archive: &Path) -> Result<PathBuf, StoreError> {
    let meta = fs::metadata(archive).map_err(|e| StoreError::io(archive, e))?;
    if meta.is_dir() {
        return Err(StoreError::invalid("Only files can be decompressed"));
    }

    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (format, stem) = ArchiveFormat::detect(&name)
        .ok_or_else(|| StoreError::unsupported(format!("Unknown archive format: {name}")))?;
    let parent = archive
        .parent()
        .ok_or_else(|| StoreError::invalid("Archive has no parent folder"))?;

    let dest = claim_free_path(parent, stem, |p| fs::create_dir(p))?;

    match unpack(format, archive, &dest) {
        Ok(()) => {
            debug!(archive = %archive.display(), dest = %dest.display(), ?format, "Extracted archive");
            Ok(dest)
        }
        Err(err) => {
            if let Err(cleanup) = fs::remove_dir_all(&dest) {
                warn!(dest = %dest.display(), error = %cleanup, "Failed to clean up partial extraction");
            }
            Err(err)
        }
    }
}

#[cfg(feature = "archive")]
fn unpack(format: ArchiveFormat, archive: &Path, dest: &Path) -> Result<(), StoreError> {
    use std::fs::File;
    use std::io::BufReader;

    let file = File::open(archive).map_err(|e| StoreError::io(archive, e))?;
    let reader = BufReader::new(file);

    match format {
        ArchiveFormat::Zip => unpack_zip(reader, archive, dest),
        ArchiveFormat::Tar => unpack_tar(reader, archive, dest),
        ArchiveFormat::TarGz => unpack_tar(flate2::read::GzDecoder::new(reader), archive, dest),
        ArchiveFormat::TarXz => unpack_tar(xz2::read::XzDecoder::new(reader), archive, dest),
        ArchiveFormat::TarBz2 => unpack_tar(bzip2::read::BzDecoder::new(reader), archive, dest),
    }
}

#[cfg(not(feature = "archive"))]
fn unpack(_format: ArchiveFormat, _archive: &Path, _dest: &Path) -> Result<(), StoreError> {
    Err(StoreError::unsupported("Archive extraction is not available"))
}

#[cfg(feature = "archive")]
fn unpack_zip<R>(reader: R, archive: &Path, dest: &Path) -> Result<(), StoreError>
where
    R: std::io::Read + std::io::Seek,
{
    let corrupt = |e: zip::result::ZipError| {
        StoreError::invalid(format!(
            "Cannot read archive '{}': {e}",
            archive.file_name().unwrap_or_default().to_string_lossy()
        ))
    };

    let mut zip = zip::ZipArchive::new(reader).map_err(corrupt)?;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(corrupt)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| unsafe_entry(entry.name()))?;
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| StoreError::io(&target, e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let mut out = fs::File::create(&target).map_err(|e| StoreError::io(&target, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| StoreError::io(&target, e))?;
    }
    Ok(())
}

#[cfg(feature = "archive")]
fn unpack_tar<R: std::io::Read>(reader: R, archive: &Path, dest: &Path) -> Result<(), StoreError> {
    let mut tar = tar::Archive::new(reader);
    let entries = tar.entries().map_err(|e| StoreError::io(archive, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| StoreError::io(archive, e))?;
        let display = entry
            .path()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        // `unpack_in` refuses entries that would land outside `dest`.
        let unpacked = entry.unpack_in(dest).map_err(|e| StoreError::io(archive, e))?;
        if !unpacked {
            return Err(unsafe_entry(&display));
        }
    }
    Ok(())
}

#[cfg(feature = "archive")]
fn unsafe_entry(name: &str) -> StoreError {
    StoreError::invalid(format!("Archive entry escapes the destination: {name}"))
}
