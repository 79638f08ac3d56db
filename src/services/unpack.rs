use crate::logging::error_chain;
use crate::services::fs_ops;
use crate::term::TermStyle;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use thiserror::Error;

/// Archive families the unpacker understands, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
}

impl ArchiveFormat {
    /// Extensions are matched case-insensitively, longest first, so
    /// `mod.tar.gz` is gzip-tar rather than unknown.
    const EXTENSIONS: [(&'static str, ArchiveFormat); 9] = [
        (".tar.gz", ArchiveFormat::TarGz),
        (".tar.bz2", ArchiveFormat::TarBz2),
        (".tar.xz", ArchiveFormat::TarXz),
        (".tgz", ArchiveFormat::TarGz),
        (".tbz2", ArchiveFormat::TarBz2),
        (".tbz", ArchiveFormat::TarBz2),
        (".txz", ArchiveFormat::TarXz),
        (".zip", ArchiveFormat::Zip),
        (".tar", ArchiveFormat::Tar),
    ];

    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_lowercase();
        Self::EXTENSIONS
            .iter()
            .find(|(ext, _)| lower.ends_with(ext))
            .map(|(_, format)| *format)
    }
}

/// Errors from the unpacker.
#[derive(Error, Debug)]
pub enum UnpackError {
    #[error("directory not found: {0}")]
    DirectoryNotFound(Utf8PathBuf),

    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to extract {archive}")]
    Extraction {
        archive: String,
        #[source]
        source: anyhow::Error,
    },
}

impl UnpackError {
    /// Process exit status when the whole batch cannot run.
    pub fn exit_code(&self) -> u8 {
        match self {
            UnpackError::DirectoryNotFound(_) => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnpackOptions {
    /// Delete each archive after it was extracted successfully
    pub remove_archive: bool,

    /// Only narrate what would be extracted
    pub dry_run: bool,
}

/// Outcome of one [`unpack_all`] batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnpackReport {
    /// Archive file names and the directory each was extracted into
    pub extracted: Vec<(String, Utf8PathBuf)>,

    /// Archive file names that were not extracted
    pub skipped: Vec<String>,

    /// Dry run only: archives that a real run would extract
    pub planned: Vec<(String, Utf8PathBuf)>,
}

/// Extraction directory for `archive`: its file name with the final extension removed.
///
/// `foo.zip` unpacks into `foo/`, `foo.tar.gz` into `foo.tar/`.
pub fn target_dir_for(archive: &Utf8Path) -> Option<Utf8PathBuf> {
    let stem = archive.file_stem()?;
    Some(archive.with_file_name(stem))
}

/// Extract every file directly under `directory` into its own subdirectory.
///
/// Entries are visited in sorted order and subdirectories are skipped as
/// already extracted. A file that cannot be extracted is logged and counted
/// as skipped; only a missing `directory` fails the batch.
pub fn unpack_all(
    directory: &Utf8Path,
    options: UnpackOptions,
    style: &TermStyle,
) -> Result<UnpackReport, UnpackError> {
    if !directory.is_dir() {
        return Err(UnpackError::DirectoryNotFound(directory.to_path_buf()));
    }

    let entries = fs_ops::sorted_entries(directory).map_err(|source| UnpackError::Extraction {
        archive: directory.to_string(),
        source,
    })?;

    let mut report = UnpackReport::default();

    for path in entries {
        if path.is_dir() {
            continue;
        }
        let (Some(name), Some(target)) = (path.file_name(), target_dir_for(&path)) else {
            continue;
        };
        let name = name.to_string();

        if options.dry_run {
            match ArchiveFormat::from_file_name(&name) {
                Some(_) => {
                    tracing::info!("{} {} -> {}", style.note("Would unpack"), name, target);
                    report.planned.push((name, target));
                }
                None => {
                    tracing::warn!("{}", style.warn(&format!("Skipping unsupported archive: {}", name)));
                    report.skipped.push(name);
                }
            }
            continue;
        }

        tracing::info!("{} {} -> {}", style.action("Attempting to unpack"), name, target);
        match unpack_one(&path, &target) {
            Ok(()) => {
                if options.remove_archive {
                    if let Err(e) = std::fs::remove_file(&path) {
                        tracing::warn!("{}", style.warn(&format!("Failed to remove {}: {}", name, e)));
                    }
                }
                report.extracted.push((name, target));
            }
            Err(UnpackError::UnsupportedFormat(_)) => {
                tracing::warn!("{}", style.warn(&format!("Skipping unsupported archive: {}", name)));
                report.skipped.push(name);
            }
            Err(e) => {
                tracing::error!("{}: {}", style.warn(&format!("Failed to unpack {}", name)), error_chain(&e));
                report.skipped.push(name);
            }
        }
    }

    log_summary(&report, style);
    Ok(report)
}

/// Extract a single archive into `target`, creating it if needed.
pub fn unpack_one(archive: &Utf8Path, target: &Utf8Path) -> Result<(), UnpackError> {
    let name = archive.file_name().unwrap_or(archive.as_str()).to_string();
    let extraction = |source: anyhow::Error| UnpackError::Extraction {
        archive: name.clone(),
        source,
    };

    fs_ops::ensure_dir(target).map_err(extraction)?;

    let format = ArchiveFormat::from_file_name(&name)
        .ok_or_else(|| UnpackError::UnsupportedFormat(name.clone()))?;

    extract(archive, target, format).map_err(extraction)
}

fn extract(archive: &Utf8Path, target: &Utf8Path, format: ArchiveFormat) -> anyhow::Result<()> {
    let file = File::open(archive).with_context(|| format!("Failed to open archive: {}", archive))?;
    let reader = BufReader::new(file);

    match format {
        ArchiveFormat::Zip => {
            let mut zip = zip::ZipArchive::new(reader)
                .with_context(|| format!("Failed to read zip archive: {}", archive))?;
            zip.extract(target)
                .with_context(|| format!("Failed to extract zip archive into {}", target))
        }
        ArchiveFormat::Tar => unpack_tar(reader, target),
        ArchiveFormat::TarGz => unpack_tar(GzDecoder::new(reader), target),
        ArchiveFormat::TarBz2 => unpack_tar(bzip2::read::BzDecoder::new(reader), target),
        ArchiveFormat::TarXz => unpack_tar(xz2::read::XzDecoder::new(reader), target),
    }
}

fn unpack_tar<R: Read>(reader: R, target: &Utf8Path) -> anyhow::Result<()> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(false);
    archive
        .unpack(target)
        .with_context(|| format!("Failed to extract tar archive into {}", target))
}

fn log_summary(report: &UnpackReport, style: &TermStyle) {
    tracing::info!(
        "{}",
        style.meta(&format!(
            "Extraction complete. Extracted: {}, Skipped: {}",
            report.extracted.len(),
            report.skipped.len()
        ))
    );
    for (archive, target) in &report.extracted {
        tracing::info!("{}", style.note(&format!(" - {} -> {}", archive, target)));
    }
    if !report.skipped.is_empty() {
        tracing::info!(
            "{}",
            style.warn(&format!("Skipped archives: {}", report.skipped.join(", ")))
        );
    }
}
