//! Zip a certificate directory for download.

use std::fs::File;
use std::io::{self, BufWriter};
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;

/// Default directory holding the versioned certificate generations.
pub const DEFAULT_ARCHIVE_DIR: &str = "/certs/archive";

/// Result type alias for archive builds.
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

/// One zip job: `source` recursively into `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Prefix every entry with the source directory's own name.
    pub include_base_directory: bool,
}

/// What a finished build wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub entries: usize,
    /// Total uncompressed bytes of file entries.
    pub bytes: u64,
}

impl ArchiveRequest {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            include_base_directory: true,
        }
    }

    #[must_use]
    pub const fn include_base_directory(mut self, include: bool) -> Self {
        self.include_base_directory = include;
        self
    }

    /// Write the archive.
    ///
    /// The target is created (or truncated) first. The zip central directory
    /// is written and the file closed even when the walk fails, so a failed
    /// build leaves a well-formed but incomplete archive behind.
    pub fn build(&self) -> ArchiveResult<ArchiveSummary> {
        let file = File::create(&self.target).map_err(|source| ArchiveError::ArchiveCreation {
            path: self.target.clone(),
            source,
        })?;
        let mut zip = ZipWriter::new(BufWriter::new(file));

        let walked = self.write_entries(&mut zip);
        let finished = zip
            .finish()
            .map_err(|e| ArchiveError::walk(&self.target, e))
            .and_then(|w| {
                w.into_inner()
                    .map_err(|e| ArchiveError::walk(&self.target, e.error()))
            });

        let (entries, bytes) = walked?;
        drop(finished?);

        info!(
            path = %self.target.display(),
            entries,
            bytes,
            "archive written"
        );
        Ok(ArchiveSummary {
            path: self.target.clone(),
            entries,
            bytes,
        })
    }

    fn write_entries<W: io::Write + io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
    ) -> ArchiveResult<(usize, u64)> {
        let meta = std::fs::metadata(&self.source).map_err(|source| ArchiveError::SourceStat {
            path: self.source.clone(),
            source,
        })?;
        let base_dir = meta
            .is_dir()
            .then(|| self.source.file_name().map(|n| n.to_string_lossy().into_owned()))
            .flatten();

        let mut entries = 0;
        let mut bytes = 0;

        for entry in WalkDir::new(&self.source)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.source).to_path_buf();
                ArchiveError::walk(&path, e)
            })?;
            let path = entry.path();
            let file_type = entry.file_type();

            let relative = path.strip_prefix(&self.source).unwrap_or(path);
            let Some(mut name) = entry_name(
                relative,
                base_dir.as_deref(),
                self.include_base_directory,
                &entry.file_name().to_string_lossy(),
            ) else {
                continue;
            };

            let mode = entry
                .metadata()
                .map_err(|e| ArchiveError::walk(path, e))?
                .permissions()
                .mode();

            if file_type.is_dir() {
                name.push('/');
                let options = SimpleFileOptions::default().unix_permissions(mode & 0o7777);
                zip.add_directory(name, options)
                    .map_err(|e| ArchiveError::walk(path, e))?;
            } else if file_type.is_file() {
                if path == self.target {
                    continue;
                }
                let options = SimpleFileOptions::default()
                    .compression_method(CompressionMethod::Deflated)
                    .unix_permissions(mode & 0o7777);
                zip.start_file(name, options)
                    .map_err(|e| ArchiveError::walk(path, e))?;

                let mut src = File::open(path).map_err(|e| ArchiveError::walk(path, e))?;
                bytes += io::copy(&mut src, &mut *zip).map_err(|e| ArchiveError::walk(path, e))?;
            } else {
                debug!(path = %path.display(), "skipping special file");
                continue;
            }
            entries += 1;
        }

        Ok((entries, bytes))
    }
}

/// Archive entry name for a walked path, `None` if the entry is omitted.
///
/// Names always use `/`, whatever the host separator.
fn entry_name(
    relative: &Path,
    base_dir: Option<&str>,
    include_base_directory: bool,
    file_name: &str,
) -> Option<String> {
    let relative = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");

    match base_dir {
        // The source is a single file: name it after itself.
        None => Some(file_name.to_string()),
        Some(base) if include_base_directory => Some(if relative.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{relative}")
        }),
        Some(_) if relative.is_empty() => None,
        Some(_) => Some(relative),
    }
}

/// Zips per-domain certificate directories next to themselves.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    archive_dir: PathBuf,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_DIR)
    }
}

impl ArchiveBuilder {
    pub fn new(archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
        }
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// The request for `<archive_dir>/<domain>` -> `<archive_dir>/<domain>.zip`.
    pub fn request_for(&self, domain: &str) -> ArchiveResult<ArchiveRequest> {
        let mut parts = Path::new(domain).components();
        match (parts.next(), parts.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(ArchiveError::InvalidDomain(domain.to_string())),
        }

        Ok(ArchiveRequest::new(
            self.archive_dir.join(domain),
            self.archive_dir.join(format!("{domain}.zip")),
        ))
    }

    /// Zip a domain's archive directory, base directory included.
    pub fn build(&self, domain: &str) -> ArchiveResult<ArchiveSummary> {
        self.request_for(domain)?.build()
    }
}

/// Zip `source` into `target`.
pub fn zip_dir(
    source: impl Into<PathBuf>,
    target: impl Into<PathBuf>,
    include_base_directory: bool,
) -> ArchiveResult<ArchiveSummary> {
    ArchiveRequest::new(source, target)
        .include_base_directory(include_base_directory)
        .build()
}
