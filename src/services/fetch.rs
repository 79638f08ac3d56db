use crate::config::{DownloadList, DownloadListError, DroppedRecord};
use crate::logging::error_chain;
use crate::models::{DownloadEntry, ModPaths};
use crate::services::unpack::{self, UnpackOptions, UnpackReport};
use crate::term::TermStyle;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use futures_util::StreamExt;
use reqwest::{Client, Response};
use std::future::Future;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Something that can save the body of `url` to `destination`.
pub trait Downloader {
    /// Download `url` into `destination`, returning the number of bytes written.
    fn download(&self, url: &str, destination: &Utf8Path) -> impl Future<Output = Result<u64>> + Send;
}

/// Streaming HTTP downloader.
///
/// Uses the client's default timeouts.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    async fn request(&self, url: &str) -> Result<Response> {
        self.client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Server rejected {}", url))
    }

    async fn stream_to_file(response: Response, url: &str, destination: &Utf8Path) -> Result<u64> {
        let mut file = File::create(destination)
            .await
            .with_context(|| format!("Failed to create {}", destination))?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("Failed to read body of {}", url))?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", destination))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .with_context(|| format!("Failed to flush {}", destination))?;
        Ok(written)
    }
}

impl Downloader for HttpDownloader {
    /// An existing file at `destination` is only touched once the server has
    /// accepted the request.
    async fn download(&self, url: &str, destination: &Utf8Path) -> Result<u64> {
        let response = self.request(url).await?;

        let result = Self::stream_to_file(response, url, destination).await;
        if result.is_err() && destination.exists() {
            match tokio::fs::remove_file(destination).await {
                Ok(()) => tracing::debug!("Removed partial download {}", destination),
                Err(e) => tracing::warn!("Failed to remove partial download {}: {}", destination, e),
            }
        }
        result
    }
}

/// Errors that stop a fetch before any download is attempted.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    DownloadList(#[from] DownloadListError),

    #[error("failed to create staging directory {path}")]
    StagingDir {
        path: Utf8PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl FetchError {
    /// Process exit status: configuration failures are 2.
    pub fn exit_code(&self) -> u8 {
        match self {
            FetchError::DownloadList(e) => e.exit_code(),
            FetchError::StagingDir { .. } => 1,
        }
    }
}

/// A download that did not make it into the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDownload {
    pub url: String,
    pub error: String,
}

/// Outcome of [`Fetcher::fetch_and_unpack`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Saved archives with their size in bytes
    pub downloaded: Vec<(DownloadEntry, Utf8PathBuf, u64)>,
    pub failed: Vec<FailedDownload>,

    /// Dry run only: entries a real run would download
    pub planned: Vec<DownloadEntry>,

    /// Download list records that were ignored
    pub dropped_records: Vec<DroppedRecord>,

    /// Result of unpacking the staging directory afterwards
    pub unpack: Option<UnpackReport>,
}

/// Downloads everything on the download list into the staging directory
/// and unpacks it.
pub struct Fetcher<D> {
    downloader: D,
    download_list: Utf8PathBuf,
    staging_dir: Utf8PathBuf,
    style: TermStyle,
}

impl<D: Downloader> Fetcher<D> {
    pub fn new(downloader: D, paths: &ModPaths, style: TermStyle) -> Self {
        Self {
            downloader,
            download_list: paths.download_list.clone(),
            staging_dir: paths.staging_dir.clone(),
            style,
        }
    }

    pub fn downloader(&self) -> &D {
        &self.downloader
    }

    /// Fetch every entry of the download list in document order, then unpack
    /// the staging directory (archives are kept).
    ///
    /// Individual download failures are collected in the report; only a
    /// missing or unusable download list fails the call.
    pub async fn fetch_and_unpack(&self, dry_run: bool) -> Result<FetchReport, FetchError> {
        self.fetch_all(dry_run)
            .await
            .inspect_err(|e| tracing::error!("{}", error_chain(e)))
    }

    async fn fetch_all(&self, dry_run: bool) -> Result<FetchReport, FetchError> {
        let style = &self.style;
        let list = DownloadList::load(&self.download_list)?;

        let mut report = FetchReport {
            dropped_records: list.dropped.clone(),
            ..FetchReport::default()
        };

        self.prepare_staging_dir(dry_run)?;

        for entry in list.entries {
            let destination = self.staging_dir.join(&entry.file_name);

            if dry_run {
                tracing::info!("{} {} -> {}", style.note("Would fetch"), entry.url, entry.file_name);
                report.planned.push(entry);
                continue;
            }

            tracing::info!("{} {}", style.action("Fetching"), entry.url);
            tracing::info!("{}", style.meta(&format!("-> {}", entry.file_name)));

            match self.downloader.download(&entry.url, &destination).await {
                Ok(bytes) => {
                    tracing::debug!("Saved {} bytes to {}", bytes, destination);
                    report.downloaded.push((entry, destination, bytes));
                }
                Err(e) => {
                    tracing::error!("{}: {:#}", style.warn(&format!("Failed to download {}", entry.url)), e);
                    report.failed.push(FailedDownload {
                        url: entry.url,
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        let options = UnpackOptions {
            remove_archive: false,
            dry_run,
        };
        // a dry run never creates the staging directory, so there may be nothing to preview
        report.unpack = if dry_run && !self.staging_dir.is_dir() {
            None
        } else {
            unpack::unpack_all(&self.staging_dir, options, style)
                .inspect_err(|e| tracing::error!("{}", error_chain(e)))
                .ok()
        };

        if !report.failed.is_empty() {
            tracing::warn!(
                "{}",
                style.warn(&format!(
                    "{} of {} downloads failed",
                    report.failed.len(),
                    report.failed.len() + report.downloaded.len()
                ))
            );
        }

        Ok(report)
    }

    fn prepare_staging_dir(&self, dry_run: bool) -> Result<(), FetchError> {
        if self.staging_dir.is_dir() {
            return Ok(());
        }

        if dry_run {
            tracing::info!("{} {}", self.style.note("Would create"), self.staging_dir);
            return Ok(());
        }

        crate::services::fs_ops::ensure_dir(&self.staging_dir).map_err(|source| {
            FetchError::StagingDir {
                path: self.staging_dir.clone(),
                source,
            }
        })
    }
}
