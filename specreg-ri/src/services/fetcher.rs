//! Regulator release download plumbing
//!
//! Downloads land as temporary files under `<root>/downloads/`; the
//! cleanup stage sweeps the directory at the end of every import run.
//! Change detection is by content hash — spreadsheet rows are never
//! interpreted here.

use crate::config::resolve_export_url;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use specreg_common::config::TomlConfig;
use specreg_common::{Error, Result};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

/// One regulator export a periodic release covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    /// Station permits
    Stations,
    /// Radio-link permits
    Radiolines,
    /// Device registrations
    Permits,
}

impl Dataset {
    pub const ALL: [Dataset; 3] = [Dataset::Stations, Dataset::Radiolines, Dataset::Permits];

    /// Stable lowercase name; matches the ingestion stage / task name
    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Stations => "stations",
            Dataset::Radiolines => "radiolines",
            Dataset::Permits => "permits",
        }
    }

    /// Settings key for the export URL override (also the TOML field name)
    pub fn url_setting_key(&self) -> &'static str {
        match self {
            Dataset::Stations => "stations_export_url",
            Dataset::Radiolines => "radiolines_export_url",
            Dataset::Permits => "permits_export_url",
        }
    }

    /// Environment variable overriding the export URL
    pub fn url_env_var(&self) -> &'static str {
        match self {
            Dataset::Stations => "SPECREG_STATIONS_EXPORT_URL",
            Dataset::Radiolines => "SPECREG_RADIOLINES_EXPORT_URL",
            Dataset::Permits => "SPECREG_PERMITS_EXPORT_URL",
        }
    }

    /// Settings key holding the content hash of the last imported release
    pub fn hash_setting_key(&self) -> &'static str {
        match self {
            Dataset::Stations => "import.release_hash.stations",
            Dataset::Radiolines => "import.release_hash.radiolines",
            Dataset::Permits => "import.release_hash.permits",
        }
    }

    /// TOML config field for this dataset's export URL
    pub fn toml_url<'a>(&self, config: &'a TomlConfig) -> Option<&'a String> {
        match self {
            Dataset::Stations => config.stations_export_url.as_ref(),
            Dataset::Radiolines => config.radiolines_export_url.as_ref(),
            Dataset::Permits => config.permits_export_url.as_ref(),
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A release downloaded to local disk, identified by content hash
#[derive(Debug, Clone)]
pub struct DownloadedRelease {
    pub dataset: Dataset,
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: u64,
}

/// Source of regulator releases
///
/// Seam between the ingestion tasks and the network; tests substitute a
/// local implementation.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn download(&self, dataset: Dataset) -> Result<DownloadedRelease>;
}

/// Downloads releases over HTTP from the resolved export URL
pub struct HttpReleaseSource {
    client: reqwest::Client,
    db: SqlitePool,
    toml_config: TomlConfig,
    downloads: DownloadStore,
}

impl HttpReleaseSource {
    pub fn new(db: SqlitePool, toml_config: TomlConfig, downloads: DownloadStore) -> Self {
        Self {
            client: reqwest::Client::new(),
            db,
            toml_config,
            downloads,
        }
    }
}

#[async_trait]
impl ReleaseSource for HttpReleaseSource {
    async fn download(&self, dataset: Dataset) -> Result<DownloadedRelease> {
        let url = resolve_export_url(&self.db, &self.toml_config, dataset).await?;

        tracing::info!(dataset = %dataset, url = %url, "Downloading regulator export");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Download(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Download(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Download(format!("Reading body of {} failed: {}", url, e)))?;

        self.downloads.ensure_dir().await?;
        let path = self.downloads.allocate_path(dataset);
        tokio::fs::write(&path, &body).await?;

        let sha256 = sha256_file(path.clone()).await?;

        tracing::debug!(
            dataset = %dataset,
            path = %path.display(),
            bytes = body.len(),
            sha256 = %sha256,
            "Export downloaded"
        );

        Ok(DownloadedRelease {
            dataset,
            path,
            sha256,
            bytes: body.len() as u64,
        })
    }
}

/// Calculate SHA-256 of a file, hex-encoded
///
/// Reads in 1MB chunks on the blocking pool so large exports never stall
/// the async executor.
pub async fn sha256_file(path: PathBuf) -> Result<String> {
    tokio::task::spawn_blocking(move || -> Result<String> {
        use std::fs::File;
        use std::io::Read;

        let mut file = File::open(&path)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 1024 * 1024];

        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    })
    .await
    .map_err(|e| Error::Internal(format!("Hash calculation task failed: {}", e)))?
}

/// Owns the downloads directory under the root folder
#[derive(Clone)]
pub struct DownloadStore {
    root: PathBuf,
}

impl DownloadStore {
    /// `root` is the downloads directory itself, e.g. `<root_folder>/downloads`
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Unique file path for a fresh release download
    pub fn allocate_path(&self, dataset: Dataset) -> PathBuf {
        self.root
            .join(format!("{}-{}.xlsx", dataset, Uuid::new_v4()))
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Remove all files under the downloads directory
    ///
    /// The directory itself (and any subdirectories) stays; only regular
    /// files are swept. Returns the number of files removed.
    pub async fn sweep(&self) -> Result<usize> {
        let root = self.root.clone();

        tokio::task::spawn_blocking(move || -> Result<usize> {
            if !root.exists() {
                return Ok(0);
            }

            let mut removed = 0;
            for entry in WalkDir::new(&root).min_depth(1) {
                let entry =
                    entry.map_err(|e| Error::Internal(format!("Downloads sweep failed: {}", e)))?;
                if entry.file_type().is_file() {
                    std::fs::remove_file(entry.path())?;
                    removed += 1;
                }
            }
            Ok(removed)
        })
        .await
        .map_err(|e| Error::Internal(format!("Downloads sweep task failed: {}", e)))?
    }
}
