//! The flat upload directory, used as the only catalogue of papers.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use url::{Position, Url};

use crate::{
    Error, UploadFile,
    encoding::{PaperRecord, decode_filename},
};

/// Route prefix under which stored files are served.
pub const UPLOADS_ROUTE: &str = "uploads";

/// Prefix of the staging files written while enriching a stored PDF.
pub const STAGING_PREFIX: &str = crate::metadata::STAGING_PREFIX;

const URL_BASE: &str = "http://localhost/";

/// The result of scanning the upload directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Listing {
    pub papers: Vec<PaperRecord>,
    /// Files that were not listed: names outside the scheme, non UTF-8 names,
    /// or records whose retrieval URL could not be built. Enrichment staging
    /// files are not counted.
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct PaperStore {
    root: PathBuf,
}

impl PaperStore {
    /// Opens the store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            Error::IOError(format!("Failed to create {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes an uploaded file under `filename`, replacing any file of the same name.
    pub async fn save(&self, filename: &str, file: &UploadFile) -> Result<PathBuf, Error> {
        let path = self.root.join(filename);
        let bytes = file.save_to(&path).await.map_err(|e| {
            Error::IOError(format!("Failed to store {}: {e}", path.display()))
        })?;
        info!("Stored {} ({} bytes, {})", filename, bytes, file.content_type);
        Ok(path)
    }

    /// Resolves a stored filename to a path inside the root.
    ///
    /// Returns `None` for anything that could escape the root or that is not a
    /// regular file.
    pub async fn locate(&self, filename: &str) -> Option<PathBuf> {
        if filename.is_empty()
            || filename == "."
            || filename == ".."
            || filename.contains(['/', '\\', '\0'])
        {
            return None;
        }
        let path = self.root.join(filename);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    /// Decodes every stored filename into a record.
    ///
    /// Order follows the directory listing and is not stable.
    pub async fn list(&self) -> Result<Listing, Error> {
        let mut listing = Listing::default();
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            Error::IOError(format!("Failed to read {}: {e}", self.root.display()))
        })?;

        while let Some(entry) = entries.next_entry().await? {
            match entry.file_type().await {
                Ok(ft) if ft.is_dir() => continue,
                Ok(_) => {}
                Err(e) => {
                    warn!("Could not stat {:?}: {}", entry.file_name(), e);
                    listing.skipped += 1;
                    continue;
                }
            }

            let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
                listing.skipped += 1;
                continue;
            };
            if filename.starts_with(STAGING_PREFIX) {
                continue;
            }
            let Some(decoded) = decode_filename(&filename) else {
                listing.skipped += 1;
                continue;
            };

            match retrieval_url(&filename) {
                Ok(url) => listing.papers.push(PaperRecord {
                    tags: decoded.tags,
                    original_name: decoded.original_name,
                    url,
                }),
                Err(e) => {
                    warn!("Error processing matched file {}: {}", filename, e);
                    listing.skipped += 1;
                }
            }
        }

        debug!(
            "Listed {} papers, skipped {} entries",
            listing.papers.len(),
            listing.skipped
        );
        Ok(listing)
    }
}

/// Builds the site-relative URL serving `filename`, percent-encoded.
pub fn retrieval_url(filename: &str) -> Result<String, Error> {
    let mut url = Url::parse(URL_BASE)
        .map_err(|e| Error::InvalidFile(format!("cannot build a url for {filename:?}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| Error::InvalidFile(format!("cannot build a url for {filename:?}")))?
        .clear()
        .push(UPLOADS_ROUTE)
        .push(filename);
    Ok(url[Position::BeforePath..].to_string())
}
