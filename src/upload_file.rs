use std::path::{Path, PathBuf};

/// A file part received in a multipart upload, spooled to a temp file.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Client-supplied filename, possibly empty.
    pub name: String,
    pub content_type: String,
    pub(crate) temp_file_path: PathBuf,
}

impl UploadFile {
    /// Copies the spooled bytes to `dest`, replacing any existing file.
    pub async fn save_to(&self, dest: impl AsRef<Path>) -> Result<u64, std::io::Error> {
        tokio::fs::copy(&self.temp_file_path, dest).await
    }
}
