//! Runtime configuration, resolved once at startup.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::{Error, form::UploadLimits};

pub const UPLOAD_DIR_VAR: &str = "EXAM_ARCHIVE_UPLOAD_DIR";
pub const BIND_VAR: &str = "EXAM_ARCHIVE_BIND";
pub const MAX_UPLOAD_BYTES_VAR: &str = "EXAM_ARCHIVE_MAX_UPLOAD_BYTES";

#[derive(Debug, Clone)]
pub struct Config {
    pub upload_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub max_upload_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            max_upload_bytes: UploadLimits::default().max_body_bytes,
        }
    }
}

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// `.env` is loaded once by the binary before logging starts, so this
    /// only reads variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup; unset variables keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Config::default();

        if let Some(dir) = lookup(UPLOAD_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup(BIND_VAR) {
            config.bind_addr = addr
                .trim()
                .parse()
                .map_err(|e| Error::DecodeError(format!("{BIND_VAR}={addr:?}: {e}")))?;
        }
        if let Some(max) = lookup(MAX_UPLOAD_BYTES_VAR) {
            config.max_upload_bytes = max
                .trim()
                .parse()
                .map_err(|e| Error::DecodeError(format!("{MAX_UPLOAD_BYTES_VAR}={max:?}: {e}")))?;
        }

        Ok(config)
    }

    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_body_bytes: self.max_upload_bytes,
        }
    }
}
