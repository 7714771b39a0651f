//! A small exam-paper repository.
//!
//! Administrators upload tagged PDFs; the tags are encoded into the stored
//! filename and written into the PDF's document info. Listing decodes the
//! filenames of the upload directory back into records.

pub mod config;
pub mod encoding;
mod error;
mod form;
pub mod metadata;
pub mod routes;
pub mod sanitize;
pub mod storage;
mod upload_file;

pub use config::Config;
pub use error::*;
pub use form::*;
pub use routes::{AppState, router};
pub use storage::{Listing, PaperStore};
pub use upload_file::*;

/// Opens the upload directory named by `config` and builds the application router.
pub async fn app(config: &Config) -> Result<axum::Router, Error> {
    let store = PaperStore::open(&config.upload_dir).await?;
    Ok(router(AppState {
        store,
        limits: config.upload_limits(),
    }))
}
