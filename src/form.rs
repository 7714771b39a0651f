use crate::{Error, UploadFile};
use axum::{
    extract::{FromRef, FromRequest, Request},
    http,
};
use log::debug;
use multer::{Constraints, SizeLimit};
use std::collections::HashMap;
use tempfile::NamedTempFile;

/// Size limits applied while reading a multipart body.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_body_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}

/// A parsed `multipart/form-data` request.
///
/// Text parts land in `fields`, parts carrying a filename are spooled to temp
/// files that live as long as the form does. Repeated names keep their first
/// value. Requests with any other content type yield an empty form, which the
/// caller treats as missing data.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadFile>,
    _temp_files: Vec<NamedTempFile>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn file(&self, name: &str) -> Option<&UploadFile> {
        self.files.get(name)
    }
}

impl<S> FromRequest<S> for UploadForm
where
    S: Send + Sync,
    UploadLimits: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let limits = UploadLimits::from_ref(state);
        let (parts, body) = req.into_parts();
        let mut form = UploadForm::default();

        let Some(content_type) = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
        else {
            debug!("No Content-Type on upload request");
            return Ok(form);
        };
        debug!("Content-Type: {:?}", content_type);

        if !content_type.starts_with("multipart/form-data") {
            debug!("Unhandled content type: {}", content_type);
            return Ok(form);
        }

        let boundary = multer::parse_boundary(content_type).map_err(|e| {
            debug!("Failed to parse multipart boundary: {}", e);
            Error::DecodeError(format!("Failed to parse multipart boundary: {e}"))
        })?;
        let constraints = Constraints::new()
            .size_limit(SizeLimit::new().whole_stream(limits.max_body_bytes));
        let mut multipart =
            multer::Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

        while let Some(mut field) = multipart.next_field().await.map_err(|e| {
            debug!("Failed to read multipart field: {}", e);
            Error::ReadError(format!("Failed to read multipart field: {e}"))
        })? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let value = field.text().await.map_err(|e| {
                    debug!("Failed to read text field: {}", e);
                    Error::ReadError(format!("Failed to read text field: {e}"))
                })?;
                form.fields.entry(name).or_insert(value);
                continue;
            };

            let content_type = field
                .content_type()
                .map(|ct| ct.to_string())
                .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

            let temp_file = NamedTempFile::new()
                .map_err(|e| Error::IOError(format!("Failed to create temp file: {e}")))?;
            debug!("Created temp file at: {:?}", temp_file.path());

            let mut file = tokio::fs::OpenOptions::new()
                .write(true)
                .open(temp_file.path())
                .await
                .map_err(|e| {
                    debug!("Failed to open temp file for writing: {}", e);
                    Error::IOError(format!("Failed to open temp file: {e}"))
                })?;

            let mut total_bytes = 0u64;
            while let Some(chunk) = field.chunk().await.map_err(|e| {
                debug!("Failed to read multipart field chunk: {}", e);
                Error::ReadError(format!("Failed to read multipart field chunk: {e}"))
            })? {
                total_bytes += chunk.len() as u64;
                tokio::io::copy(&mut &*chunk, &mut file).await.map_err(|e| {
                    debug!("Failed to write chunk to temp file: {}", e);
                    Error::IOError(format!("Failed to write to temp file: {e}"))
                })?;
            }

            file.sync_all().await.map_err(|e| {
                debug!("Failed to sync temp file: {}", e);
                Error::IOError(format!("Failed to sync temp file: {e}"))
            })?;
            debug!("Spooled {} bytes for field {:?}", total_bytes, name);

            if form.files.contains_key(&name) {
                continue;
            }
            form.files.insert(
                name,
                UploadFile {
                    name: file_name,
                    content_type,
                    temp_file_path: temp_file.path().to_path_buf(),
                },
            );
            form._temp_files.push(temp_file);
        }

        debug!(
            "Parsed upload form: fields={:?}, files={:?}",
            form.fields.keys().collect::<Vec<_>>(),
            form.files.keys().collect::<Vec<_>>()
        );
        Ok(form)
    }
}
