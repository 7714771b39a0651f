use axum::{
    Json, Router,
    extract::{FromRef, Path, State},
    http::{HeaderName, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{debug, info};

use crate::{
    Error, UploadFile, UploadForm, UploadLimits, UploadRejection,
    encoding::{PaperTags, encode_filename},
    metadata::{self, Enrichment, PaperMetadata},
    sanitize::{allowed_file, extension, secure_filename},
    storage::PaperStore,
};

pub const SKIPPED_ENTRIES_HEADER: HeaderName = HeaderName::from_static("x-skipped-entries");

/// Form fields every upload must carry, besides the `file` part.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "admin_name",
    "class",
    "subject",
    "semester",
    "exam_year",
    "exam_type",
    "medium",
];

const INDEX_PAGE: &str = include_str!("../templates/index.html");
const UPLOAD_PAGE: &str = include_str!("../templates/upload.html");

#[derive(Debug, Clone, FromRef)]
pub struct AppState {
    pub store: PaperStore,
    pub limits: UploadLimits,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/admin", get(upload_form))
        .route("/upload", post(upload))
        .route("/api/papers", get(list_papers))
        .route("/uploads/{filename}", get(uploaded_file))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_PAGE)
}

/// An upload that passed presence checks.
#[derive(Debug)]
pub struct ValidUpload<'a> {
    pub file: &'a UploadFile,
    pub admin_name: &'a str,
    pub class_name: &'a str,
    pub subject: &'a str,
    pub semester: &'a str,
    pub exam_year: &'a str,
    pub exam_type: &'a str,
    pub medium: &'a str,
}

impl<'a> ValidUpload<'a> {
    /// Checks file presence, required fields and the file type, in that order.
    pub fn from_form(form: &'a UploadForm) -> Result<Self, UploadRejection> {
        let file = form.file("file").ok_or(UploadRejection::MissingFormData)?;
        let mut values = [""; 7];
        for (slot, name) in values.iter_mut().zip(REQUIRED_FIELDS) {
            *slot = form.field(name).ok_or(UploadRejection::MissingFormData)?;
        }

        if file.name.is_empty() || values.iter().any(|v| v.is_empty()) {
            return Err(UploadRejection::EmptyField);
        }
        if !allowed_file(&file.name) {
            return Err(UploadRejection::InvalidFileType);
        }

        let [admin_name, class_name, subject, semester, exam_year, exam_type, medium] = values;
        Ok(Self {
            file,
            admin_name,
            class_name,
            subject,
            semester,
            exam_year,
            exam_type,
            medium,
        })
    }

    pub fn tags(&self) -> PaperTags {
        PaperTags {
            class_name: self.class_name.to_string(),
            subject: self.subject.to_string(),
            semester: self.semester.to_string(),
            year: self.exam_year.to_string(),
            exam_type: self.exam_type.to_string(),
            medium: self.medium.to_string(),
            uploader: self.admin_name.to_string(),
        }
    }

    pub fn metadata(&self) -> PaperMetadata {
        PaperMetadata::new(
            self.admin_name,
            self.class_name,
            self.subject,
            self.semester,
            self.exam_year,
            self.exam_type,
            self.medium,
        )
    }

    /// The encoded name the file is stored under.
    ///
    /// Rejected when path sanitizing strips the `.pdf` extension, since such a
    /// file could never be listed.
    pub fn stored_filename(&self) -> Result<String, UploadRejection> {
        let base = secure_filename(&self.file.name);
        if !extension(&base).is_some_and(|ext| ext == "pdf") {
            return Err(UploadRejection::InvalidFileType);
        }
        Ok(encode_filename(&self.tags().sanitized(), &base))
    }
}

fn success_page(filename: &str, enrichment: &Enrichment) -> String {
    let note = match enrichment {
        Enrichment::Embedded => "Metadata has been written directly into the PDF properties.",
        Enrichment::Failed(_) => {
            "The file was saved, but its PDF properties could not be updated."
        }
    };
    format!(
        r#"<style> body {{ font-family: sans-serif; background-color: #1a1a1a; color: #e0e0e0; padding: 40px; }} h1 {{ color: #4CAF50; }} p {{ color: #bbb; }} a {{ display: inline-block; margin-top: 20px; padding: 10px 15px; background-color: #4CAF50; color: white; text-decoration: none; border-radius: 4px; }} a:hover {{ background-color: #45a049; }} </style>
<h1>File Uploaded Successfully!</h1> <p>{note}</p> <p><strong>Saved as:</strong> {filename}</p> <a href="/">Go to Home Page</a>"#
    )
}

#[axum::debug_handler(state = AppState)]
async fn upload(State(store): State<PaperStore>, form: UploadForm) -> Result<Response, Error> {
    let validated = ValidUpload::from_form(&form)
        .and_then(|upload| upload.stored_filename().map(|filename| (upload, filename)));
    let (upload, filename) = match validated {
        Ok(valid) => valid,
        Err(rejection) => {
            info!("Rejected upload: {}", rejection);
            return Ok(rejection.into_response());
        }
    };

    let path = store.save(&filename, upload.file).await?;
    let enrichment = metadata::enrich(path, upload.metadata()).await;
    debug!("Upload of {} finished, metadata embedded: {}", filename, enrichment.is_embedded());

    Ok(Html(success_page(&filename, &enrichment)).into_response())
}

async fn list_papers(State(store): State<PaperStore>) -> Result<impl IntoResponse, Error> {
    let listing = store.list().await?;
    Ok((
        [(SKIPPED_ENTRIES_HEADER, listing.skipped.to_string())],
        Json(listing.papers),
    ))
}

async fn uploaded_file(
    State(store): State<PaperStore>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let path = store.locate(&filename).await.ok_or(Error::NotFound)?;
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        debug!("Failed to read {}: {}", path.display(), e);
        Error::NotFound
    })?;

    let content_type = match extension(&filename).as_deref() {
        Some("pdf") => mime::APPLICATION_PDF,
        _ => mime::APPLICATION_OCTET_STREAM,
    };
    Ok(([(header::CONTENT_TYPE, content_type.to_string())], bytes))
}
