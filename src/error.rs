use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("failed to decode request: {0}")]
    DecodeError(String),
    #[error("failed to read request: {0}")]
    ReadError(String),
    #[error("I/O error: {0}")]
    IOError(String),
    #[error("invalid file: {0}")]
    InvalidFile(String),
    #[error("not found")]
    NotFound,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IOError(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

/// Why an upload form was turned away before anything was stored.
///
/// Each variant renders its own HTML fragment; the status stays 200 so the
/// admin page can show the message in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    #[error("missing form data")]
    MissingFormData,
    #[error("all fields are required")]
    EmptyField,
    #[error("invalid file type")]
    InvalidFileType,
}

impl UploadRejection {
    pub fn html(&self) -> &'static str {
        match self {
            UploadRejection::MissingFormData => {
                "<h1>Missing form data. <a href='/admin'>Please try again.</a></h1>"
            }
            UploadRejection::EmptyField => {
                "<h1>All fields are required. <a href='/admin'>Please try again.</a></h1>"
            }
            UploadRejection::InvalidFileType => {
                "<h1>Invalid file type. Only PDFs are allowed. <a href='/admin'>Try again</a></h1>"
            }
        }
    }
}

impl IntoResponse for UploadRejection {
    fn into_response(self) -> Response {
        Html(self.html()).into_response()
    }
}
