//! Best-effort PDF document-info enrichment.
//!
//! The stored file is only replaced once the enriched document has been fully
//! serialized, so a failure here never damages an upload.

use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, StringFormat};
use log::{debug, warn};
use thiserror::Error;

/// Prefix of the sibling file an enriched PDF is staged in before the rename.
pub const STAGING_PREFIX: &str = ".enrich-";

const PRODUCER: &str = concat!("exam-archive ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("enrichment task failed: {0}")]
    Task(String),
}

/// Outcome of [`enrich`].
#[derive(Debug)]
pub enum Enrichment {
    Embedded,
    Failed(MetadataError),
}

impl Enrichment {
    pub fn is_embedded(&self) -> bool {
        matches!(self, Enrichment::Embedded)
    }
}

/// Document-info values written into an uploaded PDF, taken from the raw form
/// values rather than the sanitized tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperMetadata {
    pub author: String,
    pub title: String,
    pub subject: String,
    pub keywords: String,
}

impl PaperMetadata {
    pub fn new(
        uploader: &str,
        class_name: &str,
        subject: &str,
        semester: &str,
        exam_year: &str,
        exam_type: &str,
        medium: &str,
    ) -> Self {
        Self {
            author: uploader.to_string(),
            title: format!("{class_name} - {subject} (Semester {semester})"),
            subject: subject.to_string(),
            keywords: format!(
                "{class_name}, {exam_year}, Semester {semester}, {exam_type}, {medium}"
            ),
        }
    }

    fn info_dictionary(&self) -> Dictionary {
        Dictionary::from_iter(vec![
            ("Author", text_string(&self.author)),
            ("Title", text_string(&self.title)),
            ("Subject", text_string(&self.subject)),
            ("Keywords", text_string(&self.keywords)),
            ("Producer", text_string(PRODUCER)),
        ])
    }
}

/// Encodes a PDF text string: literal for ASCII, UTF-16BE with a BOM otherwise.
fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::String(value.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Rewrites the document-info dictionary of a PDF held in memory.
pub fn embed_metadata(pdf: &[u8], metadata: &PaperMetadata) -> Result<Vec<u8>, MetadataError> {
    let mut doc = Document::load_mem(pdf)?;
    let info_id = doc.add_object(metadata.info_dictionary());
    doc.trailer.set("Info", Object::Reference(info_id));

    let mut out = Vec::with_capacity(pdf.len());
    doc.save_to(&mut out)?;
    Ok(out)
}

fn enrich_blocking(path: &Path, metadata: &PaperMetadata) -> Result<(), MetadataError> {
    let original = std::fs::read(path)?;
    let enriched = embed_metadata(&original, metadata)?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(dir)?;
    std::io::Write::write_all(&mut staged, &enriched)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| MetadataError::Io(e.error))?;
    Ok(())
}

/// Embeds `metadata` into the PDF stored at `path`.
///
/// Never fails the caller: any error is logged and reported as
/// [`Enrichment::Failed`], leaving the file as it was.
pub async fn enrich(path: PathBuf, metadata: PaperMetadata) -> Enrichment {
    let display = path.display().to_string();
    let result = tokio::task::spawn_blocking(move || enrich_blocking(&path, &metadata))
        .await
        .map_err(|e| MetadataError::Task(e.to_string()))
        .and_then(|r| r);

    match result {
        Ok(()) => {
            debug!("Embedded document metadata into {}", display);
            Enrichment::Embedded
        }
        Err(e) => {
            warn!("Could not write metadata to {}: {}", display, e);
            Enrichment::Failed(e)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::{
        content::{Content, Operation},
        Stream,
    };

    /// Builds a small, valid PDF with `num_pages` pages.
    pub(crate) fn sample_pdf(num_pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut page_ids = Vec::new();
        for i in 0..num_pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new(
                        "Tf",
                        vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
                    ),
                    Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                    Operation::new(
                        "Tj",
                        vec![Object::string_literal(format!("Question {}", i + 1))],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
            let page_id = doc.add_object(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(612),
                        Object::Integer(792),
                    ]),
                ),
                ("Contents", Object::Reference(content_id)),
            ]));
            page_ids.push(page_id);
        }

        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(num_pages as i64)),
            (
                "Kids",
                Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    /// Reads one entry of the document-info dictionary as raw bytes.
    pub(crate) fn info_entry(pdf: &[u8], key: &[u8]) -> Option<Vec<u8>> {
        let doc = Document::load_mem(pdf).ok()?;
        let info_id = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
        let info = doc.get_object(info_id).ok()?.as_dict().ok()?;
        info.get(key).ok()?.as_str().ok().map(<[u8]>::to_vec)
    }

    fn sample_metadata() -> PaperMetadata {
        PaperMetadata::new("J Smith", "10th", "Math", "1", "2024", "Midterm", "English")
    }

    #[test]
    fn builds_title_and_keywords() {
        let meta = sample_metadata();
        assert_eq!(meta.author, "J Smith");
        assert_eq!(meta.title, "10th - Math (Semester 1)");
        assert_eq!(meta.subject, "Math");
        assert_eq!(meta.keywords, "10th, 2024, Semester 1, Midterm, English");
    }

    #[test]
    fn embeds_info_dictionary_and_keeps_pages() {
        let enriched = embed_metadata(&sample_pdf(3), &sample_metadata()).unwrap();

        assert_eq!(info_entry(&enriched, b"Author").unwrap(), b"J Smith");
        assert_eq!(
            info_entry(&enriched, b"Title").unwrap(),
            b"10th - Math (Semester 1)"
        );
        assert_eq!(
            info_entry(&enriched, b"Keywords").unwrap(),
            b"10th, 2024, Semester 1, Midterm, English"
        );
        let doc = Document::load_mem(&enriched).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn non_ascii_values_use_utf16() {
        let mut meta = sample_metadata();
        meta.author = "Zoë".into();
        let enriched = embed_metadata(&sample_pdf(1), &meta).unwrap();
        let author = info_entry(&enriched, b"Author").unwrap();
        assert_eq!(&author[..2], &[0xFE, 0xFF]);
        assert_eq!(author.len(), 2 + 2 * 3);
    }

    #[test]
    fn corrupt_input_is_an_error() {
        let err = embed_metadata(b"%PDF-1.4\nthis is not a pdf", &sample_metadata());
        assert!(matches!(err, Err(MetadataError::Pdf(_))));
    }

    #[tokio::test]
    async fn failed_enrichment_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();

        let outcome = enrich(path.clone(), sample_metadata()).await;
        assert!(matches!(outcome, Enrichment::Failed(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"not a pdf at all");
    }

    #[tokio::test]
    async fn enrichment_replaces_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, sample_pdf(1)).unwrap();

        let outcome = enrich(path.clone(), sample_metadata()).await;
        assert!(outcome.is_embedded());
        let stored = std::fs::read(&path).unwrap();
        assert_eq!(info_entry(&stored, b"Subject").unwrap(), b"Math");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn staged_rewrite_uses_the_staging_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(dir.path())
            .unwrap();
        let name = staged.path().file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with(STAGING_PREFIX));
        assert!(crate::encoding::decode_filename(&name).is_none());
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = enrich(dir.path().join("gone.pdf"), sample_metadata()).await;
        assert!(matches!(outcome, Enrichment::Failed(MetadataError::Io(_))));
    }
}
