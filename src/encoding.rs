//! The filename scheme that doubles as the paper catalogue.
//!
//! A stored paper is named
//! `[class]_[subject]_[Sem-semester]_[year]_[exam_type]_[medium]_[uploader]_original.pdf`.
//! [`encode_filename`] builds that name from sanitized tags and [`decode_filename`]
//! takes it apart again when the upload directory is listed.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::sanitize::sanitize_tag;

/// Marker stored inside the semester group so it can be stripped on decode.
pub const SEMESTER_MARKER: &str = "Sem-";

const ENCODED_NAME_PATTERN: &str =
    r"(?i)^\[(.*?)\]_\[(.*?)\]_\[(.*?)\]_\[(.*?)\]_\[(.*?)\]_\[(.*?)\]_\[(.*?)\]_(.*\.pdf)$";

static ENCODED_NAME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(ENCODED_NAME_PATTERN)
        .map_err(|e| log::error!("Encoded filename pattern failed to compile: {}", e))
        .ok()
});

/// The seven tags describing one paper, in filename order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaperTags {
    #[serde(rename = "class")]
    pub class_name: String,
    pub subject: String,
    pub semester: String,
    pub year: String,
    pub exam_type: String,
    pub medium: String,
    pub uploader: String,
}

impl PaperTags {
    /// Runs every tag through [`sanitize_tag`].
    pub fn sanitized(&self) -> Self {
        Self {
            class_name: sanitize_tag(&self.class_name),
            subject: sanitize_tag(&self.subject),
            semester: sanitize_tag(&self.semester),
            year: sanitize_tag(&self.year),
            exam_type: sanitize_tag(&self.exam_type),
            medium: sanitize_tag(&self.medium),
            uploader: sanitize_tag(&self.uploader),
        }
    }

    fn groups(&self) -> [String; 7] {
        [
            self.class_name.clone(),
            self.subject.clone(),
            format!("{SEMESTER_MARKER}{}", self.semester),
            self.year.clone(),
            self.exam_type.clone(),
            self.medium.clone(),
            self.uploader.clone(),
        ]
    }
}

/// A paper decoded from its stored filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    #[serde(flatten)]
    pub tags: PaperTags,
    pub original_name: String,
    pub url: String,
}

/// The pieces of an encoded filename, before a retrieval URL is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedName {
    pub tags: PaperTags,
    pub original_name: String,
}

/// Builds the stored filename.
///
/// Tags are expected to be sanitized already; a tag containing `]_[` would
/// shift every later group when decoded.
pub fn encode_filename(tags: &PaperTags, base_filename: &str) -> String {
    let prefix = tags
        .groups()
        .iter()
        .map(|tag| format!("[{tag}]"))
        .collect::<Vec<_>>()
        .join("_");
    format!("{prefix}_{base_filename}")
}

/// Parses a stored filename, or `None` when it does not follow the scheme.
pub fn decode_filename(filename: &str) -> Option<DecodedName> {
    let caps = ENCODED_NAME.as_ref()?.captures(filename)?;
    let group = |i: usize| caps.get(i).map_or("", |m| m.as_str()).to_string();

    let semester = group(3);
    let semester = semester
        .strip_prefix(SEMESTER_MARKER)
        .map(str::to_string)
        .unwrap_or(semester);

    Some(DecodedName {
        tags: PaperTags {
            class_name: group(1),
            subject: group(2),
            semester,
            year: group(4),
            exam_type: group(5),
            medium: group(6),
            uploader: group(7),
        },
        original_name: group(8),
    })
}
