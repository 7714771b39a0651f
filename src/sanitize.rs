use unicode_normalization::UnicodeNormalization;

/// Extensions accepted by the upload form, lowercase.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf"];

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reduces a free-text tag to alphanumerics, space, underscore and hyphen,
/// then strips trailing whitespace.
///
/// Brackets never survive, so a sanitized tag cannot contain `]_[`.
pub fn sanitize_tag(value: &str) -> String {
    let kept: String = value
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    kept.trim_end().to_string()
}

/// Makes a client-supplied filename safe to join onto the upload root.
///
/// Accented letters are decomposed to their ASCII base first; the result is
/// ASCII-only, has no path separators, uses underscores in place of
/// whitespace and may be empty.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');

    let stem = trimmed.split('.').next().unwrap_or_default();
    if WINDOWS_DEVICE_NAMES
        .iter()
        .any(|device| device.eq_ignore_ascii_case(stem))
    {
        return format!("_{trimmed}");
    }

    trimmed.to_string()
}

/// Returns the lowercase extension after the last `.`, if any.
pub fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

pub fn allowed_file(filename: &str) -> bool {
    extension(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_keeps_word_characters_and_trims_the_end() {
        assert_eq!(sanitize_tag("10th"), "10th");
        assert_eq!(sanitize_tag("J. Smith!  "), "J Smith");
        assert_eq!(sanitize_tag("  Mid-term_A"), "  Mid-term_A");
        assert_eq!(sanitize_tag("Café"), "Café");
        assert_eq!(sanitize_tag(""), "");
    }

    #[test]
    fn tag_cannot_smuggle_a_group_delimiter() {
        let tag = sanitize_tag("a]_[b");
        assert_eq!(tag, "a_b");
        assert!(!tag.contains("]_["));
    }

    #[test]
    fn secure_filename_replaces_spaces() {
        assert_eq!(secure_filename("Algebra Test.pdf"), "Algebra_Test.pdf");
        assert_eq!(secure_filename("  many   spaces .pdf"), "many_spaces_.pdf");
    }

    #[test]
    fn secure_filename_strips_paths() {
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("C:\\Users\\me\\paper.pdf"), "C_Users_me_paper.pdf");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn secure_filename_folds_accents_and_drops_other_non_ascii() {
        assert_eq!(secure_filename("résumé.pdf"), "resume.pdf");
        assert_eq!(secure_filename("Ünïcödé Test.pdf"), "Unicode_Test.pdf");
        assert_eq!(secure_filename("ﬁnal.pdf"), "final.pdf");
        assert_eq!(secure_filename("数学.pdf"), "pdf");
    }

    #[test]
    fn secure_filename_guards_device_names() {
        assert_eq!(secure_filename("con.pdf"), "_con.pdf");
        assert_eq!(secure_filename("console.pdf"), "console.pdf");
    }

    #[test]
    fn only_pdf_is_allowed() {
        assert!(allowed_file("paper.pdf"));
        assert!(allowed_file("PAPER.PDF"));
        assert!(allowed_file("archive.tar.pdf"));
        assert!(!allowed_file("paper.docx"));
        assert!(!allowed_file("pdf"));
        assert!(!allowed_file(""));
    }
}
