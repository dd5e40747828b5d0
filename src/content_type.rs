//! MIME type resolution from file names.
//!
//! Two policies coexist:
//!
//! | Function | Used by | Policy |
//! |----------|---------|--------|
//! | [`resolve_content_type`] | save handler | pinned `.md` / `.json` / `.xml`, then lookup, then octet-stream |
//! | [`guess_content_type`] | upload pipeline | lookup, then octet-stream |
//!
//! The pins exist because the standard table answers `text/xml` for `.xml`
//! and varies for `.md` across platforms.

pub const OCTET_STREAM: &str = "application/octet-stream";

const PINNED: &[(&str, &str)] = &[
    ("md", "text/markdown"),
    ("json", "application/json"),
    ("xml", "application/xml"),
];

/// Content type for objects written by the save handler.
pub fn resolve_content_type(file_name: &str) -> String {
    if let Some(ext) = extension(file_name) {
        if let Some((_, mime)) = PINNED.iter().find(|(e, _)| ext.eq_ignore_ascii_case(e)) {
            return mime.to_string();
        }
    }
    guess_content_type(file_name)
}

/// Content type for interactive uploads: plain extension lookup.
pub fn guess_content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .to_string()
}

/// Whether `file_name` ends in `.ext`, ignoring ASCII case.
pub fn has_extension(file_name: &str, ext: &str) -> bool {
    extension(file_name).is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn extension(file_name: &str) -> Option<&str> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_extensions() {
        assert_eq!(resolve_content_type("report.md"), "text/markdown");
        assert_eq!(resolve_content_type("data.json"), "application/json");
        assert_eq!(resolve_content_type("tree.xml"), "application/xml");
        assert_eq!(resolve_content_type("TREE.XML"), "application/xml");
    }

    #[test]
    fn falls_through_to_lookup() {
        assert_eq!(resolve_content_type("photo.jpg"), "image/jpeg");
        assert_eq!(resolve_content_type("doc.pdf"), "application/pdf");
    }

    #[test]
    fn unknown_or_missing_extension_is_octet_stream() {
        assert_eq!(resolve_content_type("noext"), OCTET_STREAM);
        assert_eq!(resolve_content_type("blob.zzzunknown"), OCTET_STREAM);
        assert_eq!(guess_content_type("noext"), OCTET_STREAM);
    }

    #[test]
    fn extension_check_ignores_case() {
        assert!(has_extension("DATA.JSON", "json"));
        assert!(has_extension("data.Json", "json"));
        assert!(!has_extension("data.jsonl", "json"));
        assert!(!has_extension("json", "json"));
    }

    #[test]
    fn generic_guess_does_not_pin_xml() {
        assert_eq!(guess_content_type("photo.jpg"), "image/jpeg");
        assert_ne!(guess_content_type("tree.xml"), OCTET_STREAM);
    }
}
