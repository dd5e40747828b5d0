//! Filename normalization for object keys.

use uuid::Uuid;

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Make a user-supplied filename safe to embed in an object key.
///
/// Reserved characters become `_`, surrounding whitespace and dots are
/// stripped, and a name that ends up empty is replaced with
/// `unnamed_file_<8 hex chars>`.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        let id = Uuid::new_v4().simple().to_string();
        return format!("unnamed_file_{}", &id[..8]);
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_placeholder(s: &str) -> bool {
        s.strip_prefix("unnamed_file_").is_some_and(|hex| {
            hex.len() == 8 && hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        })
    }

    #[test]
    fn replaces_reserved_characters() {
        let out = sanitize_filename(r#"a<b>c:d"e/f\g|h?i*j.txt"#);
        assert_eq!(out, "a_b_c_d_e_f_g_h_i_j.txt");
        assert!(!out.contains(INVALID_CHARS));
    }

    #[test]
    fn strips_surrounding_dots_and_spaces() {
        assert_eq!(sanitize_filename("  ..report.pdf.. "), "report.pdf");
    }

    #[test]
    fn empty_result_gets_placeholder() {
        assert!(is_placeholder(&sanitize_filename("")));
        assert!(is_placeholder(&sanitize_filename(" . . ")));
    }

    #[test]
    fn reserved_only_name_is_not_empty() {
        // Reserved characters become underscores, which survive trimming.
        assert_eq!(sanitize_filename("???"), "___");
    }

    #[test]
    fn clean_names_are_unchanged() {
        for name in ["notes.md", "2024 plan.docx", "data_v2.json"] {
            assert_eq!(sanitize_filename(name), name);
            assert_eq!(sanitize_filename(&sanitize_filename(name)), name);
        }
    }
}
