//! Helpers for untrusted names and for data entering tracing span fields.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
///
/// Used for span fields and progress events so upload roots are not logged.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Reduces an uploaded name to a single safe path component.
///
/// Directory parts are dropped, whitespace becomes `_`, and anything outside
/// ASCII letters, digits, `.`, `-` and `_` is removed. Leading dots and
/// underscores are stripped so the result is never hidden or a traversal.
/// Returns `None` when nothing usable remains.
pub fn secure_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    let trimmed = cleaned.trim_start_matches(['.', '_']).trim_end_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_path_returns_filename() {
        assert_eq!(
            redact_path(Path::new("/srv/uploads/7/jan2024/deeds.xlsx")),
            "deeds.xlsx"
        );
    }

    #[test]
    fn test_redact_path_no_filename() {
        assert_eq!(redact_path(Path::new("/")), "<unknown>");
    }

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("deeds.xlsx").as_deref(), Some("deeds.xlsx"));
        assert_eq!(
            secure_filename("My Deeds (Jan).xlsx").as_deref(),
            Some("My_Deeds_Jan.xlsx")
        );
        assert_eq!(
            secure_filename("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            secure_filename("C:\\Users\\a\\list.csv").as_deref(),
            Some("list.csv")
        );
        assert_eq!(secure_filename(".hidden.csv").as_deref(), Some("hidden.csv"));
        assert_eq!(secure_filename("जनवरी.csv").as_deref(), Some("csv"));
        assert_eq!(secure_filename(".."), None);
        assert_eq!(secure_filename("   "), None);
    }
}
