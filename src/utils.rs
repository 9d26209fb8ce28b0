//! Small helpers for logging, file system checks and environment loading.

use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) and
/// suffixed with `"…(+N bytes)"`.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let head = cut_at_char_boundary(s, max);
    if head.len() == s.len() {
        return s.to_string();
    }
    format!("{}…(+{} bytes)", head, s.len() - head.len())
}

/// Longest prefix of `s` that is at most `max` bytes and ends on a char
/// boundary.
///
/// # Arguments
///
/// * `s` - The string to cut
/// * `max` - Maximum length of the prefix, in bytes
///
/// # Returns
///
/// `s` itself when it already fits, otherwise the prefix with no marker
/// appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(cut_at_char_boundary("éé", 3), "é");
/// ```
pub fn cut_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    &s[..cut]
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// Model replies cut off by token limits fail with an EOF error; the
/// extraction step logs those differently from plain syntax errors.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    fs::write(&probe_path, b"").await?;
    let _ = fs::remove_file(&probe_path).await;
    info!("Output directory is writable");
    Ok(())
}

/// Load `KEY=value` pairs from an env file into the process environment.
///
/// Variables that are already set keep their values.
///
/// # Arguments
///
/// * `path` - The env file, usually `.env` in the working directory
///
/// # Returns
///
/// `true` if the file was read. A missing file is normal and only logged at
/// debug level; an unreadable or malformed one is logged and skipped.
pub fn load_env_file(path: &Path) -> bool {
    match dotenv::from_path(path) {
        Ok(()) => {
            info!(path = %path.display(), "Loaded environment file");
            true
        }
        Err(e) if e.not_found() => {
            debug!(path = %path.display(), "No environment file");
            false
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable environment file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte_boundary() {
        // "é" is two bytes; cutting at 3 would split the second one
        let s = "éééé";
        let result = truncate_for_log(s, 3);
        assert!(result.starts_with("é…"));
        assert!(result.contains("(+6 bytes)"));
    }

    #[test]
    fn test_cut_at_char_boundary_has_no_marker() {
        assert_eq!(cut_at_char_boundary("short", 100), "short");
        assert_eq!(cut_at_char_boundary("éééé", 3), "é");
        assert_eq!(cut_at_char_boundary(&"a".repeat(50), 10), "a".repeat(10));
    }

    #[test]
    fn test_looks_truncated() {
        let json_eof = r#"{"field": "value"#;
        let err = serde_json::from_str::<serde_json::Value>(json_eof).unwrap_err();
        assert!(looks_truncated(&err));

        let json_syntax = r#"{"field": value}"#;
        let err = serde_json::from_str::<serde_json::Value>(json_syntax).unwrap_err();
        assert!(!looks_truncated(&err));
    }

    #[test]
    fn test_load_env_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".env");
        std::fs::write(&path, "AGRI_HARVESTER_ENV_FILE_TEST=from-file\n").unwrap();

        assert!(load_env_file(&path));
        assert_eq!(
            std::env::var("AGRI_HARVESTER_ENV_FILE_TEST").as_deref(),
            Ok("from-file")
        );
        assert!(!load_env_file(&tmp.path().join("missing.env")));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
