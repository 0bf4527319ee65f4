use std::path::{Path, PathBuf};

use url::Url;

use crate::domain::AppError;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "universal_video_downloader=info".into());

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Checks that the input is a non-empty http(s) URL and returns it trimmed.
pub fn validate_url(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("Please enter a URL.".to_string()));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| AppError::InvalidInput(format!("'{}' is not a valid URL: {}", trimmed, e)))?;

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(trimmed.to_string()),
        _ => Err(AppError::InvalidInput(format!(
            "'{}' is not an http(s) URL",
            trimmed
        ))),
    }
}

/// Makes sure the destination exists, creating it if needed.
pub fn ensure_directory(path: &Path) -> Result<PathBuf, AppError> {
    if path.as_os_str().is_empty() {
        return Err(AppError::InvalidInput(
            "Please choose a save folder.".to_string(),
        ));
    }

    std::fs::create_dir_all(path).map_err(|e| {
        AppError::InvalidInput(format!("Cannot use folder {}: {}", path.display(), e))
    })?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert_eq!(
            validate_url("  https://www.youtube.com/watch?v=abc ").unwrap(),
            "https://www.youtube.com/watch?v=abc"
        );
        assert!(validate_url("http://v.douyin.com/x/").is_ok());
        assert!(validate_url("").is_err());
        assert!(validate_url("watch?v=abc").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_ensure_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b");
        assert_eq!(ensure_directory(&target).unwrap(), target);
        assert!(target.is_dir());
        assert!(ensure_directory(Path::new("")).is_err());
    }

    #[test]
    fn test_ensure_directory_rejects_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            ensure_directory(&file),
            Err(AppError::InvalidInput(_))
        ));
    }
}
