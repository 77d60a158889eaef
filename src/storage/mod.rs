pub mod config;
pub mod preferences;

use std::io;
use std::path::{Path, PathBuf};

pub const APP_DIR_NAME: &str = ".desktop-agenda";

/// Per-user directory holding config, token, preferences and logs.
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Creates `dir` (and parents) readable only by the owner.
pub fn ensure_private_dir(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)?;
    tracing::info!("Created directory {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_missing_nested_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("a").join("b");

        ensure_private_dir(&dir).unwrap();

        assert!(dir.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn created_directory_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("private");

        ensure_private_dir(&dir).unwrap();

        let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn existing_directory_is_left_alone() {
        let temp_dir = TempDir::new().unwrap();

        assert!(ensure_private_dir(temp_dir.path()).is_ok());
    }

    #[test]
    fn app_dir_ends_with_app_name() {
        assert!(app_dir().ends_with(APP_DIR_NAME));
    }
}
