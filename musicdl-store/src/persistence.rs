//! File persistence helpers.
//!
//! Handles loading and saving JSON state to disk with owner-only
//! permissions.

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::StoreError;

/// Directory name under the platform config directory.
const APP_DIR: &str = "musicdl";

/// Cookie store file name.
pub const COOKIES_FILE: &str = "cookies.json";

/// Settings file name.
pub const SETTINGS_FILE: &str = "settings.json";

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - macOS: `~/Library/Application Support/musicdl`
/// - Linux: `~/.config/musicdl`
/// - Windows: `%APPDATA%\musicdl`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|c| c.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the cookie store path inside `dir`.
pub fn cookies_path(dir: &Path) -> PathBuf {
    dir.join(COOKIES_FILE)
}

/// Returns the settings path inside `dir`.
pub fn settings_path(dir: &Path) -> PathBuf {
    dir.join(SETTINGS_FILE)
}

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

// ============================================================================
// Security: File Permissions
// ============================================================================

/// Creates `path` with owner-only permissions (0o600) on Unix systems.
///
/// The mode is applied at creation, so the content is never readable by
/// others. Fails if the file already exists.
async fn create_private_file(path: &Path) -> Result<tokio::fs::File, StoreError> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let file = options.open(path).await?;
    debug!(path = %path.display(), mode = "0600", "Created private file");
    Ok(file)
}

/// Sets owner-only directory permissions (0o700) on Unix systems.
#[cfg(unix)]
async fn set_restrictive_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o700);
    tokio::fs::set_permissions(path, perms).await?;

    debug!(path = %path.display(), mode = "0700", "Set restrictive directory permissions");
    Ok(())
}

/// No-op for non-Unix systems.
#[cfg(not(unix))]
async fn set_restrictive_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Ensures a directory exists; a newly created one gets 0o700.
pub async fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    if !tokio::fs::try_exists(path).await? {
        debug!(path = %path.display(), "Creating directory");
        tokio::fs::create_dir_all(path).await?;
        set_restrictive_dir_permissions(path).await?;
    }
    Ok(())
}

/// Saves data to a JSON file with owner-only permissions.
///
/// Creates the parent directory if needed and writes atomically (temp file
/// in the same directory, then rename).
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    debug!(path = %path.display(), "Saving JSON file");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent).await?;
    }

    let json = serde_json::to_string_pretty(data)?;

    let temp_path = path.with_extension("json.tmp");
    // A leftover from an interrupted save may carry looser permissions.
    match tokio::fs::remove_file(&temp_path).await {
        Ok(()) => debug!(path = %temp_path.display(), "Removed stale temp file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    if let Err(e) = write_and_rename(&temp_path, path, json.as_bytes()).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }

    debug!(path = %path.display(), "JSON file saved");
    Ok(())
}

async fn write_and_rename(
    temp_path: &Path,
    path: &Path,
    content: &[u8],
) -> Result<(), StoreError> {
    let mut file = create_private_file(temp_path).await?;
    file.write_all(content).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(temp_path, path).await?;
    Ok(())
}

/// Loads data from a JSON file.
///
/// # Errors
///
/// `StoreError::Io` if the file cannot be read (including not found),
/// `StoreError::Corrupt` if it does not parse.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading JSON file");

    let content = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Loads data from a JSON file, returning the default if missing or
/// unreadable. Anything other than a missing file is logged.
pub async fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match load_json(path).await {
        Ok(data) => data,
        Err(e) => {
            if !e.is_not_found() {
                warn!(path = %path.display(), error = %e, "Failed to load, using defaults");
            }
            T::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_default_paths() {
        let dir = default_config_dir();
        assert!(dir.ends_with("musicdl"));
        assert!(cookies_path(&dir).ends_with("cookies.json"));
        assert!(settings_path(&dir).ends_with("settings.json"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(Path::new("/abs/music")), PathBuf::from("/abs/music"));
        assert_eq!(expand_home(Path::new("rel/music")), PathBuf::from("rel/music"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/Music")), home.join("Music"));
            assert_eq!(expand_home(Path::new("~")), home);
        }
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");

        let mut data = BTreeMap::new();
        data.insert("a".to_string(), 1u32);
        save_json(&path, &data).await.unwrap();

        let loaded: BTreeMap<String, u32> = load_json(&path).await.unwrap();
        assert_eq!(loaded, data);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_missing_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        let err = load_json::<BTreeMap<String, u32>>(&path).await.unwrap_err();
        assert!(err.is_not_found());

        tokio::fs::write(&path, "{ not json").await.unwrap();
        let err = load_json::<BTreeMap<String, u32>>(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));

        let fallback: BTreeMap<String, u32> = load_json_or_default(&path).await;
        assert!(fallback.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_and_dir_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("conf");
        let path = sub.join("secret.json");
        save_json(&path, &"value").await.unwrap();

        let file_mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600, "File should have 0600 permissions");

        let dir_mode = std::fs::metadata(&sub).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700, "Directory should have 0700 permissions");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_temp_file_is_private_from_creation() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("secret.json.tmp");

        let file = create_private_file(&temp).await.unwrap();
        let mode = file.metadata().await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        drop(file);

        assert!(create_private_file(&temp).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stale_world_readable_temp_is_replaced() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.json");
        let temp = path.with_extension("json.tmp");
        std::fs::write(&temp, "stale").unwrap();
        std::fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o644)).unwrap();

        save_json(&path, &"value").await.unwrap();

        assert!(!temp.exists());
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(load_json::<String>(&path).await.unwrap(), "value");
    }
}
