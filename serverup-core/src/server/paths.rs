//! Default on-disk locations.
//!
//! Everything lives under the per-user data directory:
//!
//! - Linux: `~/.local/share/serverup/`
//! - macOS: `~/Library/Application Support/serverup/`
//! - Windows: `C:\Users\<User>\AppData\Roaming\serverup\`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Subdirectory name under the data directory.
const APP_DIR: &str = "serverup";

/// Returns the base serverup data directory.
pub fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(base.join(APP_DIR))
}

/// Returns the directory downloaded language servers are installed into.
///
/// Path: `{data}/serverup/bin/`
pub fn bin_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join("bin"))
}

/// Ensures a directory exists.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}

/// Expands a leading `~` to the home directory.
///
/// Paths without a leading `~`, or when no home directory is known, are
/// returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
            .or_else(|| path.strip_prefix("~\\"))
    };

    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bin_dir_is_under_data_dir() {
        let data = data_dir().unwrap();
        let bin = bin_dir().unwrap();
        assert!(data.ends_with("serverup"));
        assert!(bin.starts_with(&data));
        assert!(bin.ends_with("bin"));
    }

    #[test]
    fn test_ensure_dir_nested() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a").join("b");
        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/opt/ls"), PathBuf::from("/opt/ls"));
        assert_eq!(expand_home("relative/~/ls"), PathBuf::from("relative/~/ls"));
        assert_eq!(expand_home("~user/ls"), PathBuf::from("~user/ls"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~"), home);
            assert_eq!(expand_home("~/bin/ls"), home.join("bin/ls"));
        }
    }
}
