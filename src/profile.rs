//! The desk user's display name, kept in a small JSON file in the data
//! directory.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum ProfileError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl From<io::Error> for ProfileError {
    fn from(e: io::Error) -> Self {
        ProfileError::Io(e)
    }
}

impl From<serde_json::Error> for ProfileError {
    fn from(e: serde_json::Error) -> Self {
        ProfileError::Json(e)
    }
}

impl std::fmt::Display for ProfileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileError::Io(e) => write!(f, "profile i/o: {e}"),
            ProfileError::Json(e) => write!(f, "profile file is not valid JSON: {e}"),
        }
    }
}

impl std::error::Error for ProfileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProfileError::Io(e) => Some(e),
            ProfileError::Json(e) => Some(e),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Profile {
    path: PathBuf,
    display_name: Option<String>,
}

impl Profile {
    /// Read the profile at `path`. A missing file is an empty profile.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let display_name = match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice::<ProfileFile>(&bytes)?.display_name,
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            display_name,
        })
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Stored as given. An empty name clears the profile.
    pub fn set_display_name(&mut self, name: &str) -> Result<(), ProfileError> {
        if name.is_empty() {
            return self.clear();
        }
        let file = ProfileFile {
            display_name: Some(name.to_string()),
        };
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&file)?)?;
        self.display_name = file.display_name;
        tracing::debug!(path = %self.path.display(), "profile saved");
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), ProfileError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.display_name = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("roombook_test_profile");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn missing_file_is_empty_profile() {
        let profile = Profile::load(&test_path("missing.json")).unwrap();
        assert_eq!(profile.display_name(), None);
    }

    #[test]
    fn name_survives_reload() {
        let path = test_path("reload.json");
        let mut profile = Profile::load(&path).unwrap();
        profile.set_display_name("  Jung Ha-eun ").unwrap();
        assert_eq!(profile.display_name(), Some("  Jung Ha-eun "));

        let again = Profile::load(&path).unwrap();
        assert_eq!(again.display_name(), Some("  Jung Ha-eun "));
    }

    #[test]
    fn clear_removes_the_file() {
        let path = test_path("clear.json");
        let mut profile = Profile::load(&path).unwrap();
        profile.set_display_name("Kang").unwrap();
        assert!(path.exists());

        profile.clear().unwrap();
        assert!(!path.exists());
        assert_eq!(profile.display_name(), None);
        // Clearing twice is fine.
        profile.clear().unwrap();
    }

    #[test]
    fn empty_name_clears() {
        let path = test_path("empty.json");
        let mut profile = Profile::load(&path).unwrap();
        profile.set_display_name("Kang").unwrap();
        profile.set_display_name("").unwrap();
        assert!(!path.exists());
        assert_eq!(Profile::load(&path).unwrap().display_name(), None);
    }

    #[test]
    fn garbage_file_is_an_error() {
        let path = test_path("garbage.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(Profile::load(&path), Err(ProfileError::Json(_))));
    }
}
