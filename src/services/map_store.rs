//! School map images on the local filesystem, one file per school.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::database::models::School;

/// Accepted upload extensions, checked case-insensitively
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Debug, Error)]
pub enum MapError {
    #[error("Unsupported map format '{0}', expected png, jpg or jpeg")]
    UnsupportedExtension(String),

    #[error("Map exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("School id '{0}' cannot name a map file")]
    InvalidSchoolId(String),

    #[error("No map uploaded for school {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A stored map and the content type to serve it with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

#[derive(Debug, Clone)]
pub struct MapStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl MapStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Lowercased extension of an uploaded file name, if it is one we accept
    pub fn extension_of(filename: &str) -> Result<String, MapError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            Ok(ext)
        } else {
            Err(MapError::UnsupportedExtension(ext))
        }
    }

    pub fn content_type(ext: &str) -> &'static str {
        match ext {
            "png" => "image/png",
            _ => "image/jpeg",
        }
    }

    // The id is used verbatim as the file stem
    fn check_id(school_id: &str) -> Result<(), MapError> {
        if School::is_valid_id(school_id) {
            Ok(())
        } else {
            Err(MapError::InvalidSchoolId(school_id.to_string()))
        }
    }

    fn path_for(&self, school_id: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", school_id, ext))
    }

    /// Replace the school's map. Files with other extensions for the same
    /// school are removed so exactly one map remains.
    pub async fn store(&self, school_id: &str, filename: &str, bytes: &[u8]) -> Result<PathBuf, MapError> {
        Self::check_id(school_id)?;
        let ext = Self::extension_of(filename)?;
        if bytes.len() > self.max_bytes {
            return Err(MapError::TooLarge { limit: self.max_bytes });
        }

        fs::create_dir_all(&self.dir).await?;

        let target = self.path_for(school_id, &ext);
        let staging = self.dir.join(format!(".{}.{}.upload", school_id, ext));
        fs::write(&staging, bytes).await?;
        fs::rename(&staging, &target).await?;

        for other in ALLOWED_EXTENSIONS.iter().filter(|e| **e != ext) {
            match fs::remove_file(self.path_for(school_id, other)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        info!("Stored map for school {} ({} bytes)", school_id, bytes.len());
        Ok(target)
    }

    pub async fn load(&self, school_id: &str) -> Result<MapFile, MapError> {
        Self::check_id(school_id)?;
        for ext in ALLOWED_EXTENSIONS {
            match fs::read(self.path_for(school_id, ext)).await {
                Ok(bytes) => {
                    return Ok(MapFile {
                        bytes,
                        content_type: Self::content_type(ext),
                    })
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(MapError::NotFound(school_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_image_extensions() {
        assert_eq!(MapStore::extension_of("campus.PNG").unwrap(), "png");
        assert_eq!(MapStore::extension_of("campus.jpeg").unwrap(), "jpeg");
        assert!(matches!(
            MapStore::extension_of("campus.gif"),
            Err(MapError::UnsupportedExtension(ext)) if ext == "gif"
        ));
        assert!(MapStore::extension_of("campus").is_err());
    }

    #[tokio::test]
    async fn replaces_previous_upload_with_other_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = MapStore::new(dir.path(), 1024);

        store.store("S1", "old.png", b"png-bytes").await.unwrap();
        store.store("S1", "new.jpg", b"jpg-bytes").await.unwrap();

        assert!(!dir.path().join("S1.png").exists());
        let map = store.load("S1").await.unwrap();
        assert_eq!(map.bytes, b"jpg-bytes");
        assert_eq!(map.content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn school_prefix_does_not_match_another_school() {
        let dir = tempfile::tempdir().unwrap();
        let store = MapStore::new(dir.path(), 1024);

        store.store("S10", "map.png", b"ten").await.unwrap();
        assert!(matches!(store.load("S1").await, Err(MapError::NotFound(_))));
    }

    #[tokio::test]
    async fn rejects_oversized_upload() {
        let dir = tempfile::tempdir().unwrap();
        let store = MapStore::new(dir.path(), 4);

        let err = store.store("S1", "map.png", b"too large").await.unwrap_err();
        assert!(matches!(err, MapError::TooLarge { limit: 4 }));
    }

    #[tokio::test]
    async fn school_id_outside_file_name_charset_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = MapStore::new(dir.path().join("maps"), 1024);

        for bad in ["../evil", "S/1", "S 1", ""] {
            assert!(
                matches!(store.store(bad, "map.png", b"x").await, Err(MapError::InvalidSchoolId(_))),
                "{:?}",
                bad
            );
        }

        // Distinct valid ids never share a file
        store.store("S_1", "map.png", b"underscore").await.unwrap();
        store.store("S-1", "map.png", b"dash").await.unwrap();
        assert_eq!(store.load("S_1").await.unwrap().bytes, b"underscore");
        assert_eq!(store.load("S-1").await.unwrap().bytes, b"dash");
        assert!(matches!(store.load("S/1").await, Err(MapError::InvalidSchoolId(_))));
    }
}
