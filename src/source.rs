//! Where snapshot files come from.
//!
//! The pipeline only needs two operations from a store: list the candidate
//! files and fetch one file's bytes. [`LocalFolderSource`] implements them
//! over a directory on disk.

use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::SourceError;

/// A file as reported by a [`SnapshotSource`] listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    /// Display name; this is what the classifier reads.
    pub name: String,
    pub modified_time: Option<String>,
    pub mime_type: String,
}

pub trait SnapshotSource {
    /// List spreadsheet/CSV files, optionally restricted to a folder.
    fn list(&self, folder: Option<&str>) -> Result<Vec<RemoteFile>, SourceError>;

    /// Raw bytes of a listed file.
    fn fetch(&self, id: &str, mime_type: &str) -> Result<Vec<u8>, SourceError>;
}

/// Extension → MIME type for every file type a listing accepts.
const MIME_TYPES: &[(&str, &str)] = &[
    ("csv", "text/csv"),
    ("tsv", "text/tab-separated-values"),
    ("json", "application/json"),
    ("parquet", "application/vnd.apache.parquet"),
    ("pq", "application/vnd.apache.parquet"),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
];

pub fn mime_type_for(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    MIME_TYPES
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|&(_, mime)| mime)
}

// ---------------------------------------------------------------------------
// LocalFolderSource
// ---------------------------------------------------------------------------

/// Snapshot files in a local directory (non-recursive). The folder filter
/// selects a sub-directory of the root.
#[derive(Debug, Clone)]
pub struct LocalFolderSource {
    root: PathBuf,
}

impl LocalFolderSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalFolderSource { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Only plain names below the root; no `..`, root or drive prefix.
    fn is_contained(relative: &Path) -> bool {
        relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    }

    fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SourceError + '_ {
        move |source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl SnapshotSource for LocalFolderSource {
    fn list(&self, folder: Option<&str>) -> Result<Vec<RemoteFile>, SourceError> {
        let dir = match folder {
            Some(sub) if !sub.is_empty() => {
                if !Self::is_contained(Path::new(sub)) {
                    return Err(SourceError::OutsideRoot(sub.to_string()));
                }
                self.root.join(sub)
            }
            _ => self.root.clone(),
        };
        if !dir.is_dir() {
            return Err(SourceError::FolderNotFound(dir));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir).map_err(Self::io_error(&dir))? {
            let entry = entry.map_err(Self::io_error(&dir))?;
            let path = entry.path();
            let metadata = entry.metadata().map_err(Self::io_error(&path))?;
            if !metadata.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(mime_type) = mime_type_for(&name) else {
                log::debug!("Skipping {name}: not a spreadsheet or CSV file");
                continue;
            };
            let modified_time = metadata
                .modified()
                .ok()
                .map(|t| DateTime::<Local>::from(t).to_rfc3339());
            files.push(RemoteFile {
                id: path.to_string_lossy().into_owned(),
                name,
                modified_time,
                mime_type: mime_type.to_string(),
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        log::info!("Found {} snapshot files in {}", files.len(), dir.display());
        Ok(files)
    }

    fn fetch(&self, id: &str, _mime_type: &str) -> Result<Vec<u8>, SourceError> {
        let path = Path::new(id);
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return Err(SourceError::UnknownFile(id.to_string()));
        };
        if !Self::is_contained(relative) {
            return Err(SourceError::OutsideRoot(id.to_string()));
        }
        fs::read(path).map_err(Self::io_error(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_for_known_extensions() {
        assert_eq!(mime_type_for("a.CSV"), Some("text/csv"));
        assert!(mime_type_for("Japan Jan 08 2026.xlsx").is_some_and(|m| m.contains("spreadsheetml")));
        assert_eq!(mime_type_for("notes.md"), None);
        assert_eq!(mime_type_for("no_extension"), None);
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b UK Jan 1 2025.csv"), "Ticker\nA\n").unwrap();
        fs::write(dir.path().join("a Japan Jan 1 2025.csv"), "Ticker\nB\n").unwrap();
        fs::write(dir.path().join("readme.md"), "ignore me").unwrap();
        fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let source = LocalFolderSource::new(dir.path());
        let files = source.list(None).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a Japan Jan 1 2025.csv", "b UK Jan 1 2025.csv"]);
        assert!(files.iter().all(|f| f.modified_time.is_some()));
        assert_eq!(files[0].mime_type, "text/csv");

        let bytes = source.fetch(&files[0].id, &files[0].mime_type).unwrap();
        assert_eq!(bytes, b"Ticker\nB\n");
    }

    #[test]
    fn test_list_sub_folder_and_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("2025")).unwrap();
        fs::write(dir.path().join("2025").join("US 20250311.csv"), "Ticker\nA\n").unwrap();

        let source = LocalFolderSource::new(dir.path());
        assert_eq!(source.list(Some("2025")).unwrap().len(), 1);
        assert!(matches!(
            source.list(Some("1999")),
            Err(SourceError::FolderNotFound(_))
        ));
    }

    #[test]
    fn test_fetch_outside_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalFolderSource::new(dir.path());
        assert!(matches!(
            source.fetch("/etc/passwd", "text/csv"),
            Err(SourceError::UnknownFile(_))
        ));
    }

    #[test]
    fn test_parent_dir_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir(&root).unwrap();
        fs::write(dir.path().join("secret.csv"), "SECRET").unwrap();
        let source = LocalFolderSource::new(&root);

        let sneaky = root.join("..").join("secret.csv");
        assert!(matches!(
            source.fetch(&sneaky.to_string_lossy(), "text/csv"),
            Err(SourceError::OutsideRoot(_))
        ));
        assert!(matches!(
            source.list(Some("..")),
            Err(SourceError::OutsideRoot(_))
        ));
        assert!(matches!(
            source.list(Some("/tmp")),
            Err(SourceError::OutsideRoot(_))
        ));
    }
}
