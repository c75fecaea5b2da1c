//! Temporary files for uploads.
//!
//! An upload is written to disk under a name derived from its target path and
//! content prefix, attached to the request as a file part, and removed when
//! the returned guard is dropped, whether or not the request succeeded.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::TempPath;

use crate::error::Result;
use crate::http::FilePart;

/// Number of content characters mixed into the staged file name.
const NAME_PREFIX_CHARS: usize = 256;

/// An upload written to disk. The file is deleted when this is dropped.
#[derive(Debug)]
pub struct StagedUpload {
    path: TempPath,
    filename: String,
    content_type: String,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Delete the staged file now, reporting failures that `Drop` would
    /// swallow.
    pub fn remove(self) -> std::io::Result<()> {
        self.path.close()
    }

    /// Describe the staged file as the multipart field `field`.
    pub fn file_part(&self, field: &str) -> FilePart {
        FilePart {
            field: field.to_string(),
            filename: self.filename.clone(),
            content_type: self.content_type.clone(),
            path: self.path.to_path_buf(),
        }
    }
}

/// File name for an upload of `content` to `target`: a SHA-256 over the
/// target and the first 256 characters of the content.
pub fn staged_name(target: &str, content: &[u8]) -> String {
    let prefix: String = String::from_utf8_lossy(content)
        .chars()
        .take(NAME_PREFIX_CHARS)
        .collect();
    let digest = Sha256::new()
        .chain_update(target.as_bytes())
        .chain_update(b":")
        .chain_update(prefix.as_bytes())
        .finalize();
    format!("{}.tmp", hex::encode(digest))
}

/// Write `content` into `dir` for upload to `target`.
pub fn stage_upload(dir: &Path, target: &str, content: &[u8]) -> Result<StagedUpload> {
    let filename = staged_name(target, content);
    let path = write_guarded(dir.join(&filename), |path| fs::write(path, content))?;

    let content_type = mime_guess::from_path(target)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    Ok(StagedUpload {
        path,
        filename,
        content_type,
    })
}

/// Run `write` with `path` already owned by a guard, so a partially written
/// file is removed when the write fails.
fn write_guarded<F>(path: PathBuf, write: F) -> io::Result<TempPath>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let guard = TempPath::from_path(path);
    write(&guard)?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_depends_on_target_and_content() {
        let a = staged_name("img/a.png", b"data");
        assert_eq!(a, staged_name("img/a.png", b"data"));
        assert_ne!(a, staged_name("img/b.png", b"data"));
        assert_ne!(a, staged_name("img/a.png", b"other"));
        assert!(a.ends_with(".tmp"));
        assert_eq!(a.len(), 64 + ".tmp".len());
    }

    #[test]
    fn name_only_looks_at_content_prefix() {
        let base = "x".repeat(256);
        let longer = format!("{base}tail");
        assert_eq!(
            staged_name("doc.txt", base.as_bytes()),
            staged_name("doc.txt", longer.as_bytes())
        );
    }

    #[test]
    fn staged_file_is_written_then_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage_upload(dir.path(), "notes/readme.txt", b"hello").unwrap();
        let path = staged.path().to_path_buf();

        assert_eq!(fs::read(&path).unwrap(), b"hello");
        assert_eq!(staged.content_type(), "text/plain");
        assert_eq!(path.file_name().unwrap(), staged.filename());

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage_upload(dir.path(), "blob", b"\x00\x01").unwrap();
        assert_eq!(staged.content_type(), "application/octet-stream");
    }

    #[test]
    fn file_part_points_at_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage_upload(dir.path(), "a.json", b"{}").unwrap();
        let part = staged.file_part("doc");
        assert_eq!(part.field, "doc");
        assert_eq!(part.filename, staged.filename());
        assert_eq!(part.content_type, "application/json");
        assert_eq!(part.path, staged.path());
    }

    #[test]
    fn failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.tmp");

        let err = write_guarded(path.clone(), |p| {
            fs::write(p, b"half")?;
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "no space left on device");
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let err = stage_upload(Path::new("/nonexistent/dir"), "a.txt", b"x").unwrap_err();
        assert!(matches!(err, crate::StorageError::Io(_)));
    }
}
