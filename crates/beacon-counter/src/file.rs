//! File-backed event counter.
//!
//! The file holds the decimal text of the counter and nothing else. Writes go
//! to a sibling temp file which is then renamed over the original, so a crash
//! mid-write leaves either the old value or the new one, never a torn file.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{PersistenceError, Result};
use crate::store::CounterStore;

const TMP_SUFFIX: &str = ".beacon_tmp";

pub struct FileCounter {
    path: PathBuf,
}

impl FileCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("counter"));
        name.push(TMP_SUFFIX);
        self.path.with_file_name(name)
    }
}

/// Parse persisted counter text. Surrounding whitespace is tolerated so a
/// hand-edited file with a trailing newline still loads.
fn parse_counter(path: &Path, contents: &str) -> Result<u64> {
    contents
        .trim()
        .parse::<u64>()
        .map_err(|_| PersistenceError::Parse {
            path: path.to_path_buf(),
            contents: contents.to_string(),
        })
}

#[async_trait]
impl CounterStore for FileCounter {
    /// A missing file means no event has been recorded yet.
    async fn read(&self) -> Result<u64> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => parse_counter(&self.path, &contents),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "counter file absent, starting at 0");
                Ok(0)
            }
            Err(source) => Err(PersistenceError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    async fn write(&self, value: u64) -> Result<()> {
        let write_err = |source: std::io::Error| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp = self.tmp_path();
        let written = match tokio::fs::write(&tmp, value.to_string()).await {
            Ok(()) => tokio::fs::rename(&tmp, &self.path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // Best effort: a half-written temp file must not linger.
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }

        debug!(path = %self.path.display(), value, "counter persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn counter_in(dir: &tempfile::TempDir) -> FileCounter {
        FileCounter::new(dir.path().join("eventID.txt"))
    }

    #[tokio::test]
    async fn absent_file_reads_as_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let counter = counter_in(&dir);
        assert_eq!(counter.read().await.expect("read"), 0);
    }

    #[tokio::test]
    async fn write_persists_plain_decimal_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let counter = counter_in(&dir);

        counter.write(1).await.expect("write");
        assert_eq!(fs::read_to_string(counter.path()).expect("read"), "1");

        counter.write(42).await.expect("write");
        assert_eq!(fs::read_to_string(counter.path()).expect("read"), "42");
        assert_eq!(counter.read().await.expect("read"), 42);
    }

    #[tokio::test]
    async fn write_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let counter = counter_in(&dir);
        counter.write(7).await.expect("write");

        let names: Vec<_> = fs::read_dir(dir.path())
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("eventID.txt")]);
    }

    #[tokio::test]
    async fn trailing_newline_is_tolerated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let counter = counter_in(&dir);
        fs::write(counter.path(), "17\n").expect("write");
        assert_eq!(counter.read().await.expect("read"), 17);
    }

    #[tokio::test]
    async fn garbage_contents_fail_to_parse() {
        let dir = tempfile::tempdir().expect("tempdir");
        let counter = counter_in(&dir);
        fs::write(counter.path(), "not-a-number").expect("write");

        match counter.read().await {
            Err(PersistenceError::Parse { contents, .. }) => assert_eq!(contents, "not-a-number"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_file_fails_to_parse() {
        let dir = tempfile::tempdir().expect("tempdir");
        let counter = counter_in(&dir);
        fs::write(counter.path(), "").expect("write");
        assert!(matches!(
            counter.read().await,
            Err(PersistenceError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn directory_in_place_of_file_is_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let counter = FileCounter::new(dir.path());
        assert!(matches!(
            counter.read().await,
            Err(PersistenceError::Read { .. })
        ));
    }

    #[tokio::test]
    async fn failed_temp_write_keeps_previous_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("eventID.txt");
        std::fs::write(&path, "7").expect("seed");
        let counter = FileCounter::new(&path);
        // A directory squatting on the temp name makes the temp write fail.
        std::fs::create_dir(counter.tmp_path()).expect("squat");

        assert!(matches!(
            counter.write(8).await,
            Err(PersistenceError::Write { .. })
        ));
        assert_eq!(counter.read().await.expect("read"), 7);
        assert!(counter.tmp_path().is_dir(), "cleanup must not touch directories");

        std::fs::remove_dir(counter.tmp_path()).expect("unsquat");
        counter.write(8).await.expect("write");
        assert_eq!(counter.read().await.expect("read"), 8);
        assert!(!counter.tmp_path().exists());
    }

    #[tokio::test]
    async fn write_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let counter = FileCounter::new(dir.path().join("state/nested/eventID.txt"));
        counter.write(3).await.expect("write");
        assert_eq!(counter.read().await.expect("read"), 3);
    }
}
