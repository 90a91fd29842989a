//! Per-command text logs.
//!
//! One file per command at `<base>.<n>`, `n` being the command's 0-based
//! position in the list, each holding only that command's output with a
//! timestamp per chunk.

use async_trait::async_trait;
use logunify_core::{assign_columns, Column, CommandDescriptor, Event, EventSink, SinkError};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, trace};

/// Split log errors
#[derive(Debug, thiserror::Error)]
pub enum SplitLogError {
    /// A split file could not be created
    #[error("Cannot create split log {}: {source}", path.display())]
    Create {
        /// File path
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// Writing to a split file failed
    #[error("Split log write failed for column {column}: {source}")]
    Write {
        /// Column of the failing file
        column: Column,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },
}

impl From<SplitLogError> for SinkError {
    fn from(err: SplitLogError) -> Self {
        match err {
            SplitLogError::Create { source, .. } | SplitLogError::Write { source, .. } => {
                SinkError::Io(source)
            }
        }
    }
}

struct SplitFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

/// Writer for the per-command files
pub struct SplitLog {
    base: PathBuf,
    files: Vec<SplitFile>,
}

impl SplitLog {
    /// Path of the split file for the command at 0-based `position`
    #[must_use]
    pub fn path_for(base: &Path, position: usize) -> PathBuf {
        let mut name = base.as_os_str().to_os_string();
        name.push(format!(".{position}"));
        PathBuf::from(name)
    }

    /// Create one file per command and write its header line
    ///
    /// # Errors
    ///
    /// Returns error if any file cannot be created or written
    pub async fn create(base: &Path, commands: &[CommandDescriptor]) -> Result<Self, SplitLogError> {
        let mut files = Vec::with_capacity(commands.len());
        for (position, (column, command)) in assign_columns(commands).enumerate() {
            let path = Self::path_for(base, position);
            let file = File::create(&path)
                .await
                .map_err(|source| SplitLogError::Create {
                    path: path.clone(),
                    source,
                })?;
            let mut writer = BufWriter::new(file);
            writer
                .write_all(format!("# {column}: {command}\n").as_bytes())
                .await
                .map_err(|source| SplitLogError::Write { column, source })?;
            debug!(path = %path.display(), %column, "created split log");
            files.push(SplitFile { path, writer });
        }
        Ok(Self {
            base: base.to_path_buf(),
            files,
        })
    }

    /// Base path the files are named after
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Paths of all split files, in column order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|file| file.path.as_path())
    }

    /// Append an event to its command's file; other columns are ignored
    ///
    /// # Errors
    ///
    /// Returns error if the write fails
    pub async fn write(&mut self, event: &Event) -> Result<(), SplitLogError> {
        let Some(file) = event
            .column
            .position()
            .and_then(|position| self.files.get_mut(position))
        else {
            trace!(column = %event.column, "no split log for column");
            return Ok(());
        };

        let entry = format!("\n{}: {}\n", event.timestamp.format_stamp(), event.text);
        file.writer
            .write_all(entry.as_bytes())
            .await
            .map_err(|source| SplitLogError::Write {
                column: event.column,
                source,
            })
    }

    /// Flush and close every file
    ///
    /// # Errors
    ///
    /// Returns the first flush failure; remaining files are still closed
    pub async fn close(&mut self) -> Result<(), SplitLogError> {
        let mut first_error = None;
        for (column, mut file) in self
            .files
            .drain(..)
            .enumerate()
            .map(|(position, file)| (Column::for_position(position), file))
        {
            if let Err(source) = file.writer.shutdown().await {
                first_error.get_or_insert(SplitLogError::Write { column, source });
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl EventSink for SplitLog {
    fn name(&self) -> &str {
        "split-log"
    }

    async fn write(&mut self, event: &Event) -> Result<(), SinkError> {
        SplitLog::write(self, event).await.map_err(SinkError::from)
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        self.close().await.map_err(SinkError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logunify_core::Timestamp;
    use tempfile::tempdir;

    fn commands() -> Vec<CommandDescriptor> {
        vec![CommandDescriptor::once("dmesg"), CommandDescriptor::looping("date", 1000)]
    }

    #[test]
    fn test_path_for_appends_position() {
        let path = SplitLog::path_for(Path::new("/tmp/run.log"), 1);
        assert_eq!(path, PathBuf::from("/tmp/run.log.1"));
    }

    #[tokio::test]
    async fn test_creates_one_file_per_command() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("run.log");
        let mut split = SplitLog::create(&base, &commands()).await.unwrap();
        assert_eq!(split.paths().count(), 2);
        split.close().await.unwrap();

        let mut entries: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        assert_eq!(entries, vec!["run.log.0", "run.log.1"]);

        let header = std::fs::read_to_string(SplitLog::path_for(&base, 1)).unwrap();
        assert_eq!(header, "# 2: date (loop: true, intervalMs: 1000)\n");
    }

    #[tokio::test]
    async fn test_event_lands_only_in_its_column() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("run.log");
        let mut split = SplitLog::create(&base, &commands()).await.unwrap();

        let event = Event::at(Timestamp::new(0, 0), Column::new(2), "Thu Jan  1");
        split.write(&event).await.unwrap();
        split.write(&Event::now(Column::new(9), "ignored")).await.unwrap();
        split.close().await.unwrap();

        let first = std::fs::read_to_string(SplitLog::path_for(&base, 0)).unwrap();
        let second = std::fs::read_to_string(SplitLog::path_for(&base, 1)).unwrap();
        assert!(!first.contains("Thu Jan"));
        let expected = format!("\n{}: Thu Jan  1\n", event.timestamp.format_stamp());
        assert!(second.ends_with(&expected), "{second:?}");
        assert!(!second.contains("ignored"));
    }

    #[tokio::test]
    async fn test_create_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("missing").join("run.log");
        let err = SplitLog::create(&base, &commands()).await.err().unwrap();
        assert!(matches!(err, SplitLogError::Create { .. }));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut split = SplitLog::create(&dir.path().join("x"), &commands()).await.unwrap();
        let sink: &mut dyn EventSink = &mut split;
        assert_eq!(sink.name(), "split-log");
        sink.finish().await.unwrap();
        split.close().await.unwrap();
        assert_eq!(split.paths().count(), 0);
    }
}
