use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::record::{LogLevel, LogRecord};
use crate::sink::Sink;

// Millisecond resolution keeps rotations in quick succession from renaming
// onto the same archive.
const ARCHIVE_STAMP: &str = "%Y%m%d%H%M%S%3f";

/// Rotate once the active file exceeds either bound, whichever comes first.
/// Archives older than `max_age_days` are pruned after each rotation.
#[derive(Debug, Clone, Copy)]
pub struct RotationPolicy {
    pub max_size_bytes: u64,
    pub max_age_days: u32,
}

struct FileState {
    opened_at: DateTime<Utc>,
    size: u64,
}

/// Append-only file destination with size/age rotation. Lines use the same
/// format as the console: timestamp, level, component, message, metadata.
///
/// `level` caps how verbose a record this file accepts: `Some(Error)` keeps
/// only error records, `None` keeps everything.
pub struct RollingFileSink {
    path: PathBuf,
    level: Option<LogLevel>,
    policy: RotationPolicy,
    state: Mutex<Option<FileState>>,
}

impl RollingFileSink {
    pub fn new(path: impl Into<PathBuf>, level: Option<LogLevel>, policy: RotationPolicy) -> Self {
        Self {
            path: path.into(),
            level,
            policy,
            state: Mutex::new(None),
        }
    }

    fn max_age(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.policy.max_age_days))
    }

    /// Pick up size and age of a pre-existing active file on first write.
    async fn init_state(&self) -> FileState {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => {
                let opened_at = meta
                    .created()
                    .or_else(|_| meta.modified())
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                FileState {
                    opened_at,
                    size: meta.len(),
                }
            }
            Err(_) => FileState {
                opened_at: Utc::now(),
                size: 0,
            },
        }
    }

    fn archive_path(&self, now: DateTime<Utc>) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("log");
        let ext = self
            .path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("log");
        self.path
            .with_file_name(format!("{stem}.{}.{ext}", now.format(ARCHIVE_STAMP)))
    }

    async fn rotate(&self, state: &mut FileState) -> Result<(), Box<dyn Error + Send + Sync>> {
        let now = Utc::now();
        if state.size > 0 {
            tokio::fs::rename(&self.path, self.archive_path(now)).await?;
        }
        state.opened_at = now;
        state.size = 0;
        self.prune_archives(now).await;
        Ok(())
    }

    /// Delete archives older than the retention age. Best effort; a failure
    /// here never fails the write that triggered it.
    async fn prune_archives(&self, now: DateTime<Utc>) {
        let Some(dir) = self.path.parent() else {
            return;
        };
        let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let Some(stamp) = archive_stamp(&self.path, Path::new(&name)) else {
                continue;
            };
            if now - stamp.and_utc() > self.max_age() {
                let _ = tokio::fs::remove_file(entry.path()).await;
            }
        }
    }
}

/// Extract the timestamp from an archive file name belonging to `active`,
/// e.g. `fitness-app.20260830101500123.log` for `fitness-app.log`.
fn archive_stamp(active: &Path, candidate: &Path) -> Option<NaiveDateTime> {
    let stem = active.file_stem()?.to_str()?;
    let ext = active.extension()?.to_str()?;
    let name = candidate.file_name()?.to_str()?;
    let middle = name
        .strip_prefix(stem)?
        .strip_prefix('.')?
        .strip_suffix(ext)?
        .strip_suffix('.')?;
    NaiveDateTime::parse_from_str(middle, ARCHIVE_STAMP).ok()
}

#[async_trait]
impl Sink for RollingFileSink {
    async fn write(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(max) = self.level {
            if record.level > max {
                return Ok(());
            }
        }

        let mut guard = self.state.lock().await;
        if guard.is_none() {
            *guard = Some(self.init_state().await);
        }
        let state = guard.as_mut().expect("state initialized above");

        if state.size > self.policy.max_size_bytes || Utc::now() - state.opened_at > self.max_age()
        {
            self.rotate(state).await?;
        }

        let mut line = record.format_line();
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        state.size += line.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RotationPolicy {
        RotationPolicy {
            max_size_bytes: 10 * 1024 * 1024,
            max_age_days: 7,
        }
    }

    fn record(level: LogLevel, message: &str) -> LogRecord {
        LogRecord::new(level, "backend", message)
    }

    #[tokio::test]
    async fn error_filter_drops_less_severe_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fitness-app-error.log");
        let sink = RollingFileSink::new(&path, Some(LogLevel::Error), policy());

        sink.write(&record(LogLevel::Info, "ignored")).await.unwrap();
        sink.write(&record(LogLevel::Error, "kept")).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("kept"));
        assert!(!contents.contains("ignored"));
        assert_eq!(contents.lines().count(), 1);
    }

    #[tokio::test]
    async fn unfiltered_sink_keeps_every_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fitness-app.log");
        let sink = RollingFileSink::new(&path, None, policy());

        for level in [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
        ] {
            sink.write(&record(level, "entry")).await.unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 4);
    }

    #[tokio::test]
    async fn rotates_when_size_threshold_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fitness-app.log");
        let sink = RollingFileSink::new(
            &path,
            None,
            RotationPolicy {
                max_size_bytes: 32,
                max_age_days: 7,
            },
        );

        sink.write(&record(LogLevel::Info, "first entry, longer than the threshold"))
            .await
            .unwrap();
        sink.write(&record(LogLevel::Info, "second entry lands in a fresh file"))
            .await
            .unwrap();

        let archives: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                archive_stamp(&path, Path::new(&e.file_name())).is_some()
            })
            .collect();
        assert_eq!(archives.len(), 1);

        let active = std::fs::read_to_string(&path).unwrap();
        assert!(active.contains("second entry"));
        assert!(!active.contains("first entry"));
    }

    #[tokio::test]
    async fn rotates_when_age_threshold_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fitness-app.log");
        // Zero-day retention makes any elapsed time an expired age.
        let sink = RollingFileSink::new(
            &path,
            None,
            RotationPolicy {
                max_size_bytes: 10 * 1024 * 1024,
                max_age_days: 0,
            },
        );

        sink.write(&record(LogLevel::Info, "first entry")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        sink.write(&record(LogLevel::Info, "second entry")).await.unwrap();

        // Well under the size threshold, so only the age branch can have
        // moved the first entry out of the active file.
        let active = std::fs::read_to_string(&path).unwrap();
        assert_eq!(active.lines().count(), 1);
        assert!(active.contains("second entry"));
        assert!(!active.contains("first entry"));
    }

    #[tokio::test]
    async fn prunes_archives_older_than_retention() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fitness-app.log");

        let expired = dir.path().join("fitness-app.20200101000000000.log");
        std::fs::write(&expired, "ancient\n").unwrap();
        let recent_stamp = (Utc::now() - TimeDelta::days(1)).format(ARCHIVE_STAMP);
        let recent = dir.path().join(format!("fitness-app.{recent_stamp}.log"));
        std::fs::write(&recent, "recent\n").unwrap();
        let unrelated = dir.path().join("fitness-app-error.20200101000000000.log");
        std::fs::write(&unrelated, "other output's archive\n").unwrap();

        let sink = RollingFileSink::new(
            &path,
            None,
            RotationPolicy {
                max_size_bytes: 16,
                max_age_days: 7,
            },
        );
        sink.write(&record(LogLevel::Info, "fills the file past the threshold"))
            .await
            .unwrap();
        sink.write(&record(LogLevel::Info, "triggers the rotation"))
            .await
            .unwrap();

        assert!(!expired.exists());
        assert!(recent.exists());
        assert!(unrelated.exists());
    }

    #[tokio::test]
    async fn rotations_in_quick_succession_keep_distinct_archives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fitness-app.log");
        let sink = RollingFileSink::new(
            &path,
            None,
            RotationPolicy {
                max_size_bytes: 16,
                max_age_days: 7,
            },
        );

        for message in ["first entry", "second entry", "third entry"] {
            sink.write(&record(LogLevel::Info, message)).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let archives: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| archive_stamp(&path, Path::new(&e.file_name())).is_some())
            .collect();
        assert_eq!(archives.len(), 2);
    }

    #[test]
    fn archive_stamp_parses_only_matching_names() {
        let active = Path::new("logs/fitness-app.log");
        assert!(archive_stamp(active, Path::new("fitness-app.20260830101500123.log")).is_some());
        assert!(archive_stamp(active, Path::new("fitness-app.log")).is_none());
        assert!(
            archive_stamp(active, Path::new("fitness-app-error.20260830101500123.log")).is_none()
        );
        assert!(archive_stamp(active, Path::new("fitness-app.notadate.log")).is_none());
    }
}
