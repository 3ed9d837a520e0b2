// ============================================
// Interaction Recorder
// ============================================
//
// Append-only JSON-lines log of served recommendations and user feedback,
// consumed offline to compare engines. Recording is best effort: a failed
// append is logged and counted but never fails the request that caused it.

use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::InteractionEvent;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Destination for interaction events
#[async_trait]
pub trait InteractionSink: Send + Sync {
    async fn append(&self, event: &InteractionEvent) -> Result<()>;
}

/// Writes whole lines; a line cut short by an error is terminated before
/// the next one so later lines still parse
struct LineWriter<W> {
    inner: W,
    partial: bool,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            partial: false,
        }
    }

    async fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        if self.partial {
            self.inner.write_all(b"\n").await?;
            self.partial = false;
        }

        let mut written = 0;
        while written < line.len() {
            match self.inner.write(&line[written..]).await {
                Ok(0) => {
                    self.partial = written > 0;
                    return Err(std::io::ErrorKind::WriteZero.into());
                }
                Ok(n) => written += n,
                Err(e) => {
                    self.partial = written > 0;
                    return Err(e);
                }
            }
        }
        self.inner.flush().await
    }
}

/// One JSON object per line, appended to a single file
pub struct JsonLinesSink {
    path: PathBuf,
    /// Single writer; holding the lock for the whole line keeps lines intact
    file: Mutex<LineWriter<File>>,
}

impl JsonLinesSink {
    /// Open (creating if missing) the log in append mode
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::RecorderIo(format!("{}: {}", parent.display(), e)))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AppError::RecorderIo(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), "Interaction log opened");
        Ok(Self {
            path,
            file: Mutex::new(LineWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InteractionSink for JsonLinesSink {
    async fn append(&self, event: &InteractionEvent) -> Result<()> {
        let mut line = serde_json::to_vec(event)
            .map_err(|e| AppError::RecorderIo(format!("failed to encode event: {}", e)))?;
        line.push(b'\n');

        self.file
            .lock()
            .await
            .write_line(&line)
            .await
            .map_err(|e| AppError::RecorderIo(e.to_string()))
    }
}

/// Best-effort front for a sink
#[derive(Clone)]
pub struct InteractionRecorder {
    sink: Arc<dyn InteractionSink>,
}

impl InteractionRecorder {
    pub fn new(sink: Arc<dyn InteractionSink>) -> Self {
        Self { sink }
    }

    /// Append an event; failures stay inside the recorder
    pub async fn record(&self, event: InteractionEvent) {
        match self.sink.append(&event).await {
            Ok(()) => {
                debug!(
                    engine = %event.engine,
                    action = event.action.as_str(),
                    "Interaction recorded"
                );
            }
            Err(e) => {
                metrics::record_recorder_failure();
                warn!(
                    engine = %event.engine,
                    action = event.action.as_str(),
                    error = %e,
                    "Failed to record interaction"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, EngineName, ItemId};
    use tempfile::TempDir;

    /// Accepts `budget` bytes, then fails every write until the budget is lifted
    struct FlakyWriter {
        data: Vec<u8>,
        budget: Option<usize>,
    }

    impl AsyncWrite for FlakyWriter {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            let this = self.get_mut();
            let accepted = match this.budget {
                None => buf.len(),
                Some(0) => {
                    return std::task::Poll::Ready(Err(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "disk full",
                    )))
                }
                Some(n) => {
                    let k = n.min(buf.len());
                    this.budget = Some(n - k);
                    k
                }
            };
            this.data.extend_from_slice(&buf[..accepted]);
            std::task::Poll::Ready(Ok(accepted))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    fn encoded(event: &InteractionEvent) -> Vec<u8> {
        let mut line = serde_json::to_vec(event).unwrap();
        line.push(b'\n');
        line
    }

    struct FailingSink;

    #[async_trait]
    impl InteractionSink for FailingSink {
        async fn append(&self, _event: &InteractionEvent) -> Result<()> {
            Err(AppError::RecorderIo("disk full".to_string()))
        }
    }

    async fn read_events(path: &Path) -> Vec<InteractionEvent> {
        let raw = tokio::fs::read_to_string(path).await.unwrap();
        raw.lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_events_roundtrip_through_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.jsonl");
        let sink = JsonLinesSink::open(&path).await.unwrap();

        let served = InteractionEvent::recommend(EngineName::Combined, vec![ItemId(10), ItemId(20)]);
        let rated = InteractionEvent::feedback(
            EngineName::Neural,
            vec![ItemId(10)],
            ItemId(30),
            Action::Rate,
            Some(4),
        );
        sink.append(&served).await.unwrap();
        sink.append(&rated).await.unwrap();

        let events = read_events(&path).await;
        assert_eq!(events, vec![served, rated]);
    }

    #[tokio::test]
    async fn test_reopen_appends_instead_of_truncating() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("records.jsonl");

        let event = InteractionEvent::recommend(EngineName::Random, vec![ItemId(1)]);
        JsonLinesSink::open(&path).await.unwrap().append(&event).await.unwrap();
        JsonLinesSink::open(&path).await.unwrap().append(&event).await.unwrap();

        assert_eq!(read_events(&path).await.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_appends_never_interleave() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.jsonl");
        let recorder = InteractionRecorder::new(Arc::new(JsonLinesSink::open(&path).await.unwrap()));

        let tasks: Vec<_> = (0..64u64)
            .map(|i| {
                let recorder = recorder.clone();
                tokio::spawn(async move {
                    let queries = (0..50).map(|j| ItemId(i * 1000 + j)).collect();
                    recorder
                        .record(InteractionEvent::recommend(EngineName::Content, queries))
                        .await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let events = read_events(&path).await;
        assert_eq!(events.len(), 64);
        assert!(events.iter().all(|e| e.queries.len() == 50));
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let recorder = InteractionRecorder::new(Arc::new(FailingSink));
        recorder
            .record(InteractionEvent::recommend(EngineName::Vector, vec![ItemId(1)]))
            .await;
    }

    #[tokio::test]
    async fn test_line_after_partial_write_still_parses() {
        let mut writer = LineWriter::new(FlakyWriter {
            data: Vec::new(),
            budget: Some(5),
        });
        let lost = InteractionEvent::recommend(EngineName::Genre, vec![ItemId(1)]);
        let kept = InteractionEvent::feedback(
            EngineName::Vector,
            vec![ItemId(1)],
            ItemId(2),
            Action::Click,
            None,
        );

        assert!(writer.write_line(&encoded(&lost)).await.is_err());
        assert_eq!(writer.inner.data.len(), 5);

        writer.inner.budget = None;
        writer.write_line(&encoded(&kept)).await.unwrap();

        let raw = String::from_utf8(writer.inner.data.clone()).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: InteractionEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, kept);
    }

    #[tokio::test]
    async fn test_failed_write_with_nothing_written_adds_no_blank_line() {
        let mut writer = LineWriter::new(FlakyWriter {
            data: Vec::new(),
            budget: Some(0),
        });
        let event = InteractionEvent::recommend(EngineName::Random, vec![ItemId(3)]);

        assert!(writer.write_line(&encoded(&event)).await.is_err());
        writer.inner.budget = None;
        writer.write_line(&encoded(&event)).await.unwrap();

        assert_eq!(writer.inner.data, encoded(&event));
    }

    #[tokio::test]
    async fn test_unwritable_location_is_recorder_error() {
        let dir = TempDir::new().unwrap();
        // a directory cannot be opened as the log file
        let result = JsonLinesSink::open(dir.path()).await;
        assert!(matches!(result, Err(AppError::RecorderIo(_))));
    }
}
