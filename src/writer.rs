use std::collections::BTreeMap;
use tokio::sync::mpsc;

use crate::record::{LogLevel, LogRecord};
use crate::sink::Sink;

/// Cloneable producer handle for the writer pipeline. Pushing a record never
/// blocks and never fails the caller; when the channel is full the record is
/// dropped with a console note.
#[derive(Clone)]
pub struct LogWriter {
    tx: mpsc::Sender<LogRecord>,
    component: String,
}

impl LogWriter {
    pub fn log(&self, record: LogRecord) {
        if self.tx.try_send(record).is_err() {
            eprintln!("log pipeline full, dropping record");
        }
    }

    pub fn error(&self, message: impl Into<String>, metadata: BTreeMap<String, serde_json::Value>) {
        self.emit(LogLevel::Error, message, metadata);
    }

    pub fn warn(&self, message: impl Into<String>, metadata: BTreeMap<String, serde_json::Value>) {
        self.emit(LogLevel::Warn, message, metadata);
    }

    pub fn info(&self, message: impl Into<String>, metadata: BTreeMap<String, serde_json::Value>) {
        self.emit(LogLevel::Info, message, metadata);
    }

    pub fn debug(&self, message: impl Into<String>, metadata: BTreeMap<String, serde_json::Value>) {
        self.emit(LogLevel::Debug, message, metadata);
    }

    fn emit(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) {
        self.log(LogRecord::new(level, self.component.clone(), message).with_metadata(metadata));
    }
}

/// Fans each record out to every sink: console plus the two rotating files.
/// Records below the level threshold are skipped; a sink error is reported
/// and the loop keeps going. Each record is handled independently, there is
/// no batching and no cross-record state.
pub struct Pipeline {
    rx: mpsc::Receiver<LogRecord>,
    sinks: Vec<Box<dyn Sink>>,
    threshold: LogLevel,
}

impl Pipeline {
    pub fn new(
        component: impl Into<String>,
        threshold: LogLevel,
        sinks: Vec<Box<dyn Sink>>,
        capacity: usize,
    ) -> (LogWriter, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(16));
        let writer = LogWriter {
            tx,
            component: component.into(),
        };
        (
            writer,
            Self {
                rx,
                sinks,
                threshold,
            },
        )
    }

    pub async fn run(mut self) {
        while let Some(record) = self.rx.recv().await {
            if record.level > self.threshold {
                continue;
            }
            for sink in &self.sinks {
                if let Err(e) = sink.write(&record).await {
                    eprintln!("sink error: {e}");
                }
            }
        }
        // Channel closed — every writer handle is gone.
    }
}
