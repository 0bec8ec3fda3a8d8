#![allow(dead_code)]

use async_trait::async_trait;
use logrelay::record::LogRecord;
use logrelay::sink::Sink;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records everything it sees so tests can assert on pipeline output.
pub struct CaptureSink {
    pub records: Arc<Mutex<Vec<LogRecord>>>,
}

#[async_trait]
impl Sink for CaptureSink {
    async fn write(
        &self,
        record: &LogRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Poll until at least `count` records arrived or a second passed. The
/// pipeline runs on its own task, so tests give it a moment to drain.
pub async fn wait_for_records(
    records: &Arc<Mutex<Vec<LogRecord>>>,
    count: usize,
) -> Vec<LogRecord> {
    for _ in 0..100 {
        {
            let guard = records.lock().unwrap();
            if guard.len() >= count {
                return guard.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    records.lock().unwrap().clone()
}
