use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::record::{LogLevel, LogRecord};

pub mod file;

pub use file::{RollingFileSink, RotationPolicy};

/// Asynchronous destination for [`LogRecord`]s. The writer pipeline calls
/// `write` once per record from its own task; an error never stops the
/// pipeline, it is reported on the process console and the record moves on
/// to the next sink.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn write(
        &self,
        record: &LogRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Mirrors every record to the process console through the `tracing` macros,
/// matched on the record's own level.
pub struct ConsoleSink;

#[async_trait]
impl Sink for ConsoleSink {
    async fn write(
        &self,
        record: &LogRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let meta = if record.metadata.is_empty() {
            String::new()
        } else {
            format!(
                " {}",
                serde_json::to_string(&record.metadata).unwrap_or_else(|_| "{}".to_string())
            )
        };
        match record.level {
            LogLevel::Error => error!("[{}] {}{}", record.component, record.message, meta),
            LogLevel::Warn => warn!("[{}] {}{}", record.component, record.message, meta),
            LogLevel::Info => info!("[{}] {}{}", record.component, record.message, meta),
            LogLevel::Debug => debug!("[{}] {}{}", record.component, record.message, meta),
        }
        Ok(())
    }
}
