use std::collections::BTreeMap;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Mode;
use crate::record::{LogLevel, LogRecord};
use crate::transport::HttpTransport;

/// Ambient browsing context attached to every remotely shipped record.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub url: String,
    pub user_agent: String,
}

/// Client-side log producer. In development mode records echo to the local
/// console and never touch the network; in production they are enriched with
/// the ambient context and handed to the transport. A log call can never
/// fail from the caller's point of view.
pub struct Emitter {
    mode: Mode,
    component: String,
    context: ClientContext,
    transport: HttpTransport,
}

impl Emitter {
    pub fn new(
        mode: Mode,
        component: impl Into<String>,
        context: ClientContext,
        transport: HttpTransport,
    ) -> Self {
        Self {
            mode,
            component: component.into(),
            context,
            transport,
        }
    }

    pub fn error(
        &self,
        message: impl Into<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Option<JoinHandle<()>> {
        self.emit(LogLevel::Error, message, metadata)
    }

    pub fn warn(
        &self,
        message: impl Into<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Option<JoinHandle<()>> {
        self.emit(LogLevel::Warn, message, metadata)
    }

    pub fn info(
        &self,
        message: impl Into<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Option<JoinHandle<()>> {
        self.emit(LogLevel::Info, message, metadata)
    }

    pub fn debug(
        &self,
        message: impl Into<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Option<JoinHandle<()>> {
        self.emit(LogLevel::Debug, message, metadata)
    }

    /// Returns the delivery handle in production mode, `None` when the
    /// record was echoed locally.
    pub fn emit(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Option<JoinHandle<()>> {
        let mut record =
            LogRecord::new(level, self.component.clone(), message).with_metadata(metadata);

        match self.mode {
            Mode::Development => {
                echo(&record);
                None
            }
            Mode::Production => {
                record.insert("url", self.context.url.clone());
                record.insert("userAgent", self.context.user_agent.clone());
                Some(self.transport.deliver(record))
            }
        }
    }
}

fn echo(record: &LogRecord) {
    let line = record.format_line();
    match record.level {
        LogLevel::Error => error!("{line}"),
        LogLevel::Warn => warn!("{line}"),
        LogLevel::Info => info!("{line}"),
        LogLevel::Debug => debug!("{line}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_emitter(mode: Mode) -> Emitter {
        Emitter::new(
            mode,
            "frontend",
            ClientContext {
                url: "http://localhost/pages/profile".to_string(),
                user_agent: "test-agent/1.0".to_string(),
            },
            HttpTransport::new("http://127.0.0.1:9/api/logs"),
        )
    }

    #[tokio::test]
    async fn development_mode_never_spawns_a_delivery() {
        let emitter = test_emitter(Mode::Development);
        assert!(emitter.error("boom", BTreeMap::new()).is_none());
        assert!(emitter.warn("eh", BTreeMap::new()).is_none());
        assert!(emitter.info("hi", BTreeMap::new()).is_none());
        assert!(emitter.debug("dbg", BTreeMap::new()).is_none());
    }

    #[tokio::test]
    async fn transport_failure_completes_without_panicking() {
        // Port 9 has nothing listening; delivery fails and degrades to a
        // console entry inside the spawned task.
        let emitter = test_emitter(Mode::Production);
        let handle = emitter.info("unreachable", BTreeMap::new()).unwrap();
        handle.await.expect("delivery task must not panic");
    }
}
