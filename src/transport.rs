use reqwest::Client;
use std::error::Error;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::record::LogRecord;

/// Best-effort HTTP delivery of a single [`LogRecord`] to the ingestion
/// endpoint. Delivery runs on a detached task, so it keeps going even when
/// the caller is torn down mid-flight (the browser `keepalive` semantic).
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("build http client");
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// POST one record as a JSON document. Non-2xx statuses count as failure.
    pub async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let resp = self.client.post(&self.endpoint).json(record).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(format!("log endpoint returned {}", resp.status()).into())
        }
    }

    /// Fire-and-forget delivery. The returned handle is only useful to tests
    /// and the CLI; ordinary callers drop it. A failed attempt degrades to a
    /// single console entry and is never surfaced to the caller.
    pub fn deliver(&self, record: LogRecord) -> JoinHandle<()> {
        let transport = self.clone();
        tokio::spawn(async move {
            if let Err(e) = transport.send(&record).await {
                eprintln!("failed to send log to API: {e}");
            }
        })
    }
}
