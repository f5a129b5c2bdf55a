//! Audit sink implementations.
//!
//! The sink is an explicit dependency constructed once at bootstrap and
//! passed into the audit trail; no process-wide singleton. Events are
//! write-only: each append is independent, with no read-modify-write
//! contention between concurrent requests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::domain::AuditEvent;

/// Durable, append-only storage for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist one event. Must not mutate previously written events.
    async fn append(&self, event: &AuditEvent) -> Result<()>;

    /// Load every event, in write order.
    async fn load(&self) -> Result<Vec<AuditEvent>>;
}

/// File-backed sink using newline-delimited JSON.
///
/// Appends rely on the file being opened in append mode, so concurrent
/// writers interleave whole lines rather than corrupting each other.
pub struct JsonlAuditSink {
    events_path: PathBuf,
}

impl JsonlAuditSink {
    /// Create or open a sink at the given directory, writing `audit.jsonl`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create audit directory: {}", dir.display()))?;

        Ok(Self {
            events_path: dir.join("audit.jsonl"),
        })
    }

    /// Path to the underlying events file.
    pub fn events_path(&self) -> &Path {
        &self.events_path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn append(&self, event: &AuditEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.events_path)
            .await
            .with_context(|| {
                format!("Failed to open audit file: {}", self.events_path.display())
            })?;

        let json = serde_json::to_string(event).context("Failed to serialize audit event")?;
        file.write_all(format!("{}\n", json).as_bytes())
            .await
            .context("Failed to write audit event")?;
        file.flush().await.context("Failed to flush audit event")?;

        Ok(())
    }

    async fn load(&self) -> Result<Vec<AuditEvent>> {
        if !self.events_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.events_path)
            .await
            .with_context(|| format!("Failed to open audit file: {}", self.events_path.display()))?;

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut events = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let event: AuditEvent = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse audit event: {}", line))?;
            events.push(event);
        }

        Ok(events)
    }
}

/// In-process sink for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.lock().expect("audit sink lock poisoned").len()
    }

    /// Whether the sink is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, event: &AuditEvent) -> Result<()> {
        self.events
            .lock()
            .expect("audit sink lock poisoned")
            .push(event.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<AuditEvent>> {
        Ok(self
            .events
            .lock()
            .expect("audit sink lock poisoned")
            .clone())
    }
}
