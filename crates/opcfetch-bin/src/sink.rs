// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! JSON-lines record sink.
//!
//! Every transferred record becomes one line:
//!
//! ```text
//! {"relationship":"success","id":"…","created_at":"…","attributes":{"NodeID":"101",…},"content":"21.5"}
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use opcfetch_core::{EmissionStage, FetchError, FetchResult, OutputRecord, RecordSink, Relationship};

use crate::config::OutputSettings;
use crate::error::{BinError, BinResult};

/// Boxed writer used by the binary.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Serialize)]
struct Line<'a> {
    relationship: Relationship,
    #[serde(flatten)]
    record: &'a OutputRecord,
}

/// [`RecordSink`] writing one JSON object per line.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
    include_failure: bool,
    written: AtomicU64,
    discarded: AtomicU64,
}

impl JsonLinesSink<BoxedWriter> {
    /// Opens the sink described by `settings`.
    pub async fn open(settings: &OutputSettings) -> BinResult<Self> {
        let writer: BoxedWriter = match &settings.path {
            Some(path) => Box::new(open_append(path).await?),
            None => Box::new(tokio::io::stdout()),
        };
        Ok(Self::new(writer, settings.include_failure))
    }
}

async fn open_append(path: &Path) -> BinResult<tokio::fs::File> {
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| BinError::io(e.to_string()).with_context(format!("opening {}", path.display())))
}

impl<W: AsyncWrite + Send + Unpin> JsonLinesSink<W> {
    /// Wraps `writer`.
    pub fn new(writer: W, include_failure: bool) -> Self {
        Self {
            writer: Mutex::new(writer),
            include_failure,
            written: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Lines written so far.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Failure records dropped because `include_failure` is off.
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Send + Unpin> RecordSink for JsonLinesSink<W> {
    async fn create(&self) -> FetchResult<OutputRecord> {
        Ok(OutputRecord::new())
    }

    async fn write_content(&self, record: &mut OutputRecord, content: String) -> FetchResult<()> {
        record.content = Some(content);
        Ok(())
    }

    async fn transfer(&self, record: OutputRecord, relationship: Relationship) -> FetchResult<()> {
        if relationship == Relationship::Failure && !self.include_failure {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            debug!(id = %record.id, "Discarding failure record");
            return Ok(());
        }

        let mut line = serde_json::to_vec(&Line {
            relationship,
            record: &record,
        })
        .map_err(|e| FetchError::emission(EmissionStage::Transfer, e.to_string()))?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| FetchError::emission(EmissionStage::Transfer, e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| FetchError::emission(EmissionStage::Transfer, e.to_string()))?;

        self.written.fetch_add(1, Ordering::Relaxed);
        trace!(id = %record.id, relationship = %relationship, "Record written");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, content: Option<&str>) -> OutputRecord {
        let mut record = OutputRecord::new();
        record.set_attribute("Browsename", name);
        if let Some(content) = content {
            record.content = Some(content.to_string());
        }
        record
    }

    fn lines(bytes: &[u8]) -> Vec<serde_json::Value> {
        std::str::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_transfer_writes_json_lines() {
        let sink = JsonLinesSink::new(Vec::new(), true);

        sink.transfer(record("Temperature", Some("21.5")), Relationship::Success)
            .await
            .unwrap();
        sink.transfer(record("Speed", None), Relationship::Failure)
            .await
            .unwrap();

        assert_eq!(sink.written(), 2);
        let out = lines(&sink.into_inner());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["relationship"], "success");
        assert_eq!(out[0]["attributes"]["Browsename"], "Temperature");
        assert_eq!(out[0]["content"], "21.5");
        assert_eq!(out[1]["relationship"], "failure");
        assert!(out[1].get("content").is_none());
    }

    #[tokio::test]
    async fn test_failure_records_discarded() {
        let sink = JsonLinesSink::new(Vec::new(), false);

        sink.transfer(record("Speed", None), Relationship::Failure)
            .await
            .unwrap();

        assert_eq!(sink.written(), 0);
        assert_eq!(sink.discarded(), 1);
        assert!(sink.into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_write_content_sets_content() {
        let sink = JsonLinesSink::new(Vec::new(), true);
        let mut rec = sink.create().await.unwrap();

        sink.write_content(&mut rec, "1200".to_string()).await.unwrap();

        assert_eq!(rec.content.as_deref(), Some("1200"));
    }

    #[tokio::test]
    async fn test_open_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let settings = OutputSettings {
            path: Some(path.clone()),
            include_failure: true,
        };

        for name in ["A", "B"] {
            let sink = JsonLinesSink::open(&settings).await.unwrap();
            sink.transfer(record(name, Some("1")), Relationship::Success)
                .await
                .unwrap();
        }

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
