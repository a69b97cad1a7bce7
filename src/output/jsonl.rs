//! JSON Lines output sink
//!
//! Appends one JSON object per line. The file is opened in append mode, so
//! a resumed run adds to the records of the interrupted one.

use crate::output::traits::{OutputRecord, OutputResult, RecordSink};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Append-only JSON Lines writer
pub struct JsonlSink {
    writer: BufWriter<File>,
    written: u64,
}

impl JsonlSink {
    /// Opens `path` for appending, creating it and its parent directories
    pub fn open(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            written: 0,
        })
    }
}

impl RecordSink for JsonlSink {
    fn write(&mut self, record: &OutputRecord) -> OutputResult<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn written(&self) -> u64 {
        self.written
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!("Failed to flush output on close: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(url: &str) -> OutputRecord {
        OutputRecord {
            url: url.to_string(),
            final_url: url.to_string(),
            status: 200,
            title: "Title".to_string(),
            text: "line one\nline two".to_string(),
            links: vec!["https://example.com/next".to_string()],
            extractor: "default".to_string(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_writes_one_object_per_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.jsonl");

        let mut sink = JsonlSink::open(&path).unwrap();
        sink.write(&record("https://example.com/a")).unwrap();
        sink.write(&record("https://example.com/b")).unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.written(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["url"], "https://example.com/a");
        assert_eq!(first["text"], "line one\nline two");
        assert_eq!(first["links"][0], "https://example.com/next");
    }

    #[test]
    fn test_appends_across_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("out.jsonl");

        {
            let mut sink = JsonlSink::open(&path).unwrap();
            sink.write(&record("https://example.com/a")).unwrap();
        }
        {
            let mut sink = JsonlSink::open(&path).unwrap();
            sink.write(&record("https://example.com/b")).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
