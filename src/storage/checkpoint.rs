//! Frontier checkpoints
//!
//! A checkpoint is a single JSON object `{"queue": [...], "seen": [...]}`.
//! Saves are atomic (write to a sibling temp file, then rename), so a crash
//! mid-save leaves the previous checkpoint intact.

use crate::storage::traits::StorageResult;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Serialized crawl progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Pending frontier, in dequeue order
    pub queue: Vec<String>,

    /// Every canonical key enqueued or fetched so far
    pub seen: Vec<String>,
}

impl CheckpointState {
    /// Snapshots a frontier and seen set; `seen` is sorted for stable output
    pub fn capture(frontier: &VecDeque<String>, seen: &HashSet<String>) -> Self {
        let mut seen: Vec<String> = seen.iter().cloned().collect();
        seen.sort();
        Self {
            queue: frontier.iter().cloned().collect(),
            seen,
        }
    }

    /// Converts back into a frontier and seen set
    ///
    /// Queue entries missing from `seen` are added to it, so the result
    /// always satisfies "every frontier URL is seen".
    pub fn restore(self) -> (VecDeque<String>, HashSet<String>) {
        let mut seen: HashSet<String> = self.seen.into_iter().collect();
        seen.extend(self.queue.iter().cloned());
        (self.queue.into(), seen)
    }
}

/// Writes a checkpoint atomically
pub fn save(path: &Path, frontier: &VecDeque<String>, seen: &HashSet<String>) -> StorageResult<()> {
    let state = CheckpointState::capture(frontier, seen);
    let json = serde_json::to_vec(&state)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;

    tracing::debug!(
        "Checkpoint written to {} ({} queued, {} seen)",
        path.display(),
        state.queue.len(),
        state.seen.len()
    );
    Ok(())
}

/// Reads a checkpoint
///
/// Returns None when the file is missing or unreadable; the caller starts
/// fresh in that case.
pub fn load(path: &Path) -> Option<(VecDeque<String>, HashSet<String>)> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!("No checkpoint at {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_slice::<CheckpointState>(&content) {
        Ok(state) => Some(state.restore()),
        Err(e) => {
            tracing::warn!("Ignoring corrupt checkpoint {}: {}", path.display(), e);
            None
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
