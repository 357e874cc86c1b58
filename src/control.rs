use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::{now_utc_string, write_json_pretty};

/// Cooperative cancellation shared between the supervisor and the worker.
///
/// The worker only reads it at checkpoints: between stages and before each
/// batch submission. A batch already handed to the adapter always finishes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    requested: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub requested_at: String,
}

pub fn write_cancel_request(path: &Path) -> Result<CancelRequest> {
    let request = CancelRequest {
        requested_at: now_utc_string(),
    };
    write_json_pretty(path, &request)?;
    Ok(request)
}

/// Consumes a pending cancel request file. Returns whether one existed.
pub fn take_cancel_request(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path)
        .with_context(|| format!("failed to remove cancel request {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_flag() {
        let flag = CancelFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_cancelled());
        flag.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn cancel_request_file_is_consumed_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("manifests").join("cancel.request");

        assert!(!take_cancel_request(&path).expect("no request yet"));
        write_cancel_request(&path).expect("write request");
        assert!(take_cancel_request(&path).expect("request present"));
        assert!(!take_cancel_request(&path).expect("request consumed"));
    }
}
