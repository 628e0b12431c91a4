//! Converter capability probe

use crate::constants::PROBE_TIMEOUT_SECS;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::Command;

/// Run `<binary> --version`; true when it starts and exits successfully
///
/// Has no side effects beyond the child process, so it can be called as
/// often as needed. Use [`CapabilityCache`] to avoid repeated spawns.
pub async fn probe_converter(binary: &str) -> bool {
    let mut command = Command::new(binary);
    command
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let status = tokio::time::timeout(
        Duration::from_secs(PROBE_TIMEOUT_SECS),
        command.status(),
    )
    .await;

    match status {
        Ok(Ok(status)) if status.success() => {
            log::debug!("Converter {} is available", binary);
            true
        }
        Ok(Ok(status)) => {
            log::debug!("Converter {} --version exited with {}", binary, status);
            false
        }
        Ok(Err(e)) => {
            log::debug!("Converter {} could not be started: {}", binary, e);
            false
        }
        Err(_) => {
            log::debug!("Converter {} --version timed out", binary);
            false
        }
    }
}

/// Memoized probe result, cleared with [`CapabilityCache::invalidate`]
#[derive(Debug, Default)]
pub struct CapabilityCache {
    known: Mutex<Option<bool>>,
}

impl CapabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result, probing `binary` on first use
    pub async fn is_available(&self, binary: &str) -> bool {
        if let Some(known) = self.cached() {
            return known;
        }
        let available = probe_converter(binary).await;
        *self.known.lock().unwrap_or_else(|e| e.into_inner()) = Some(available);
        available
    }

    pub fn cached(&self) -> Option<bool> {
        *self.known.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Forget the cached result so the next call probes again
    pub fn invalidate(&self) {
        *self.known.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING: &str = "cardt-no-such-converter-binary";

    #[tokio::test]
    async fn test_missing_binary_probes_false() {
        assert!(!probe_converter(MISSING).await);
    }

    #[tokio::test]
    async fn test_cache_memoizes_and_invalidates() {
        let cache = CapabilityCache::new();
        assert_eq!(cache.cached(), None);
        assert!(!cache.is_available(MISSING).await);
        assert_eq!(cache.cached(), Some(false));
        cache.invalidate();
        assert_eq!(cache.cached(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_true_binary_probes_true() {
        assert!(probe_converter("true").await);
    }
}
