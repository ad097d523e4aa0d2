//! Credential persistence.
//!
//! The credential blob is opaque to the bridge — it is produced and
//! consumed by the sidecar. The store's only job is to mirror it to
//! disk on every update so a restart can resume the session without
//! re-pairing.

use std::path::PathBuf;

use {
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::error::Result;

/// File-based credential storage at `<auth_dir>/creds.json`.
#[derive(Debug, Clone)]
pub struct CredsStore {
    path: PathBuf,
}

impl CredsStore {
    /// Create a store rooted at the given auth directory.
    #[must_use]
    pub fn new(auth_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: auth_dir.into().join("creds.json"),
        }
    }

    /// Load the persisted credential blob, if any. Read and parse
    /// failures are logged and treated as absent credentials — the
    /// sidecar then starts a fresh pairing.
    pub fn load(&self) -> Option<Value> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no persisted credentials");
                return None;
            },
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "credential file read failed");
                return None;
            },
        };

        match serde_json::from_str(&data) {
            Ok(creds) => {
                debug!(path = %self.path.display(), "credentials loaded");
                Some(creds)
            },
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "credential file parse failed");
                None
            },
        }
    }

    /// Persist the credential blob, creating the auth directory if
    /// needed. Called on every creds-update event.
    pub fn save(&self, creds: &Value) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(creds)?;
        std::fs::write(&self.path, &data)?;

        // Session material; keep it private.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            if let Err(e) = std::fs::set_permissions(&self.path, perms) {
                warn!(path = %self.path.display(), error = %e, "failed to set credential file permissions");
            }
        }

        debug!(path = %self.path.display(), "credentials saved");
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_returns_none_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredsStore::new(dir.path());
        assert!(store.load().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredsStore::new(dir.path().join("auth"));

        let creds = serde_json::json!({"noiseKey": {"private": "aaa"}, "registered": true});
        store.save(&creds).unwrap();
        assert_eq!(store.load(), Some(creds));
    }

    #[test]
    fn save_overwrites_previous_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredsStore::new(dir.path());

        store.save(&serde_json::json!({"v": 1})).unwrap();
        store.save(&serde_json::json!({"v": 2})).unwrap();
        assert_eq!(store.load(), Some(serde_json::json!({"v": 2})));
    }

    #[test]
    fn corrupt_file_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("creds.json"), "not json").unwrap();
        let store = CredsStore::new(dir.path());
        assert!(store.load().is_none());
    }
}
