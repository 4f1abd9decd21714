//! Typed, file-backed session store for the role gate.
//!
//! The active role is process-wide state with an explicit init (read on
//! load) / teardown (clear on logout) lifecycle. Modeling it as a small
//! typed store keeps it out of ambient globals. A missing or malformed
//! file reads as "no session": the engine has no behavior when the role
//! is absent.

use std::path::PathBuf;

use lifesync_types::Role;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Errors that can occur while persisting the session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading or writing the session file failed.
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session could not be serialized.
    #[error("session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// On-disk session record.
#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    role: Role,
}

/// File-backed store for the active client role.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Create a store persisting to the given path.
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the persisted role, if any.
    ///
    /// A missing file or one that fails to parse reads as `None`; a
    /// corrupt session must never block startup.
    pub fn load(&self) -> Option<Role> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "session read failed");
                return None;
            }
        };

        match serde_json::from_str::<SessionRecord>(&raw) {
            Ok(record) => Some(record.role),
            Err(e) => {
                warn!(error = %e, "malformed session file, treating as logged out");
                None
            }
        }
    }

    /// Persist the active role (login).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if serialization or the write fails.
    pub fn save(&self, role: Role) -> Result<(), SessionError> {
        let raw = serde_json::to_string(&SessionRecord { role })?;
        std::fs::write(&self.path, raw)?;
        debug!(role = %role, "session saved");
        Ok(())
    }

    /// Clear the persisted role (logout). Clearing an absent session is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the delete fails for any reason
    /// other than the file already being gone.
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> SessionStore {
        let mut path = std::env::temp_dir();
        path.push(format!("lifesync-session-{}.json", uuid::Uuid::new_v4()));
        SessionStore::new(path)
    }

    #[test]
    fn missing_session_reads_as_logged_out() {
        let store = temp_store();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn save_load_clear_roundtrip() {
        let store = temp_store();

        assert!(store.save(Role::Responder).is_ok());
        assert_eq!(store.load(), Some(Role::Responder));

        // Login with the other role overwrites.
        assert!(store.save(Role::Citizen).is_ok());
        assert_eq!(store.load(), Some(Role::Citizen));

        assert!(store.clear().is_ok());
        assert_eq!(store.load(), None);
        // Clearing again is a no-op.
        assert!(store.clear().is_ok());
    }

    #[test]
    fn malformed_session_reads_as_logged_out() {
        let store = temp_store();
        let _ = std::fs::write(&store.path, "not json at all");
        assert_eq!(store.load(), None);
        let _ = store.clear();
    }
}
