use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const SESSION_FILE: &str = "session.json";

/// Root of the app's local data directory.
#[derive(Debug, Clone)]
pub struct DataPath {
    base: PathBuf,
}

impl DataPath {
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref().to_path_buf();
        Self { base }
    }

    pub fn default_base() -> Option<PathBuf> {
        dirs::data_local_dir().map(|pb| pb.join("cropguard"))
    }

    pub fn default_base_or_cwd() -> PathBuf {
        use std::str::FromStr;
        Self::default_base().unwrap_or_else(|| PathBuf::from_str(".").unwrap())
    }

    pub fn session_file(&self) -> PathBuf {
        self.base.join(SESSION_FILE)
    }
}

impl Default for DataPath {
    fn default() -> Self {
        Self::new(Self::default_base_or_cwd())
    }
}

#[derive(Serialize, Deserialize)]
struct SessionFile {
    user_id: String,
}

/// Persisted user identity, read by the background fetch tick when the app
/// process is not running. Every failure mode degrades to "no session";
/// identity loss must never take the host down.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(data_path: &DataPath) -> Self {
        Self {
            path: data_path.session_file(),
        }
    }

    /// The persisted user id, if a readable session exists.
    pub fn user_id(&self) -> Option<String> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("could not read session file: {err}");
                return None;
            }
        };

        match serde_json::from_str::<SessionFile>(&contents) {
            Ok(session) if session.user_id.is_empty() => None,
            Ok(session) => Some(session.user_id),
            Err(err) => {
                warn!("discarding corrupt session file: {err}");
                None
            }
        }
    }

    pub fn set_user_id(&self, user_id: &str) {
        let session = SessionFile {
            user_id: user_id.to_owned(),
        };

        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!("could not create session directory: {err}");
                return;
            }
        }

        match serde_json::to_string(&session) {
            Ok(json) => {
                if let Err(err) = fs::write(&self.path, json) {
                    warn!("could not persist session: {err}");
                } else {
                    debug!("session persisted for user {user_id}");
                }
            }
            Err(err) => warn!("could not serialize session: {err}"),
        }
    }

    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("session cleared"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!("could not clear session: {err}"),
        }
    }
}
