//! Credential-table verification backends.
//!
//! The simplest deployable backends: a username/password table held in
//! memory, populated either from inline configuration or from a
//! credentials file in the format:
//!
//! ```text
//! # comment
//! username1:password1
//! username2:password2
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::CachedValue;
use crate::config::UserCredential;
use crate::error::{BackendError, BackendResult, ConfigError, ConfigResult};
use crate::principal::AuthenticatedUser;

use super::VerifyBackend;

/// In-memory credential table built from inline configuration.
pub struct TableBackend {
    credentials: HashMap<String, String>,
}

impl TableBackend {
    /// Build the table from inline user entries, expanding environment
    /// variables in passwords.
    #[must_use]
    pub fn from_users(users: &[UserCredential]) -> Self {
        let credentials = users
            .iter()
            .map(|user| (user.username.clone(), user.password()))
            .collect();
        Self { credentials }
    }
}

impl VerifyBackend for TableBackend {
    fn verify(&self, username: &str, password: &str) -> BackendResult<AuthenticatedUser> {
        match self.credentials.get(username) {
            Some(stored) if stored == password => Ok(AuthenticatedUser::new(username)),
            // An unknown user and a wrong password answer identically.
            _ => Err(BackendError::InvalidCredentials),
        }
    }
}

impl fmt::Debug for TableBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableBackend")
            .field("users", &self.credentials.len())
            .finish()
    }
}

/// Credential table loaded lazily from a file.
///
/// The parsed table is held in a [`CachedValue`], so concurrent connections
/// sharing this backend trigger a single file read; a failed read stays a
/// cache miss and is retried on the next verification. [`invalidate`]
/// drops the table after a credential rotation.
///
/// [`invalidate`]: FileTableBackend::invalidate
pub struct FileTableBackend {
    path: PathBuf,
    table: CachedValue<Arc<HashMap<String, String>>>,
}

impl FileTableBackend {
    /// Create a backend reading its table from `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        let load_path = path.clone();
        let table = CachedValue::new(move || match load_table(&load_path) {
            Ok(table) => {
                debug!(
                    path = %load_path.display(),
                    users = table.len(),
                    "loaded credential table"
                );
                Some(Arc::new(table))
            }
            Err(e) => {
                warn!(
                    path = %load_path.display(),
                    error = %e,
                    "failed to load credential table"
                );
                None
            }
        });
        Self { path, table }
    }

    /// Drop the cached table; the next verification reloads the file.
    pub fn invalidate(&self) {
        self.table.invalidate();
    }

    fn unavailable(&self) -> BackendError {
        BackendError::Unavailable(format!(
            "credential table '{}' could not be loaded",
            self.path.display()
        ))
    }
}

impl VerifyBackend for FileTableBackend {
    fn verify(&self, username: &str, password: &str) -> BackendResult<AuthenticatedUser> {
        let table = self.table.get().ok_or_else(|| self.unavailable())?;
        match table.get(username) {
            Some(stored) if stored == password => Ok(AuthenticatedUser::new(username)),
            _ => Err(BackendError::InvalidCredentials),
        }
    }

    fn validate_configuration(&self) -> ConfigResult<()> {
        load_table(&self.path).map(|_| ())
    }

    fn setup(&self) -> BackendResult<()> {
        // Prime the cache so the first connection does not pay for the read.
        self.table.get().map(|_| ()).ok_or_else(|| self.unavailable())
    }
}

impl fmt::Debug for FileTableBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileTableBackend")
            .field("path", &self.path)
            .finish()
    }
}

fn load_table(path: &Path) -> ConfigResult<HashMap<String, String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::CredentialFile {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut table = HashMap::new();
    for (line_number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once(':') {
            Some((username, password)) => {
                table.insert(username.to_string(), password.to_string());
            }
            None => {
                return Err(ConfigError::CredentialFileFormat {
                    path: path.display().to_string(),
                    line: line_number + 1,
                })
            }
        }
    }
    Ok(table)
}
