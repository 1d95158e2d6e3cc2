//! Credential verification backends.
//!
//! The negotiation engine checks decoded credentials through a
//! [`VerifyBackend`]. Concrete identity stores (a directory-service bind, a
//! login-module chain) live outside this crate and are injected per
//! deployment; this module defines the contract they implement, the
//! explicit registry that resolves configured backend kinds, and the
//! in-tree credential-table implementations.

pub mod table;

pub use table::{FileTableBackend, TableBackend};

use std::sync::Arc;

use crate::config::BackendConfig;
use crate::error::{BackendResult, ConfigResult};
use crate::principal::AuthenticatedUser;

/// Contract between the negotiation engine and an identity store.
pub trait VerifyBackend: Send + Sync + std::fmt::Debug {
    /// Verify a username/password pair, resolving the authenticated user.
    ///
    /// Wrong credentials are a [`BackendError::InvalidCredentials`] result,
    /// never a panic; [`BackendError::Unavailable`] signals an
    /// infrastructure failure rather than a bad client. The call is
    /// synchronous and may block on I/O, so callers must not hold
    /// per-connection locks across it.
    ///
    /// [`BackendError::InvalidCredentials`]: crate::error::BackendError::InvalidCredentials
    /// [`BackendError::Unavailable`]: crate::error::BackendError::Unavailable
    ///
    /// # Errors
    ///
    /// Returns an error when the credentials are rejected or the backend
    /// cannot answer.
    fn verify(&self, username: &str, password: &str) -> BackendResult<AuthenticatedUser>;

    /// Validate deployment configuration.
    ///
    /// Invoked once at process start, before any connection is served;
    /// failure is fatal to startup, not to any single connection.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend's configuration is unusable.
    fn validate_configuration(&self) -> ConfigResult<()> {
        Ok(())
    }

    /// One-time setup before serving traffic.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be brought up.
    fn setup(&self) -> BackendResult<()> {
        Ok(())
    }
}

/// Resolve a configured backend kind to a concrete implementation.
///
/// This is the whole plugin story: new backend kinds are new arms here,
/// not runtime lookup.
///
/// # Errors
///
/// Returns an error if the backend settings are unusable.
pub fn create_backend(config: &BackendConfig) -> ConfigResult<Arc<dyn VerifyBackend>> {
    match config {
        BackendConfig::Table { users, file } => match file {
            Some(path) => Ok(Arc::new(FileTableBackend::new(path.clone()))),
            None => Ok(Arc::new(TableBackend::from_users(users))),
        },
    }
}
