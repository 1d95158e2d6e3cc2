//! Server-side SASL authentication.
//!
//! This module provides the negotiation side of the native-protocol
//! authentication exchange. Supported mechanisms:
//! - `PLAIN` - username/password in a single NUL-delimited token, verified
//!   through the configured backend (should only be offered over TLS)
//! - `EXTERNAL` - identity taken from the client certificate captured by
//!   the transport during mutual TLS
//!
//! An [`Authenticator`] is built once per deployment; each connection gets
//! its own [`SaslNegotiator`] from it.

pub mod external;
pub mod negotiator;
pub mod plain;

pub use negotiator::SaslNegotiator;
pub use plain::DecodedCredential;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use rustls_pki_types::CertificateDer;

use crate::backend::{create_backend, VerifyBackend};
use crate::config::{AuthConfig, Mechanism};
use crate::error::{AuthError, AuthResult, BackendResult, ConfigError, ConfigResult};
use crate::principal::AuthenticatedUser;

/// Key for the username entry in a legacy credential map.
pub const USERNAME_KEY: &str = "username";

/// Key for the password entry in a legacy credential map.
pub const PASSWORD_KEY: &str = "password";

/// Deployment-level authenticator.
///
/// Advertises the ordered set of supported mechanisms and creates one
/// negotiator per connection. The backend is shared across connections;
/// negotiators are not.
#[derive(Debug)]
pub struct Authenticator {
    mechanisms: Vec<Mechanism>,
    backend: Arc<dyn VerifyBackend>,
}

impl Authenticator {
    /// Create an authenticator from deployment configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation or the
    /// backend cannot be resolved.
    pub fn from_config(config: &AuthConfig) -> ConfigResult<Self> {
        config.validate()?;
        let backend = create_backend(&config.backend)?;
        Ok(Self {
            mechanisms: config.mechanisms.clone(),
            backend,
        })
    }

    /// Create an authenticator around an injected backend.
    ///
    /// This is how external identity stores (a directory-service bind, a
    /// login-module chain) plug in.
    ///
    /// # Errors
    ///
    /// Returns an error if the mechanism list is empty.
    pub fn with_backend(
        mechanisms: Vec<Mechanism>,
        backend: Arc<dyn VerifyBackend>,
    ) -> ConfigResult<Self> {
        if mechanisms.is_empty() {
            return Err(ConfigError::NoMechanisms);
        }
        Ok(Self {
            mechanisms,
            backend,
        })
    }

    /// Ordered mechanism names advertised to clients.
    #[must_use]
    pub fn supported_mechanisms(&self) -> Vec<&'static str> {
        self.mechanisms
            .iter()
            .map(|mechanism| mechanism.mechanism_name())
            .collect()
    }

    /// This engine always demands authentication.
    #[must_use]
    pub fn require_authentication(&self) -> bool {
        true
    }

    /// Validate backend configuration.
    ///
    /// Called once at process start, before any connection is served;
    /// failure is fatal to startup.
    ///
    /// # Errors
    ///
    /// Returns the backend's configuration error.
    pub fn validate_configuration(&self) -> ConfigResult<()> {
        self.backend.validate_configuration()
    }

    /// One-time backend setup before serving traffic.
    ///
    /// # Errors
    ///
    /// Returns the backend's setup error.
    pub fn setup(&self) -> BackendResult<()> {
        self.backend.setup()
    }

    /// Create the negotiator for a new connection.
    ///
    /// `certificates` is the chain the transport captured at connection
    /// establishment (leaf first), out of band from the negotiated bytes;
    /// it is immutable for the connection's lifetime. Connections without
    /// client certificates pass an empty chain.
    #[must_use]
    pub fn new_negotiator(
        &self,
        client_address: SocketAddr,
        certificates: Vec<CertificateDer<'static>>,
    ) -> SaslNegotiator {
        SaslNegotiator::new(
            self.mechanisms.clone(),
            Arc::clone(&self.backend),
            certificates,
            client_address,
        )
    }

    /// Authenticate from a pre-SASL credential map.
    ///
    /// Older protocol versions hand over a string map instead of running
    /// the SASL exchange; it must contain `username` and `password` keys.
    ///
    /// # Errors
    ///
    /// Returns a decode error for a missing key, or the backend's failure.
    pub fn legacy_authenticate(
        &self,
        credentials: &HashMap<String, String>,
    ) -> AuthResult<AuthenticatedUser> {
        let username = credentials
            .get(USERNAME_KEY)
            .ok_or(AuthError::MissingUsername)?;
        let password = credentials
            .get(PASSWORD_KEY)
            .ok_or(AuthError::MissingPassword)?;
        Ok(self.backend.verify(username, password)?)
    }
}
