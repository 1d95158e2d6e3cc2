//! Server-side SASL authentication negotiation for CQL native protocol
//! servers.
//!
//! This library implements the mechanism-agnostic handshake a database
//! server runs against a connecting client: negotiating an authentication
//! mechanism, decoding credentials from the raw challenge/response bytes,
//! resolving an identity through a pluggable verification backend or from a
//! presented certificate chain, and caching expensive backend state so
//! concurrent connections do not repeat it.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Domain-specific error types
//! - [`sasl`] - The negotiation engine and its mechanisms
//! - [`backend`] - Credential verification contract and implementations
//! - [`subject`] - Certificate subject distinguished-name parsing
//! - [`cache`] - Single-fill lazy cache shared between connections
//! - [`principal`] - The resolved identity type
//!
//! The transport layer stays outside: it frames the wire bytes, owns TLS,
//! and feeds each connection's tokens into that connection's negotiator.
//!
//! # Example
//!
//! ```
//! use cql_sasl_core::{AuthConfig, Authenticator};
//!
//! let config = AuthConfig::from_str(
//!     r"
//! mechanisms: [PLAIN]
//! backend:
//!   kind: table
//!   users:
//!     - username: cassandra
//!       password: password
//! ",
//! )
//! .expect("valid config");
//!
//! let authenticator = Authenticator::from_config(&config).expect("valid backend");
//! let mut negotiator =
//!     authenticator.new_negotiator("127.0.0.1:9042".parse().unwrap(), Vec::new());
//!
//! // Round 1: the client names a mechanism, the server echoes it.
//! assert_eq!(negotiator.submit(b"PLAIN").unwrap(), b"PLAIN");
//! // Round 2: the client sends credentials, the server answers empty.
//! assert!(negotiator.submit(b"\0cassandra\0password").unwrap().is_empty());
//!
//! assert!(negotiator.is_complete());
//! assert_eq!(negotiator.resolved_identity().unwrap().name(), "cassandra");
//! ```

#![forbid(unsafe_code)]

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod principal;
pub mod sasl;
pub mod subject;

// Re-export commonly used types
pub use backend::{create_backend, FileTableBackend, TableBackend, VerifyBackend};
pub use cache::CachedValue;
pub use config::{AuthConfig, BackendConfig, Mechanism, UserCredential};
pub use error::{
    AuthError, AuthResult, BackendError, BackendResult, ConfigError, ConfigResult,
};
pub use principal::AuthenticatedUser;
pub use sasl::{Authenticator, SaslNegotiator};
pub use subject::{SubjectAttribute, SubjectName, SubjectParseError};
