//! Domain error types for the authentication negotiation engine.
//!
//! Uses `thiserror` for ergonomic error definitions with proper context.

use thiserror::Error;

use crate::subject::SubjectParseError;

/// Errors raised while negotiating authentication for one connection.
///
/// Every kind here is fatal to the current handshake; the client must
/// restart the whole negotiation to retry. None of these corrupt state
/// shared between connections.
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    /// The client selected a mechanism the server does not offer.
    #[error("unsupported SASL mechanism: {0}")]
    UnsupportedMechanism(String),

    /// `submit` was called again after the exchange already finished.
    #[error("SASL negotiation already complete")]
    AlreadyComplete,

    /// The resolved identity was requested before the exchange finished.
    #[error("SASL negotiation not complete")]
    NegotiationNotStarted,

    /// The PLAIN token carries no password field.
    #[error("password missing from PLAIN credentials")]
    MissingPassword,

    /// The PLAIN token carries no authentication id field.
    #[error("authentication id missing from PLAIN credentials")]
    MissingUsername,

    /// EXTERNAL negotiation without a client certificate chain.
    #[error("client certificate required for authentication")]
    CertificateRequired,

    /// The leaf of the presented chain is not an X.509 certificate.
    #[error("only X.509 certificates are supported for authentication")]
    UnsupportedCertificateType,

    /// The leaf certificate's subject does not follow the DN grammar.
    #[error("unable to parse certificate subject: {0}")]
    UnparsableSubject(#[from] SubjectParseError),

    /// The certificate subject has no CN attribute to use as the account name.
    #[error("common name field required but not present in certificate subject")]
    CommonNameRequired,

    /// The verification backend rejected the credentials or was unreachable.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Failures reported by a credential verification backend.
///
/// Rejected credentials and an unreachable backend are distinct kinds so a
/// deployment can alert on infrastructure trouble separately from bad
/// clients.
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    /// The username/password pair was rejected.
    #[error("provided credentials are invalid")]
    InvalidCredentials,

    /// The backend could not be reached or is not ready.
    #[error("authentication backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors related to configuration parsing and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The mechanism list is empty; a server must offer at least one.
    #[error("no SASL mechanisms configured")]
    NoMechanisms,

    /// The table backend names neither inline users nor a file.
    #[error("credential table backend requires inline users or a file")]
    EmptyCredentialTable,

    /// The table backend names both inline users and a file.
    #[error("credential table backend must not mix inline users with a file")]
    AmbiguousCredentialTable,

    /// The credentials file could not be read.
    #[error("failed to read credentials file '{path}': {source}")]
    CredentialFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A line in the credentials file is not `username:password`.
    #[error("invalid credentials file '{path}' at line {line}: expected 'username:password'")]
    CredentialFileFormat { path: String, line: usize },
}

/// Result type alias for negotiation operations.
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Result type alias for backend verification.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
