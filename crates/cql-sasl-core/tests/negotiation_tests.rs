//! End-to-end negotiation flows: configuration through resolved identity.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use rustls_pki_types::CertificateDer;

use cql_sasl_core::{
    AuthConfig, AuthError, AuthenticatedUser, Authenticator, BackendError, BackendResult,
    Mechanism, VerifyBackend,
};

fn client_address() -> SocketAddr {
    "127.0.0.1:9042".parse().unwrap()
}

fn plain_authenticator() -> Authenticator {
    let config = AuthConfig::from_str(
        r"
mechanisms: [PLAIN]
backend:
  kind: table
  users:
    - username: cassandra
      password: password
",
    )
    .unwrap();
    Authenticator::from_config(&config).unwrap()
}

/// Generate a self-signed certificate with the given subject attributes.
fn test_certificate(attributes: &[(DnType, &str)]) -> CertificateDer<'static> {
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    for (attr_type, value) in attributes {
        dn.push(attr_type.clone(), *value);
    }
    params.distinguished_name = dn;

    let key_pair = KeyPair::generate().expect("key generation should succeed");
    let cert = params
        .self_signed(&key_pair)
        .expect("self-signing should succeed");
    cert.der().clone()
}

#[test]
fn test_plain_full_round_trip() {
    let authenticator = plain_authenticator();
    assert_eq!(authenticator.supported_mechanisms(), vec!["PLAIN"]);

    let mut negotiator = authenticator.new_negotiator(client_address(), Vec::new());

    let echo = negotiator.submit(b"PLAIN").unwrap();
    assert_eq!(echo, b"PLAIN");

    let response = negotiator.submit(b"\0cassandra\0password").unwrap();
    assert!(response.is_empty());
    assert!(negotiator.is_complete());

    let user = negotiator.resolved_identity().unwrap();
    assert_eq!(user.name(), "cassandra");
}

#[test]
fn test_plain_rejects_unlisted_mechanism() {
    let authenticator = plain_authenticator();
    let mut negotiator = authenticator.new_negotiator(client_address(), Vec::new());

    let result = negotiator.submit(b"EXTERNAL");
    assert!(matches!(result, Err(AuthError::UnsupportedMechanism(_))));
    assert!(!negotiator.is_complete());
}

#[test]
fn test_resubmission_after_completion_fails() {
    let authenticator = plain_authenticator();
    let mut negotiator = authenticator.new_negotiator(client_address(), Vec::new());

    negotiator.submit(b"PLAIN").unwrap();
    negotiator.submit(b"\0cassandra\0password").unwrap();

    for _ in 0..3 {
        assert!(matches!(
            negotiator.submit(b"PLAIN"),
            Err(AuthError::AlreadyComplete)
        ));
    }
    assert_eq!(negotiator.resolved_identity().unwrap().name(), "cassandra");
}

#[derive(Debug)]
struct CountingBackend {
    calls: AtomicUsize,
    accept: bool,
}

impl CountingBackend {
    fn new(accept: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            accept,
        })
    }
}

impl VerifyBackend for CountingBackend {
    fn verify(&self, username: &str, _password: &str) -> BackendResult<AuthenticatedUser> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.accept {
            Ok(AuthenticatedUser::new(username))
        } else {
            Err(BackendError::InvalidCredentials)
        }
    }
}

#[test]
fn test_accepted_verification_runs_backend_once() {
    let backend = CountingBackend::new(true);
    let trait_backend: Arc<dyn VerifyBackend> = backend.clone();
    let authenticator =
        Authenticator::with_backend(vec![Mechanism::Plain], trait_backend).unwrap();
    let mut negotiator = authenticator.new_negotiator(client_address(), Vec::new());

    negotiator.submit(b"PLAIN").unwrap();
    negotiator.submit(b"\0cassandra\0password").unwrap();

    for _ in 0..3 {
        assert_eq!(negotiator.resolved_identity().unwrap().name(), "cassandra");
    }
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_rejected_verification_runs_backend_once() {
    let backend = CountingBackend::new(false);
    let trait_backend: Arc<dyn VerifyBackend> = backend.clone();
    let authenticator =
        Authenticator::with_backend(vec![Mechanism::Plain], trait_backend).unwrap();
    let mut negotiator = authenticator.new_negotiator(client_address(), Vec::new());

    negotiator.submit(b"PLAIN").unwrap();
    negotiator.submit(b"\0cassandra\0password").unwrap();

    for _ in 0..3 {
        assert!(matches!(
            negotiator.resolved_identity(),
            Err(AuthError::Backend(BackendError::InvalidCredentials))
        ));
    }
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[derive(Debug)]
struct UnavailableBackend;

impl VerifyBackend for UnavailableBackend {
    fn verify(&self, _username: &str, _password: &str) -> BackendResult<AuthenticatedUser> {
        Err(BackendError::Unavailable("directory down".to_string()))
    }
}

#[test]
fn test_backend_unavailable_surfaces_distinctly() {
    let authenticator =
        Authenticator::with_backend(vec![Mechanism::Plain], Arc::new(UnavailableBackend)).unwrap();
    let mut negotiator = authenticator.new_negotiator(client_address(), Vec::new());

    negotiator.submit(b"PLAIN").unwrap();
    negotiator.submit(b"\0cassandra\0password").unwrap();

    assert!(matches!(
        negotiator.resolved_identity(),
        Err(AuthError::Backend(BackendError::Unavailable(_)))
    ));
}

#[test]
fn test_external_full_round_trip() {
    let config = AuthConfig::from_str(
        r"
mechanisms: [EXTERNAL]
backend:
  kind: table
  users:
    - username: unused
      password: unused
",
    )
    .unwrap();
    let authenticator = Authenticator::from_config(&config).unwrap();
    assert_eq!(authenticator.supported_mechanisms(), vec!["EXTERNAL"]);

    let leaf = test_certificate(&[
        (DnType::CommonName, "cassandra"),
        (DnType::OrganizationalUnitName, "Eng"),
        (DnType::OrganizationName, "Org"),
    ]);
    let mut negotiator = authenticator.new_negotiator(client_address(), vec![leaf]);

    assert_eq!(negotiator.submit(b"EXTERNAL").unwrap(), b"EXTERNAL");
    assert!(negotiator.submit(b"").unwrap().is_empty());
    assert!(negotiator.is_complete());
    assert_eq!(negotiator.resolved_identity().unwrap().name(), "cassandra");
}

#[test]
fn test_external_ignores_certificates_beyond_the_leaf() {
    let config = AuthConfig::from_str(
        r"
mechanisms: [EXTERNAL]
backend:
  kind: table
  users:
    - username: unused
      password: unused
",
    )
    .unwrap();
    let authenticator = Authenticator::from_config(&config).unwrap();

    let leaf = test_certificate(&[(DnType::CommonName, "other")]);
    // Junk past the leaf must not be inspected.
    let chain = vec![leaf, CertificateDer::from(vec![0u8; 4])];
    let mut negotiator = authenticator.new_negotiator(client_address(), chain);

    negotiator.submit(b"EXTERNAL").unwrap();
    negotiator.submit(b"").unwrap();
    assert_eq!(negotiator.resolved_identity().unwrap().name(), "other");
}

#[test]
fn test_external_requires_common_name() {
    let config = AuthConfig::from_str(
        r"
mechanisms: [EXTERNAL]
backend:
  kind: table
  users:
    - username: unused
      password: unused
",
    )
    .unwrap();
    let authenticator = Authenticator::from_config(&config).unwrap();

    let leaf = test_certificate(&[(DnType::OrganizationName, "NoName")]);
    let mut negotiator = authenticator.new_negotiator(client_address(), vec![leaf]);

    negotiator.submit(b"EXTERNAL").unwrap();
    let result = negotiator.submit(b"");
    assert!(matches!(result, Err(AuthError::CommonNameRequired)));
    assert!(!negotiator.is_complete());
}

#[test]
fn test_external_rejects_garbage_leaf() {
    let config = AuthConfig::from_str(
        r"
mechanisms: [EXTERNAL]
backend:
  kind: table
  users:
    - username: unused
      password: unused
",
    )
    .unwrap();
    let authenticator = Authenticator::from_config(&config).unwrap();

    let chain = vec![CertificateDer::from(vec![0xde, 0xad, 0xbe, 0xef])];
    let mut negotiator = authenticator.new_negotiator(client_address(), chain);

    negotiator.submit(b"EXTERNAL").unwrap();
    assert!(matches!(
        negotiator.submit(b""),
        Err(AuthError::UnsupportedCertificateType)
    ));
}

#[test]
fn test_file_backed_table_through_full_handshake() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials");
    std::fs::write(&path, "cassandra:password\n").unwrap();

    let yaml = format!(
        r"
mechanisms: [PLAIN]
backend:
  kind: table
  file: {}
",
        path.display()
    );
    let config = AuthConfig::from_str(&yaml).unwrap();
    let authenticator = Authenticator::from_config(&config).unwrap();
    authenticator.validate_configuration().unwrap();
    authenticator.setup().unwrap();

    let mut negotiator = authenticator.new_negotiator(client_address(), Vec::new());
    negotiator.submit(b"PLAIN").unwrap();
    negotiator.submit(b"\0cassandra\0password").unwrap();
    assert_eq!(negotiator.resolved_identity().unwrap().name(), "cassandra");
}

#[test]
fn test_legacy_authenticate_through_backend() {
    let authenticator = plain_authenticator();

    let mut credentials = HashMap::new();
    credentials.insert("username".to_string(), "cassandra".to_string());
    credentials.insert("password".to_string(), "wrong".to_string());
    assert!(matches!(
        authenticator.legacy_authenticate(&credentials),
        Err(AuthError::Backend(BackendError::InvalidCredentials))
    ));

    credentials.insert("password".to_string(), "password".to_string());
    let user = authenticator.legacy_authenticate(&credentials).unwrap();
    assert_eq!(user.name(), "cassandra");
}
