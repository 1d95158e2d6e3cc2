//! SASL/EXTERNAL identity extraction.
//!
//! EXTERNAL derives the client identity from credentials the transport
//! layer already established: the X.509 certificate chain presented during
//! mutual TLS. Only the leaf certificate is inspected, and its common name
//! is trusted unconditionally as the account name; chain trust must have
//! been established by the transport before this code runs.

use rustls_pki_types::CertificateDer;
use tracing::debug;
use x509_parser::parse_x509_certificate;

use crate::error::{AuthError, AuthResult};
use crate::principal::AuthenticatedUser;
use crate::subject::SubjectName;

const COMMON_NAME: &str = "CN";

/// Resolve an identity from a client certificate chain.
///
/// # Errors
///
/// Each step has a distinct failure: an empty chain
/// ([`AuthError::CertificateRequired`]), a leaf that is not X.509
/// ([`AuthError::UnsupportedCertificateType`]), a subject that does not
/// parse ([`AuthError::UnparsableSubject`]), and a subject without a CN
/// ([`AuthError::CommonNameRequired`]).
pub fn extract_identity(chain: &[CertificateDer<'_>]) -> AuthResult<AuthenticatedUser> {
    let leaf = chain.first().ok_or(AuthError::CertificateRequired)?;

    // Entries beyond the leaf are accepted but never looked at; validating
    // them is the transport layer's job.
    let (_, certificate) = parse_x509_certificate(leaf.as_ref())
        .map_err(|_| AuthError::UnsupportedCertificateType)?;

    let subject = SubjectName::parse(&certificate.subject().to_string())?;
    common_name_identity(&subject)
}

fn common_name_identity(subject: &SubjectName) -> AuthResult<AuthenticatedUser> {
    match subject.first_value(COMMON_NAME) {
        Some(common_name) => {
            debug!(common_name, "resolved identity from client certificate");
            Ok(AuthenticatedUser::new(common_name))
        }
        None => Err(AuthError::CommonNameRequired),
    }
}
