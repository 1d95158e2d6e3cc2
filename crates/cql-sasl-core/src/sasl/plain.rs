//! SASL/PLAIN credential decoding.
//!
//! PLAIN transmits credentials as a single token of UTF-8 bytes delimited
//! by NUL: `authzid<NUL>authnid<NUL>password`. The authzid is optional and
//! ignored here; the resolved identity is always the authnid, so no client
//! can act on behalf of another account.

use tracing::trace;

use crate::error::{AuthError, AuthResult};

const NUL: u8 = 0;

/// Username and password recovered from a PLAIN token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCredential {
    /// The authentication id.
    pub username: String,
    /// The password; may legitimately be empty.
    pub password: String,
}

/// Decode a client's PLAIN token.
///
/// The token is scanned from the end: the last NUL delimits the password,
/// the one before it delimits the username, and any bytes before that (the
/// authzid) are discarded. An empty-but-present field is valid; only a
/// wholly absent field is an error, which is what permits blank passwords.
///
/// # Errors
///
/// Returns [`AuthError::MissingPassword`] when no NUL delimits a password
/// field and [`AuthError::MissingUsername`] when no second NUL delimits a
/// username field.
pub fn decode_credentials(token: &[u8]) -> AuthResult<DecodedCredential> {
    trace!("decoding credentials from client token");

    let mut user: Option<&[u8]> = None;
    let mut pass: Option<&[u8]> = None;
    let mut end = token.len();
    for i in (0..token.len()).rev() {
        if token[i] == NUL {
            if pass.is_none() {
                pass = Some(&token[i + 1..end]);
            } else if user.is_none() {
                user = Some(&token[i + 1..end]);
            }
            end = i;
        }
    }

    let pass = pass.ok_or(AuthError::MissingPassword)?;
    let user = user.ok_or(AuthError::MissingUsername)?;

    Ok(DecodedCredential {
        username: String::from_utf8_lossy(user).into_owned(),
        password: String::from_utf8_lossy(pass).into_owned(),
    })
}
