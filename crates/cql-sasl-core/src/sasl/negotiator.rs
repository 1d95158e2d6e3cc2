//! Per-connection SASL negotiation state machine.
//!
//! A negotiator runs a two-phase exchange: the first client token names a
//! mechanism, which is checked against the server's supported set and
//! echoed back as the acknowledgment; the next token is handed to the
//! chosen mechanism. Transitions are one-directional: once the machine is
//! complete or failed it never moves again, and further calls fail loudly
//! instead of silently re-running.

use std::net::SocketAddr;
use std::sync::Arc;

use rustls_pki_types::CertificateDer;
use tracing::{debug, warn};

use crate::backend::VerifyBackend;
use crate::config::Mechanism;
use crate::error::{AuthError, AuthResult};
use crate::principal::AuthenticatedUser;

use super::external;
use super::plain::{self, DecodedCredential};

/// Progress of one connection's negotiation.
#[derive(Debug)]
enum NegotiationState {
    /// Waiting for the client to name a mechanism.
    AwaitingMechanism,
    /// Mechanism accepted; waiting for its credential token.
    MechanismChosen(Mechanism),
    /// Exchange finished; the outcome is held for `resolved_identity`.
    Complete(Negotiated),
    /// Terminal failure, re-raised on any further call.
    Failed(AuthError),
}

/// What a completed exchange produced.
#[derive(Debug)]
enum Negotiated {
    /// PLAIN decoded credentials; backend verification happens (once) when
    /// the identity is requested, and its outcome is memoized here.
    Plain {
        credentials: DecodedCredential,
        resolved: Option<AuthResult<AuthenticatedUser>>,
    },
    /// EXTERNAL resolved the identity directly from the certificate chain.
    External { user: AuthenticatedUser },
}

/// Server-side negotiator for a single client connection.
///
/// Owned by exactly one connection; the transport serializes calls into it,
/// so it carries no locking of its own.
#[derive(Debug)]
pub struct SaslNegotiator {
    mechanisms: Vec<Mechanism>,
    backend: Arc<dyn VerifyBackend>,
    certificates: Vec<CertificateDer<'static>>,
    client_address: SocketAddr,
    state: NegotiationState,
}

impl SaslNegotiator {
    pub(crate) fn new(
        mechanisms: Vec<Mechanism>,
        backend: Arc<dyn VerifyBackend>,
        certificates: Vec<CertificateDer<'static>>,
        client_address: SocketAddr,
    ) -> Self {
        Self {
            mechanisms,
            backend,
            certificates,
            client_address,
            state: NegotiationState::AwaitingMechanism,
        }
    }

    /// Evaluate one client token and produce the server's response token.
    ///
    /// The first call selects the mechanism and echoes it back; the second
    /// runs the mechanism and returns an empty payload on success.
    ///
    /// # Errors
    ///
    /// Protocol misuse ([`AuthError::AlreadyComplete`]), an unsupported
    /// mechanism, or a mechanism-specific decode/extraction failure. Any
    /// error is terminal for this negotiator.
    pub fn submit(&mut self, token: &[u8]) -> AuthResult<Vec<u8>> {
        match &self.state {
            NegotiationState::AwaitingMechanism => self.choose_mechanism(token),
            NegotiationState::MechanismChosen(mechanism) => {
                let mechanism = *mechanism;
                self.run_mechanism(mechanism, token)
            }
            NegotiationState::Complete(_) => Err(AuthError::AlreadyComplete),
            NegotiationState::Failed(error) => Err(error.clone()),
        }
    }

    fn choose_mechanism(&mut self, token: &[u8]) -> AuthResult<Vec<u8>> {
        let candidate = String::from_utf8_lossy(token);
        match self
            .mechanisms
            .iter()
            .find(|mechanism| mechanism.mechanism_name() == candidate)
        {
            Some(mechanism) => {
                debug!(
                    client = %self.client_address,
                    mechanism = mechanism.mechanism_name(),
                    "negotiated SASL mechanism"
                );
                self.state = NegotiationState::MechanismChosen(*mechanism);
                // The client's choice is accepted as-is rather than ranked
                // against alternatives; echoing the name keeps the
                // selection explicit on the wire.
                Ok(token.to_vec())
            }
            None => {
                warn!(
                    client = %self.client_address,
                    mechanism = %candidate,
                    "unsupported SASL mechanism requested"
                );
                self.fail(AuthError::UnsupportedMechanism(candidate.into_owned()))
            }
        }
    }

    fn run_mechanism(&mut self, mechanism: Mechanism, token: &[u8]) -> AuthResult<Vec<u8>> {
        let negotiated = match mechanism {
            Mechanism::Plain => {
                plain::decode_credentials(token).map(|credentials| Negotiated::Plain {
                    credentials,
                    resolved: None,
                })
            }
            Mechanism::External => external::extract_identity(&self.certificates)
                .map(|user| Negotiated::External { user }),
        };

        match negotiated {
            Ok(negotiated) => {
                self.state = NegotiationState::Complete(negotiated);
                Ok(Vec::new())
            }
            Err(error) => self.fail(error),
        }
    }

    fn fail(&mut self, error: AuthError) -> AuthResult<Vec<u8>> {
        self.state = NegotiationState::Failed(error.clone());
        Err(error)
    }

    /// Whether the exchange has finished successfully.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.state, NegotiationState::Complete(_))
    }

    /// The identity this negotiation resolved.
    ///
    /// For PLAIN the backend verification runs on the first call and its
    /// outcome, accepted or rejected, is memoized, so the backend is never
    /// driven twice and the resolved identity never changes.
    ///
    /// # Errors
    ///
    /// [`AuthError::NegotiationNotStarted`] before the exchange finished; a
    /// failed exchange re-raises its original error; rejected credentials
    /// surface as a backend error.
    pub fn resolved_identity(&mut self) -> AuthResult<AuthenticatedUser> {
        let credentials = match &self.state {
            NegotiationState::AwaitingMechanism | NegotiationState::MechanismChosen(_) => {
                return Err(AuthError::NegotiationNotStarted)
            }
            NegotiationState::Failed(error) => return Err(error.clone()),
            NegotiationState::Complete(Negotiated::External { user }) => return Ok(user.clone()),
            NegotiationState::Complete(Negotiated::Plain {
                credentials,
                resolved,
            }) => {
                if let Some(outcome) = resolved {
                    return outcome.clone();
                }
                credentials.clone()
            }
        };

        // The backend may block on I/O; no per-connection lock is held here.
        let outcome = self
            .backend
            .verify(&credentials.username, &credentials.password)
            .map_err(AuthError::from);
        if let Err(error) = &outcome {
            warn!(
                client = %self.client_address,
                username = %credentials.username,
                error = %error,
                "authentication failed"
            );
        }
        if let NegotiationState::Complete(Negotiated::Plain { resolved, .. }) = &mut self.state {
            *resolved = Some(outcome.clone());
        }
        outcome
    }
}
