//! The client's asymmetric signaling key pair.
//!
//! Pairs come from the node, which owns the network's key scheme: it creates
//! fresh pairs and derives the request form of a persisted insert URI. Only the
//! insert form is ever persisted; the request form is asked for again on
//! restore, so the two can never drift apart.
//!
//! [`SignalingKeyPair::generate_local`] and [`local_request_uri`] implement a
//! self-contained Ed25519 scheme producing pairs of the same shape. Network
//! nodes cannot read its keys; it backs in-process node doubles and offline
//! tooling.

use std::fmt;

use crate::constants::{EXTRA_INSERT_FLAG_INDEX, SEED_LENGTH, ssk_extra};
use crate::crypto::{generate_crypto_key, generate_seed, public_routing_key};
use crate::error::{KeyError, UriError};
use crate::uri::{FreenetUri, KeyTriple, KeyType};

/// An SSK insert/request pair identifying this client to the bridge.
#[derive(Clone, PartialEq, Eq)]
pub struct SignalingKeyPair {
    insert_uri: FreenetUri,
    request_uri: FreenetUri,
}

impl SignalingKeyPair {
    /// Pair an insert URI with the request URI the node derived for it.
    ///
    /// Both must be SSKs in their respective forms and share the crypto key.
    /// Names and editions are dropped: a signaling key is the bare subspace.
    pub fn from_parts(insert_uri: FreenetUri, request_uri: FreenetUri) -> Result<Self, KeyError> {
        let insert_uri = check_insert_uri(insert_uri)?.to_bare_ssk()?;
        if request_uri.key_type() != KeyType::Ssk {
            return Err(KeyError::WrongKeyType(request_uri.key_type().as_str()));
        }
        if request_uri.is_insert_form() {
            return Err(KeyError::NotRequestUri);
        }
        let request_uri = request_uri.to_bare_ssk()?;
        if insert_uri.crypto_key() != request_uri.crypto_key() {
            return Err(KeyError::Mismatch);
        }
        Ok(Self {
            insert_uri,
            request_uri,
        })
    }

    /// Generate a pair with the local Ed25519 scheme.
    #[must_use]
    pub fn generate_local() -> Self {
        let seed = generate_seed();
        let crypto_key = generate_crypto_key();
        let insert = KeyTriple {
            routing_key: seed.to_vec(),
            crypto_key,
            extra: ssk_extra(true),
        };
        let request = KeyTriple {
            routing_key: public_routing_key(&seed).to_vec(),
            crypto_key,
            extra: ssk_extra(false),
        };
        Self {
            insert_uri: FreenetUri::ssk_from_checked(insert, None),
            request_uri: FreenetUri::ssk_from_checked(request, None),
        }
    }

    /// Restore a pair from an insert string using the local scheme.
    pub fn restore_local(s: &str) -> Result<Self, KeyError> {
        let insert_uri = parse_insert_uri(s)?;
        let request_uri = local_request_uri(&insert_uri)?;
        Self::from_parts(insert_uri, request_uri)
    }

    /// The private insert form. Never publish this outside the reply record.
    #[must_use]
    pub fn insert_uri(&self) -> &FreenetUri {
        &self.insert_uri
    }

    /// The public request form.
    #[must_use]
    pub fn request_uri(&self) -> &FreenetUri {
        &self.request_uri
    }

    /// ASCII serialization of the insert form, for persistence.
    #[must_use]
    pub fn insert_string(&self) -> String {
        self.insert_uri.to_ascii_string()
    }
}

impl fmt::Debug for SignalingKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalingKeyPair")
            .field("insert_uri", &"[REDACTED]")
            .field("request_uri", &self.request_uri)
            .finish()
    }
}

/// Parse a persisted insert string, checking it is an SSK insert URI.
pub fn parse_insert_uri(s: &str) -> Result<FreenetUri, KeyError> {
    check_insert_uri(FreenetUri::parse(s)?)
}

fn check_insert_uri(uri: FreenetUri) -> Result<FreenetUri, KeyError> {
    if uri.key_type() != KeyType::Ssk {
        return Err(KeyError::WrongKeyType(uri.key_type().as_str()));
    }
    if !uri.is_insert_form() {
        return Err(UriError::NotInsertUri.into());
    }
    Ok(uri)
}

/// Request URI of a local-scheme insert URI: the SHA-256 of the Ed25519
/// verifying key for the seed in the routing slot, insert flag cleared.
pub fn local_request_uri(insert_uri: &FreenetUri) -> Result<FreenetUri, KeyError> {
    let insert_uri = check_insert_uri(insert_uri.clone())?;
    let keys = insert_uri.keys().ok_or(UriError::NotInsertUri)?;
    let seed: &[u8; SEED_LENGTH] =
        keys.routing_key
            .as_slice()
            .try_into()
            .map_err(|_| UriError::InvalidKeyLength {
                part: "routing key",
                expected: SEED_LENGTH,
                actual: keys.routing_key.len(),
            })?;
    let mut extra = keys.extra;
    extra[EXTRA_INSERT_FLAG_INDEX] = 0;
    let request = KeyTriple {
        routing_key: public_routing_key(seed).to_vec(),
        crypto_key: keys.crypto_key,
        extra,
    };
    Ok(FreenetUri::ssk_from_checked(request, None))
}
