//! Decoding and validation of attested private-key seeds.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::Identity;

const SEED_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::seed");

/// Opaque signed key bundle carried by a seed.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    /// Wraps raw key bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "KeyMaterial(<{} bytes redacted>)", self.0.len())
    }
}

/// Decoded attested-boot seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    identity: Identity,
    life: u32,
    ring: KeyMaterial,
    oath: Option<Vec<u8>>,
}

/// Serialized layout of a seed inside its wire encoding.
#[derive(Debug, Serialize, Deserialize)]
struct SeedRecord {
    ship: u128,
    life: u32,
    ring: Vec<u8>,
    oath: Option<Vec<u8>>,
}

/// Errors raised while decoding a seed.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The encoded text was not valid.
    #[error("invalid private keys: {text}")]
    InvalidEncoding {
        /// Text that failed to decode.
        text: String,
    },
    /// The decoded bytes did not hold a seed record.
    #[error("unable to deserialize private key: {message}")]
    Deserialize {
        /// Decoder failure description.
        message: String,
    },
    /// The seed belongs to a different identity than the one expected.
    #[error("boot: expected ship {expected}, but key file is for {found}")]
    Mismatch {
        /// Identity the caller asked for.
        expected: Identity,
        /// Identity embedded in the seed.
        found: Identity,
    },
    /// Encoding a seed for transport failed.
    #[error("unable to serialize seed: {message}")]
    Serialize {
        /// Encoder failure description.
        message: String,
    },
}

impl Seed {
    /// Builds a seed from its parts.
    #[must_use]
    pub const fn new(
        identity: Identity,
        life: u32,
        ring: KeyMaterial,
        oath: Option<Vec<u8>>,
    ) -> Self {
        Self {
            identity,
            life,
            ring,
            oath,
        }
    }

    /// Identity the seed attests.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Key revision number.
    #[must_use]
    pub const fn life(&self) -> u32 {
        self.life
    }

    /// Signed key bundle.
    #[must_use]
    pub const fn ring(&self) -> &KeyMaterial {
        &self.ring
    }

    /// Optional parent signature.
    #[must_use]
    pub fn oath(&self) -> Option<&[u8]> {
        self.oath.as_deref()
    }

    /// Encodes the seed into the text form accepted by [`decode_seed`].
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::Serialize`] when the record cannot be encoded.
    pub fn to_wire(&self) -> Result<String, SeedError> {
        let record = SeedRecord {
            ship: self.identity.value(),
            life: self.life,
            ring: self.ring.as_bytes().to_vec(),
            oath: self.oath.clone(),
        };
        let bytes = bincode::serialize(&record).map_err(|error| SeedError::Serialize {
            message: error.to_string(),
        })?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }
}

/// Decodes `encoded` into a seed, optionally requiring it to attest
/// `expected`.
///
/// The encoded text is consumed. Surrounding whitespace is ignored so a key
/// pasted with a trailing newline still decodes.
///
/// # Errors
///
/// Returns [`SeedError::InvalidEncoding`] echoing the input when the text is
/// not valid, [`SeedError::Deserialize`] when the bytes do not form a seed
/// record, and [`SeedError::Mismatch`] when `expected` differs from the
/// embedded identity.
pub fn decode_seed(encoded: String, expected: Option<&Identity>) -> Result<Seed, SeedError> {
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(encoded.trim()) else {
        tracing::error!(target: SEED_TARGET, "dawn: invalid private keys: {encoded}");
        return Err(SeedError::InvalidEncoding { text: encoded });
    };
    drop(encoded);

    let record: SeedRecord = bincode::deserialize(&bytes).map_err(|error| {
        tracing::error!(target: SEED_TARGET, %error, "unable to deserialize private key");
        SeedError::Deserialize {
            message: error.to_string(),
        }
    })?;

    let seed = Seed {
        identity: Identity::new(record.ship),
        life: record.life,
        ring: KeyMaterial::new(record.ring),
        oath: record.oath,
    };

    if let Some(expected) = expected
        && expected != seed.identity()
    {
        return Err(SeedError::Mismatch {
            expected: expected.clone(),
            found: seed.identity().clone(),
        });
    }
    Ok(seed)
}
