//! Listing fingerprints for set-membership deduplication.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::listing::Listing;

/// Number of hex characters kept from the digest.
const FINGERPRINT_LEN: usize = 16;

/// A short, stable identifier derived from a listing's `(name, price)`.
///
/// Description and URL do not take part. Only used as a set key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(listing: &Listing) -> Self {
        Self::from_parts(&listing.name, listing.price)
    }

    pub fn from_parts(name: &str, price: f64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        hasher.update(b"|");
        hasher.update(price.to_string().as_bytes());
        let digest = hex::encode(hasher.finalize());
        Self(digest[..FINGERPRINT_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
