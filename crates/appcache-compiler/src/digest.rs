use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;
use std::io::Read;

/// SHA-1 digest of one output file's content, stored as a lowercase hex
/// string. AppCache fingerprints are SHA-1 for compatibility with the
/// manifests clients already hold; this is a change marker, not a security
/// boundary.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the digest of an arbitrary byte slice.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(bytes.as_ref());
        Self(hex::encode(hasher.finalize()))
    }

    /// Compute the digest of bytes read from `reader`.
    ///
    /// Streaming keeps large build outputs (bundled JS, sprite sheets) out
    /// of memory; the result is identical to [`from_bytes`](Self::from_bytes)
    /// over the same content.
    pub fn from_reader(mut reader: impl Read) -> std::io::Result<Self> {
        let mut hasher = Sha1::new();
        let mut buf = [0_u8; 64 * 1024];
        loop {
            let read = reader.read(&mut buf)?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Order-independent SHA-1 fingerprint over a batch's content digests,
/// stored as a lowercase hex string. This is the value written on the
/// manifest's `#` comment line and compared by the change gate.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateFingerprint(String);

impl AggregateFingerprint {
    /// Combine per-file digests into the batch fingerprint.
    ///
    /// The digest hex strings are sorted and joined with `,` before
    /// hashing, so arrival order never changes the result. Duplicate
    /// digests each contribute: two files with equal content are still two
    /// entries. An empty batch hashes the empty string, which is a legal
    /// fingerprint for a manifest with no cacheable output.
    pub fn combine(digests: &[ContentDigest]) -> Self {
        let mut hex_digests: Vec<&str> = digests.iter().map(ContentDigest::as_str).collect();
        hex_digests.sort_unstable();

        let mut hasher = Sha1::new();
        hasher.update(hex_digests.join(",").as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AggregateFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
