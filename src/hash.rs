// src/hash.rs

//! Content digests for installed components
//!
//! Every tracked artifact is identified by a digest of its bytes. Two
//! algorithms are supported:
//! - **SHA-256**: the default; recorded in the installation ledger and used
//!   wherever a declared checksum must be verified exactly.
//! - **XXH128**: non-cryptographic and much faster; suitable for bulk
//!   same-or-changed comparisons during detection scans.
//!
//! Persisted digests use the prefixed form `sha256:<hex>` so the algorithm
//! survives in version-controlled state.

use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;
use xxhash_rust::xxh3::xxh3_128;

use crate::error::{Error, Result};

/// Digest algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// SHA-256, cryptographic. The ledger format.
    #[default]
    Sha256,
    /// XXH128, non-cryptographic, fast comparison only.
    Xxh128,
}

impl HashAlgorithm {
    /// Hex string length of a digest under this algorithm
    #[inline]
    pub const fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Xxh128 => 32,
        }
    }

    /// Algorithm name as used in the prefixed digest form
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Xxh128 => "xxh128",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "xxh128" | "xxh3" => Ok(Self::Xxh128),
            _ => Err(Error::Serialize(format!("unknown hash algorithm: {}", s))),
        }
    }
}

/// A digest value together with its algorithm
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    pub algorithm: HashAlgorithm,
    pub value: String,
}

impl ContentHash {
    /// Validate a hex digest string for the given algorithm
    pub fn new(algorithm: HashAlgorithm, value: impl Into<String>) -> Result<Self> {
        let value: String = value.into();
        if value.len() != algorithm.hex_len() {
            return Err(Error::ChecksumMismatch {
                expected: format!("{} hex chars", algorithm.hex_len()),
                actual: format!("{} hex chars", value.len()),
            });
        }
        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::ChecksumMismatch {
                expected: "hex digest".to_string(),
                actual: value,
            });
        }
        Ok(Self {
            algorithm,
            value: value.to_lowercase(),
        })
    }

    fn new_unchecked(algorithm: HashAlgorithm, value: String) -> Self {
        Self { algorithm, value }
    }

    /// Parse a prefixed digest string, e.g. `sha256:ab12...`.
    ///
    /// Unprefixed strings are taken as SHA-256.
    pub fn parse_prefixed(s: &str) -> Result<Self> {
        if let Some((algo, hex)) = s.split_once(':') {
            Self::new(algo.parse()?, hex)
        } else {
            Self::new(HashAlgorithm::Sha256, s)
        }
    }

    /// Format as the persisted `algo:hex` form
    pub fn to_prefixed_string(&self) -> String {
        format!("{}:{}", self.algorithm.name(), self.value)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Incremental hasher over either algorithm
pub struct Hasher {
    algorithm: HashAlgorithm,
    state: HasherState,
}

enum HasherState {
    Sha256(Sha256),
    // xxh3 has no incremental API in this crate; buffer and hash at the end
    Xxh128(Vec<u8>),
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
            HashAlgorithm::Xxh128 => HasherState::Xxh128(Vec::new()),
        };
        Self { algorithm, state }
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Sha256(h) => h.update(data),
            HasherState::Xxh128(buf) => buf.extend_from_slice(data),
        }
    }

    pub fn finalize(self) -> ContentHash {
        let value = match self.state {
            HasherState::Sha256(h) => format!("{:x}", h.finalize()),
            HasherState::Xxh128(buf) => format!("{:032x}", xxh3_128(&buf)),
        };
        ContentHash::new_unchecked(self.algorithm, value)
    }
}

/// Digest a byte slice
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> ContentHash {
    let value = match algorithm {
        HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(data)),
        HashAlgorithm::Xxh128 => format!("{:032x}", xxh3_128(data)),
    };
    ContentHash::new_unchecked(algorithm, value)
}

/// Digest data from a reader without loading it all into memory
pub fn hash_reader<R: Read>(algorithm: HashAlgorithm, reader: &mut R) -> io::Result<ContentHash> {
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = [0u8; 8192];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hasher.finalize())
}

/// The ledger digest of a content blob: prefixed SHA-256
#[inline]
pub fn content_digest(data: &[u8]) -> String {
    hash_bytes(HashAlgorithm::Sha256, data).to_prefixed_string()
}

/// Digest a file's content in the ledger form
pub fn file_digest(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    let hash = hash_reader(HashAlgorithm::Sha256, &mut file)?;
    Ok(hash.to_prefixed_string())
}

/// Verify bytes against an expected digest in prefixed or bare-hex form.
///
/// Fatal for the component being verified, never for the whole run.
pub fn verify_bytes(data: &[u8], expected: &str) -> Result<()> {
    let expected_hash = ContentHash::parse_prefixed(expected)?;
    let actual = hash_bytes(expected_hash.algorithm, data);
    if actual.value == expected_hash.value {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            expected: expected_hash.to_prefixed_string(),
            actual: actual.to_prefixed_string(),
        })
    }
}

/// Verify a file on disk against an expected digest, streaming its content
pub fn verify_file(path: &Path, expected: &str) -> Result<()> {
    let expected_hash = ContentHash::parse_prefixed(expected)?;
    let mut file = std::fs::File::open(path)?;
    let actual = hash_reader(expected_hash.algorithm, &mut file)?;
    if actual.value == expected_hash.value {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            expected: expected_hash.to_prefixed_string(),
            actual: actual.to_prefixed_string(),
        })
    }
}
