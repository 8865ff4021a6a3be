use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha3::digest::{ExtendableOutput, Update};
use sha3::Shake256;

use crate::error::{Error, Result};

/// length in bytes of a shake256 digest value
pub const SHAKE256_LENGTH: usize = 64;

/// the hash function a [`Digest`] was produced with
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DigestType {
    #[default]
    Shake256,
}

/// (type, token, value length), the only place digest types are enumerated
const DIGEST_TYPES: &[(DigestType, &str, usize)] =
    &[(DigestType::Shake256, "shake256", SHAKE256_LENGTH)];

impl DigestType {
    /// every known digest type
    pub fn all() -> impl Iterator<Item = DigestType> {
        DIGEST_TYPES.iter().map(|(t, _, _)| *t)
    }

    /// parse a digest type token such as `shake256`
    pub fn parse(s: &str) -> Result<Self> {
        DIGEST_TYPES
            .iter()
            .find(|(_, token, _)| *token == s)
            .map(|(t, _, _)| *t)
            .ok_or_else(|| Error::UnknownDigestType(s.to_string()))
    }

    /// canonical string token
    pub fn as_str(&self) -> &'static str {
        self.entry().1
    }

    /// fixed value length in bytes
    pub fn value_len(&self) -> usize {
        self.entry().2
    }

    fn entry(&self) -> &'static (DigestType, &'static str, usize) {
        // every variant has an entry in DIGEST_TYPES
        DIGEST_TYPES
            .iter()
            .find(|(t, _, _)| t == self)
            .unwrap_or(&DIGEST_TYPES[0])
    }
}

impl fmt::Display for DigestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// a typed content fingerprint
///
/// the string form is `<type>:<lowercase hex>`, e.g. `shake256:3f...`.
/// values can only be produced by hashing content or by parsing, so the
/// value length always matches the type.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest {
    digest_type: DigestType,
    value: Vec<u8>,
}

impl Digest {
    /// hash everything readable from `reader`
    pub fn for_content<R: Read>(reader: R, digest_type: DigestType) -> Result<Self> {
        let mut hasher = DigestHasher::new(digest_type);
        copy_into(reader, &mut hasher)?;
        Ok(hasher.finalize())
    }

    /// hash an in-memory byte slice
    pub fn for_bytes(content: &[u8], digest_type: DigestType) -> Self {
        let mut hasher = DigestHasher::new(digest_type);
        hasher.update(content);
        hasher.finalize()
    }

    /// create a digest from a type and raw value, checking the length
    pub fn from_parts(digest_type: DigestType, value: Vec<u8>) -> Result<Self> {
        if value.len() != digest_type.value_len() {
            return Err(Error::InvalidDigest {
                input: hex::encode(&value),
                reason: format!(
                    "expected {} bytes for {}, got {}",
                    digest_type.value_len(),
                    digest_type,
                    value.len()
                ),
            });
        }
        Ok(Self { digest_type, value })
    }

    /// parse the `<type>:<hex>` string form
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidDigest {
            input: s.to_string(),
            reason,
        };
        if s.is_empty() {
            return Err(invalid("empty string".to_string()));
        }
        let (type_str, hex_str) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected <type>:<value>".to_string()))?;
        let digest_type = DigestType::parse(type_str).map_err(|e| invalid(e.to_string()))?;
        let value = hex::decode(hex_str).map_err(|e| invalid(format!("invalid hex: {}", e)))?;
        if value.len() != digest_type.value_len() {
            return Err(invalid(format!(
                "expected {} bytes for {}, got {}",
                digest_type.value_len(),
                digest_type,
                value.len()
            )));
        }
        Ok(Self { digest_type, value })
    }

    pub fn digest_type(&self) -> DigestType {
        self.digest_type
    }

    /// raw value bytes
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// lowercase hex of the value, without the type prefix
    pub fn to_hex(&self) -> String {
        hex::encode(&self.value)
    }
}

/// nil-safe digest equality
///
/// two absent digests are equal, one absent digest is not.
pub fn digest_equal(a: Option<&Digest>, b: Option<&Digest>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.digest_type, self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({}:{})", self.digest_type, &self.to_hex()[..12])
    }
}

impl FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// streaming hasher for a [`DigestType`]
pub struct DigestHasher {
    inner: HasherState,
}

enum HasherState {
    Shake256(Shake256),
}

impl DigestHasher {
    pub fn new(digest_type: DigestType) -> Self {
        let inner = match digest_type {
            DigestType::Shake256 => HasherState::Shake256(Shake256::default()),
        };
        Self { inner }
    }

    /// feed content bytes
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.inner {
            HasherState::Shake256(h) => h.update(data),
        }
    }

    /// finalize and return the digest
    pub fn finalize(self) -> Digest {
        match self.inner {
            HasherState::Shake256(h) => {
                let mut value = vec![0u8; SHAKE256_LENGTH];
                h.finalize_xof_into(&mut value);
                Digest {
                    digest_type: DigestType::Shake256,
                    value,
                }
            }
        }
    }
}

impl Write for DigestHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// copy a reader into a writer, mapping read failures
pub(crate) fn copy_into<R: Read, W: Write>(mut reader: R, writer: &mut W) -> Result<u64> {
    io::copy(&mut reader, writer).map_err(|source| Error::Io {
        path: "<reader>".into(),
        source,
    })
}
