use std::io::Read;

use crate::cas::digest::{copy_into, Digest, DigestHasher, DigestType};
use crate::error::{Error, Result};

/// content paired with its verified digest
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    digest: Digest,
    content: Vec<u8>,
}

/// options for [`Blob::for_content`]
#[derive(Clone, Debug, Default)]
pub struct BlobOptions {
    /// digest the caller already expects; checked against the computed one
    pub known_digest: Option<Digest>,
    /// hash function to use, ignored in favour of the known digest's type
    pub digest_type: DigestType,
}

impl BlobOptions {
    pub fn with_known_digest(mut self, digest: Digest) -> Self {
        self.known_digest = Some(digest);
        self
    }

    pub fn with_digest_type(mut self, digest_type: DigestType) -> Self {
        self.digest_type = digest_type;
        self
    }
}

impl Blob {
    /// read all content from `reader`, hashing it while buffering
    pub fn for_content<R: Read>(reader: R, options: BlobOptions) -> Result<Self> {
        let digest_type = options
            .known_digest
            .as_ref()
            .map_or(options.digest_type, Digest::digest_type);

        let mut tee = TeeHasher {
            hasher: DigestHasher::new(digest_type),
            content: Vec::new(),
        };
        copy_into(reader, &mut tee)?;
        let digest = tee.hasher.finalize();

        if let Some(known) = options.known_digest {
            if known != digest {
                return Err(Error::DigestMismatch {
                    expected: known.to_string(),
                    actual: digest.to_string(),
                });
            }
        }

        Ok(Self {
            digest,
            content: tee.content,
        })
    }

    /// hash in-memory content with the default digest type
    pub fn for_bytes(content: impl Into<Vec<u8>>) -> Self {
        let content = content.into();
        let digest = Digest::for_bytes(&content, DigestType::default());
        Self { digest, content }
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// consume and return the content
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("digest", &self.digest)
            .field("len", &self.content.len())
            .finish()
    }
}

/// writer that hashes and buffers at the same time
struct TeeHasher {
    hasher: DigestHasher,
    content: Vec<u8>,
}

impl std::io::Write for TeeHasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.hasher.update(buf);
        self.content.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_for_content() {
        let blob = Blob::for_content("hello".as_bytes(), BlobOptions::default()).unwrap();
        assert_eq!(blob.content(), b"hello");
        assert_eq!(
            blob.digest(),
            &Digest::for_bytes(b"hello", DigestType::Shake256)
        );
        assert_eq!(blob, Blob::for_bytes("hello"));
    }

    #[test]
    fn test_blob_known_digest_match() {
        let known = Digest::for_bytes(b"hello", DigestType::Shake256);
        let blob = Blob::for_content(
            "hello".as_bytes(),
            BlobOptions::default().with_known_digest(known.clone()),
        )
        .unwrap();
        assert_eq!(blob.digest(), &known);
    }

    #[test]
    fn test_blob_known_digest_mismatch() {
        let known = Digest::for_bytes(b"hello", DigestType::Shake256);
        let err = Blob::for_content(
            "world".as_bytes(),
            BlobOptions::default().with_known_digest(known.clone()),
        )
        .unwrap_err();
        match err {
            Error::DigestMismatch { expected, .. } => assert_eq!(expected, known.to_string()),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_blob_empty_content() {
        let blob = Blob::for_content(&b""[..], BlobOptions::default()).unwrap();
        assert!(blob.content().is_empty());
        assert_eq!(blob.digest(), &Digest::for_bytes(b"", DigestType::Shake256));
    }
}
