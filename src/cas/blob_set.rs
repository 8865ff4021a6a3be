use std::collections::BTreeMap;

use crate::cas::blob::Blob;
use crate::cas::digest::Digest;

/// blobs indexed by digest string
///
/// construction deduplicates by digest and keeps the first blob seen.
/// content of later blobs with the same digest is not compared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlobSet {
    blobs: BTreeMap<String, Blob>,
}

impl BlobSet {
    pub fn new(blobs: impl IntoIterator<Item = Blob>) -> Self {
        let mut map = BTreeMap::new();
        for blob in blobs {
            map.entry(blob.digest().to_string()).or_insert(blob);
        }
        Self { blobs: map }
    }

    /// look up a blob by digest
    pub fn get(&self, digest: &Digest) -> Option<&Blob> {
        self.blobs.get(&digest.to_string())
    }

    /// blobs sorted by digest string
    pub fn blobs(&self) -> Vec<Blob> {
        self.blobs.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Blob> {
        self.blobs.values()
    }

    /// digest strings in sorted order
    pub fn digest_strings(&self) -> impl Iterator<Item = &str> {
        self.blobs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}
