use std::collections::BTreeSet;

use tracing::debug;

use crate::cas::blob::Blob;
use crate::cas::blob_set::BlobSet;
use crate::cas::file_node::FileNode;
use crate::cas::manifest::Manifest;
use crate::error::{Error, Result};
use crate::storage::{ReadBucket, WriteBucket};

/// a manifest together with exactly the blobs it references
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSet {
    manifest: Manifest,
    blob_set: BlobSet,
}

impl FileSet {
    /// pair a manifest with a blob set
    ///
    /// every non-empty digest in the manifest must have a blob, and every
    /// blob must be referenced by the manifest.
    pub fn new(manifest: Manifest, blob_set: BlobSet) -> Result<Self> {
        let referenced: BTreeSet<String> = manifest.digests().into_keys().collect();
        let present: BTreeSet<String> = blob_set.digest_strings().map(str::to_string).collect();

        let missing_blobs: Vec<String> = referenced.difference(&present).cloned().collect();
        let unreferenced_blobs: Vec<String> = present.difference(&referenced).cloned().collect();
        if !missing_blobs.is_empty() || !unreferenced_blobs.is_empty() {
            return Err(Error::FileSetMismatch {
                missing_blobs,
                unreferenced_blobs,
            });
        }

        Ok(Self { manifest, blob_set })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn blob_set(&self) -> &BlobSet {
        &self.blob_set
    }

    /// content of a path, empty for files without a digest
    pub fn content(&self, path: &str) -> Option<&[u8]> {
        let node = self.manifest.get(path)?;
        match node.digest() {
            None => Some(&[][..]),
            Some(digest) => self.blob_set.get(digest).map(Blob::content),
        }
    }
}

/// read every object in a bucket into a file set
///
/// empty files get a manifest entry without a digest and no blob.
pub fn file_set_for_bucket<B: ReadBucket + ?Sized>(bucket: &B) -> Result<FileSet> {
    let mut nodes = Vec::new();
    let mut blobs = Vec::new();
    for path in bucket.walk(".")? {
        let content = bucket.get(&path)?;
        if content.is_empty() {
            nodes.push(FileNode::new(path, None)?);
            continue;
        }
        let blob = Blob::for_bytes(content);
        nodes.push(FileNode::new(path, Some(blob.digest().clone()))?);
        blobs.push(blob);
    }
    debug!(files = nodes.len(), blobs = blobs.len(), "built file set from bucket");
    FileSet::new(Manifest::new(nodes)?, BlobSet::new(blobs))
}

/// write every file of a file set into a bucket
pub fn put_file_set_to_bucket<B: WriteBucket + ?Sized>(file_set: &FileSet, bucket: &mut B) -> Result<()> {
    for node in file_set.manifest().iter() {
        let content: &[u8] = match node.digest() {
            None => &[],
            Some(digest) => file_set
                .blob_set()
                .get(digest)
                .map(Blob::content)
                .ok_or_else(|| {
                    Error::Internal(format!(
                        "file set has no blob for {} at {}",
                        digest,
                        node.path()
                    ))
                })?,
        };
        bucket.put(node.path(), content)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas::{Digest, DigestType};
    use crate::storage::MemoryBucket;

    fn node(path: &str, content: &str) -> FileNode {
        FileNode::new(path, Some(Digest::for_bytes(content.as_bytes(), DigestType::Shake256)))
            .unwrap()
    }

    #[test]
    fn test_file_set_valid() {
        let manifest = Manifest::new(vec![node("a.proto", "a"), node("b.proto", "a")]).unwrap();
        let blobs = BlobSet::new(vec![Blob::for_bytes("a")]);
        let fs = FileSet::new(manifest, blobs).unwrap();
        assert_eq!(fs.content("b.proto"), Some(&b"a"[..]));
        assert_eq!(fs.content("c.proto"), None);
    }

    #[test]
    fn test_file_set_missing_blob() {
        let manifest = Manifest::new(vec![node("a.proto", "a")]).unwrap();
        let missing = Digest::for_bytes(b"a", DigestType::Shake256).to_string();
        let err = FileSet::new(manifest, BlobSet::default()).unwrap_err();
        assert!(err.to_string().contains(&missing));
        match err {
            Error::FileSetMismatch {
                missing_blobs,
                unreferenced_blobs,
            } => {
                assert_eq!(missing_blobs, vec![missing]);
                assert!(unreferenced_blobs.is_empty());
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_file_set_unreferenced_blob() {
        let extra = Blob::for_bytes("extra");
        let err = FileSet::new(Manifest::default(), BlobSet::new(vec![extra.clone()])).unwrap_err();
        assert!(err.to_string().contains(&extra.digest().to_string()));
    }

    #[test]
    fn test_file_set_for_bucket_end_to_end() {
        let bucket =
            MemoryBucket::from_entries([("foo/a.proto", "X"), ("foo/b.proto", "")]).unwrap();
        let fs = file_set_for_bucket(&bucket).unwrap();

        let x_digest = Digest::for_bytes(b"X", DigestType::Shake256);
        assert_eq!(
            fs.manifest().to_string(),
            format!("{}  foo/a.proto\nfoo/b.proto\n", x_digest)
        );
        assert_eq!(fs.blob_set().len(), 1);
        assert_eq!(fs.blob_set().get(&x_digest).unwrap().content(), b"X");
    }

    #[test]
    fn test_put_file_set_to_bucket() {
        let source =
            MemoryBucket::from_entries([("foo/a.proto", "X"), ("foo/b.proto", "")]).unwrap();
        let fs = file_set_for_bucket(&source).unwrap();

        let mut dest = MemoryBucket::new();
        put_file_set_to_bucket(&fs, &mut dest).unwrap();
        assert_eq!(dest.get("foo/a.proto").unwrap(), b"X");
        assert!(dest.get("foo/b.proto").unwrap().is_empty());
        assert_eq!(file_set_for_bucket(&dest).unwrap(), fs);
    }
}
