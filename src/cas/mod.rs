//! content-addressable storage primitives
//!
//! digests fingerprint bytes, blobs pair bytes with their digest, manifests
//! list paths with digests, and file sets tie a manifest to the blobs it
//! references. the manifest encoding is hashed to produce module digests.

mod blob;
mod blob_set;
mod digest;
mod file_node;
mod file_set;
mod manifest;

pub use blob::{Blob, BlobOptions};
pub use blob_set::BlobSet;
pub use digest::{digest_equal, Digest, DigestHasher, DigestType, SHAKE256_LENGTH};
pub use file_node::FileNode;
pub use file_set::{file_set_for_bucket, put_file_set_to_bucket, FileSet};
pub use manifest::Manifest;
