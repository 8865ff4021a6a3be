//! protomod - content-addressed protobuf modules
//!
//! computes deterministic digests for modules of `.proto` files and reads
//! and writes the versioned configuration files that describe them.
//!
//! # Core concepts
//!
//! - **Digest**: a typed content fingerprint, `shake256:<hex>`
//! - **Manifest**: the sorted list of `digest  path` lines for a set of files
//! - **FileSet**: a manifest together with the blobs it references
//! - **Module digest**: the digest over a module's files digest and the
//!   digests of its dependencies
//! - **Config files**: buf.yaml, buf.lock, buf.work.yaml and buf.gen.yaml,
//!   each in versions v1beta1, v1 and v2 where supported
//!
//! # Digest format
//!
//! module digest = SHAKE256(files_digest "\n" dep_digest_1 "\n" ... dep_digest_n)
//!
//! where dependency digests are sorted and deduplicated, and `files_digest`
//! is the digest of the manifest over the module's `.proto` files.
//!
//! # Example usage
//!
//! ```no_run
//! use protomod::module::module_digest;
//! use protomod::storage::DirBucket;
//! use std::path::Path;
//!
//! let bucket = DirBucket::open(Path::new("proto")).unwrap();
//! let digest = module_digest(&bucket, &[]).unwrap();
//! println!("{}", digest);
//! ```

mod error;

pub mod cas;
pub mod config;
pub mod module;
pub mod normalpath;
pub mod storage;

pub use error::{Error, ErrorKind, Result};
