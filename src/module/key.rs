use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::debug;

use crate::cas::Digest;
use crate::error::{Error, Result};
use crate::module::ModuleFullName;

type DigestFn = Box<dyn FnOnce() -> Result<Digest> + Send>;

/// a pinned dependency: module identity, optional commit and a digest
///
/// the digest is produced on demand by a caller-supplied closure, which may
/// need storage or network access. the closure runs at most once, even with
/// concurrent callers; its outcome, success or failure, is memoized.
/// clones share the memoized digest.
#[derive(Clone)]
pub struct ModuleKey {
    full_name: ModuleFullName,
    commit_id: Option<String>,
    digest: Arc<LazyDigest>,
}

impl ModuleKey {
    /// create a key whose digest is computed by `get_digest` on first use
    pub fn new<F>(full_name: ModuleFullName, commit_id: Option<String>, get_digest: F) -> Self
    where
        F: FnOnce() -> Result<Digest> + Send + 'static,
    {
        Self {
            full_name,
            commit_id: commit_id.filter(|c| !c.is_empty()),
            digest: Arc::new(LazyDigest::new(Box::new(get_digest))),
        }
    }

    /// create a key with an already known digest
    pub fn with_digest(full_name: ModuleFullName, commit_id: Option<String>, digest: Digest) -> Self {
        Self::new(full_name, commit_id, move || Ok(digest))
    }

    pub fn full_name(&self) -> &ModuleFullName {
        &self.full_name
    }

    /// commit id, `None` when the key is pinned by digest only
    pub fn commit_id(&self) -> Option<&str> {
        self.commit_id.as_deref()
    }

    /// resolve the digest, running the closure on first call
    pub fn digest(&self) -> Result<Digest> {
        self.digest
            .get(&self.full_name)
            .map_err(|message| Error::ModuleDigest {
                module: self.full_name.to_string(),
                message,
            })
    }

    /// has the digest already been resolved
    pub fn is_resolved(&self) -> bool {
        self.digest.cell.get().is_some()
    }
}

impl fmt::Debug for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleKey")
            .field("full_name", &self.full_name.to_string())
            .field("commit_id", &self.commit_id)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.commit_id {
            Some(commit) => write!(f, "{}:{}", self.full_name, commit),
            None => write!(f, "{}", self.full_name),
        }
    }
}

/// memoized single-flight digest computation
struct LazyDigest {
    cell: OnceLock<std::result::Result<Digest, String>>,
    get_digest: Mutex<Option<DigestFn>>,
}

impl LazyDigest {
    fn new(get_digest: DigestFn) -> Self {
        Self {
            cell: OnceLock::new(),
            get_digest: Mutex::new(Some(get_digest)),
        }
    }

    fn get(&self, full_name: &ModuleFullName) -> std::result::Result<Digest, String> {
        self.cell
            .get_or_init(|| {
                let taken = match self.get_digest.lock() {
                    Ok(mut guard) => guard.take(),
                    Err(poisoned) => poisoned.into_inner().take(),
                };
                let Some(get_digest) = taken else {
                    return Err("digest computation already consumed".to_string());
                };
                debug!(module = %full_name, "resolving module digest");
                get_digest().map_err(|e| e.to_string())
            })
            .clone()
    }
}
