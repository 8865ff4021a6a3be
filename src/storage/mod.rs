//! key to bytes storage used by the content-addressed layer and config files
//!
//! a bucket maps normalized relative paths to file content. buckets are not
//! synchronized: callers ensure at most one writer per path.

mod dir;
mod memory;

pub use dir::DirBucket;
pub use memory::MemoryBucket;

use crate::error::Result;
use crate::normalpath;

/// read access to a bucket
pub trait ReadBucket {
    /// read the full content at `path`
    ///
    /// returns [`crate::Error::NotFound`] if there is no object at `path`.
    fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// does an object exist at `path`
    fn exists(&self, path: &str) -> Result<bool>;

    /// every object path under `prefix`, normalized and sorted byte-wise
    fn walk(&self, prefix: &str) -> Result<Vec<String>>;
}

/// write access to a bucket
pub trait WriteBucket {
    /// store `content` at `path`, replacing anything already there
    fn put(&mut self, path: &str, content: &[u8]) -> Result<()>;
}

impl<B: ReadBucket + ?Sized> ReadBucket for &B {
    fn get(&self, path: &str) -> Result<Vec<u8>> {
        (**self).get(path)
    }

    fn exists(&self, path: &str) -> Result<bool> {
        (**self).exists(path)
    }

    fn walk(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).walk(prefix)
    }
}

/// read-only view of a bucket restricted to paths a predicate accepts
pub struct MappedReadBucket<B, F> {
    inner: B,
    filter: F,
}

impl<B, F> MappedReadBucket<B, F>
where
    B: ReadBucket,
    F: Fn(&str) -> bool,
{
    pub fn new(inner: B, filter: F) -> Self {
        Self { inner, filter }
    }
}

impl<B, F> ReadBucket for MappedReadBucket<B, F>
where
    B: ReadBucket,
    F: Fn(&str) -> bool,
{
    fn get(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalpath::normalize_and_validate_object(path)?;
        if !(self.filter)(&path) {
            return Err(crate::Error::NotFound(path));
        }
        self.inner.get(&path)
    }

    fn exists(&self, path: &str) -> Result<bool> {
        let path = normalpath::normalize_and_validate_object(path)?;
        if !(self.filter)(&path) {
            return Ok(false);
        }
        self.inner.exists(&path)
    }

    fn walk(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .inner
            .walk(prefix)?
            .into_iter()
            .filter(|p| (self.filter)(p))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_bucket_filters() {
        let mut bucket = MemoryBucket::new();
        bucket.put("a.proto", b"a").unwrap();
        bucket.put("README.md", b"readme").unwrap();

        let protos = MappedReadBucket::new(&bucket, |p: &str| normalpath::ext(p) == ".proto");
        assert_eq!(protos.walk(".").unwrap(), vec!["a.proto"]);
        assert!(protos.exists("a.proto").unwrap());
        assert!(!protos.exists("README.md").unwrap());
        assert!(protos.get("README.md").unwrap_err().is_not_found());
        assert_eq!(protos.get("a.proto").unwrap(), b"a");
    }
}
