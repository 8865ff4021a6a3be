use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::normalpath;
use crate::storage::{ReadBucket, WriteBucket};

/// bucket held entirely in memory
#[derive(Clone, Debug, Default)]
pub struct MemoryBucket {
    objects: BTreeMap<String, Vec<u8>>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// build a bucket from (path, content) pairs
    pub fn from_entries<P, C>(entries: impl IntoIterator<Item = (P, C)>) -> Result<Self>
    where
        P: AsRef<str>,
        C: Into<Vec<u8>>,
    {
        let mut bucket = Self::new();
        for (path, content) in entries {
            let path = normalpath::normalize_and_validate_object(path.as_ref())?;
            bucket.objects.insert(path, content.into());
        }
        Ok(bucket)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ReadBucket for MemoryBucket {
    fn get(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalpath::normalize_and_validate_object(path)?;
        self.objects
            .get(&path)
            .cloned()
            .ok_or(Error::NotFound(path))
    }

    fn exists(&self, path: &str) -> Result<bool> {
        let path = normalpath::normalize_and_validate_object(path)?;
        Ok(self.objects.contains_key(&path))
    }

    fn walk(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = normalpath::normalize_and_validate(prefix)?;
        Ok(self
            .objects
            .keys()
            .filter(|p| normalpath::contains_path(&prefix, p))
            .cloned()
            .collect())
    }
}

impl WriteBucket for MemoryBucket {
    fn put(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let path = normalpath::normalize_and_validate_object(path)?;
        self.objects.insert(path, content.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_bucket_put_get() {
        let mut bucket = MemoryBucket::new();
        bucket.put("./foo//a.proto", b"X").unwrap();
        assert_eq!(bucket.get("foo/a.proto").unwrap(), b"X");
        assert!(bucket.exists("foo/a.proto").unwrap());
        assert!(!bucket.exists("foo/b.proto").unwrap());
        assert!(bucket.get("foo/b.proto").unwrap_err().is_not_found());
    }

    #[test]
    fn test_memory_bucket_rejects_escaping_paths() {
        let mut bucket = MemoryBucket::new();
        assert!(bucket.put("../a.proto", b"X").is_err());
        assert!(bucket.put("/a.proto", b"X").is_err());
        assert!(MemoryBucket::from_entries([(".", "x")]).is_err());
    }

    #[test]
    fn test_memory_bucket_walk_prefix() {
        let bucket = MemoryBucket::from_entries([
            ("foo/b.proto", "b"),
            ("foo/a.proto", "a"),
            ("foobar/c.proto", "c"),
            ("d.proto", "d"),
        ])
        .unwrap();
        assert_eq!(
            bucket.walk(".").unwrap(),
            vec!["d.proto", "foo/a.proto", "foo/b.proto", "foobar/c.proto"]
        );
        assert_eq!(bucket.walk("foo").unwrap(), vec!["foo/a.proto", "foo/b.proto"]);
        assert!(bucket.walk("nothing").unwrap().is_empty());
    }
}
