use std::fmt;

use crate::cas::digest::Digest;
use crate::error::{Error, Result};
use crate::normalpath;

/// separator between digest and path in the line encoding
const SEPARATOR: &str = "  ";

/// a normalized file path and the digest of its content
///
/// empty files carry no digest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileNode {
    path: String,
    digest: Option<Digest>,
}

impl FileNode {
    /// create a file node, rejecting paths that are empty or not normalized
    pub fn new(path: impl Into<String>, digest: Option<Digest>) -> Result<Self> {
        let path = path.into();
        let invalid = |reason: &str| Error::InvalidFileNode {
            input: path.clone(),
            reason: reason.to_string(),
        };
        if path.is_empty() {
            return Err(invalid("path is empty"));
        }
        // line breaks and the separator would make the manifest ambiguous
        if path.contains(['\n', '\r']) {
            return Err(invalid("path contains a line break"));
        }
        if path.contains(SEPARATOR) {
            return Err(invalid("path contains the digest separator"));
        }
        let normalized = normalpath::normalize_and_validate_object(&path)
            .map_err(|e| invalid(&e.to_string()))?;
        if normalized != path {
            return Err(invalid(&format!("path is not normalized, expected {:?}", normalized)));
        }
        Ok(Self { path, digest })
    }

    /// parse the line encoding produced by `Display`
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidFileNode {
            input: s.to_string(),
            reason,
        };
        let mut split = s.split(SEPARATOR);
        let (digest, path) = match (split.next(), split.next(), split.next()) {
            (Some(path), None, _) => (None, path),
            (Some(digest), Some(path), None) => {
                let digest = Digest::parse(digest).map_err(|e| invalid(e.to_string()))?;
                (Some(digest), path)
            }
            _ => return Err(invalid("expected at most one separator".to_string())),
        };
        Self::new(path, digest).map_err(|e| match e {
            Error::InvalidFileNode { reason, .. } => invalid(reason),
            other => other,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// digest of the content, `None` for empty files
    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }
}

impl fmt::Display for FileNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.digest {
            Some(digest) => write!(f, "{}{}{}", digest, SEPARATOR, self.path),
            None => f.write_str(&self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas::DigestType;

    #[test]
    fn test_file_node_string() {
        let digest = Digest::for_bytes(b"X", DigestType::Shake256);
        let node = FileNode::new("foo/a.proto", Some(digest.clone())).unwrap();
        assert_eq!(node.to_string(), format!("{}  foo/a.proto", digest));

        let empty = FileNode::new("foo/b.proto", None).unwrap();
        assert_eq!(empty.to_string(), "foo/b.proto");
    }

    #[test]
    fn test_file_node_parse() {
        let digest = Digest::for_bytes(b"X", DigestType::Shake256);
        let line = format!("{}  foo/a.proto", digest);
        let node = FileNode::parse(&line).unwrap();
        assert_eq!(node.path(), "foo/a.proto");
        assert_eq!(node.digest(), Some(&digest));

        let bare = FileNode::parse("foo/b.proto").unwrap();
        assert_eq!(bare.digest(), None);
    }

    #[test]
    fn test_file_node_rejects_unnormalized() {
        assert!(FileNode::new("", None).is_err());
        assert!(FileNode::new("./a.proto", None).is_err());
        assert!(FileNode::new("a//b.proto", None).is_err());
        assert!(FileNode::new("/a.proto", None).is_err());
        assert!(FileNode::new("../a.proto", None).is_err());
        assert!(FileNode::new(".", None).is_err());
    }

    #[test]
    fn test_file_node_rejects_ambiguous_paths() {
        for path in ["x.proto\ny.proto", "a\r.proto", "a  b.proto", "dir  x/a.proto"] {
            assert!(
                matches!(FileNode::new(path, None), Err(Error::InvalidFileNode { .. })),
                "{:?} should be rejected",
                path
            );
        }
        assert!(FileNode::new("a b.proto", None).is_ok());
    }

    #[test]
    fn test_file_node_parse_errors() {
        assert!(FileNode::parse("").is_err());
        assert!(FileNode::parse("shake256:00  a.proto").is_err());
        let digest = Digest::for_bytes(b"X", DigestType::Shake256);
        assert!(FileNode::parse(&format!("{}  a  b", digest)).is_err());
        assert!(matches!(
            FileNode::parse("a//b"),
            Err(Error::InvalidFileNode { input, .. }) if input == "a//b"
        ));
    }
}
