use std::collections::BTreeMap;
use std::fmt;

use crate::cas::blob::Blob;
use crate::cas::digest::{digest_equal, Digest, DigestType};
use crate::cas::file_node::FileNode;
use crate::error::{Error, Result};

/// a sorted, deduplicated listing of file nodes
///
/// the `Display` output is the canonical encoding: one node per line,
/// sorted by path byte-wise, each line terminated by `\n`. this exact byte
/// sequence is what gets hashed for module digests, so it must never change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    nodes: BTreeMap<String, FileNode>,
}

impl Manifest {
    /// create a manifest from file nodes
    ///
    /// repeated paths are accepted when their digests agree, and rejected
    /// otherwise.
    pub fn new(file_nodes: impl IntoIterator<Item = FileNode>) -> Result<Self> {
        let mut nodes: BTreeMap<String, FileNode> = BTreeMap::new();
        for node in file_nodes {
            if let Some(existing) = nodes.get(node.path()) {
                if !digest_equal(existing.digest(), node.digest()) {
                    return Err(Error::ManifestConflict {
                        path: node.path().to_string(),
                        first: digest_label(existing.digest()),
                        second: digest_label(node.digest()),
                    });
                }
                continue;
            }
            nodes.insert(node.path().to_string(), node);
        }
        Ok(Self { nodes })
    }

    /// parse the canonical encoding
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::default());
        }
        let body = s.strip_suffix('\n').ok_or_else(|| {
            Error::InvalidManifest("manifest does not end with a newline".to_string())
        })?;
        let nodes = body
            .split('\n')
            .enumerate()
            .map(|(i, line)| {
                FileNode::parse(line).map_err(|e| {
                    Error::InvalidManifest(format!("line {}: {}", i + 1, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(nodes)
    }

    /// file nodes in path order
    pub fn file_nodes(&self) -> Vec<FileNode> {
        self.nodes.values().cloned().collect()
    }

    /// iterate file nodes in path order without cloning
    pub fn iter(&self) -> impl Iterator<Item = &FileNode> {
        self.nodes.values()
    }

    /// paths in sorted order
    pub fn paths(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    /// look up a file node by path
    pub fn get(&self, path: &str) -> Option<&FileNode> {
        self.nodes.get(path)
    }

    /// digest for a path
    ///
    /// the outer option is `None` when the path is absent, the inner one when
    /// the file is empty.
    pub fn get_digest(&self, path: &str) -> Option<Option<&Digest>> {
        self.nodes.get(path).map(FileNode::digest)
    }

    /// non-empty digests referenced by this manifest, deduplicated
    pub fn digests(&self) -> BTreeMap<String, Digest> {
        self.nodes
            .values()
            .filter_map(FileNode::digest)
            .map(|d| (d.to_string(), d.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// digest of the canonical encoding
    pub fn digest(&self) -> Digest {
        Digest::for_bytes(self.to_string().as_bytes(), DigestType::Shake256)
    }

    /// the canonical encoding as a blob
    pub fn blob(&self) -> Blob {
        Blob::for_bytes(self.to_string())
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in self.nodes.values() {
            writeln!(f, "{}", node)?;
        }
        Ok(())
    }
}

fn digest_label(digest: Option<&Digest>) -> String {
    digest.map_or_else(|| "<empty>".to_string(), Digest::to_string)
}
