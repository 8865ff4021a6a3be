use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cas::Digest;
use crate::config::file::{decode_yaml, encode_yaml};
use crate::config::{ConfigFile, FileType, FileVersion};
use crate::error::{Error, Result};
use crate::module::{ModuleFullName, ModuleKey};

/// a parsed `buf.lock`: the pinned dependencies of a module or workspace
#[derive(Clone, Debug)]
pub struct BufLockFile {
    file_version: FileVersion,
    dep_module_keys: Vec<ModuleKey>,
}

impl BufLockFile {
    /// keys are sorted by module full name
    ///
    /// before v2 every key must carry a commit id.
    pub fn new(file_version: FileVersion, mut dep_module_keys: Vec<ModuleKey>) -> Result<Self> {
        FileType::BufLock.check_supported(file_version)?;
        let mut seen = HashSet::new();
        for key in &dep_module_keys {
            if !seen.insert(key.full_name()) {
                return Err(Error::Duplicate {
                    what: "dependency",
                    value: key.full_name().to_string(),
                });
            }
            if file_version < FileVersion::V2 && key.commit_id().is_none() {
                return Err(Error::invalid_config(
                    file_version,
                    format!("dependency {} has no commit", key.full_name()),
                ));
            }
        }
        dep_module_keys.sort_by(|a, b| a.full_name().cmp(b.full_name()));
        Ok(Self {
            file_version,
            dep_module_keys,
        })
    }

    pub fn dep_module_keys(&self) -> &[ModuleKey] {
        &self.dep_module_keys
    }
}

/// resolve every dependency digest, collecting all failures
pub fn validate_lock_file_digests(file: &BufLockFile) -> Result<()> {
    let errors: Vec<Error> = file
        .dep_module_keys
        .iter()
        .filter_map(|key| key.digest().err())
        .collect();
    if errors.is_empty() {
        return Ok(());
    }
    warn!(failed = errors.len(), "lock file has unresolvable digests");
    Err(Error::Multiple(errors))
}

fn parse_digest(file_version: FileVersion, name: &ModuleFullName, digest: &str) -> Result<Digest> {
    Digest::parse(digest).map_err(|e| {
        Error::invalid_config(file_version, format!("dependency {}: {}", name, e))
    })
}

impl ConfigFile for BufLockFile {
    const FILE_TYPE: FileType = FileType::BufLock;

    fn file_version(&self) -> FileVersion {
        self.file_version
    }

    fn decode(version: FileVersion, data: &[u8], identifier: &str) -> Result<Self> {
        let mut keys = Vec::new();
        match version {
            FileVersion::V1Beta1 | FileVersion::V1 => {
                let ext: ExternalBufLockV1 = decode_yaml(data, identifier)?;
                for dep in ext.deps {
                    let name = ModuleFullName::new(dep.remote, dep.owner, dep.repository)?;
                    let key = match dep.digest.filter(|d| !d.is_empty()) {
                        Some(digest) => {
                            let digest = parse_digest(version, &name, &digest)?;
                            ModuleKey::with_digest(name, Some(dep.commit), digest)
                        }
                        None if version == FileVersion::V1Beta1 => {
                            // old lock files may omit digests; they only fail
                            // once someone asks for one
                            let module = name.to_string();
                            ModuleKey::new(name, Some(dep.commit), move || {
                                Err(Error::NotFound(format!("digest for {}", module)))
                            })
                        }
                        None => {
                            return Err(Error::invalid_config(
                                version,
                                format!("dependency {} has no digest", name),
                            ))
                        }
                    };
                    keys.push(key);
                }
            }
            FileVersion::V2 => {
                let ext: ExternalBufLockV2 = decode_yaml(data, identifier)?;
                for dep in ext.deps {
                    let name = ModuleFullName::parse(&dep.name)?;
                    let digest = parse_digest(version, &name, &dep.digest)?;
                    keys.push(ModuleKey::with_digest(name, dep.commit, digest));
                }
            }
        }
        debug!(identifier, deps = keys.len(), "decoded lock file");
        Self::new(version, keys)
    }

    fn encode(&self) -> Result<Vec<u8>> {
        FileType::BufLock.check_supported(self.file_version)?;
        let identifier = FileType::BufLock.label();
        let version = self.file_version.to_string();
        match self.file_version {
            FileVersion::V1Beta1 | FileVersion::V1 => {
                let deps = self
                    .dep_module_keys
                    .iter()
                    .map(|key| {
                        let name = key.full_name();
                        Ok(ExternalDepV1 {
                            remote: name.registry().to_string(),
                            owner: name.owner().to_string(),
                            repository: name.name().to_string(),
                            commit: key.commit_id().unwrap_or_default().to_string(),
                            digest: Some(key.digest()?.to_string()),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                encode_yaml(&ExternalBufLockV1 { version, deps }, identifier)
            }
            FileVersion::V2 => {
                let deps = self
                    .dep_module_keys
                    .iter()
                    .map(|key| {
                        Ok(ExternalDepV2 {
                            name: key.full_name().to_string(),
                            commit: key.commit_id().map(str::to_string),
                            digest: key.digest()?.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                encode_yaml(&ExternalBufLockV2 { version, deps }, identifier)
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalBufLockV1 {
    #[serde(default)]
    version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    deps: Vec<ExternalDepV1>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalDepV1 {
    remote: String,
    owner: String,
    repository: String,
    #[serde(default)]
    commit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    digest: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalBufLockV2 {
    #[serde(default)]
    version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    deps: Vec<ExternalDepV2>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalDepV2 {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    commit: Option<String>,
    digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas::DigestType;
    use crate::config::{read_file, write_file};

    fn digest(s: &str) -> Digest {
        Digest::for_bytes(s.as_bytes(), DigestType::Shake256)
    }

    fn key(name: &str, commit: Option<&str>) -> ModuleKey {
        ModuleKey::with_digest(
            ModuleFullName::parse(name).unwrap(),
            commit.map(str::to_string),
            digest(name),
        )
    }

    fn names(file: &BufLockFile) -> Vec<String> {
        file.dep_module_keys()
            .iter()
            .map(|k| k.full_name().to_string())
            .collect()
    }

    #[test]
    fn test_new_sorts_by_full_name() {
        let file = BufLockFile::new(
            FileVersion::V2,
            vec![key("buf.build/b/y", None), key("buf.build/a/z", None)],
        )
        .unwrap();
        assert_eq!(names(&file), vec!["buf.build/a/z", "buf.build/b/y"]);
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let err = BufLockFile::new(
            FileVersion::V2,
            vec![key("buf.build/a/z", None), key("buf.build/a/z", Some("c1"))],
        )
        .unwrap_err();
        assert!(err.to_string().contains("buf.build/a/z"));
    }

    #[test]
    fn test_commit_required_before_v2() {
        assert!(BufLockFile::new(FileVersion::V1, vec![key("buf.build/a/z", None)]).is_err());
        assert!(BufLockFile::new(FileVersion::V1, vec![key("buf.build/a/z", Some("abc"))]).is_ok());
        assert!(BufLockFile::new(FileVersion::V2, vec![key("buf.build/a/z", None)]).is_ok());
    }

    #[test]
    fn test_empty_lock_encodes_version_only() {
        let file = BufLockFile::new(FileVersion::V1, vec![]).unwrap();
        assert_eq!(write_file(&file).unwrap(), b"version: v1\n");
    }

    #[test]
    fn test_v1_roundtrip() {
        let file = BufLockFile::new(
            FileVersion::V1,
            vec![key("buf.build/acme/b", Some("c2")), key("buf.build/acme/a", Some("c1"))],
        )
        .unwrap();
        let encoded = write_file(&file).unwrap();
        let text = String::from_utf8(encoded.clone()).unwrap();
        assert!(text.contains("remote: buf.build"));
        assert!(text.contains("repository: a"));
        let read: BufLockFile = read_file(&encoded, "buf.lock").unwrap();
        assert_eq!(names(&read), names(&file));
        assert_eq!(read.dep_module_keys()[0].commit_id(), Some("c1"));
        assert_eq!(read.dep_module_keys()[0].digest().unwrap(), digest("buf.build/acme/a"));
    }

    #[test]
    fn test_v2_roundtrip() {
        let file = BufLockFile::new(
            FileVersion::V2,
            vec![key("buf.build/acme/a", None), key("buf.build/acme/b", Some("c2"))],
        )
        .unwrap();
        let encoded = write_file(&file).unwrap();
        let read: BufLockFile = read_file(&encoded, "buf.lock").unwrap();
        assert_eq!(names(&read), names(&file));
        assert_eq!(read.dep_module_keys()[0].commit_id(), None);
        assert_eq!(read.dep_module_keys()[1].commit_id(), Some("c2"));
    }

    #[test]
    fn test_v1beta1_missing_digest_fails_lazily() {
        let data = "version: v1beta1\ndeps:\n  - remote: buf.build\n    owner: acme\n    repository: a\n    commit: c1\n  - remote: buf.build\n    owner: acme\n    repository: b\n    commit: c2\n";
        let file: BufLockFile = read_file(data.as_bytes(), "buf.lock").unwrap();
        assert_eq!(file.dep_module_keys().len(), 2);
        match validate_lock_file_digests(&file) {
            Err(Error::Multiple(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected aggregated errors, got {:?}", other),
        }
    }

    #[test]
    fn test_v1_missing_digest_is_an_error() {
        let data = "version: v1\ndeps:\n  - remote: buf.build\n    owner: acme\n    repository: a\n    commit: c1\n";
        assert!(read_file::<BufLockFile>(data.as_bytes(), "buf.lock").is_err());
    }

    #[test]
    fn test_validate_lock_file_digests_ok() {
        let file = BufLockFile::new(FileVersion::V2, vec![key("buf.build/acme/a", None)]).unwrap();
        assert!(validate_lock_file_digests(&file).is_ok());
    }

    #[test]
    fn test_bad_digest_names_dependency() {
        let data = "version: v2\ndeps:\n  - name: buf.build/acme/a\n    digest: sha1:abc\n";
        let err = read_file::<BufLockFile>(data.as_bytes(), "buf.lock").unwrap_err();
        assert!(err.to_string().contains("buf.build/acme/a"));
    }
}
