use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::file::{decode_yaml, encode_yaml};
use crate::config::module_config::validate_configuration_overlap;
use crate::config::{ConfigFile, FileType, FileVersion};
use crate::error::{Error, Result};
use crate::normalpath;

/// a parsed `buf.work.yaml`, grouping module directories into a workspace
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufWorkYamlFile {
    file_version: FileVersion,
    directories: Vec<String>,
}

impl BufWorkYamlFile {
    pub fn new(file_version: FileVersion, directories: Vec<String>) -> Result<Self> {
        FileType::BufWorkYaml.check_supported(file_version)?;
        if directories.is_empty() {
            return Err(Error::invalid_config(
                file_version,
                "a workspace must list at least one directory",
            ));
        }
        let mut normalized = Vec::with_capacity(directories.len());
        let mut seen = HashSet::new();
        for dir in &directories {
            let dir = normalpath::normalize_and_validate(dir)?;
            if !seen.insert(dir.clone()) {
                return Err(Error::Duplicate {
                    what: "workspace directory",
                    value: dir,
                });
            }
            normalized.push(dir);
        }
        validate_configuration_overlap(&normalized, "workspace directories")?;
        normalized.sort();
        Ok(Self {
            file_version,
            directories: normalized,
        })
    }

    /// normalized directories, sorted
    pub fn directories(&self) -> &[String] {
        &self.directories
    }
}

impl ConfigFile for BufWorkYamlFile {
    const FILE_TYPE: FileType = FileType::BufWorkYaml;

    fn file_version(&self) -> FileVersion {
        self.file_version
    }

    fn decode(version: FileVersion, data: &[u8], identifier: &str) -> Result<Self> {
        let ext: ExternalBufWorkYaml = decode_yaml(data, identifier)?;
        Self::new(version, ext.directories)
    }

    fn encode(&self) -> Result<Vec<u8>> {
        FileType::BufWorkYaml.check_supported(self.file_version)?;
        encode_yaml(
            &ExternalBufWorkYaml {
                version: self.file_version.to_string(),
                directories: self.directories.clone(),
            },
            FileType::BufWorkYaml.label(),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalBufWorkYaml {
    #[serde(default)]
    version: String,
    #[serde(default)]
    directories: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{read_file, write_file};
    use crate::error::ErrorKind;

    fn dirs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_directories_normalized_and_sorted() {
        let file = BufWorkYamlFile::new(FileVersion::V1, dirs(&["./proto/b/", "proto/a"])).unwrap();
        assert_eq!(file.directories(), &dirs(&["proto/a", "proto/b"])[..]);
    }

    #[test]
    fn test_rejects_invalid_directories() {
        assert!(BufWorkYamlFile::new(FileVersion::V1, vec![]).is_err());
        assert!(matches!(
            BufWorkYamlFile::new(FileVersion::V1, dirs(&["a", "a/"])),
            Err(Error::Duplicate { .. })
        ));
        assert!(matches!(
            BufWorkYamlFile::new(FileVersion::V1, dirs(&["a", "a/b"])),
            Err(Error::Overlap { .. })
        ));
        assert!(BufWorkYamlFile::new(FileVersion::V1, dirs(&["../a"])).is_err());
    }

    #[test]
    fn test_only_v1_supported() {
        let err = BufWorkYamlFile::new(FileVersion::V2, dirs(&["a"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
        let err = read_file::<BufWorkYamlFile>(b"version: v2\ndirectories: [a]\n", "buf.work.yaml")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
        let err = read_file::<BufWorkYamlFile>(b"directories: [a]\n", "buf.work.yaml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
    }

    #[test]
    fn test_roundtrip() {
        let file = read_file::<BufWorkYamlFile>(
            b"version: v1\ndirectories:\n  - proto\n  - vendor/protos\n",
            "buf.work.yaml",
        )
        .unwrap();
        let encoded = write_file(&file).unwrap();
        assert_eq!(
            String::from_utf8(encoded.clone()).unwrap(),
            "version: v1\ndirectories:\n- proto\n- vendor/protos\n"
        );
        assert_eq!(read_file::<BufWorkYamlFile>(&encoded, "buf.work.yaml").unwrap(), file);
    }
}
