use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};

/// version of a configuration file's schema, in order of introduction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileVersion {
    V1Beta1,
    V1,
    V2,
}

const FILE_VERSIONS: &[(FileVersion, &str)] = &[
    (FileVersion::V1Beta1, "v1beta1"),
    (FileVersion::V1, "v1"),
    (FileVersion::V2, "v2"),
];

impl FileVersion {
    /// parse a version token, empty meaning the legacy default v1beta1
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(FileVersion::V1Beta1);
        }
        FILE_VERSIONS
            .iter()
            .find(|(_, token)| *token == s)
            .map(|(v, _)| *v)
            .ok_or_else(|| Error::UnknownFileVersion(s.to_string()))
    }

    /// canonical token
    pub fn as_str(&self) -> &'static str {
        match self {
            FileVersion::V1Beta1 => "v1beta1",
            FileVersion::V1 => "v1",
            FileVersion::V2 => "v2",
        }
    }

    pub fn all() -> impl Iterator<Item = FileVersion> {
        FILE_VERSIONS.iter().map(|(v, _)| *v)
    }
}

impl fmt::Display for FileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// the only field read before the version-specific shape is known
#[derive(Deserialize)]
struct VersionOnly {
    #[serde(default)]
    version: String,
}

/// read just the `version` key, ignoring everything else
pub(crate) fn sniff_version(data: &[u8], identifier: &str) -> Result<FileVersion> {
    let data = non_empty_document(data);
    let sniffed: VersionOnly = serde_yaml::from_slice(data).map_err(|source| Error::Decode {
        identifier: identifier.to_string(),
        source,
    })?;
    FileVersion::parse(&sniffed.version)
}

/// blank documents decode as an empty mapping
pub(crate) fn non_empty_document(data: &[u8]) -> &[u8] {
    if data.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_file_version_parse() {
        assert_eq!(FileVersion::parse("").unwrap(), FileVersion::V1Beta1);
        assert_eq!(FileVersion::parse("v1beta1").unwrap(), FileVersion::V1Beta1);
        assert_eq!(FileVersion::parse("v1").unwrap(), FileVersion::V1);
        assert_eq!(FileVersion::parse("v2").unwrap(), FileVersion::V2);
        for token in ["v3", "V1"] {
            let err = FileVersion::parse(token).unwrap_err();
            assert!(matches!(err, Error::UnknownFileVersion(ref t) if t == token));
            assert_eq!(err.kind(), ErrorKind::Parse);
        }
    }

    #[test]
    fn test_file_version_order() {
        assert!(FileVersion::V1Beta1 < FileVersion::V1);
        assert!(FileVersion::V1 < FileVersion::V2);
        let all: Vec<_> = FileVersion::all().map(|v| v.to_string()).collect();
        assert_eq!(all, vec!["v1beta1", "v1", "v2"]);
    }

    #[test]
    fn test_sniff_version() {
        assert_eq!(sniff_version(b"version: v2\nmodules: []\n", "f").unwrap(), FileVersion::V2);
        assert_eq!(sniff_version(b"name: x\n", "f").unwrap(), FileVersion::V1Beta1);
        assert_eq!(sniff_version(b"", "f").unwrap(), FileVersion::V1Beta1);
        assert_eq!(sniff_version(b"  \n", "f").unwrap(), FileVersion::V1Beta1);
        assert_eq!(sniff_version(br#"{"version": "v1"}"#, "f").unwrap(), FileVersion::V1);
        assert!(matches!(
            sniff_version(b"version: [", "buf.yaml"),
            Err(Error::Decode { ref identifier, .. }) if identifier == "buf.yaml"
        ));
    }
}
