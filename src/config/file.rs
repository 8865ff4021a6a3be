use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::version::{non_empty_document, sniff_version, FileVersion};
use crate::error::{Error, Result};
use crate::normalpath;
use crate::storage::{ReadBucket, WriteBucket};

/// the kinds of configuration file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileType {
    BufYaml,
    BufLock,
    BufWorkYaml,
    BufGenYaml,
}

/// per file type: names to try in order (default first), label, versions
struct FileTypeInfo {
    file_names: &'static [&'static str],
    label: &'static str,
    versions: &'static [FileVersion],
    unsupported_detail: &'static str,
}

const ALL_VERSIONS: &[FileVersion] = &[FileVersion::V1Beta1, FileVersion::V1, FileVersion::V2];

const BUF_YAML: FileTypeInfo = FileTypeInfo {
    file_names: &["buf.yaml", "buf.mod"],
    label: "config file",
    versions: ALL_VERSIONS,
    unsupported_detail: "",
};

const BUF_LOCK: FileTypeInfo = FileTypeInfo {
    file_names: &["buf.lock"],
    label: "lock file",
    versions: ALL_VERSIONS,
    unsupported_detail: "",
};

const BUF_WORK_YAML: FileTypeInfo = FileTypeInfo {
    file_names: &["buf.work.yaml", "buf.work"],
    label: "workspace file",
    versions: &[FileVersion::V1],
    unsupported_detail: "workspaces are declared with a v1 buf.work.yaml, or with modules in a v2 buf.yaml",
};

const BUF_GEN_YAML: FileTypeInfo = FileTypeInfo {
    file_names: &["buf.gen.yaml"],
    label: "generation file",
    versions: ALL_VERSIONS,
    unsupported_detail: "",
};

impl FileType {
    fn info(&self) -> &'static FileTypeInfo {
        match self {
            FileType::BufYaml => &BUF_YAML,
            FileType::BufLock => &BUF_LOCK,
            FileType::BufWorkYaml => &BUF_WORK_YAML,
            FileType::BufGenYaml => &BUF_GEN_YAML,
        }
    }

    /// name written by `put_file_for_prefix`
    pub fn default_file_name(&self) -> &'static str {
        self.info().file_names[0]
    }

    /// default name followed by legacy aliases, in lookup order
    pub fn file_names(&self) -> &'static [&'static str] {
        self.info().file_names
    }

    /// human-readable label used in error messages
    pub fn label(&self) -> &'static str {
        self.info().label
    }

    pub fn supported_versions(&self) -> &'static [FileVersion] {
        self.info().versions
    }

    /// fail unless this file type accepts `version`
    pub fn check_supported(&self, version: FileVersion) -> Result<()> {
        let info = self.info();
        if info.versions.contains(&version) {
            return Ok(());
        }
        Err(Error::UnsupportedVersion {
            file_type: self.default_file_name(),
            version: version.to_string(),
            detail: (!info.unsupported_detail.is_empty())
                .then(|| info.unsupported_detail.to_string()),
        })
    }
}

/// a versioned configuration file
///
/// implementations decode the version-specific external shape, and must
/// call [`FileType::check_supported`] from their own constructors too.
pub trait ConfigFile: Sized {
    const FILE_TYPE: FileType;

    fn file_version(&self) -> FileVersion;

    /// decode `data` whose version has already been sniffed and gated
    fn decode(version: FileVersion, data: &[u8], identifier: &str) -> Result<Self>;

    /// encode to the external shape for `self.file_version()`
    fn encode(&self) -> Result<Vec<u8>>;
}

/// parse a configuration file from raw bytes
///
/// `identifier` is a path or label used to give decode errors context.
pub fn read_file<F: ConfigFile>(data: &[u8], identifier: &str) -> Result<F> {
    let version = sniff_version(data, identifier)?;
    F::FILE_TYPE.check_supported(version)?;
    F::decode(version, data, identifier)
}

/// serialize a configuration file
pub fn write_file<F: ConfigFile>(file: &F) -> Result<Vec<u8>> {
    F::FILE_TYPE.check_supported(file.file_version())?;
    file.encode()
}

/// read the first existing file of type `F` at `prefix`
///
/// the default file name is tried first, then each legacy alias.
pub fn get_file_for_prefix<F, B>(bucket: &B, prefix: &str) -> Result<F>
where
    F: ConfigFile,
    B: ReadBucket + ?Sized,
{
    let prefix = normalpath::normalize_and_validate(prefix)?;
    for name in F::FILE_TYPE.file_names() {
        let path = normalpath::join(&prefix, name);
        if bucket.exists(&path)? {
            debug!(path = %path, "found {}", F::FILE_TYPE.label());
            let data = bucket.get(&path)?;
            return read_file(&data, &path);
        }
    }
    Err(Error::NotFound(normalpath::join(
        &prefix,
        F::FILE_TYPE.default_file_name(),
    )))
}

/// does any file of type `F` exist at `prefix`
pub fn exists_file_for_prefix<F, B>(bucket: &B, prefix: &str) -> Result<bool>
where
    F: ConfigFile,
    B: ReadBucket + ?Sized,
{
    let prefix = normalpath::normalize_and_validate(prefix)?;
    for name in F::FILE_TYPE.file_names() {
        if bucket.exists(&normalpath::join(&prefix, name))? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// write `file` under its default name at `prefix`
pub fn put_file_for_prefix<F, B>(bucket: &mut B, prefix: &str, file: &F) -> Result<()>
where
    F: ConfigFile,
    B: WriteBucket + ?Sized,
{
    let prefix = normalpath::normalize_and_validate(prefix)?;
    let data = write_file(file)?;
    let path = normalpath::join(&prefix, F::FILE_TYPE.default_file_name());
    debug!(path = %path, "writing {}", F::FILE_TYPE.label());
    bucket.put(&path, &data)
}

/// strict decode: unknown fields are an error
pub(crate) fn decode_yaml<T: DeserializeOwned>(data: &[u8], identifier: &str) -> Result<T> {
    serde_yaml::from_slice(non_empty_document(data)).map_err(|source| Error::Decode {
        identifier: identifier.to_string(),
        source,
    })
}

pub(crate) fn encode_yaml<T: Serialize>(value: &T, identifier: &str) -> Result<Vec<u8>> {
    serde_yaml::to_string(value)
        .map(String::into_bytes)
        .map_err(|source| Error::Encode {
            identifier: identifier.to_string(),
            source,
        })
}
