use std::fmt;
use std::path::PathBuf;

/// error type for protomod operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid digest {input:?}: {reason}")]
    InvalidDigest { input: String, reason: String },

    #[error("unknown digest type: {0:?}")]
    UnknownDigestType(String),

    #[error("unknown file version {0:?}, expected one of v1beta1, v1, v2")]
    UnknownFileVersion(String),

    #[error("invalid file node {input:?}: {reason}")]
    InvalidFileNode { input: String, reason: String },

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid module name {input:?}: {reason}")]
    InvalidModuleName { input: String, reason: String },

    #[error("invalid plugin configuration: {0}")]
    InvalidPluginConfig(String),

    #[error("invalid {file_version} configuration: {message}")]
    InvalidConfig {
        file_version: String,
        message: String,
    },

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("{}", file_set_mismatch_message(.missing_blobs, .unreferenced_blobs))]
    FileSetMismatch {
        missing_blobs: Vec<String>,
        unreferenced_blobs: Vec<String>,
    },

    #[error("manifest has conflicting digests for path {path:?}: {first} and {second}")]
    ManifestConflict {
        path: String,
        first: String,
        second: String,
    },

    #[error("duplicate {what}: {value}")]
    Duplicate { what: &'static str, value: String },

    #[error("{child:?} overlaps with {parent:?}: {what} cannot contain one another")]
    Overlap {
        what: &'static str,
        parent: String,
        child: String,
    },

    #[error("{what} {path:?} is not contained in any of the roots {roots:?}")]
    NotInRoot {
        what: &'static str,
        path: String,
        roots: Vec<String>,
    },

    #[error("could not resolve digest for {module}: {message}")]
    ModuleDigest { module: String, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{file_type} does not support version {version}{}", suffix_message(.detail))]
    UnsupportedVersion {
        file_type: &'static str,
        version: String,
        detail: Option<String>,
    },

    #[error("could not decode {identifier}: {source}")]
    Decode {
        identifier: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("could not encode {identifier}: {source}")]
    Encode {
        identifier: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}", multiple_message(.0))]
    Multiple(Vec<Error>),
}

pub type Result<T> = std::result::Result<T, Error>;

/// broad classification of an [`Error`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// malformed external input
    Parse,
    /// well-formed input violating a domain invariant
    Validation,
    /// a bug in this crate
    Internal,
    /// a requested file or object is absent
    NotFound,
    /// a version this file type does not accept
    UnsupportedVersion,
    /// filesystem failure
    Io,
}

impl Error {
    /// classify the error
    ///
    /// aggregated errors take the kind of their first member.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidDigest { .. }
            | Error::UnknownDigestType(_)
            | Error::UnknownFileVersion(_)
            | Error::InvalidFileNode { .. }
            | Error::InvalidManifest(_)
            | Error::InvalidModuleName { .. }
            | Error::Decode { .. } => ErrorKind::Parse,
            Error::InvalidPath { .. }
            | Error::InvalidPluginConfig(_)
            | Error::InvalidConfig { .. }
            | Error::DigestMismatch { .. }
            | Error::FileSetMismatch { .. }
            | Error::ManifestConflict { .. }
            | Error::Duplicate { .. }
            | Error::Overlap { .. }
            | Error::NotInRoot { .. }
            | Error::ModuleDigest { .. } => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            Error::Encode { .. } | Error::Internal(_) => ErrorKind::Internal,
            Error::Io { .. } => ErrorKind::Io,
            Error::Multiple(errs) => errs.first().map_or(ErrorKind::Internal, Error::kind),
        }
    }

    /// is this a not-found error, either directly or from the filesystem
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    pub(crate) fn invalid_config(file_version: impl fmt::Display, message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            file_version: file_version.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}

fn file_set_mismatch_message(missing: &[String], unreferenced: &[String]) -> String {
    let mut msg = String::from("manifest and blob set do not match");
    if !missing.is_empty() {
        msg.push_str(&format!(
            "; digests in manifest with no blob: [{}]",
            missing.join(", ")
        ));
    }
    if !unreferenced.is_empty() {
        msg.push_str(&format!(
            "; blobs not referenced by manifest: [{}]",
            unreferenced.join(", ")
        ));
    }
    msg
}

fn suffix_message(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(": {}", d)).unwrap_or_default()
}

fn multiple_message(errs: &[Error]) -> String {
    errs.iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
