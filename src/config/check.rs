use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::FileVersion;
use crate::error::{Error, Result};
use crate::normalpath;

/// rule selection shared by lint and breaking configuration
///
/// rule and category ids are opaque here; interpreting them is up to the
/// checker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckConfig {
    file_version: FileVersion,
    use_ids: Vec<String>,
    except_ids: Vec<String>,
    ignore_paths: Vec<String>,
    ignore_only: BTreeMap<String, Vec<String>>,
}

impl CheckConfig {
    pub fn new(
        file_version: FileVersion,
        use_ids: Vec<String>,
        except_ids: Vec<String>,
        ignore_paths: Vec<String>,
        ignore_only: BTreeMap<String, Vec<String>>,
    ) -> Result<Self> {
        let ignore_paths = normalize_paths(file_version, "ignore", ignore_paths)?;
        let mut normalized_only = BTreeMap::new();
        for (id, paths) in ignore_only {
            if id.is_empty() {
                return Err(Error::invalid_config(
                    file_version,
                    "ignore_only has an empty rule or category id",
                ));
            }
            let paths = normalize_paths(file_version, "ignore_only", paths)?;
            normalized_only.insert(id, paths);
        }
        Ok(Self {
            file_version,
            use_ids,
            except_ids,
            ignore_paths,
            ignore_only: normalized_only,
        })
    }

    /// empty configuration for a file version
    pub fn empty(file_version: FileVersion) -> Self {
        Self {
            file_version,
            use_ids: Vec::new(),
            except_ids: Vec::new(),
            ignore_paths: Vec::new(),
            ignore_only: BTreeMap::new(),
        }
    }

    pub fn file_version(&self) -> FileVersion {
        self.file_version
    }

    pub fn use_ids(&self) -> &[String] {
        &self.use_ids
    }

    pub fn except_ids(&self) -> &[String] {
        &self.except_ids
    }

    pub fn ignore_paths(&self) -> &[String] {
        &self.ignore_paths
    }

    /// rule or category id to the paths it is ignored for
    pub fn ignore_only(&self) -> &BTreeMap<String, Vec<String>> {
        &self.ignore_only
    }
}

fn normalize_paths(file_version: FileVersion, key: &str, paths: Vec<String>) -> Result<Vec<String>> {
    let mut normalized = paths
        .iter()
        .map(|p| {
            normalpath::normalize_and_validate(p).map_err(|e| {
                Error::invalid_config(file_version, format!("{}: {}", key, e))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    normalized.sort();
    normalized.dedup();
    Ok(normalized)
}

/// lint rule configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LintConfig {
    check: CheckConfig,
    enum_zero_value_suffix: String,
    rpc_allow_same_request_response: bool,
    rpc_allow_google_protobuf_empty_requests: bool,
    rpc_allow_google_protobuf_empty_responses: bool,
    service_suffix: String,
    allow_comment_ignores: bool,
}

impl LintConfig {
    /// default lint configuration for a file version
    ///
    /// comment ignores are opt-in before v2 and opt-out from v2 on.
    pub fn default_for(file_version: FileVersion) -> Self {
        Self {
            check: CheckConfig::empty(file_version),
            enum_zero_value_suffix: String::new(),
            rpc_allow_same_request_response: false,
            rpc_allow_google_protobuf_empty_requests: false,
            rpc_allow_google_protobuf_empty_responses: false,
            service_suffix: String::new(),
            allow_comment_ignores: file_version >= FileVersion::V2,
        }
    }

    pub fn check(&self) -> &CheckConfig {
        &self.check
    }

    pub fn enum_zero_value_suffix(&self) -> &str {
        &self.enum_zero_value_suffix
    }

    pub fn rpc_allow_same_request_response(&self) -> bool {
        self.rpc_allow_same_request_response
    }

    pub fn rpc_allow_google_protobuf_empty_requests(&self) -> bool {
        self.rpc_allow_google_protobuf_empty_requests
    }

    pub fn rpc_allow_google_protobuf_empty_responses(&self) -> bool {
        self.rpc_allow_google_protobuf_empty_responses
    }

    pub fn service_suffix(&self) -> &str {
        &self.service_suffix
    }

    pub fn allow_comment_ignores(&self) -> bool {
        self.allow_comment_ignores
    }

    pub(crate) fn from_external_v1(file_version: FileVersion, ext: ExternalLintConfigV1) -> Result<Self> {
        Ok(Self {
            check: CheckConfig::new(file_version, ext.use_ids, ext.except, ext.ignore, ext.ignore_only)?,
            enum_zero_value_suffix: ext.enum_zero_value_suffix,
            rpc_allow_same_request_response: ext.rpc_allow_same_request_response,
            rpc_allow_google_protobuf_empty_requests: ext.rpc_allow_google_protobuf_empty_requests,
            rpc_allow_google_protobuf_empty_responses: ext.rpc_allow_google_protobuf_empty_responses,
            service_suffix: ext.service_suffix,
            allow_comment_ignores: ext.allow_comment_ignores,
        })
    }

    pub(crate) fn to_external_v1(&self) -> ExternalLintConfigV1 {
        ExternalLintConfigV1 {
            use_ids: self.check.use_ids.clone(),
            except: self.check.except_ids.clone(),
            ignore: self.check.ignore_paths.clone(),
            ignore_only: self.check.ignore_only.clone(),
            enum_zero_value_suffix: self.enum_zero_value_suffix.clone(),
            rpc_allow_same_request_response: self.rpc_allow_same_request_response,
            rpc_allow_google_protobuf_empty_requests: self.rpc_allow_google_protobuf_empty_requests,
            rpc_allow_google_protobuf_empty_responses: self.rpc_allow_google_protobuf_empty_responses,
            service_suffix: self.service_suffix.clone(),
            allow_comment_ignores: self.allow_comment_ignores,
        }
    }

    pub(crate) fn from_external_v2(ext: ExternalLintConfigV2) -> Result<Self> {
        Ok(Self {
            check: CheckConfig::new(FileVersion::V2, ext.use_ids, ext.except, ext.ignore, ext.ignore_only)?,
            enum_zero_value_suffix: ext.enum_zero_value_suffix,
            rpc_allow_same_request_response: ext.rpc_allow_same_request_response,
            rpc_allow_google_protobuf_empty_requests: ext.rpc_allow_google_protobuf_empty_requests,
            rpc_allow_google_protobuf_empty_responses: ext.rpc_allow_google_protobuf_empty_responses,
            service_suffix: ext.service_suffix,
            allow_comment_ignores: !ext.disallow_comment_ignores,
        })
    }

    pub(crate) fn to_external_v2(&self) -> ExternalLintConfigV2 {
        ExternalLintConfigV2 {
            use_ids: self.check.use_ids.clone(),
            except: self.check.except_ids.clone(),
            ignore: self.check.ignore_paths.clone(),
            ignore_only: self.check.ignore_only.clone(),
            enum_zero_value_suffix: self.enum_zero_value_suffix.clone(),
            rpc_allow_same_request_response: self.rpc_allow_same_request_response,
            rpc_allow_google_protobuf_empty_requests: self.rpc_allow_google_protobuf_empty_requests,
            rpc_allow_google_protobuf_empty_responses: self.rpc_allow_google_protobuf_empty_responses,
            service_suffix: self.service_suffix.clone(),
            disallow_comment_ignores: !self.allow_comment_ignores,
        }
    }
}

/// breaking change rule configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BreakingConfig {
    check: CheckConfig,
    ignore_unstable_packages: bool,
}

impl BreakingConfig {
    pub fn default_for(file_version: FileVersion) -> Self {
        Self {
            check: CheckConfig::empty(file_version),
            ignore_unstable_packages: false,
        }
    }

    pub fn check(&self) -> &CheckConfig {
        &self.check
    }

    pub fn ignore_unstable_packages(&self) -> bool {
        self.ignore_unstable_packages
    }

    pub(crate) fn from_external(file_version: FileVersion, ext: ExternalBreakingConfig) -> Result<Self> {
        Ok(Self {
            check: CheckConfig::new(file_version, ext.use_ids, ext.except, ext.ignore, ext.ignore_only)?,
            ignore_unstable_packages: ext.ignore_unstable_packages,
        })
    }

    pub(crate) fn to_external(&self) -> ExternalBreakingConfig {
        ExternalBreakingConfig {
            use_ids: self.check.use_ids.clone(),
            except: self.check.except_ids.clone(),
            ignore: self.check.ignore_paths.clone(),
            ignore_only: self.check.ignore_only.clone(),
            ignore_unstable_packages: self.ignore_unstable_packages,
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// `lint` block of v1beta1 and v1 files
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExternalLintConfigV1 {
    #[serde(rename = "use", default, skip_serializing_if = "Vec::is_empty")]
    pub use_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub except: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ignore_only: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub enum_zero_value_suffix: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub rpc_allow_same_request_response: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub rpc_allow_google_protobuf_empty_requests: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub rpc_allow_google_protobuf_empty_responses: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_suffix: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_comment_ignores: bool,
}

/// `lint` block of v2 files
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExternalLintConfigV2 {
    #[serde(rename = "use", default, skip_serializing_if = "Vec::is_empty")]
    pub use_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub except: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ignore_only: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub enum_zero_value_suffix: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub rpc_allow_same_request_response: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub rpc_allow_google_protobuf_empty_requests: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub rpc_allow_google_protobuf_empty_responses: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_suffix: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disallow_comment_ignores: bool,
}

/// `breaking` block, the same shape in every version
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExternalBreakingConfig {
    #[serde(rename = "use", default, skip_serializing_if = "Vec::is_empty")]
    pub use_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub except: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ignore_only: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_unstable_packages: bool,
}

impl ExternalLintConfigV1 {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ExternalLintConfigV2 {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ExternalBreakingConfig {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
