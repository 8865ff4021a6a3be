use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::check::{ExternalBreakingConfig, ExternalLintConfigV1, ExternalLintConfigV2};
use crate::config::file::{decode_yaml, encode_yaml};
use crate::config::module_config::get_root_to_excludes;
use crate::config::{BreakingConfig, ConfigFile, FileType, FileVersion, LintConfig, ModuleConfig};
use crate::error::{Error, Result};
use crate::module::{ModuleFullName, ModuleRef};
use crate::normalpath;

/// a parsed `buf.yaml`
///
/// v1beta1 and v1 files describe exactly one module at `.`. v2 files
/// describe one module per entry in `modules`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufYamlFile {
    file_version: FileVersion,
    module_configs: Vec<ModuleConfig>,
    config_deps: Vec<ModuleRef>,
}

impl BufYamlFile {
    pub fn new(
        file_version: FileVersion,
        module_configs: Vec<ModuleConfig>,
        config_deps: Vec<ModuleRef>,
    ) -> Result<Self> {
        FileType::BufYaml.check_supported(file_version)?;
        if file_version < FileVersion::V2 {
            match module_configs.as_slice() {
                [config] if config.root_path() == "." => {}
                [_] => {
                    return Err(Error::invalid_config(
                        file_version,
                        "the module of a buf.yaml must be at \".\" before v2",
                    ))
                }
                _ => {
                    return Err(Error::invalid_config(
                        file_version,
                        format!(
                            "expected exactly one module config, got {}",
                            module_configs.len()
                        ),
                    ))
                }
            }
        }
        if file_version == FileVersion::V1 {
            if let Some(config) = module_configs.first() {
                if config.root_to_excludes().keys().any(|root| root != ".") {
                    return Err(roots_unsupported(file_version));
                }
            }
        }

        let mut dirs = HashSet::new();
        let mut names = HashSet::new();
        for config in &module_configs {
            if !dirs.insert(config.root_path()) {
                return Err(Error::Duplicate {
                    what: "module directory",
                    value: config.root_path().to_string(),
                });
            }
            if let Some(name) = config.full_name() {
                if !names.insert(name) {
                    return Err(Error::Duplicate {
                        what: "module name",
                        value: name.to_string(),
                    });
                }
            }
        }
        let mut dep_names = HashSet::new();
        for dep in &config_deps {
            if !dep_names.insert(dep.full_name()) {
                return Err(Error::Duplicate {
                    what: "dependency",
                    value: dep.full_name().to_string(),
                });
            }
        }

        Ok(Self {
            file_version,
            module_configs,
            config_deps,
        })
    }

    pub fn module_configs(&self) -> &[ModuleConfig] {
        &self.module_configs
    }

    /// dependencies as declared, with any pinned reference
    pub fn config_deps(&self) -> &[ModuleRef] {
        &self.config_deps
    }
}

fn roots_unsupported(file_version: FileVersion) -> Error {
    Error::UnsupportedVersion {
        file_type: FileType::BufYaml.default_file_name(),
        version: file_version.to_string(),
        detail: Some("build.roots is only supported in v1beta1, move each root into its own module".to_string()),
    }
}

fn parse_deps(deps: &[String]) -> Result<Vec<ModuleRef>> {
    deps.iter().map(|d| ModuleRef::parse(d)).collect()
}

fn parse_name(file_version: FileVersion, name: &str) -> Result<Option<ModuleFullName>> {
    if name.is_empty() {
        return Ok(None);
    }
    ModuleFullName::parse(name)
        .map(Some)
        .map_err(|e| Error::invalid_config(file_version, e.to_string()))
}

fn name_string(config: &ModuleConfig) -> String {
    config.full_name().map(ToString::to_string).unwrap_or_default()
}

impl ConfigFile for BufYamlFile {
    const FILE_TYPE: FileType = FileType::BufYaml;

    fn file_version(&self) -> FileVersion {
        self.file_version
    }

    fn decode(version: FileVersion, data: &[u8], identifier: &str) -> Result<Self> {
        trace!(identifier, %version, "decoding buf.yaml");
        match version {
            FileVersion::V1Beta1 => {
                let ext: ExternalBufYamlV1Beta1 = decode_yaml(data, identifier)?;
                let config = ModuleConfig::new(
                    ".",
                    parse_name(version, &ext.name)?,
                    get_root_to_excludes(&ext.build.roots, &ext.build.excludes)?,
                    LintConfig::from_external_v1(version, ext.lint)?,
                    BreakingConfig::from_external(version, ext.breaking)?,
                )?;
                Self::new(version, vec![config], parse_deps(&ext.deps)?)
            }
            FileVersion::V1 => {
                let ext: ExternalBufYamlV1 = decode_yaml(data, identifier)?;
                if !ext.build.roots.is_empty() {
                    return Err(roots_unsupported(version));
                }
                let config = ModuleConfig::new(
                    ".",
                    parse_name(version, &ext.name)?,
                    get_root_to_excludes(&[], &ext.build.excludes)?,
                    LintConfig::from_external_v1(version, ext.lint)?,
                    BreakingConfig::from_external(version, ext.breaking)?,
                )?;
                Self::new(version, vec![config], parse_deps(&ext.deps)?)
            }
            FileVersion::V2 => {
                let ext: ExternalBufYamlV2 = decode_yaml(data, identifier)?;
                let modules = if ext.modules.is_empty() {
                    vec![ExternalModuleV2 {
                        directory: ".".to_string(),
                        ..Default::default()
                    }]
                } else {
                    ext.modules
                };
                let mut configs = Vec::with_capacity(modules.len());
                for module in modules {
                    configs.push(module_config_v2(module, &ext.lint, &ext.breaking)?);
                }
                Self::new(version, configs, parse_deps(&ext.deps)?)
            }
        }
    }

    fn encode(&self) -> Result<Vec<u8>> {
        FileType::BufYaml.check_supported(self.file_version)?;
        let identifier = FileType::BufYaml.label();
        let version = self.file_version.to_string();
        let deps: Vec<String> = self.config_deps.iter().map(ToString::to_string).collect();
        match self.file_version {
            FileVersion::V1Beta1 | FileVersion::V1 => {
                let config = self.module_configs.first().ok_or_else(|| {
                    Error::Internal("buf.yaml has no module config".to_string())
                })?;
                let mut roots = Vec::new();
                let mut excludes = Vec::new();
                for (root, root_excludes) in config.root_to_excludes() {
                    roots.push(root.clone());
                    excludes.extend(root_excludes.iter().map(|e| normalpath::join(root, e)));
                }
                if roots == ["."] {
                    roots.clear();
                }
                if self.file_version == FileVersion::V1 {
                    if !roots.is_empty() {
                        return Err(roots_unsupported(self.file_version));
                    }
                    encode_yaml(
                        &ExternalBufYamlV1 {
                            version,
                            name: name_string(config),
                            deps,
                            build: ExternalBuildV1 {
                                roots: Vec::new(),
                                excludes,
                            },
                            lint: config.lint_config().to_external_v1(),
                            breaking: config.breaking_config().to_external(),
                        },
                        identifier,
                    )
                } else {
                    encode_yaml(
                        &ExternalBufYamlV1Beta1 {
                            version,
                            name: name_string(config),
                            deps,
                            build: ExternalBuildV1Beta1 { roots, excludes },
                            lint: config.lint_config().to_external_v1(),
                            breaking: config.breaking_config().to_external(),
                        },
                        identifier,
                    )
                }
            }
            FileVersion::V2 => {
                let modules = self
                    .module_configs
                    .iter()
                    .map(|config| {
                        let excludes = config
                            .root_to_excludes()
                            .iter()
                            .flat_map(|(root, excludes)| {
                                excludes.iter().map(move |e| {
                                    normalpath::join(config.root_path(), &normalpath::join(root, e))
                                })
                            })
                            .collect();
                        let lint = config.lint_config().to_external_v2();
                        let breaking = config.breaking_config().to_external();
                        ExternalModuleV2 {
                            directory: config.root_path().to_string(),
                            name: name_string(config),
                            excludes,
                            lint: (!lint.is_empty()).then_some(lint),
                            breaking: (!breaking.is_empty()).then_some(breaking),
                        }
                    })
                    .collect();
                encode_yaml(
                    &ExternalBufYamlV2 {
                        version,
                        modules,
                        deps,
                        lint: ExternalLintConfigV2::default(),
                        breaking: ExternalBreakingConfig::default(),
                    },
                    identifier,
                )
            }
        }
    }
}

/// one v2 module entry; module-level checks override the top-level ones
fn module_config_v2(
    module: ExternalModuleV2,
    default_lint: &ExternalLintConfigV2,
    default_breaking: &ExternalBreakingConfig,
) -> Result<ModuleConfig> {
    let version = FileVersion::V2;
    let directory = normalpath::normalize_and_validate(&module.directory)?;
    // excludes are written relative to the buf.yaml, so rebase them onto the
    // module directory, which is the module's only root
    let by_dir = get_root_to_excludes(std::slice::from_ref(&directory), &module.excludes)?;
    let mut root_to_excludes = BTreeMap::new();
    root_to_excludes.insert(
        ".".to_string(),
        by_dir.into_values().next().unwrap_or_default(),
    );
    let lint = module.lint.unwrap_or_else(|| default_lint.clone());
    let breaking = module.breaking.unwrap_or_else(|| default_breaking.clone());
    ModuleConfig::new(
        &directory,
        parse_name(version, &module.name)?,
        root_to_excludes,
        LintConfig::from_external_v2(lint)?,
        BreakingConfig::from_external(version, breaking)?,
    )
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalBufYamlV1Beta1 {
    #[serde(default)]
    version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    deps: Vec<String>,
    #[serde(default, skip_serializing_if = "ExternalBuildV1Beta1::is_empty")]
    build: ExternalBuildV1Beta1,
    #[serde(default, skip_serializing_if = "ExternalLintConfigV1::is_empty")]
    lint: ExternalLintConfigV1,
    #[serde(default, skip_serializing_if = "ExternalBreakingConfig::is_empty")]
    breaking: ExternalBreakingConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalBuildV1Beta1 {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    roots: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    excludes: Vec<String>,
}

impl ExternalBuildV1Beta1 {
    fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.excludes.is_empty()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalBufYamlV1 {
    #[serde(default)]
    version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    deps: Vec<String>,
    #[serde(default, skip_serializing_if = "ExternalBuildV1::is_empty")]
    build: ExternalBuildV1,
    #[serde(default, skip_serializing_if = "ExternalLintConfigV1::is_empty")]
    lint: ExternalLintConfigV1,
    #[serde(default, skip_serializing_if = "ExternalBreakingConfig::is_empty")]
    breaking: ExternalBreakingConfig,
}

/// roots are read only to reject them with a version error
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalBuildV1 {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    roots: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    excludes: Vec<String>,
}

impl ExternalBuildV1 {
    fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.excludes.is_empty()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalBufYamlV2 {
    #[serde(default)]
    version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    modules: Vec<ExternalModuleV2>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    deps: Vec<String>,
    #[serde(default, skip_serializing_if = "ExternalLintConfigV2::is_empty")]
    lint: ExternalLintConfigV2,
    #[serde(default, skip_serializing_if = "ExternalBreakingConfig::is_empty")]
    breaking: ExternalBreakingConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalModuleV2 {
    #[serde(default = "default_directory")]
    directory: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    excludes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lint: Option<ExternalLintConfigV2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    breaking: Option<ExternalBreakingConfig>,
}

fn default_directory() -> String {
    ".".to_string()
}
