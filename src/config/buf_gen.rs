use serde::{Deserialize, Serialize};

use crate::config::file::{decode_yaml, encode_yaml};
use crate::config::plugin::{ExternalPluginV1, ExternalPluginV2};
use crate::config::{ConfigFile, FileType, FileVersion, GeneratePluginConfig};
use crate::error::{Error, Result};

/// a parsed `buf.gen.yaml`
///
/// the `managed` block is kept as-is and not interpreted.
#[derive(Clone, Debug, PartialEq)]
pub struct BufGenYamlFile {
    file_version: FileVersion,
    plugins: Vec<GeneratePluginConfig>,
    managed: Option<serde_yaml::Value>,
}

impl BufGenYamlFile {
    pub fn new(
        file_version: FileVersion,
        plugins: Vec<GeneratePluginConfig>,
        managed: Option<serde_yaml::Value>,
    ) -> Result<Self> {
        FileType::BufGenYaml.check_supported(file_version)?;
        if plugins.is_empty() {
            return Err(Error::invalid_config(
                file_version,
                "a generation file must have at least one plugin",
            ));
        }
        Ok(Self {
            file_version,
            plugins,
            managed: managed.filter(|v| !v.is_null()),
        })
    }

    pub fn plugins(&self) -> &[GeneratePluginConfig] {
        &self.plugins
    }

    pub fn managed(&self) -> Option<&serde_yaml::Value> {
        self.managed.as_ref()
    }
}

impl ConfigFile for BufGenYamlFile {
    const FILE_TYPE: FileType = FileType::BufGenYaml;

    fn file_version(&self) -> FileVersion {
        self.file_version
    }

    fn decode(version: FileVersion, data: &[u8], identifier: &str) -> Result<Self> {
        // plugin errors carry no location, so name the file
        let in_file = |e: Error| match e {
            Error::InvalidPluginConfig(message) => {
                Error::InvalidPluginConfig(format!("{}: {}", identifier, message))
            }
            other => other,
        };
        match version {
            FileVersion::V1Beta1 | FileVersion::V1 => {
                let ext: ExternalBufGenYamlV1 = decode_yaml(data, identifier)?;
                let plugins = ext
                    .plugins
                    .into_iter()
                    .map(|p| p.into_config().map_err(in_file))
                    .collect::<Result<Vec<_>>>()?;
                Self::new(version, plugins, ext.managed)
            }
            FileVersion::V2 => {
                let ext: ExternalBufGenYamlV2 = decode_yaml(data, identifier)?;
                let plugins = ext
                    .plugins
                    .into_iter()
                    .map(|p| p.into_config().map_err(in_file))
                    .collect::<Result<Vec<_>>>()?;
                Self::new(version, plugins, ext.managed)
            }
        }
    }

    fn encode(&self) -> Result<Vec<u8>> {
        FileType::BufGenYaml.check_supported(self.file_version)?;
        let identifier = FileType::BufGenYaml.label();
        let version = self.file_version.to_string();
        match self.file_version {
            FileVersion::V1Beta1 | FileVersion::V1 => encode_yaml(
                &ExternalBufGenYamlV1 {
                    version,
                    plugins: self.plugins.iter().map(ExternalPluginV1::from_config).collect(),
                    managed: self.managed.clone(),
                },
                identifier,
            ),
            FileVersion::V2 => encode_yaml(
                &ExternalBufGenYamlV2 {
                    version,
                    plugins: self.plugins.iter().map(ExternalPluginV2::from_config).collect(),
                    managed: self.managed.clone(),
                },
                identifier,
            ),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalBufGenYamlV1 {
    #[serde(default)]
    version: String,
    #[serde(default)]
    plugins: Vec<ExternalPluginV1>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    managed: Option<serde_yaml::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalBufGenYamlV2 {
    #[serde(default)]
    version: String,
    #[serde(default)]
    plugins: Vec<ExternalPluginV2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    managed: Option<serde_yaml::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{read_file, write_file, PluginConfigType, Strategy};
    use crate::error::ErrorKind;

    fn read(data: &str) -> Result<BufGenYamlFile> {
        read_file(data.as_bytes(), "buf.gen.yaml")
    }

    #[test]
    fn test_v1_file() {
        let file = read(
            "version: v1\nmanaged:\n  enabled: true\n  go_package_prefix:\n    default: github.com/acme/gen\nplugins:\n  - plugin: buf.build/protocolbuffers/go\n    out: gen/go\n    opt: paths=source_relative\n  - name: cpp\n    out: gen/cpp\n    strategy: all\n",
        )
        .unwrap();
        assert_eq!(file.plugins().len(), 2);
        assert_eq!(file.plugins()[0].plugin_config_type(), PluginConfigType::Remote);
        assert_eq!(file.plugins()[0].opt(), "paths=source_relative");
        assert_eq!(file.plugins()[1].strategy(), Some(Strategy::All));
        let managed = file.managed().unwrap();
        assert_eq!(managed["enabled"], serde_yaml::Value::Bool(true));

        let encoded = write_file(&file).unwrap();
        assert_eq!(read_file::<BufGenYamlFile>(&encoded, "buf.gen.yaml").unwrap(), file);
    }

    #[test]
    fn test_v2_file() {
        let file = read(
            "version: v2\nplugins:\n  - local: protoc-gen-go\n    out: gen\n  - remote: buf.build/grpc/go\n    out: gen\n    revision: 2\n",
        )
        .unwrap();
        assert_eq!(file.plugins()[0].plugin_config_type(), PluginConfigType::Binary);
        assert_eq!(file.plugins()[1].plugin_config_type(), PluginConfigType::Remote);
        assert!(file.managed().is_none());

        let encoded = write_file(&file).unwrap();
        assert_eq!(read_file::<BufGenYamlFile>(&encoded, "buf.gen.yaml").unwrap(), file);
    }

    #[test]
    fn test_requires_plugins() {
        assert!(read("version: v1\n").is_err());
        assert!(BufGenYamlFile::new(FileVersion::V2, vec![], None).is_err());
    }

    #[test]
    fn test_plugin_error_names_file() {
        let err = read("version: v1\nplugins:\n  - name: go\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("buf.gen.yaml"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = read("version: v1\nplugins:\n  - name: go\n    out: gen\n    optt: x\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(read("version: v2\nplugins:\n  - plugin: go\n    out: gen\n").is_err());
    }
}
