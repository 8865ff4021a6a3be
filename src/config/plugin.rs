use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// how a plugin is invoked over the files of a module
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// one invocation per directory
    #[default]
    Directory,
    /// a single invocation for all files
    All,
}

impl Strategy {
    /// empty means the default, `directory`
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "" | "directory" => Ok(Strategy::Directory),
            "all" => Ok(Strategy::All),
            _ => Err(Error::InvalidPluginConfig(format!(
                "unknown strategy {:?}, expected directory or all",
                s
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Directory => "directory",
            Strategy::All => "all",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// discriminant of [`PluginKind`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PluginConfigType {
    Local,
    Binary,
    ProtocBuiltin,
    Remote,
}

/// where a plugin comes from and how it is run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PluginKind {
    /// a name only; whether it is a binary on the path or built into protoc
    /// is decided when the plugin is run
    Local { strategy: Strategy },
    /// an executable, with any leading arguments
    Binary { path: Vec<String>, strategy: Strategy },
    ProtocBuiltin { protoc_path: String, strategy: Strategy },
    Remote { remote_host: String, revision: u32 },
}

/// one plugin of a generation file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratePluginConfig {
    name: String,
    out: String,
    opt: String,
    include_imports: bool,
    include_wkt: bool,
    kind: PluginKind,
}

impl GeneratePluginConfig {
    /// `opt` entries are joined with commas
    pub fn new(
        name: impl Into<String>,
        out: impl Into<String>,
        opt: Vec<String>,
        include_imports: bool,
        include_wkt: bool,
        kind: PluginKind,
    ) -> Result<Self> {
        let name = name.into();
        let out = out.into();
        if name.is_empty() {
            return Err(Error::InvalidPluginConfig("plugin name is required".to_string()));
        }
        if out.is_empty() {
            return Err(Error::InvalidPluginConfig(format!(
                "out is required for plugin {}",
                name
            )));
        }
        if include_wkt && !include_imports {
            return Err(Error::InvalidPluginConfig(format!(
                "cannot include well-known types without including imports for plugin {}",
                name
            )));
        }
        match &kind {
            PluginKind::Binary { path, .. } if path.is_empty() => {
                return Err(Error::InvalidPluginConfig(format!(
                    "empty path for plugin {}",
                    name
                )))
            }
            PluginKind::Remote { remote_host, .. } if remote_host.is_empty() => {
                return Err(Error::InvalidPluginConfig(format!(
                    "remote plugin {} has no host",
                    name
                )))
            }
            _ => {}
        }
        Ok(Self {
            name,
            out,
            opt: opt.join(","),
            include_imports,
            include_wkt,
            kind,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn out(&self) -> &str {
        &self.out
    }

    /// comma-joined plugin options
    pub fn opt(&self) -> &str {
        &self.opt
    }

    pub fn include_imports(&self) -> bool {
        self.include_imports
    }

    pub fn include_wkt(&self) -> bool {
        self.include_wkt
    }

    pub fn kind(&self) -> &PluginKind {
        &self.kind
    }

    pub fn plugin_config_type(&self) -> PluginConfigType {
        match self.kind {
            PluginKind::Local { .. } => PluginConfigType::Local,
            PluginKind::Binary { .. } => PluginConfigType::Binary,
            PluginKind::ProtocBuiltin { .. } => PluginConfigType::ProtocBuiltin,
            PluginKind::Remote { .. } => PluginConfigType::Remote,
        }
    }

    /// strategy for local plugins, `None` for remote ones
    pub fn strategy(&self) -> Option<Strategy> {
        match self.kind {
            PluginKind::Local { strategy }
            | PluginKind::Binary { strategy, .. }
            | PluginKind::ProtocBuiltin { strategy, .. } => Some(strategy),
            PluginKind::Remote { .. } => None,
        }
    }

    fn opt_external(&self) -> Option<OneOrMany> {
        (!self.opt.is_empty()).then(|| OneOrMany::One(self.opt.clone()))
    }
}

/// a string or a list of strings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) if s.is_empty() => Vec::new(),
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }

    fn from_vec(mut v: Vec<String>) -> Self {
        if v.len() == 1 {
            OneOrMany::One(v.remove(0))
        } else {
            OneOrMany::Many(v)
        }
    }
}

fn into_vec(value: Option<OneOrMany>) -> Vec<String> {
    value.map(OneOrMany::into_vec).unwrap_or_default()
}

/// host of a `host/owner/plugin[:version]` reference, if `s` is one
fn remote_plugin_host(s: &str) -> Option<&str> {
    let identity = s.split_once(':').map_or(s, |(identity, _)| identity);
    let parts: Vec<&str> = identity.split('/').collect();
    let valid = parts.len() == 3
        && parts.iter().all(|p| {
            !p.is_empty() && *p != "." && *p != ".." && !p.contains(char::is_whitespace)
        })
        && !parts[0].starts_with('.');
    valid.then_some(parts[0])
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// plugin stanza of v1beta1 and v1 generation files
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExternalPluginV1 {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    plugin: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    remote: String,
    #[serde(default)]
    out: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    revision: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    opt: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    protoc_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    strategy: String,
    #[serde(default, skip_serializing_if = "is_false")]
    include_imports: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    include_wkt: bool,
}

impl ExternalPluginV1 {
    pub fn into_config(self) -> Result<GeneratePluginConfig> {
        if !self.remote.is_empty() {
            return Err(Error::InvalidPluginConfig(format!(
                "the remote key is no longer supported, use plugin: {} instead",
                self.remote
            )));
        }
        let (name, via_plugin_key) = match (self.plugin.is_empty(), self.name.is_empty()) {
            (false, true) => (self.plugin, true),
            (true, false) => (self.name, false),
            (false, false) => {
                return Err(Error::InvalidPluginConfig(format!(
                    "only one of plugin or name can be set, got plugin {} and name {}",
                    self.plugin, self.name
                )))
            }
            (true, true) => {
                return Err(Error::InvalidPluginConfig(
                    "one of plugin or name is required".to_string(),
                ))
            }
        };
        let path = into_vec(self.path);
        let opt = into_vec(self.opt);

        let remote_host = if via_plugin_key { remote_plugin_host(&name) } else { None };
        if let Some(host) = remote_host {
            if !path.is_empty() || !self.protoc_path.is_empty() || !self.strategy.is_empty() {
                return Err(Error::InvalidPluginConfig(format!(
                    "remote plugin {} cannot set path, protoc_path or strategy",
                    name
                )));
            }
            let kind = PluginKind::Remote {
                remote_host: host.to_string(),
                revision: self.revision,
            };
            return GeneratePluginConfig::new(name, self.out, opt, self.include_imports, self.include_wkt, kind);
        }

        if self.revision != 0 {
            return Err(Error::InvalidPluginConfig(format!(
                "revision is only valid for remote plugins, not {}",
                name
            )));
        }
        let strategy = Strategy::parse(&self.strategy)?;
        let kind = if !path.is_empty() {
            PluginKind::Binary { path, strategy }
        } else if !self.protoc_path.is_empty() {
            PluginKind::ProtocBuiltin {
                protoc_path: self.protoc_path,
                strategy,
            }
        } else {
            PluginKind::Local { strategy }
        };
        GeneratePluginConfig::new(name, self.out, opt, self.include_imports, self.include_wkt, kind)
    }

    pub fn from_config(config: &GeneratePluginConfig) -> Self {
        let mut ext = ExternalPluginV1 {
            out: config.out.clone(),
            opt: config.opt_external(),
            include_imports: config.include_imports,
            include_wkt: config.include_wkt,
            ..Default::default()
        };
        match &config.kind {
            PluginKind::Remote { revision, .. } => {
                ext.plugin = config.name.clone();
                ext.revision = *revision;
                return ext;
            }
            PluginKind::Local { .. } => {}
            PluginKind::Binary { path, .. } => ext.path = Some(OneOrMany::from_vec(path.clone())),
            PluginKind::ProtocBuiltin { protoc_path, .. } => ext.protoc_path = protoc_path.clone(),
        }
        // the name key never reads back as a remote reference
        ext.name = config.name.clone();
        if let Some(Strategy::All) = config.strategy() {
            ext.strategy = Strategy::All.as_str().to_string();
        }
        ext
    }
}

/// plugin stanza of v2 generation files
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExternalPluginV2 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    local: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    protoc_builtin: Option<String>,
    #[serde(default)]
    out: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    opt: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    strategy: String,
    #[serde(default, skip_serializing_if = "is_false")]
    include_imports: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    include_wkt: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    revision: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    protoc_path: String,
}

impl ExternalPluginV2 {
    pub fn into_config(self) -> Result<GeneratePluginConfig> {
        let set = [self.local.is_some(), self.remote.is_some(), self.protoc_builtin.is_some()]
            .iter()
            .filter(|b| **b)
            .count();
        if set != 1 {
            return Err(Error::InvalidPluginConfig(
                "exactly one of local, remote or protoc_builtin must be set".to_string(),
            ));
        }
        let opt = into_vec(self.opt);

        if let Some(remote) = self.remote {
            if !self.strategy.is_empty() || !self.protoc_path.is_empty() {
                return Err(Error::InvalidPluginConfig(format!(
                    "remote plugin {} cannot set strategy or protoc_path",
                    remote
                )));
            }
            let remote_host = remote_plugin_host(&remote)
                .ok_or_else(|| {
                    Error::InvalidPluginConfig(format!(
                        "invalid remote plugin {:?}, expected host/owner/plugin[:version]",
                        remote
                    ))
                })?
                .to_string();
            let kind = PluginKind::Remote {
                remote_host,
                revision: self.revision,
            };
            return GeneratePluginConfig::new(remote, self.out, opt, self.include_imports, self.include_wkt, kind);
        }

        if self.revision != 0 {
            return Err(Error::InvalidPluginConfig(
                "revision is only valid for remote plugins".to_string(),
            ));
        }
        let strategy = Strategy::parse(&self.strategy)?;
        if let Some(builtin) = self.protoc_builtin {
            let kind = PluginKind::ProtocBuiltin {
                protoc_path: self.protoc_path,
                strategy,
            };
            return GeneratePluginConfig::new(builtin, self.out, opt, self.include_imports, self.include_wkt, kind);
        }

        if !self.protoc_path.is_empty() {
            return Err(Error::InvalidPluginConfig(
                "protoc_path is only valid for protoc_builtin plugins".to_string(),
            ));
        }
        let path = into_vec(self.local);
        let name = path.first().cloned().unwrap_or_default();
        GeneratePluginConfig::new(
            name,
            self.out,
            opt,
            self.include_imports,
            self.include_wkt,
            PluginKind::Binary { path, strategy },
        )
    }

    pub fn from_config(config: &GeneratePluginConfig) -> Self {
        let mut ext = ExternalPluginV2 {
            out: config.out.clone(),
            opt: config.opt_external(),
            include_imports: config.include_imports,
            include_wkt: config.include_wkt,
            ..Default::default()
        };
        match &config.kind {
            PluginKind::Local { .. } => ext.local = Some(OneOrMany::One(config.name.clone())),
            PluginKind::Binary { path, .. } => ext.local = Some(OneOrMany::from_vec(path.clone())),
            PluginKind::ProtocBuiltin { protoc_path, .. } => {
                ext.protoc_builtin = Some(config.name.clone());
                ext.protoc_path = protoc_path.clone();
            }
            PluginKind::Remote { revision, .. } => {
                ext.remote = Some(config.name.clone());
                ext.revision = *revision;
            }
        }
        if let Some(Strategy::All) = config.strategy() {
            ext.strategy = Strategy::All.as_str().to_string();
        }
        ext
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v1(yaml: &str) -> Result<GeneratePluginConfig> {
        let ext: ExternalPluginV1 = serde_yaml::from_str(yaml).unwrap();
        ext.into_config()
    }

    fn v2(yaml: &str) -> Result<GeneratePluginConfig> {
        let ext: ExternalPluginV2 = serde_yaml::from_str(yaml).unwrap();
        ext.into_config()
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(Strategy::parse("").unwrap(), Strategy::Directory);
        assert_eq!(Strategy::parse("directory").unwrap(), Strategy::Directory);
        assert_eq!(Strategy::parse("all").unwrap(), Strategy::All);
        assert!(Strategy::parse("ALL").is_err());
    }

    #[test]
    fn test_v1_classification() {
        let remote = v1("plugin: buf.build/protocolbuffers/go:v1.28.1\nout: gen\n").unwrap();
        assert_eq!(remote.plugin_config_type(), PluginConfigType::Remote);
        assert!(matches!(remote.kind(), PluginKind::Remote { remote_host, .. } if remote_host == "buf.build"));
        assert_eq!(remote.strategy(), None);

        let binary = v1("plugin: go\nout: gen\npath: [go, run, ./cmd]\n").unwrap();
        assert!(matches!(binary.kind(), PluginKind::Binary { path, .. } if path.len() == 3));

        let builtin = v1("name: cpp\nout: gen\nprotoc_path: /usr/bin/protoc\n").unwrap();
        assert_eq!(builtin.plugin_config_type(), PluginConfigType::ProtocBuiltin);

        let local = v1("name: go\nout: gen\nstrategy: all\n").unwrap();
        assert_eq!(local.plugin_config_type(), PluginConfigType::Local);
        assert_eq!(local.strategy(), Some(Strategy::All));
    }

    #[test]
    fn test_v1_name_key_is_never_remote() {
        let local = v1("name: a/b/c\nout: gen\n").unwrap();
        assert_eq!(local.plugin_config_type(), PluginConfigType::Local);
    }

    #[test]
    fn test_v1_relative_paths_are_local() {
        for plugin in ["./bin/protoc-gen-x", "../x/y", "a/../b", ".hidden/owner/name"] {
            let config = v1(&format!("plugin: {}\nout: gen\n", plugin)).unwrap();
            assert_eq!(config.plugin_config_type(), PluginConfigType::Local, "{}", plugin);
        }
    }

    #[test]
    fn test_v1_rejections() {
        assert!(v1("remote: buf.build/x/y\nout: gen\n").is_err());
        assert!(v1("plugin: go\nname: go\nout: gen\n").is_err());
        assert!(v1("out: gen\n").is_err());
        assert!(v1("plugin: buf.build/x/y\nout: gen\npath: bin\n").is_err());
        assert!(v1("plugin: buf.build/x/y\nout: gen\nstrategy: all\n").is_err());
        assert!(v1("name: go\nout: gen\nrevision: 2\n").is_err());
        assert!(v1("name: go\nout: gen\nstrategy: bogus\n").is_err());
        assert!(v1("name: go\nout: gen\ninclude_wkt: true\n").is_err());
        assert!(v1("name: go\n").is_err());
    }

    #[test]
    fn test_opt_string_or_list() {
        let one = v1("name: go\nout: gen\nopt: paths=source_relative\n").unwrap();
        assert_eq!(one.opt(), "paths=source_relative");
        let many = v1("name: go\nout: gen\nopt:\n  - a=1\n  - b=2\n").unwrap();
        assert_eq!(many.opt(), "a=1,b=2");
    }

    #[test]
    fn test_v2_classification() {
        let local = v2("local: protoc-gen-go\nout: gen\n").unwrap();
        assert_eq!(local.plugin_config_type(), PluginConfigType::Binary);
        assert_eq!(local.name(), "protoc-gen-go");

        let remote = v2("remote: buf.build/grpc/go\nout: gen\nrevision: 3\n").unwrap();
        assert!(matches!(remote.kind(), PluginKind::Remote { revision: 3, .. }));

        let builtin = v2("protoc_builtin: java\nout: gen\nprotoc_path: protoc\n").unwrap();
        assert!(matches!(builtin.kind(), PluginKind::ProtocBuiltin { protoc_path, .. } if protoc_path == "protoc"));
    }

    #[test]
    fn test_v2_rejections() {
        assert!(v2("out: gen\n").is_err());
        assert!(v2("local: a\nremote: buf.build/x/y\nout: gen\n").is_err());
        assert!(v2("local: a\nout: gen\nrevision: 1\n").is_err());
        assert!(v2("local: a\nout: gen\nprotoc_path: protoc\n").is_err());
        assert!(v2("remote: not-a-ref\nout: gen\n").is_err());
        assert!(v2("remote: buf.build/x/y\nout: gen\nstrategy: all\n").is_err());
    }

    #[test]
    fn test_v2_external_roundtrip() {
        for yaml in [
            "local: [go, run, ./cmd]\nout: gen\nstrategy: all\n",
            "remote: buf.build/grpc/go:v1.3.0\nout: gen\ninclude_imports: true\ninclude_wkt: true\n",
            "protoc_builtin: java\nout: gen\nopt: lite\n",
        ] {
            let config = v2(yaml).unwrap();
            assert_eq!(ExternalPluginV2::from_config(&config).into_config().unwrap(), config);
        }
    }

    #[test]
    fn test_external_roundtrip() {
        for yaml in [
            "plugin: buf.build/protocolbuffers/go\nout: gen\nrevision: 1\n",
            "name: go\nout: gen\npath: [a, b]\nstrategy: all\n",
            "name: cpp\nout: gen\nprotoc_path: protoc\nopt: x=1\n",
        ] {
            let config = v1(yaml).unwrap();
            assert_eq!(ExternalPluginV1::from_config(&config).into_config().unwrap(), config);
        }
    }
}
