use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// `registry/owner/name` identity of a module
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModuleFullName {
    registry: String,
    owner: String,
    name: String,
}

impl ModuleFullName {
    /// create from components, validating each one
    pub fn new(
        registry: impl Into<String>,
        owner: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let full_name = Self {
            registry: registry.into(),
            owner: owner.into(),
            name: name.into(),
        };
        for (what, value) in [
            ("registry", &full_name.registry),
            ("owner", &full_name.owner),
            ("name", &full_name.name),
        ] {
            validate_component(&full_name.to_string(), what, value)?;
        }
        Ok(full_name)
    }

    /// parse `registry/owner/name`
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 3 {
            return Err(Error::InvalidModuleName {
                input: s.to_string(),
                reason: "expected registry/owner/name".to_string(),
            });
        }
        Self::new(parts[0], parts[1], parts[2])
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn validate_component(input: &str, what: &str, value: &str) -> Result<()> {
    let reason = if value.is_empty() {
        format!("{} is empty", what)
    } else if value.contains(|c: char| c.is_whitespace() || c == '/' || c == ':') {
        format!("{} {:?} contains an invalid character", what, value)
    } else {
        return Ok(());
    };
    Err(Error::InvalidModuleName {
        input: input.to_string(),
        reason,
    })
}

impl fmt::Display for ModuleFullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.registry, self.owner, self.name)
    }
}

impl FromStr for ModuleFullName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ordering follows the string form so sorted lists match their rendering
impl PartialOrd for ModuleFullName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModuleFullName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl Serialize for ModuleFullName {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModuleFullName {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// a dependency reference `registry/owner/name[:ref]`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModuleRef {
    full_name: ModuleFullName,
    reference: Option<String>,
}

impl ModuleRef {
    pub fn new(full_name: ModuleFullName, reference: Option<String>) -> Result<Self> {
        if reference.as_deref() == Some("") {
            return Err(Error::InvalidModuleName {
                input: format!("{}:", full_name),
                reason: "reference is empty".to_string(),
            });
        }
        Ok(Self {
            full_name,
            reference,
        })
    }

    /// parse `registry/owner/name[:ref]`
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((name, reference)) => {
                Self::new(ModuleFullName::parse(name)?, Some(reference.to_string()))
            }
            None => Self::new(ModuleFullName::parse(s)?, None),
        }
    }

    pub fn full_name(&self) -> &ModuleFullName {
        &self.full_name
    }

    /// branch, tag, commit or label, if pinned
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            Some(r) => write!(f, "{}:{}", self.full_name, r),
            None => write!(f, "{}", self.full_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_parse() {
        let n = ModuleFullName::parse("buf.build/acme/weather").unwrap();
        assert_eq!(n.registry(), "buf.build");
        assert_eq!(n.owner(), "acme");
        assert_eq!(n.name(), "weather");
        assert_eq!(n.to_string(), "buf.build/acme/weather");
    }

    #[test]
    fn test_full_name_invalid() {
        for input in ["", "a/b", "a/b/c/d", "a//c", "a/b c/d", "/b/c"] {
            assert!(
                matches!(ModuleFullName::parse(input), Err(Error::InvalidModuleName { .. })),
                "expected error for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_full_name_ordering_matches_string() {
        let mut names = vec![
            ModuleFullName::parse("b.build/a/x").unwrap(),
            ModuleFullName::parse("a.build/z/x").unwrap(),
            ModuleFullName::parse("a.build/a/y").unwrap(),
        ];
        names.sort();
        let rendered: Vec<_> = names.iter().map(|n| n.to_string()).collect();
        assert_eq!(rendered, vec!["a.build/a/y", "a.build/z/x", "b.build/a/x"]);
    }

    #[test]
    fn test_module_ref_parse() {
        let r = ModuleRef::parse("buf.build/acme/weather:v1.2.0").unwrap();
        assert_eq!(r.full_name().name(), "weather");
        assert_eq!(r.reference(), Some("v1.2.0"));
        assert_eq!(r.to_string(), "buf.build/acme/weather:v1.2.0");

        let r = ModuleRef::parse("buf.build/acme/weather").unwrap();
        assert_eq!(r.reference(), None);

        assert!(ModuleRef::parse("buf.build/acme/weather:").is_err());
        assert!(ModuleRef::parse("buf.build/acme:main").is_err());
    }
}
