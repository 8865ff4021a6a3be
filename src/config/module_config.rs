use std::collections::{BTreeMap, HashSet};

use crate::config::{BreakingConfig, FileVersion, LintConfig};
use crate::error::{Error, Result};
use crate::module::ModuleFullName;
use crate::normalpath;

/// configuration of one module directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleConfig {
    root_path: String,
    full_name: Option<ModuleFullName>,
    root_to_excludes: BTreeMap<String, Vec<String>>,
    lint: LintConfig,
    breaking: BreakingConfig,
}

impl ModuleConfig {
    /// `root_path` is relative to the directory of the file that declares
    /// the module. `root_to_excludes` maps roots under the module to
    /// exclude paths relative to each root.
    pub fn new(
        root_path: &str,
        full_name: Option<ModuleFullName>,
        root_to_excludes: BTreeMap<String, Vec<String>>,
        lint: LintConfig,
        breaking: BreakingConfig,
    ) -> Result<Self> {
        let root_path = normalpath::normalize_and_validate(root_path)?;
        for (root, excludes) in &root_to_excludes {
            if normalpath::normalize_and_validate(root)? != *root {
                return Err(Error::invalid_path(root.as_str(), "root is not normalized"));
            }
            for exclude in excludes {
                if normalpath::normalize_and_validate_object(exclude)? != *exclude {
                    return Err(Error::invalid_path(exclude.as_str(), "exclude is not normalized"));
                }
            }
        }
        Ok(Self {
            root_path,
            full_name,
            root_to_excludes,
            lint,
            breaking,
        })
    }

    /// a module at `.` with no name, no excludes and default checks
    pub fn default_for(file_version: FileVersion) -> Self {
        let mut root_to_excludes = BTreeMap::new();
        root_to_excludes.insert(".".to_string(), Vec::new());
        Self {
            root_path: ".".to_string(),
            full_name: None,
            root_to_excludes,
            lint: LintConfig::default_for(file_version),
            breaking: BreakingConfig::default_for(file_version),
        }
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn full_name(&self) -> Option<&ModuleFullName> {
        self.full_name.as_ref()
    }

    pub fn root_to_excludes(&self) -> &BTreeMap<String, Vec<String>> {
        &self.root_to_excludes
    }

    pub fn lint_config(&self) -> &LintConfig {
        &self.lint
    }

    pub fn breaking_config(&self) -> &BreakingConfig {
        &self.breaking
    }
}

/// partition `excludes` among `roots`
///
/// an empty root list means the single root `.`. every exclude must be a
/// directory under exactly one root and is returned relative to that root.
pub fn get_root_to_excludes(roots: &[String], excludes: &[String]) -> Result<BTreeMap<String, Vec<String>>> {
    let default_roots = [".".to_string()];
    let roots = if roots.is_empty() { &default_roots[..] } else { roots };

    let mut normalized_roots = Vec::with_capacity(roots.len());
    let mut seen = HashSet::new();
    for root in roots {
        let root = normalpath::normalize_and_validate(root)?;
        if !seen.insert(root.clone()) {
            return Err(Error::Duplicate {
                what: "root",
                value: root,
            });
        }
        normalized_roots.push(root);
    }
    validate_configuration_overlap(&normalized_roots, "roots")?;

    let mut root_to_excludes: BTreeMap<String, Vec<String>> = normalized_roots
        .iter()
        .map(|root| (root.clone(), Vec::new()))
        .collect();
    let mut unique_excludes = HashSet::new();
    for exclude in excludes {
        let exclude = normalpath::normalize_and_validate(exclude)?;
        if normalpath::ext(&exclude) == ".proto" {
            return Err(Error::invalid_path(
                exclude,
                "excludes can only be directories, not .proto files",
            ));
        }
        if normalized_roots.contains(&exclude) {
            return Err(Error::invalid_path(
                exclude,
                "an exclude cannot be equal to a root, remove the root instead",
            ));
        }
        let containing: Vec<&String> = normalized_roots
            .iter()
            .filter(|root| normalpath::contains_path(root, &exclude))
            .collect();
        let root = match containing.as_slice() {
            [] => {
                return Err(Error::NotInRoot {
                    what: "exclude",
                    path: exclude,
                    roots: normalized_roots.clone(),
                })
            }
            [root] => *root,
            _ => {
                return Err(Error::Internal(format!(
                    "exclude {:?} is contained in multiple roots {:?}",
                    exclude, containing
                )))
            }
        };
        unique_excludes.insert(exclude.clone());
        let rel = normalpath::rel(root, &exclude)?;
        if let Some(list) = root_to_excludes.get_mut(root) {
            list.push(rel);
        }
    }

    let mut total = 0;
    for list in root_to_excludes.values_mut() {
        list.sort();
        list.dedup();
        total += list.len();
    }
    if total != unique_excludes.len() {
        return Err(Error::Internal(format!(
            "expected {} unique excludes across roots, got {}",
            unique_excludes.len(),
            total
        )));
    }
    Ok(root_to_excludes)
}

/// fail if any path contains another
///
/// `paths` must be normalized and free of duplicates.
pub fn validate_configuration_overlap(paths: &[String], what: &'static str) -> Result<()> {
    for (i, a) in paths.iter().enumerate() {
        for b in &paths[i + 1..] {
            let (parent, child) = if normalpath::contains_path(a, b) {
                (a, b)
            } else if normalpath::contains_path(b, a) {
                (b, a)
            } else {
                continue;
            };
            return Err(Error::Overlap {
                what,
                parent: parent.clone(),
                child: child.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_root_to_excludes_default_root() {
        let m = get_root_to_excludes(&[], &[]).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m["."], Vec::<String>::new());
    }

    #[test]
    fn test_root_to_excludes_partitions_by_root() {
        let m = get_root_to_excludes(&strings(&["a", "b"]), &strings(&["a/x"])).unwrap();
        assert_eq!(m["a"], strings(&["x"]));
        assert_eq!(m["b"], Vec::<String>::new());
    }

    #[test]
    fn test_root_to_excludes_sorts_and_dedups() {
        let m = get_root_to_excludes(&[], &strings(&["b/c", "a", "./b/c/"])).unwrap();
        assert_eq!(m["."], strings(&["a", "b/c"]));
    }

    #[test]
    fn test_root_to_excludes_rejects_exclude_equal_to_root() {
        let err = get_root_to_excludes(&strings(&["a", "b"]), &strings(&["a"])).unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
    }

    #[test]
    fn test_root_to_excludes_rejects_proto_file_exclude() {
        let err = get_root_to_excludes(&[], &strings(&["foo/bar.proto"])).unwrap_err();
        assert!(err.to_string().contains("bar.proto"));
    }

    #[test]
    fn test_root_to_excludes_rejects_exclude_outside_roots() {
        let err = get_root_to_excludes(&strings(&["a"]), &strings(&["c/d"])).unwrap_err();
        assert!(matches!(err, Error::NotInRoot { ref path, .. } if path == "c/d"));
    }

    #[test]
    fn test_root_to_excludes_rejects_bad_roots() {
        assert!(matches!(
            get_root_to_excludes(&strings(&["a", "./a"]), &[]),
            Err(Error::Duplicate { .. })
        ));
        assert!(matches!(
            get_root_to_excludes(&strings(&["a", "a/b"]), &[]),
            Err(Error::Overlap { .. })
        ));
        assert!(get_root_to_excludes(&strings(&["/abs"]), &[]).is_err());
        assert!(get_root_to_excludes(&strings(&["../up"]), &[]).is_err());
    }

    #[test]
    fn test_validate_configuration_overlap() {
        assert!(validate_configuration_overlap(&strings(&["a", "b", "ab"]), "roots").is_ok());
        assert!(validate_configuration_overlap(&strings(&["a/b/c", "a"]), "roots").is_err());
        assert!(validate_configuration_overlap(&strings(&[".", "a"]), "roots").is_err());
        assert!(validate_configuration_overlap(&strings(&["."]), "roots").is_ok());
        assert!(validate_configuration_overlap(&[], "roots").is_ok());
    }

    #[test]
    fn test_module_config_default() {
        let config = ModuleConfig::default_for(FileVersion::V1);
        assert_eq!(config.root_path(), ".");
        assert!(config.full_name().is_none());
        assert_eq!(config.root_to_excludes().keys().collect::<Vec<_>>(), vec!["."]);
    }

    #[test]
    fn test_module_config_rejects_unnormalized_root() {
        let mut m = BTreeMap::new();
        m.insert("./a".to_string(), Vec::new());
        assert!(ModuleConfig::new(
            ".",
            None,
            m,
            LintConfig::default_for(FileVersion::V1),
            BreakingConfig::default_for(FileVersion::V1),
        )
        .is_err());
    }
}
