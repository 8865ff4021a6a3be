use std::collections::HashSet;

use tracing::debug;

use crate::cas::Digest;
use crate::error::{Error, Result};
use crate::module::{module_digest, ModuleFullName, ModuleKey};
use crate::storage::ReadBucket;

/// a local module in a [`ModuleSet`]
pub struct LocalModule {
    opaque_id: String,
    bucket: Box<dyn ReadBucket + Send + Sync>,
    is_target: bool,
}

impl LocalModule {
    /// identifier unique within the set, usually the directory path
    pub fn opaque_id(&self) -> &str {
        &self.opaque_id
    }

    pub fn is_target(&self) -> bool {
        self.is_target
    }

    pub fn bucket(&self) -> &dyn ReadBucket {
        self.bucket.as_ref()
    }
}

/// builder for [`ModuleSet`]
#[derive(Default)]
pub struct ModuleSetBuilder {
    modules: Vec<LocalModule>,
}

impl ModuleSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// add a module backed by a bucket
    ///
    /// target modules depend on every non-target module in the set.
    pub fn add_local_module<B>(mut self, bucket: B, opaque_id: impl Into<String>, is_target: bool) -> Self
    where
        B: ReadBucket + Send + Sync + 'static,
    {
        self.modules.push(LocalModule {
            opaque_id: opaque_id.into(),
            bucket: Box::new(bucket),
            is_target,
        });
        self
    }

    pub fn build(self) -> Result<ModuleSet> {
        let mut seen = HashSet::new();
        for module in &self.modules {
            if !seen.insert(module.opaque_id.as_str()) {
                return Err(Error::Duplicate {
                    what: "module",
                    value: module.opaque_id.clone(),
                });
            }
        }
        if !self.modules.iter().any(|m| m.is_target) {
            return Err(Error::invalid_config("module set", "no target modules"));
        }
        Ok(ModuleSet {
            modules: self.modules,
        })
    }
}

/// an in-memory set of local modules
pub struct ModuleSet {
    modules: Vec<LocalModule>,
}

impl ModuleSet {
    pub fn modules(&self) -> &[LocalModule] {
        &self.modules
    }

    /// digests of the target modules, in insertion order
    ///
    /// non-target modules act as the dependencies of every target and are
    /// digested from their own files alone.
    pub fn digests(&self) -> Result<Vec<(String, Digest)>> {
        let mut dep_keys = Vec::new();
        for (i, module) in self.modules.iter().filter(|m| !m.is_target).enumerate() {
            let digest = module_digest(module.bucket(), &[])?;
            // local dependencies have no registry identity, so give each a
            // placeholder name that is unique in the set
            let name = ModuleFullName::new("local", "dep", format!("module{}", i))?;
            dep_keys.push(ModuleKey::with_digest(name, None, digest));
        }

        let mut digests = Vec::new();
        for module in self.modules.iter().filter(|m| m.is_target) {
            let digest = module_digest(module.bucket(), &dep_keys)?;
            debug!(module = %module.opaque_id, digest = %digest, "digested target module");
            digests.push((module.opaque_id.clone(), digest));
        }
        Ok(digests)
    }
}
