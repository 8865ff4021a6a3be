use std::collections::BTreeSet;

use tracing::debug;

use crate::cas::{file_set_for_bucket, Digest, DigestType};
use crate::config::{get_file_for_prefix, BufYamlFile, ConfigFile, ModuleConfig};
use crate::error::{Error, Result};
use crate::module::ModuleKey;
use crate::normalpath;
use crate::storage::{MappedReadBucket, ReadBucket};

/// compute the digest of a module from its files and its dependencies
///
/// the files digest is the digest of the manifest over the module's `.proto`
/// files. the module digest hashes the files digest followed by the sorted,
/// deduplicated dependency digests, one per line.
pub fn module_digest<B: ReadBucket + ?Sized>(bucket: &B, dep_module_keys: &[ModuleKey]) -> Result<Digest> {
    let files_digest = module_files_digest(bucket)?;

    let mut dep_digests = BTreeSet::new();
    for key in dep_module_keys {
        dep_digests.insert(key.digest()?.to_string());
    }
    let lines: Vec<String> = std::iter::once(files_digest.to_string())
        .chain(dep_digests)
        .collect();
    let digest = Digest::for_bytes(lines.join("\n").as_bytes(), DigestType::Shake256);
    debug!(deps = dep_module_keys.len(), digest = %digest, "computed module digest");
    Ok(digest)
}

/// digest of the manifest of a module's own files
///
/// when the bucket carries a `buf.yaml`, only files under the roots of its
/// root module count, and files under their excludes are left out.
pub fn module_files_digest<B: ReadBucket + ?Sized>(bucket: &B) -> Result<Digest> {
    let (roots, excludes) = root_layout(bucket)?;
    let filtered = MappedReadBucket::new(bucket, |path: &str| {
        normalpath::ext(path) == ".proto"
            && roots.iter().any(|root| normalpath::contains_path(root, path))
            && !excludes
                .iter()
                .any(|exclude| normalpath::contains_path(exclude, path))
    });
    let file_set = file_set_for_bucket(&filtered)?;
    Ok(file_set.manifest().digest())
}

/// roots and root-joined excludes of the module at `.`
fn root_layout<B: ReadBucket + ?Sized>(bucket: &B) -> Result<(Vec<String>, Vec<String>)> {
    let buf_yaml = match get_file_for_prefix::<BufYamlFile, _>(bucket, ".") {
        Ok(file) => file,
        Err(Error::NotFound(_)) => return Ok((vec![".".to_string()], Vec::new())),
        Err(e) => return Err(e),
    };
    let config = buf_yaml
        .module_configs()
        .iter()
        .find(|c| c.root_path() == ".")
        .cloned()
        .unwrap_or_else(|| ModuleConfig::default_for(buf_yaml.file_version()));
    let roots = config.root_to_excludes().keys().cloned().collect();
    let excludes = config
        .root_to_excludes()
        .iter()
        .flat_map(|(root, excludes)| excludes.iter().map(move |e| normalpath::join(root, e)))
        .collect();
    Ok((roots, excludes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleFullName;
    use crate::storage::MemoryBucket;

    fn key(name: &str, content: &str) -> ModuleKey {
        ModuleKey::with_digest(
            ModuleFullName::parse(name).unwrap(),
            None,
            Digest::for_bytes(content.as_bytes(), DigestType::Shake256),
        )
    }

    #[test]
    fn test_module_digest_ignores_non_proto_files() {
        let a = MemoryBucket::from_entries([("a.proto", "syntax"), ("README.md", "hi")]).unwrap();
        let b = MemoryBucket::from_entries([("a.proto", "syntax")]).unwrap();
        assert_eq!(module_digest(&a, &[]).unwrap(), module_digest(&b, &[]).unwrap());
    }

    #[test]
    fn test_module_digest_chains_files_and_deps() {
        let bucket = MemoryBucket::from_entries([("a.proto", "syntax")]).unwrap();
        let deps = vec![key("buf.build/acme/b", "b"), key("buf.build/acme/a", "a")];

        let files_digest = module_files_digest(&bucket).unwrap();
        let mut dep_lines: Vec<String> = deps.iter().map(|k| k.digest().unwrap().to_string()).collect();
        dep_lines.sort();
        let expected = Digest::for_bytes(
            format!("{}\n{}", files_digest, dep_lines.join("\n")).as_bytes(),
            DigestType::Shake256,
        );
        assert_eq!(module_digest(&bucket, &deps).unwrap(), expected);

        // dependency order does not matter
        let reversed: Vec<_> = deps.iter().rev().cloned().collect();
        assert_eq!(module_digest(&bucket, &reversed).unwrap(), expected);
    }

    #[test]
    fn test_module_digest_without_deps_hashes_files_digest() {
        let bucket = MemoryBucket::from_entries([("a.proto", "syntax")]).unwrap();
        let files_digest = module_files_digest(&bucket).unwrap();
        assert_eq!(
            module_digest(&bucket, &[]).unwrap(),
            Digest::for_bytes(files_digest.to_string().as_bytes(), DigestType::Shake256)
        );
    }

    #[test]
    fn test_module_digest_applies_buf_yaml_excludes() {
        let with_excluded = MemoryBucket::from_entries([
            ("buf.yaml", "version: v1\nbuild:\n  excludes:\n    - vendor\n"),
            ("a.proto", "syntax"),
            ("vendor/x.proto", "vendored"),
        ])
        .unwrap();
        let plain = MemoryBucket::from_entries([("a.proto", "syntax")]).unwrap();
        assert_eq!(
            module_files_digest(&with_excluded).unwrap(),
            module_files_digest(&plain).unwrap()
        );
    }

    #[test]
    fn test_module_digest_only_counts_v1beta1_roots() {
        let rooted = MemoryBucket::from_entries([
            ("buf.yaml", "version: v1beta1\nbuild:\n  roots:\n    - a\n"),
            ("a/x.proto", "inside"),
            ("b.proto", "outside"),
            ("c/y.proto", "outside"),
        ])
        .unwrap();
        let inside = MemoryBucket::from_entries([("a/x.proto", "inside")]).unwrap();
        assert_eq!(
            module_files_digest(&rooted).unwrap(),
            module_files_digest(&inside).unwrap()
        );
    }

    #[test]
    fn test_module_digest_rejects_line_break_paths() {
        // a path with a line break would encode like two separate files
        let joined = MemoryBucket::from_entries([("x.proto\ny.proto", "")]).unwrap();
        let split = MemoryBucket::from_entries([("x.proto", ""), ("y.proto", "")]).unwrap();
        assert!(matches!(
            module_files_digest(&joined),
            Err(Error::InvalidFileNode { .. })
        ));
        assert!(module_files_digest(&split).is_ok());
    }

    #[test]
    fn test_module_digest_changes_with_content() {
        let a = MemoryBucket::from_entries([("a.proto", "content")]).unwrap();
        let b = MemoryBucket::from_entries([("a.proto", "content2")]).unwrap();
        assert_ne!(module_digest(&a, &[]).unwrap(), module_digest(&b, &[]).unwrap());
    }

    #[test]
    fn test_module_digest_propagates_dep_failure() {
        let bucket = MemoryBucket::from_entries([("a.proto", "syntax")]).unwrap();
        let broken = ModuleKey::new(ModuleFullName::parse("buf.build/acme/x").unwrap(), None, || {
            Err(Error::NotFound("x".to_string()))
        });
        assert!(matches!(
            module_digest(&bucket, &[broken]),
            Err(Error::ModuleDigest { .. })
        ));
    }
}
