use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::{Error, IoResultExt, Result};
use crate::normalpath;
use crate::storage::{ReadBucket, WriteBucket};

/// directory name used for in-flight writes, never reported by `walk`
const TMP_DIR: &str = ".protomod-tmp";

/// bucket backed by a directory on the local filesystem
///
/// only regular files are objects. symlinks are not followed.
#[derive(Clone, Debug)]
pub struct DirBucket {
    root: PathBuf,
}

impl DirBucket {
    /// open a bucket rooted at an existing directory
    pub fn open(root: &Path) -> Result<Self> {
        let meta = fs::metadata(root).with_path(root)?;
        if !meta.is_dir() {
            return Err(Error::invalid_path(
                root.display().to_string(),
                "not a directory",
            ));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// directory this bucket is rooted at
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, path: &str) -> Result<(String, PathBuf)> {
        let path = normalpath::normalize_and_validate_object(path)?;
        let full = self.root.join(&path);
        Ok((path, full))
    }
}

impl ReadBucket for DirBucket {
    fn get(&self, path: &str) -> Result<Vec<u8>> {
        let (path, full) = self.object_path(path)?;
        trace!(path = %path, "reading object");
        fs::read(&full).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path)
            } else {
                Error::Io { path: full, source }
            }
        })
    }

    fn exists(&self, path: &str) -> Result<bool> {
        let (_, full) = self.object_path(path)?;
        match fs::symlink_metadata(&full) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(Error::Io { path: full, source }),
        }
    }

    fn walk(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = normalpath::normalize_and_validate(prefix)?;
        let start = self.root.join(&prefix);
        if !start.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let walker = WalkDir::new(&start)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || e.file_name() != TMP_DIR);
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(start.as_path()).to_path_buf();
                Error::Io {
                    path,
                    source: e.into(),
                }
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&self.root).map_err(|_| {
                Error::Internal(format!(
                    "walked path {} outside bucket root",
                    entry.path().display()
                ))
            })?;
            let relative = relative.to_str().ok_or_else(|| {
                Error::invalid_path(relative.display().to_string(), "path is not valid UTF-8")
            })?;
            paths.push(normalpath::normalize(&relative.replace('\\', "/")));
        }
        paths.sort();
        debug!(root = %self.root.display(), prefix = %prefix, count = paths.len(), "walked bucket");
        Ok(paths)
    }
}

impl WriteBucket for DirBucket {
    fn put(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let (_, full) = self.object_path(path)?;
        let parent = full
            .parent()
            .ok_or_else(|| Error::Internal(format!("object {} has no parent", full.display())))?
            .to_path_buf();
        fs::create_dir_all(&parent).with_path(&parent)?;

        // atomic write: temp -> fsync -> rename
        let tmp_dir = self.root.join(TMP_DIR);
        fs::create_dir_all(&tmp_dir).with_path(&tmp_dir)?;
        let tmp_path = tmp_dir.join(uuid::Uuid::new_v4().to_string());
        if let Err(e) = write_and_rename(&tmp_path, &full, content) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        let dir = File::open(&parent).with_path(&parent)?;
        dir.sync_all().with_path(&parent)?;
        trace!(path = %full.display(), len = content.len(), "wrote object");
        Ok(())
    }
}

fn write_and_rename(tmp_path: &Path, full: &Path, content: &[u8]) -> Result<()> {
    {
        let mut tmp_file = File::create(tmp_path).with_path(tmp_path)?;
        tmp_file.write_all(content).with_path(tmp_path)?;
        tmp_file.sync_all().with_path(tmp_path)?;
    }
    fs::rename(tmp_path, full).with_path(full)
}
