//! versioned configuration files: buf.yaml, buf.lock, buf.work.yaml and
//! buf.gen.yaml
//!
//! every file is read in two passes. the `version` key is sniffed first,
//! then the document is decoded strictly against that version's shape.

mod buf_gen;
mod buf_lock;
mod buf_work;
mod buf_yaml;
mod check;
mod file;
mod module_config;
mod plugin;
mod version;

pub use buf_gen::BufGenYamlFile;
pub use buf_lock::{validate_lock_file_digests, BufLockFile};
pub use buf_work::BufWorkYamlFile;
pub use buf_yaml::BufYamlFile;
pub use check::{BreakingConfig, CheckConfig, LintConfig};
pub use file::{
    exists_file_for_prefix, get_file_for_prefix, put_file_for_prefix, read_file, write_file,
    ConfigFile, FileType,
};
pub use module_config::{get_root_to_excludes, validate_configuration_overlap, ModuleConfig};
pub use plugin::{GeneratePluginConfig, PluginConfigType, PluginKind, Strategy};
pub use version::FileVersion;
