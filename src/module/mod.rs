//! module identity, pinned dependency keys and module digests

mod digest;
mod full_name;
mod key;
mod set;

pub use digest::{module_digest, module_files_digest};
pub use full_name::{ModuleFullName, ModuleRef};
pub use key::ModuleKey;
pub use set::{LocalModule, ModuleSet, ModuleSetBuilder};
