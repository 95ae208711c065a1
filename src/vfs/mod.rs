mod archive_fs;
pub mod bundle;
mod dir_source;
mod direct_fs;
mod entry;
pub mod resolve;
mod source;
pub(crate) mod zip_source;

pub use archive_fs::ArchiveFS;
pub use bundle::{RESOURCE_MARKER, ResourceBundle, resource_path};
pub use direct_fs::DirectFS;
pub use entry::{Entry, EntryType};
pub use resolve::{ResolveContext, Resolved, Resolver, Strategy};
