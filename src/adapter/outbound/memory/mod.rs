//! In-process adapters: cache store, alert repository and directory.

mod alert;
mod directory;
mod glob;
mod store;

pub use alert::MemoryAlertRepository;
pub use directory::StaticDirectory;
pub use glob::glob_match;
pub use store::MemoryStore;
