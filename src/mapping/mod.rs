//! Memory-mapped file facade
//!
//! A thin, platform-neutral wrapper over file creation, shared mapping,
//! grow-in-place and msync. The queue holds one [`MappedFile`] per shared
//! file; all typed access to the mapped bytes lives in the queue modules.

mod file;

pub use file::MappedFile;
