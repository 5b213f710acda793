//! On-disk side of the recorder: capture files, their names, and the lock file.

pub mod lock;
pub mod paths;
pub mod session;

pub use lock::LockFile;
pub use paths::{DatedPathNamer, PathNamer, check_writable_dir};
pub use session::FileSession;
