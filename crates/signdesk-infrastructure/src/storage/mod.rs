pub mod atomic_file;
pub mod kv_store;

pub use atomic_file::{AtomicFileError, AtomicJsonFile, write_atomic};
pub use kv_store::FileKvStore;
