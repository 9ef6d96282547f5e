pub mod centroid_classifier;
pub mod config_service;
pub mod file_session_backend;
pub mod memory_session_backend;
pub mod paths;
pub mod remote_detector;
pub mod storage;

pub use crate::centroid_classifier::CentroidClassifier;
pub use crate::config_service::ConfigService;
pub use crate::file_session_backend::FileSessionBackend;
pub use crate::memory_session_backend::MemorySessionBackend;
pub use crate::paths::SignDeskPaths;
pub use crate::remote_detector::RemoteHandDetector;
