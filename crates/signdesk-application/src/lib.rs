//! Service objects of the gesture-to-text service.
//!
//! Each shared subsystem (session store, confirmation registry, request
//! cache, admission control, metrics) owns its own lock; none of them
//! share a critical section with another.

pub mod confirmation_registry;
pub mod metrics;
pub mod rate_limit;
pub mod recognition;
pub mod request_cache;
pub mod session_service;
pub mod session_store;
pub mod slots;
pub mod sweeper;

pub use confirmation_registry::{ConfirmationRegistry, FrameEvent, SessionSlot};
pub use metrics::{GlobalMetrics, MetricsView};
pub use rate_limit::{Admission, RateLimiter, Throttle, resolve_identity};
pub use recognition::{
    FrameAnalysis, HealthReport, PredictRequest, PredictResponse, RecognitionOptions,
    RecognitionService,
};
pub use request_cache::{Fingerprint, RequestCache};
pub use session_service::{CommandResponse, SessionService};
pub use session_store::{SessionStore, SessionStoreOptions, StoreInfo};
pub use sweeper::SessionSweeper;
