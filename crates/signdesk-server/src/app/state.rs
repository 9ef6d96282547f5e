use std::sync::Arc;

use signdesk_application::{RecognitionService, SessionService};

/// Application state shared across request handlers.
#[derive(Clone)]
pub struct AppState {
    pub recognition: Arc<RecognitionService>,
    pub sessions: Arc<SessionService>,
}
