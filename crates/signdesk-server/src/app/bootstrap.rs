use std::sync::Arc;

use anyhow::{Context, Result};
use signdesk_application::{
    ConfirmationRegistry, GlobalMetrics, RateLimiter, RecognitionOptions, RecognitionService,
    RequestCache, SessionService, SessionStore, SessionStoreOptions, SessionSweeper, Throttle,
};
use signdesk_core::config::{RootConfig, StoreKind};
use signdesk_core::recognition::{Classifier, HandDetector};
use signdesk_core::session::SessionBackend;
use signdesk_infrastructure::{
    CentroidClassifier, FileSessionBackend, MemorySessionBackend, RemoteHandDetector,
};

use crate::app::AppState;

pub struct AppBootstrap {
    pub app_state: AppState,
    pub sweeper: SessionSweeper,
}

/// Composition root: builds every service from a resolved configuration.
///
/// A missing or broken model and an unconfigured detector are not fatal;
/// the server starts and reports them through the health endpoint.
pub fn bootstrap(config: &RootConfig) -> Result<AppBootstrap> {
    let classifier = load_classifier(config);

    let detector: Option<Arc<dyn HandDetector>> = match &config.recognition.detector_url {
        Some(url) => {
            let detector = RemoteHandDetector::new(url, config.recognition.detector_timeout())
                .context("Failed to create hand detector client")?;
            tracing::info!(url = %url, "[Bootstrap] Hand detector configured");
            Some(Arc::new(detector))
        }
        None => {
            tracing::warn!("[Bootstrap] No detector_url configured, prediction is disabled");
            None
        }
    };

    let durable: Option<Arc<dyn SessionBackend>> = match config.store.kind {
        StoreKind::File => {
            let dir = config
                .store
                .path
                .clone()
                .context("Session store path is not resolved")?;
            tracing::info!(path = %dir.display(), "[Bootstrap] Using file session store");
            Some(Arc::new(FileSessionBackend::new(dir)))
        }
        StoreKind::Memory => {
            tracing::info!("[Bootstrap] Using in-memory session store only");
            None
        }
    };

    let recognition = &config.recognition;
    let sessions = Arc::new(SessionStore::new(
        durable,
        Arc::new(MemorySessionBackend::new()),
        SessionStoreOptions {
            session_ttl: config.store.session_ttl(),
            operation_timeout: config.store.operation_timeout(),
            retry_interval: config.store.retry_interval(),
            default_confidence_threshold: recognition.confidence_threshold,
            default_letter_delay_ms: recognition.confirmation_delay_ms,
        },
    ));
    let registry = Arc::new(ConfirmationRegistry::new(recognition.confirmation_delay()));
    let metrics = Arc::new(GlobalMetrics::new(config.metrics.active_window()));

    let mut service = RecognitionService::new(
        classifier,
        detector,
        sessions.clone(),
        registry.clone(),
        RequestCache::new(config.cache.ttl(), config.cache.capacity),
        metrics,
        RecognitionOptions {
            prediction_cooldown: recognition.prediction_cooldown(),
            hand_loss_frames: recognition.hand_loss_frames,
            default_confidence_threshold: recognition.confidence_threshold,
            default_confirmation_delay: recognition.confirmation_delay(),
        },
    );
    if config.rate_limit.enabled {
        service = service.with_admission(
            RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window()),
            Throttle::new(config.rate_limit.min_interval()),
        );
    }

    let sweeper = SessionSweeper::new(
        sessions.clone(),
        registry.clone(),
        config.store.sweep_interval(),
        config.store.session_ttl(),
    );

    Ok(AppBootstrap {
        app_state: AppState {
            recognition: Arc::new(service),
            sessions: Arc::new(SessionService::new(sessions, registry)),
        },
        sweeper,
    })
}

fn load_classifier(config: &RootConfig) -> Option<Arc<dyn Classifier>> {
    let Some(path) = &config.recognition.model_path else {
        tracing::warn!("[Bootstrap] No model_path configured, classifier not loaded");
        return None;
    };
    match CentroidClassifier::load(path) {
        Ok(classifier) => {
            tracing::info!(
                path = %path.display(),
                classes = classifier.class_count(),
                "[Bootstrap] Classifier loaded"
            );
            Some(Arc::new(classifier))
        }
        Err(e) => {
            tracing::error!(error = %e, "[Bootstrap] Classifier not loaded");
            None
        }
    }
}
