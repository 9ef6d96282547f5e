use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use signdesk_application::{
    ConfirmationRegistry, FrameEvent, GlobalMetrics, PredictRequest, RateLimiter,
    RecognitionOptions, RecognitionService, RequestCache, SessionService, SessionStore,
    SessionStoreOptions, Throttle,
};
use signdesk_core::confirmation::WordCommand;
use signdesk_core::error::{Result, SignDeskError};
use signdesk_core::recognition::{Classifier, DetectedHand, FeatureVector, HandDetector, Landmark};
use signdesk_infrastructure::MemorySessionBackend;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Returns whatever label the test last set.
struct ScriptedClassifier {
    next: Mutex<(usize, f64)>,
}

impl ScriptedClassifier {
    fn new() -> Self {
        Self {
            next: Mutex::new((0, 0.9)),
        }
    }

    fn set(&self, label_index: usize, confidence: f64) {
        *self.next.lock().unwrap() = (label_index, confidence);
    }
}

impl Classifier for ScriptedClassifier {
    fn predict(&self, _features: &FeatureVector) -> Result<(usize, f64)> {
        Ok(*self.next.lock().unwrap())
    }
}

/// Finds a hand in every frame except ones whose bytes start with `empty`.
struct StubDetector {
    calls: AtomicUsize,
}

#[async_trait]
impl HandDetector for StubDetector {
    async fn detect(&self, image: &[u8]) -> Result<Option<DetectedHand>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if image.starts_with(b"empty") {
            return Ok(None);
        }
        if image.starts_with(b"panic") {
            panic!("detector blew up");
        }
        let landmarks = (0..21)
            .map(|i| Landmark::new(0.3 + i as f64 * 0.01, 0.4 + i as f64 * 0.005))
            .collect();
        Ok(Some(DetectedHand {
            landmarks,
            image_width: Some(640),
            image_height: Some(480),
        }))
    }
}

struct Harness {
    service: Arc<RecognitionService>,
    sessions: SessionService,
    classifier: Arc<ScriptedClassifier>,
    detector: Arc<StubDetector>,
    metrics: Arc<GlobalMetrics>,
}

fn harness(cache_ttl: Duration) -> Harness {
    let store = Arc::new(SessionStore::new(
        None,
        Arc::new(MemorySessionBackend::new()),
        SessionStoreOptions {
            default_letter_delay_ms: 0,
            ..SessionStoreOptions::default()
        },
    ));
    let registry = Arc::new(ConfirmationRegistry::new(Duration::ZERO));
    let classifier = Arc::new(ScriptedClassifier::new());
    let detector = Arc::new(StubDetector {
        calls: AtomicUsize::new(0),
    });
    let metrics = Arc::new(GlobalMetrics::new(Duration::from_secs(3600)));
    let service = RecognitionService::new(
        Some(classifier.clone()),
        Some(detector.clone()),
        store.clone(),
        registry.clone(),
        RequestCache::new(cache_ttl, 50),
        metrics.clone(),
        RecognitionOptions {
            prediction_cooldown: Duration::ZERO,
            hand_loss_frames: 3,
            default_confidence_threshold: 0.5,
            default_confirmation_delay: Duration::ZERO,
        },
    );
    Harness {
        service: Arc::new(service),
        sessions: SessionService::new(store, registry),
        classifier,
        detector,
        metrics,
    }
}

fn request(session: &str, payload: &str) -> PredictRequest {
    PredictRequest {
        session_id: Some(session.to_string()),
        origin: Some("127.0.0.1".to_string()),
        frame: Some(format!(
            "data:image/jpeg;base64,{}",
            STANDARD.encode(payload.as_bytes())
        )),
    }
}

#[tokio::test]
async fn frames_compose_a_word() {
    let h = harness(Duration::from_millis(100));

    h.classifier.set(0, 0.9);
    let first = h.service.predict(request("s1", "f1")).await.unwrap();
    assert!(first.success);
    assert!(first.hand_detected);
    assert_eq!(first.prediction.letter, Some('A'));
    assert_eq!(first.landmarks.as_ref().map(Vec::len), Some(21));
    assert!(first.bounding_box.is_some());
    assert_eq!(first.confirmation.event, FrameEvent::NewPendingLetter);

    let second = h.service.predict(request("s1", "f2")).await.unwrap();
    assert_eq!(second.confirmation.event, FrameEvent::LetterConfirmed);
    assert_eq!(second.confirmation.word, "A");

    h.classifier.set(1, 0.9);
    h.service.predict(request("s1", "f3")).await.unwrap();
    let fourth = h.service.predict(request("s1", "f4")).await.unwrap();
    assert_eq!(fourth.confirmation.word, "AB");

    let state = h.sessions.snapshot("s1").await.unwrap();
    assert_eq!(state.current_word, "AB");
    assert_eq!(state.predictions.len(), 4);
    assert_eq!(state.request_count, 4);

    let view = h.metrics.snapshot();
    assert_eq!(view.total_requests, 4);
    assert_eq!(view.successful_requests, 4);
}

#[tokio::test]
async fn sessions_do_not_share_words() {
    let h = harness(Duration::from_millis(100));
    h.classifier.set(2, 0.9);
    h.service.predict(request("s1", "a1")).await.unwrap();
    h.service.predict(request("s1", "a2")).await.unwrap();

    let other = h.service.predict(request("s2", "b1")).await.unwrap();
    assert_eq!(other.confirmation.event, FrameEvent::NewPendingLetter);
    assert_eq!(other.confirmation.word, "");
    assert_eq!(h.sessions.snapshot("s1").await.unwrap().current_word, "C");
}

#[tokio::test]
async fn low_confidence_is_returned_but_not_confirmed() {
    let h = harness(Duration::from_millis(100));
    h.classifier.set(0, 0.2);
    for payload in ["w1", "w2", "w3"] {
        let response = h.service.predict(request("s1", payload)).await.unwrap();
        assert_eq!(response.prediction.letter, Some('A'));
        assert_eq!(response.confirmation.event, FrameEvent::BelowThreshold);
    }
    assert_eq!(h.sessions.snapshot("s1").await.unwrap().current_word, "");
}

#[tokio::test]
async fn identical_frames_within_ttl_are_served_from_cache() {
    let h = harness(Duration::from_secs(60));
    h.classifier.set(0, 0.9);

    let first = h.service.predict(request("s1", "same")).await.unwrap();
    let second = h.service.predict(request("s1", "same")).await.unwrap();
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.prediction, second.prediction);
    assert_eq!(h.detector.calls.load(Ordering::SeqCst), 1);

    // The cache short-circuits compute only; the session still advanced.
    assert_eq!(second.confirmation.event, FrameEvent::LetterConfirmed);

    let view = h.metrics.snapshot();
    assert_eq!(view.cache_hits, 1);
    assert_eq!(view.cache_misses, 1);
}

#[tokio::test]
async fn hand_loss_clears_pending_letter() {
    let h = harness(Duration::from_millis(100));
    h.sessions
        .update_settings(
            "s1",
            serde_json::json!({"letter_delay_ms": 60_000}).as_object().unwrap(),
        )
        .await
        .unwrap();
    h.classifier.set(4, 0.9);
    let held = h.service.predict(request("s1", "hold")).await.unwrap();
    assert_eq!(held.confirmation.pending_letter, Some('E'));

    let events: Vec<FrameEvent> = {
        let mut events = Vec::new();
        for n in 0..3 {
            let r = h
                .service
                .predict(request("s1", &format!("empty-{n}")))
                .await
                .unwrap();
            assert!(!r.hand_detected);
            events.push(r.confirmation.event);
        }
        events
    };
    assert_eq!(
        events,
        vec![FrameEvent::NoHand, FrameEvent::NoHand, FrameEvent::PendingCleared]
    );
}

#[tokio::test]
async fn completed_word_freezes_until_cleared() {
    let h = harness(Duration::from_millis(100));
    h.classifier.set(7, 0.9);
    h.service.predict(request("s1", "h1")).await.unwrap();
    h.service.predict(request("s1", "h2")).await.unwrap();

    let done = h
        .sessions
        .apply_command("s1", WordCommand::CompleteWord)
        .await
        .unwrap();
    assert!(done.applied);

    h.classifier.set(8, 0.9);
    h.service.predict(request("s1", "i1")).await.unwrap();
    let ignored = h.service.predict(request("s1", "i2")).await.unwrap();
    assert_eq!(ignored.confirmation.word, "H");
    assert!(!ignored.confirmation.formation_active);

    let state = h.sessions.snapshot("s1").await.unwrap();
    assert_eq!(state.word_history.back().unwrap().word, "H");

    h.sessions
        .apply_command("s1", WordCommand::AddSpace)
        .await
        .unwrap();
    h.service.predict(request("s1", "i3")).await.unwrap();
    let resumed = h.service.predict(request("s1", "i4")).await.unwrap();
    assert_eq!(resumed.confirmation.word, "H I");
}

#[tokio::test]
async fn missing_frame_is_a_client_error_and_not_counted() {
    let h = harness(Duration::from_millis(100));
    let err = h
        .service
        .predict(PredictRequest {
            session_id: Some("s1".into()),
            origin: None,
            frame: None,
        })
        .await
        .unwrap_err();
    assert!(err.is_input());

    let bad = h
        .service
        .predict(PredictRequest {
            frame: Some("%%%".into()),
            ..request("s1", "")
        })
        .await
        .unwrap_err();
    assert!(bad.is_input());
    assert_eq!(h.metrics.snapshot().total_requests, 0);
}

#[tokio::test]
async fn uninitialized_services_are_unavailable_and_counted() {
    let store = Arc::new(SessionStore::new(
        None,
        Arc::new(MemorySessionBackend::new()),
        SessionStoreOptions::default(),
    ));
    let metrics = Arc::new(GlobalMetrics::new(Duration::from_secs(3600)));
    let service = Arc::new(RecognitionService::new(
        None,
        None,
        store,
        Arc::new(ConfirmationRegistry::new(Duration::from_secs(3))),
        RequestCache::new(Duration::from_millis(100), 50),
        metrics.clone(),
        RecognitionOptions::default(),
    ));

    let err = service.predict(request("s1", "x")).await.unwrap_err();
    assert!(err.is_unavailable());
    assert!(service.labels().unwrap_err().is_unavailable());
    assert_eq!(service.health().status, "unhealthy");

    let view = metrics.snapshot();
    assert_eq!(view.failed_requests, 1);
    assert_eq!(view.error_rate, 100.0);
}

#[tokio::test]
async fn collaborator_panic_is_contained() {
    let h = harness(Duration::from_millis(100));
    let err = h.service.predict(request("s1", "panic")).await.unwrap_err();
    assert!(matches!(err, SignDeskError::Internal(_)));

    // The service keeps working for the next request.
    h.classifier.set(0, 0.9);
    assert!(h.service.predict(request("s1", "ok")).await.is_ok());
    assert_eq!(h.metrics.snapshot().failed_requests, 1);
}

#[tokio::test]
async fn admission_control_rejects_with_retry_hint() {
    let store = Arc::new(SessionStore::new(
        None,
        Arc::new(MemorySessionBackend::new()),
        SessionStoreOptions::default(),
    ));
    let classifier: Arc<dyn Classifier> = Arc::new(ScriptedClassifier::new());
    let detector: Arc<dyn HandDetector> = Arc::new(StubDetector {
        calls: AtomicUsize::new(0),
    });
    let metrics = Arc::new(GlobalMetrics::new(Duration::from_secs(3600)));
    let service = Arc::new(
        RecognitionService::new(
            Some(classifier),
            Some(detector),
            store,
            Arc::new(ConfirmationRegistry::new(Duration::from_secs(3))),
            RequestCache::new(Duration::from_millis(100), 50),
            metrics.clone(),
            RecognitionOptions::default(),
        )
        .with_admission(
            RateLimiter::new(2, Duration::from_secs(60)),
            Throttle::new(Duration::ZERO),
        ),
    );

    service.predict(request("s1", "r1")).await.unwrap();
    service.predict(request("s1", "r2")).await.unwrap();
    let err = service.predict(request("s1", "r3")).await.unwrap_err();
    assert!(matches!(err, SignDeskError::RateLimited { .. }));
    assert!(err.retry_after_ms().unwrap() > 0);

    // Another session has its own budget.
    service.predict(request("s2", "r4")).await.unwrap();
    // Rejections are not pipeline failures.
    assert_eq!(metrics.snapshot().failed_requests, 0);
}
