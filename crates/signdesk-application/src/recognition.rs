//! The frame-to-letter request pipeline.
//!
//! admit → cache check → decode → detect → extract → classify → per-session
//! confirmation → session record → metrics.

use crate::confirmation_registry::{ConfirmationRegistry, FrameEvent};
use crate::metrics::GlobalMetrics;
use crate::rate_limit::{RateLimiter, Throttle, UNKNOWN_IDENTITY, resolve_identity};
use crate::request_cache::{Fingerprint, RequestCache};
use crate::session_store::SessionStore;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::Serialize;
use signdesk_core::error::{Result, SignDeskError};
use signdesk_core::recognition::{
    BoundingBox, Classifier, FeatureExtractor, HandDetector, LabelMap, Observation, Point,
    Prediction,
};
use signdesk_core::session::PredictionRecord;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

#[derive(Debug, Clone)]
pub struct RecognitionOptions {
    pub prediction_cooldown: Duration,
    pub hand_loss_frames: u32,
    pub default_confidence_threshold: f64,
    pub default_confirmation_delay: Duration,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            prediction_cooldown: Duration::from_millis(500),
            hand_loss_frames: 3,
            default_confidence_threshold: 0.5,
            default_confirmation_delay: Duration::from_secs(3),
        }
    }
}

/// One classification request as received from a client.
#[derive(Debug, Clone, Default)]
pub struct PredictRequest {
    /// `X-Session-ID` header, if sent.
    pub session_id: Option<String>,
    /// Peer address, if known.
    pub origin: Option<String>,
    /// Base64 image, optionally as a data URL.
    pub frame: Option<String>,
}

/// Frame-level analysis. This is what the request cache holds; it carries
/// nothing session specific.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FrameAnalysis {
    pub hand_detected: bool,
    pub prediction: Prediction,
    pub landmarks: Option<Vec<Point>>,
    pub bounding_box: Option<BoundingBox>,
    pub error: Option<String>,
}

impl FrameAnalysis {
    fn no_hand() -> Self {
        Self {
            hand_detected: false,
            prediction: Prediction::default(),
            landmarks: None,
            bounding_box: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfirmationView {
    pub event: FrameEvent,
    pub pending_letter: Option<char>,
    pub word: String,
    pub formation_active: bool,
    pub hold_progress: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub hand_detected: bool,
    pub prediction: Prediction,
    pub landmarks: Option<Vec<Point>>,
    pub bounding_box: Option<BoundingBox>,
    pub error: Option<String>,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub cached: bool,
    pub confirmation: ConfirmationView,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthConfig {
    pub confidence_threshold: f64,
    /// Seconds.
    pub letter_confirmation_delay: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub model_loaded: bool,
    pub detector_ready: bool,
    pub timestamp: DateTime<Utc>,
    pub config: HealthConfig,
    pub message: &'static str,
}

pub struct RecognitionService {
    classifier: Option<Arc<dyn Classifier>>,
    detector: Option<Arc<dyn HandDetector>>,
    labels: LabelMap,
    extractor: FeatureExtractor,
    sessions: Arc<SessionStore>,
    registry: Arc<ConfirmationRegistry>,
    cache: RequestCache<FrameAnalysis>,
    rate_limiter: Option<RateLimiter>,
    throttle: Option<Throttle>,
    metrics: Arc<GlobalMetrics>,
    options: RecognitionOptions,
}

impl RecognitionService {
    pub fn new(
        classifier: Option<Arc<dyn Classifier>>,
        detector: Option<Arc<dyn HandDetector>>,
        sessions: Arc<SessionStore>,
        registry: Arc<ConfirmationRegistry>,
        cache: RequestCache<FrameAnalysis>,
        metrics: Arc<GlobalMetrics>,
        options: RecognitionOptions,
    ) -> Self {
        Self {
            classifier,
            detector,
            labels: LabelMap::latin(),
            extractor: FeatureExtractor,
            sessions,
            registry,
            cache,
            rate_limiter: None,
            throttle: None,
            metrics,
            options,
        }
    }

    /// Enables admission control in front of the pipeline.
    pub fn with_admission(mut self, rate_limiter: RateLimiter, throttle: Throttle) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self.throttle = Some(throttle);
        self
    }

    pub fn model_loaded(&self) -> bool {
        self.classifier.as_ref().is_some_and(|c| c.is_loaded())
    }

    pub fn detector_ready(&self) -> bool {
        self.detector.as_ref().is_some_and(|d| d.is_ready())
    }

    pub fn health(&self) -> HealthReport {
        let model_loaded = self.model_loaded();
        let detector_ready = self.detector_ready();
        let healthy = model_loaded && detector_ready;
        HealthReport {
            status: if healthy { "healthy" } else { "unhealthy" },
            model_loaded,
            detector_ready,
            timestamp: Utc::now(),
            config: HealthConfig {
                confidence_threshold: self.options.default_confidence_threshold,
                letter_confirmation_delay: self.options.default_confirmation_delay.as_secs_f64(),
            },
            message: match (model_loaded, detector_ready) {
                (true, true) => "All services ready",
                (false, _) => "Model not loaded - prediction will not work",
                (true, false) => "Hand detector not configured - prediction will not work",
            },
        }
    }

    /// Index → letter table; unavailable until a model is loaded.
    pub fn labels(&self) -> Result<BTreeMap<usize, char>> {
        if !self.model_loaded() {
            return Err(SignDeskError::unavailable("Predictor not initialized"));
        }
        Ok(self.labels.entries())
    }

    pub fn metrics(&self) -> &GlobalMetrics {
        &self.metrics
    }

    /// Runs one frame through the pipeline.
    ///
    /// Admission rejections and client errors are not counted in the
    /// metrics. The pipeline itself runs in its own task, so a panic in a
    /// collaborator becomes an `Internal` error for this request only.
    pub async fn predict(self: &Arc<Self>, request: PredictRequest) -> Result<PredictResponse> {
        let started = Instant::now();
        let session_id = request
            .session_id
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string());

        self.admit(&request)?;

        let span = tracing::info_span!(
            "predict",
            request_id = %uuid::Uuid::new_v4(),
            session_id = %session_id
        );
        let this = Arc::clone(self);
        let task_session = session_id.clone();
        let handle = tokio::spawn(
            async move { this.run_pipeline(task_session, request, started).await }.instrument(span),
        );
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Prediction task failed");
                Err(SignDeskError::internal(format!("Prediction task failed: {}", e)))
            }
        };

        let elapsed = started.elapsed();
        match &result {
            Ok(response) => self
                .metrics
                .record(&session_id, true, elapsed, response.cached),
            Err(e) if e.is_input() => {}
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Prediction failed");
                self.metrics.record(&session_id, false, elapsed, false);
            }
        }
        result
    }

    fn admit(&self, request: &PredictRequest) -> Result<()> {
        let origin = request.origin.as_deref().unwrap_or(UNKNOWN_IDENTITY);
        if let Some(throttle) = &self.throttle {
            throttle.check(origin)?;
        }
        if let Some(limiter) = &self.rate_limiter {
            let identity = resolve_identity(request.session_id.as_deref(), request.origin.as_deref());
            if let Err(e) = limiter.check(&identity) {
                tracing::debug!(identity = %identity, "Rate limit exceeded");
                return Err(e);
            }
        }
        Ok(())
    }

    async fn run_pipeline(
        &self,
        session_id: String,
        request: PredictRequest,
        started: Instant,
    ) -> Result<PredictResponse> {
        let (classifier, detector) = match (&self.classifier, &self.detector) {
            (Some(c), Some(d)) if c.is_loaded() && d.is_ready() => (c.clone(), d.clone()),
            _ => return Err(SignDeskError::unavailable("Services not initialized")),
        };

        let frame = request
            .frame
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| SignDeskError::input("Frame data missing in request"))?;

        let fingerprint = Fingerprint::of(frame.as_bytes());
        let (analysis, cached) = match self.cache.lookup(&fingerprint) {
            Some(analysis) => {
                tracing::debug!(fingerprint = %fingerprint, "Cache hit");
                (analysis, true)
            }
            None => {
                let analysis = self.analyze(frame, classifier.as_ref(), detector.as_ref()).await?;
                self.cache.store(fingerprint, analysis.clone());
                (analysis, false)
            }
        };

        let confirmation = self.confirm(&session_id, &analysis, started).await?;

        Ok(PredictResponse {
            success: true,
            hand_detected: analysis.hand_detected,
            prediction: analysis.prediction,
            landmarks: analysis.landmarks,
            bounding_box: analysis.bounding_box,
            error: analysis.error,
            session_id,
            timestamp: Utc::now(),
            cached,
            confirmation,
        })
    }

    async fn analyze(
        &self,
        frame: &str,
        classifier: &dyn Classifier,
        detector: &dyn HandDetector,
    ) -> Result<FrameAnalysis> {
        let image = decode_frame(frame)?;
        let Some(hand) = detector.detect(&image).await? else {
            return Ok(FrameAnalysis::no_hand());
        };

        let features = self.extractor.extract(&hand.landmarks)?;
        let (label_index, confidence) = classifier.predict(&features)?;
        let letter = self.labels.letter(label_index);
        let error = match letter {
            Some(_) => None,
            None => Some(format!("Unknown label index {}", label_index)),
        };

        Ok(FrameAnalysis {
            hand_detected: true,
            prediction: Prediction {
                letter,
                confidence,
                label_index: Some(label_index),
            },
            landmarks: Some(hand.landmarks.iter().map(Point::from).collect()),
            bounding_box: hand.bounding_box(),
            error,
        })
    }

    /// Feeds the analysis to the session's engine and records the outcome.
    ///
    /// The session's slot lock is held until the store is updated, so the
    /// mirrored word never lags behind the engine.
    async fn confirm(
        &self,
        session_id: &str,
        analysis: &FrameAnalysis,
        started: Instant,
    ) -> Result<ConfirmationView> {
        let state = self.sessions.get(session_id).await?;
        let threshold = state
            .settings
            .effective_confidence_threshold(self.options.default_confidence_threshold);

        let slot = self.registry.slot(&state).await;
        let mut slot = slot.lock().await;
        let now = Instant::now();

        let event = match (analysis.hand_detected, analysis.prediction.letter) {
            (false, _) => slot.hand_missing(self.options.hand_loss_frames),
            (true, Some(letter)) => {
                let observation = Observation::new(letter, analysis.prediction.confidence, now);
                slot.offer(&observation, threshold, self.options.prediction_cooldown)
            }
            (true, None) => FrameEvent::NoChange,
        };
        if event == FrameEvent::LetterConfirmed {
            tracing::info!(session_id, word = %slot.engine().word(), "Letter confirmed");
        }

        let engine = slot.engine();
        let word = engine.word().text();
        let formation_active = engine.formation().is_active();
        let record = analysis.prediction.letter.map(|letter| PredictionRecord {
            letter,
            confidence: analysis.prediction.confidence,
            recorded_at: Utc::now(),
        });
        let elapsed = started.elapsed();

        let mirror = word.clone();
        self.sessions
            .modify(session_id, move |s| {
                if let Some(record) = record {
                    s.push_prediction(record);
                }
                s.current_word = mirror;
                s.formation_active = formation_active;
                s.record_request(elapsed);
                Ok(())
            })
            .await?;

        Ok(ConfirmationView {
            event,
            pending_letter: engine.pending_letter(),
            word,
            formation_active,
            hold_progress: engine.hold_progress(now),
        })
    }
}

/// Decodes a base64 frame, accepting a `data:<mime>;base64,` prefix.
pub fn decode_frame(frame: &str) -> Result<Vec<u8>> {
    let payload = match frame.split_once(',') {
        Some((_, data)) => data,
        None => frame,
    };
    let bytes = STANDARD.decode(payload.trim())?;
    if bytes.is_empty() {
        return Err(SignDeskError::input("Failed to decode image: empty payload"));
    }
    Ok(bytes)
}
