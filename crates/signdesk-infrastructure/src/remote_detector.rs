//! Hand detector client for an HTTP landmark sidecar.
//!
//! The encoded frame is POSTed as `application/octet-stream`; the sidecar
//! answers `{"hand": null}` or `{"hand": {"landmarks": [...], ...}}`.

use async_trait::async_trait;
use serde::Deserialize;
use signdesk_core::error::{Result, SignDeskError};
use signdesk_core::recognition::{DetectedHand, HandDetector};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct DetectorResponse {
    #[serde(default)]
    hand: Option<DetectedHand>,
}

#[derive(Debug, Clone)]
pub struct RemoteHandDetector {
    client: reqwest::Client,
    url: String,
}

impl RemoteHandDetector {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SignDeskError::config(format!("Cannot build detector client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HandDetector for RemoteHandDetector {
    async fn detect(&self, image: &[u8]) -> Result<Option<DetectedHand>> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| SignDeskError::unavailable(format!("Hand detector unreachable: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            // The sidecar could not decode the frame.
            return Err(SignDeskError::input(format!(
                "Hand detector rejected the frame ({})",
                status
            )));
        }
        if !status.is_success() {
            return Err(SignDeskError::detector(format!(
                "Hand detector returned {}",
                status
            )));
        }

        let body: DetectorResponse = response
            .json()
            .await
            .map_err(|e| SignDeskError::detector(format!("Invalid detector response: {}", e)))?;
        Ok(body.hand.filter(|hand| !hand.landmarks.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Bytes;
    use axum::http::StatusCode;
    use axum::routing::post;
    use serde_json::{Value, json};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/detect", addr)
    }

    async fn fake_detector(body: Bytes) -> (StatusCode, axum::Json<Value>) {
        match body.as_ref() {
            b"hand" => (
                StatusCode::OK,
                axum::Json(json!({
                    "hand": {
                        "landmarks": [{"x": 0.2, "y": 0.3}, {"x": 0.4, "y": 0.6, "z": 0.1}],
                        "image_width": 640,
                        "image_height": 480
                    }
                })),
            ),
            b"empty" => (StatusCode::OK, axum::Json(json!({"hand": null}))),
            _ => (StatusCode::BAD_REQUEST, axum::Json(json!({"error": "bad image"}))),
        }
    }

    #[tokio::test]
    async fn test_detects_hand_and_absence() {
        let url = serve(Router::new().route("/detect", post(fake_detector))).await;
        let detector = RemoteHandDetector::new(url, Duration::from_secs(2)).unwrap();

        let hand = detector.detect(b"hand").await.unwrap().unwrap();
        assert_eq!(hand.landmarks.len(), 2);
        assert_eq!(hand.image_width, Some(640));
        assert_eq!(hand.landmarks[1].z, 0.1);

        assert!(detector.detect(b"empty").await.unwrap().is_none());
        assert!(detector.detect(b"junk").await.unwrap_err().is_input());
    }

    #[tokio::test]
    async fn test_unreachable_sidecar_is_unavailable() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let detector =
            RemoteHandDetector::new(format!("http://{}/detect", addr), Duration::from_millis(500))
                .unwrap();
        let err = detector.detect(b"hand").await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
