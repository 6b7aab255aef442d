//! Vertex AI Imagen predict API

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::output::RawImage;

use super::auth::AccessToken;

/// Body of a `:predict` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<Instance>,
    pub parameters: Parameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instance {
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    pub sample_count: i64,
    pub aspect_ratio: String,
    pub sample_image_size: String,
    pub include_rai_reason: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    #[serde(default)]
    pub bytes_base64_encoded: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub rai_filtered_reason: Option<String>,
}

/// What one prediction amounts to
#[derive(Debug, PartialEq, Eq)]
pub enum PredictionOutcome {
    Image(RawImage),
    /// Filtered upstream, with the reason given
    Filtered(String),
}

impl Prediction {
    pub fn into_outcome(self) -> Result<PredictionOutcome> {
        match self.bytes_base64_encoded.filter(|b| !b.is_empty()) {
            Some(encoded) => {
                let bytes = BASE64.decode(encoded.trim()).map_err(|e| {
                    Error::ImageGenerationError(format!("invalid image payload: {}", e))
                })?;
                Ok(PredictionOutcome::Image(RawImage::new(bytes, self.mime_type)))
            }
            None => Ok(PredictionOutcome::Filtered(
                self.rai_filtered_reason
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "no image data returned".to_string()),
            )),
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Authenticated handle to the Vertex AI endpoint of one project/location
#[derive(Debug, Clone)]
pub struct VertexClient {
    http: reqwest::Client,
    token: AccessToken,
    project_id: String,
    location: String,
    endpoint: String,
}

impl VertexClient {
    pub fn new(
        http: reqwest::Client,
        token: AccessToken,
        project_id: impl Into<String>,
        location: impl Into<String>,
        endpoint: Option<&str>,
    ) -> Self {
        let location = location.into();
        let endpoint = endpoint
            .map(|e| e.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", location));
        Self {
            http,
            token,
            project_id: project_id.into(),
            location,
            endpoint,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.token.is_fresh()
    }

    pub fn predict_url(&self, model: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            self.endpoint, self.project_id, self.location, model
        )
    }

    pub async fn predict(&self, model: &str, request: &PredictRequest) -> Result<PredictResponse> {
        let url = self.predict_url(model);

        debug!(model = %model, sample_count = request.parameters.sample_count, "Sending predict request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.token.secret())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(match status.as_u16() {
                401 | 403 => Error::InvalidCredential(format!("{} ({})", message, status)),
                _ => Error::ImageGenerationError(format!("HTTP {}: {}", status, message)),
            });
        }

        response.json().await.map_err(|e| {
            Error::ImageGenerationError(format!("Failed to parse response: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_request_shape() {
        let request = PredictRequest {
            instances: vec![Instance {
                prompt: "a lighthouse".to_string(),
            }],
            parameters: Parameters {
                sample_count: 2,
                aspect_ratio: "16:9".to_string(),
                sample_image_size: "2K".to_string(),
                include_rai_reason: true,
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "instances": [{"prompt": "a lighthouse"}],
                "parameters": {
                    "sampleCount": 2,
                    "aspectRatio": "16:9",
                    "sampleImageSize": "2K",
                    "includeRaiReason": true
                }
            })
        );
    }

    #[test]
    fn test_prediction_outcomes() {
        let image: Prediction = serde_json::from_value(serde_json::json!({
            "bytesBase64Encoded": "iVBORw==",
            "mimeType": "image/png"
        }))
        .unwrap();
        assert_eq!(
            image.into_outcome().unwrap(),
            PredictionOutcome::Image(RawImage::new(
                vec![0x89, 0x50, 0x4E, 0x47],
                Some("image/png".to_string())
            ))
        );

        let filtered: Prediction = serde_json::from_value(serde_json::json!({
            "raiFilteredReason": "blocked by safety filter"
        }))
        .unwrap();
        assert_eq!(
            filtered.into_outcome().unwrap(),
            PredictionOutcome::Filtered("blocked by safety filter".to_string())
        );

        let empty: Prediction = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(
            empty.into_outcome().unwrap(),
            PredictionOutcome::Filtered(_)
        ));
    }

    #[test]
    fn test_predict_url() {
        let token = AccessToken::new("t", Duration::from_secs(3600));
        let client = VertexClient::new(reqwest::Client::new(), token.clone(), "proj", "us-central1", None);
        assert_eq!(
            client.predict_url("imagen-4.0-generate-001"),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/proj/locations/us-central1/publishers/google/models/imagen-4.0-generate-001:predict"
        );

        let client = VertexClient::new(
            reqwest::Client::new(),
            token,
            "proj",
            "europe-west4",
            Some("http://127.0.0.1:8080/"),
        );
        assert!(client.predict_url("m").starts_with("http://127.0.0.1:8080/v1/projects/proj/"));
    }
}
