//! HTTP клиент сервиса синтеза речи

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use crate::config::SynthesisConfig;
use crate::error::{KaraokeError, Result};
use super::{SpeechSynthesizer, SynthesisRequest};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Синтез через HTTP эндпоинт, принимающий `{text, speed, voiceGender}`
pub struct HttpSynthesizer {
    client: Client,
    endpoint: String,
}

impl HttpSynthesizer {
    pub fn new(config: &SynthesisConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(KaraokeError::Configuration(
                "Synthesis endpoint is required".to_string(),
            ));
        }
        Ok(Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes> {
        log::info!(
            "Sending synthesis request ({} chars, speed {}, voice {})",
            request.text.chars().count(),
            request.speed,
            request.voice_gender.as_str()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(ErrorBody { error: Some(error) }) => error,
                _ => "Audio unavailable".to_string(),
            };
            log::error!("Synthesis service error (status {}): {}", status, message);
            return Err(KaraokeError::Synthesis(format!("{} (status {})", message, status)));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            log::error!("Synthesis service returned an empty payload");
            return Err(KaraokeError::Synthesis("empty audio payload".to_string()));
        }

        log::debug!("Received {} bytes of synthesized audio", bytes.len());
        Ok(bytes)
    }
}
