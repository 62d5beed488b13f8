//! Модуль для работы с сервисом синтеза речи
//!
//! Синтез используется как последний уровень цепочки источников, когда
//! предзаписанного аудио нет. Сам сервис внешний и может отказать.

pub mod cache;
pub mod client;

pub use cache::{cache_key, MemorySynthesisCache, NoCache, SynthesisCache};
pub use client::HttpSynthesizer;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use crate::config::VoiceGender;
use crate::error::Result;

/// Запрос на синтез
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    pub text: String,
    pub speed: f32,
    pub voice_gender: VoiceGender,
}

/// Сервис синтеза речи: текст на входе, аудио на выходе
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes>;
}
