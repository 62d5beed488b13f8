//! Стратегии поиска аудио для секции молитвы
//!
//! Соглашения об именах файлов:
//! `{prayers_dir}/{prayerId}/{sectionId}{suffix}.mp3` для секций и
//! `{prayers_dir}/{prayerId}/{prayerId}-sidduraudio.mp3` для записи целой молитвы.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use log::debug;
use crate::config::{Pronunciation, SynthesisConfig, VoiceGender};
use crate::error::{KaraokeError, Result};
use crate::playback::{AudioHandle, AudioTimeRange, SynthesizedAudio};
use crate::tts::{cache_key, SpeechSynthesizer, SynthesisCache, SynthesisRequest};
use super::assets::AssetStore;
use super::registry::{AudioKind, AudioRegistry};
use super::{ResolvedSource, SourceRequest, SourceResolver};

fn join_dir(dir: &str, rest: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", dir, rest)
    }
}

/// Предзаписанный файл секции с учетом стиля произношения
pub struct SectionFileResolver {
    store: Arc<dyn AssetStore>,
    prayers_dir: String,
    pronunciation: Pronunciation,
}

impl SectionFileResolver {
    pub fn new(store: Arc<dyn AssetStore>, prayers_dir: &str, pronunciation: Pronunciation) -> Self {
        Self {
            store,
            prayers_dir: prayers_dir.to_string(),
            pronunciation,
        }
    }

    fn section_path(&self, prayer_id: &str, section_id: &str, suffix: &str) -> String {
        join_dir(&self.prayers_dir, &format!("{}/{}{}.mp3", prayer_id, section_id, suffix))
    }
}

#[async_trait]
impl SourceResolver for SectionFileResolver {
    fn name(&self) -> &str {
        "section-file"
    }

    async fn resolve(&self, request: &SourceRequest) -> Result<Option<ResolvedSource>> {
        let (Some(prayer_id), Some(section_id)) = (&request.prayer_id, &request.section_id) else {
            return Ok(None);
        };

        let suffix = self.pronunciation.file_suffix();
        let styled = self.section_path(prayer_id, section_id, suffix);
        if self.store.exists(&styled).await {
            return Ok(Some(ResolvedSource::new(self.store.handle(&styled), self.name())));
        }

        // Стилизованного варианта нет, пробуем файл по умолчанию
        if !suffix.is_empty() {
            let fallback = self.section_path(prayer_id, section_id, "");
            if self.store.exists(&fallback).await {
                debug!("No {:?} variant of {}, using default recording", self.pronunciation, section_id);
                return Ok(Some(ResolvedSource::new(self.store.handle(&fallback), self.name())));
            }
        }

        Ok(None)
    }
}

/// Запись целой молитвы, при известном диапазоне проигрывается только секция
pub struct FullRecordingResolver {
    store: Arc<dyn AssetStore>,
    prayers_dir: String,
    section_ranges: HashMap<String, AudioTimeRange>,
}

impl FullRecordingResolver {
    pub fn new(store: Arc<dyn AssetStore>, prayers_dir: &str) -> Self {
        Self {
            store,
            prayers_dir: prayers_dir.to_string(),
            section_ranges: HashMap::new(),
        }
    }

    pub fn with_ranges(mut self, ranges: HashMap<String, AudioTimeRange>) -> Self {
        self.section_ranges = ranges;
        self
    }
}

#[async_trait]
impl SourceResolver for FullRecordingResolver {
    fn name(&self) -> &str {
        "full-recording"
    }

    async fn resolve(&self, request: &SourceRequest) -> Result<Option<ResolvedSource>> {
        let Some(prayer_id) = &request.prayer_id else {
            return Ok(None);
        };

        let path = join_dir(&self.prayers_dir, &format!("{0}/{0}-sidduraudio.mp3", prayer_id));
        if !self.store.exists(&path).await {
            return Ok(None);
        }

        let mut source = ResolvedSource::new(self.store.handle(&path), self.name());
        if let Some(range) = request
            .section_id
            .as_deref()
            .and_then(|id| self.section_ranges.get(id))
        {
            source = source.with_range(*range);
        }
        Ok(Some(source))
    }
}

/// Запись выбранного пользователем источника из реестра
pub struct RegistryResolver {
    registry: Arc<AudioRegistry>,
    store: Arc<dyn AssetStore>,
}

impl RegistryResolver {
    pub fn new(registry: Arc<AudioRegistry>, store: Arc<dyn AssetStore>) -> Self {
        Self { registry, store }
    }
}

#[async_trait]
impl SourceResolver for RegistryResolver {
    fn name(&self) -> &str {
        "registry"
    }

    async fn resolve(&self, request: &SourceRequest) -> Result<Option<ResolvedSource>> {
        let (Some(prayer_id), Some(preferred)) = (&request.prayer_id, request.preferred_source) else {
            return Ok(None);
        };
        let Some(entry) = self.registry.audio_by_source(prayer_id, preferred) else {
            return Ok(None);
        };
        if !self.store.exists(&entry.path).await {
            debug!("Registry entry {} for {} is missing on disk", entry.path, prayer_id);
            return Ok(None);
        }

        let mut source = ResolvedSource::new(self.store.handle(&entry.path), self.name());
        if entry.kind == AudioKind::FullPrayer {
            if let Some(range) = request
                .section_id
                .as_deref()
                .and_then(|id| self.registry.section_range(id))
            {
                source = source.with_range(range);
            }
        }
        Ok(Some(source))
    }
}

/// Синтез речи по тексту секции; последний уровень цепочки
pub struct SynthesisResolver {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    cache: Arc<dyn SynthesisCache>,
    voice: VoiceGender,
    max_text_chars: usize,
}

impl SynthesisResolver {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        cache: Arc<dyn SynthesisCache>,
        config: &SynthesisConfig,
    ) -> Self {
        Self {
            synthesizer,
            cache,
            voice: config.voice_gender,
            max_text_chars: config.max_text_chars,
        }
    }
}

#[async_trait]
impl SourceResolver for SynthesisResolver {
    fn name(&self) -> &str {
        "synthesis"
    }

    async fn resolve(&self, request: &SourceRequest) -> Result<Option<ResolvedSource>> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(KaraokeError::InvalidInput("Text required for synthesis".to_string()));
        }
        let chars = text.chars().count();
        if chars > self.max_text_chars {
            return Err(KaraokeError::InvalidInput(format!(
                "Text too long for synthesis: {} chars (max {})",
                chars, self.max_text_chars
            )));
        }

        let speed = request.speed.unwrap_or(1.0);
        let key = cache_key(self.voice, speed, text);
        self.cache.evict_expired();

        let bytes = match self.cache.get(&key) {
            Some(bytes) => {
                debug!("Synthesis cache hit for {}", request.describe());
                bytes
            }
            None => {
                let bytes = self
                    .synthesizer
                    .synthesize(&SynthesisRequest {
                        text: text.to_string(),
                        speed,
                        voice_gender: self.voice,
                    })
                    .await?;
                self.cache.put(&key, bytes.clone());
                bytes
            }
        };

        let audio = SynthesizedAudio::from_bytes(&bytes)?;
        let mut source = ResolvedSource::new(AudioHandle::Synthesized(audio), self.name());
        source.speed_applied = true;
        Ok(Some(source))
    }
}
