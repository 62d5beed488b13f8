//! Модуль поиска источника аудио
//!
//! Источник выбирается упорядоченным списком стратегий: первая стратегия,
//! нашедшая аудио, побеждает. Контроллер воспроизведения не знает, сколько
//! уровней в цепочке и как они устроены.

pub mod assets;
pub mod registry;
pub mod resolvers;

pub use assets::{AssetStore, HttpAssetStore, LocalAssetStore};
pub use registry::{AudioKind, AudioRegistry, AudioSourceId, PrayerAudioEntry};
pub use resolvers::{FullRecordingResolver, RegistryResolver, SectionFileResolver, SynthesisResolver};

use std::sync::Arc;
use async_trait::async_trait;
use log::{debug, info, warn};
use crate::config::KaraokeConfig;
use crate::error::{KaraokeError, Result};
use crate::playback::{AudioHandle, AudioTimeRange};
use crate::tts::{SpeechSynthesizer, SynthesisCache};

/// Запрос на воспроизведение секции молитвы
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRequest {
    pub prayer_id: Option<String>,
    pub section_id: Option<String>,
    /// Текст секции; нужен для синтеза
    pub text: String,
    /// Скорость; без нее берется значение из конфигурации
    pub speed: Option<f32>,
    /// Предпочитаемая запись из реестра
    pub preferred_source: Option<AudioSourceId>,
}

impl SourceRequest {
    pub fn section(prayer_id: impl Into<String>, section_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            prayer_id: Some(prayer_id.into()),
            section_id: Some(section_id.into()),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_source(mut self, source: AudioSourceId) -> Self {
        self.preferred_source = Some(source);
        self
    }

    /// Строка для логов
    pub fn describe(&self) -> String {
        match (&self.prayer_id, &self.section_id) {
            (Some(p), Some(s)) => format!("{}/{}", p, s),
            (Some(p), None) => p.clone(),
            (None, Some(s)) => s.clone(),
            (None, None) => format!("text ({} chars)", self.text.chars().count()),
        }
    }
}

/// Найденный источник
#[derive(Debug)]
pub struct ResolvedSource {
    pub handle: AudioHandle,
    pub time_range: Option<AudioTimeRange>,
    /// Имя стратегии, нашедшей источник
    pub tier: String,
    /// Скорость уже заложена в само аудио (синтез)
    pub speed_applied: bool,
}

impl ResolvedSource {
    pub fn new(handle: AudioHandle, tier: impl Into<String>) -> Self {
        Self {
            handle,
            time_range: None,
            tier: tier.into(),
            speed_applied: false,
        }
    }

    pub fn with_range(mut self, range: AudioTimeRange) -> Self {
        self.time_range = Some(range);
        self
    }
}

/// Стратегия поиска источника
#[async_trait]
pub trait SourceResolver: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` означает "не найдено, пробуйте дальше"
    async fn resolve(&self, request: &SourceRequest) -> Result<Option<ResolvedSource>>;
}

/// Цепочка стратегий: побеждает первая успешная
#[derive(Default)]
pub struct FallbackChain {
    tiers: Vec<Arc<dyn SourceResolver>>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tier(mut self, tier: Arc<dyn SourceResolver>) -> Self {
        self.tiers.push(tier);
        self
    }

    pub fn push(&mut self, tier: Arc<dyn SourceResolver>) {
        self.tiers.push(tier);
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Найти источник или вернуть `ResourceUnavailable`
    pub async fn resolve_first(&self, request: &SourceRequest) -> Result<ResolvedSource> {
        self.resolve(request).await?.ok_or_else(|| {
            KaraokeError::ResourceUnavailable(format!("no audio source for {}", request.describe()))
        })
    }
}

#[async_trait]
impl SourceResolver for FallbackChain {
    fn name(&self) -> &str {
        "fallback-chain"
    }

    async fn resolve(&self, request: &SourceRequest) -> Result<Option<ResolvedSource>> {
        let mut last_error: Option<KaraokeError> = None;

        for tier in &self.tiers {
            match tier.resolve(request).await {
                Ok(Some(source)) => {
                    info!(
                        "Audio for {} resolved by {}: {}",
                        request.describe(),
                        tier.name(),
                        source.handle.describe()
                    );
                    return Ok(Some(source));
                }
                Ok(None) => debug!("{} has no audio for {}", tier.name(), request.describe()),
                Err(e) => {
                    warn!("{} failed for {}: {}", tier.name(), request.describe(), e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(KaraokeError::ResourceUnavailable(format!(
                "no audio source for {} (last error: {})",
                request.describe(),
                e
            ))),
            None => Ok(None),
        }
    }
}

/// Стандартная цепочка: запись из реестра, файл секции, запись всей
/// молитвы, синтез
pub fn default_chain(
    config: &KaraokeConfig,
    store: Arc<dyn AssetStore>,
    registry: Option<Arc<AudioRegistry>>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    cache: Arc<dyn SynthesisCache>,
) -> FallbackChain {
    let assets = &config.assets;
    let mut chain = FallbackChain::new();

    if let Some(registry) = registry.clone() {
        chain.push(Arc::new(RegistryResolver::new(registry, store.clone())));
    }
    chain.push(Arc::new(SectionFileResolver::new(
        store.clone(),
        &assets.prayers_dir,
        assets.pronunciation,
    )));
    let mut full = FullRecordingResolver::new(store, &assets.prayers_dir);
    if let Some(registry) = registry {
        full = full.with_ranges(registry.section_ranges());
    }
    chain.push(Arc::new(full));
    if let Some(synthesizer) = synthesizer {
        chain.push(Arc::new(SynthesisResolver::new(synthesizer, cache, &config.synthesis)));
    }
    chain
}
