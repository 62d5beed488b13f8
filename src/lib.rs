//! Основной файл библиотеки siddur-karaoke
//!
//! Библиотека оценивает тайминги слов молитвы по длительности записи,
//! воспроизводит аудио секции (запись, фрагмент записи целой молитвы или
//! синтез) и ведет курсор караоке по часам воспроизведения.

pub mod config;
pub mod error;
pub mod timing;
pub mod playback;
pub mod source;
pub mod tts;
pub mod karaoke;
pub mod utils;

use std::sync::Arc;
use log::debug;
use tokio::sync::watch;
use crate::config::KaraokeConfig;
use crate::error::Result;
use crate::karaoke::{KaraokeCursor, KaraokeObserver};
use crate::playback::{AudioOutput, PlaybackController, TokioFrameScheduler};
use crate::source::{default_chain, AssetStore, AudioRegistry, HttpAssetStore, LocalAssetStore, SourceRequest};
use crate::timing::{TimingTable, WordTiming};
use crate::tts::{HttpSynthesizer, MemorySynthesisCache, NoCache, SpeechSynthesizer, SynthesisCache};

pub use crate::error::KaraokeError;

/// Плеер секций молитвы с курсором караоке
pub struct SiddurKaraoke {
    /// Конфигурация библиотеки
    config: KaraokeConfig,
    controller: PlaybackController,
    /// Таблица таймингов, загруженная при старте
    timings: Arc<TimingTable>,
    karaoke: KaraokeObserver,
}

impl SiddurKaraoke {
    /// Связать готовый контроллер с таблицей таймингов
    pub fn new(config: KaraokeConfig, controller: PlaybackController, timings: Arc<TimingTable>) -> Self {
        let (karaoke, _cursor) = KaraokeObserver::new(Vec::<WordTiming>::new().into());
        controller.add_observer(Box::new(karaoke.clone()));
        Self {
            config,
            controller,
            timings,
            karaoke,
        }
    }

    /// Собрать плеер со стандартной цепочкой источников
    ///
    /// Файлы берутся из `assets.root` (директория или базовый URL), синтез
    /// идет через HTTP сервис, кадры отсчитывает таймер Tokio. Требует
    /// запущенного рантайма Tokio.
    pub fn with_defaults(
        config: KaraokeConfig,
        output: Arc<dyn AudioOutput>,
        timings: TimingTable,
        registry: Option<Arc<AudioRegistry>>,
    ) -> Result<Self> {
        config.validate()?;

        let root = &config.assets.root;
        let store: Arc<dyn AssetStore> = if root.starts_with("http://") || root.starts_with("https://") {
            Arc::new(HttpAssetStore::new(root.as_str()))
        } else {
            Arc::new(LocalAssetStore::new(root.as_str()))
        };
        let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(HttpSynthesizer::new(&config.synthesis)?);
        let cache: Arc<dyn SynthesisCache> = if config.synthesis.use_caching {
            Arc::new(MemorySynthesisCache::new(config.synthesis.cache_ttl()))
        } else {
            Arc::new(NoCache)
        };

        let chain = default_chain(&config, store, registry, Some(synthesizer), cache);
        let scheduler = Arc::new(TokioFrameScheduler::from_current(config.playback.frame_interval())?);
        let controller = PlaybackController::new(output, scheduler, config.playback.clone())
            .with_resolver(Arc::new(chain));

        Ok(Self::new(config, controller, Arc::new(timings)))
    }

    /// Подписка на курсор караоке
    pub fn cursor(&self) -> watch::Receiver<KaraokeCursor> {
        self.karaoke.subscribe()
    }

    /// Воспроизвести секцию и вести по ней курсор
    pub async fn play_section(&self, request: &SourceRequest) -> Result<()> {
        let timings = request
            .section_id
            .as_deref()
            .and_then(|id| self.timings.get(id));
        let timings = match timings {
            Some(timings) => timings,
            None => {
                debug!("No word timings for {}, cursor stays idle", request.describe());
                Vec::<WordTiming>::new().into()
            }
        };
        // Старая сессия не должна доставить тик в тайминги новой секции
        self.controller.stop();
        self.karaoke.load_section(timings);
        self.controller.play(request).await
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn timings(&self) -> &TimingTable {
        &self.timings
    }

    pub fn config(&self) -> &KaraokeConfig {
        &self.config
    }
}
