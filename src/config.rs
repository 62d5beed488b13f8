//! Модуль конфигурации библиотеки siddur-karaoke
//!
//! Этот модуль содержит структуры и перечисления для настройки генерации
//! таймингов, воспроизведения, синтеза речи и поиска аудиофайлов.

use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::{KaraokeError, Result};

/// Стиль произношения записи
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Pronunciation {
    /// Современное (израильское) произношение
    Modern,
    /// Американское ашкеназское произношение
    American,
}

impl Default for Pronunciation {
    fn default() -> Self {
        Self::Modern
    }
}

impl Pronunciation {
    /// Суффикс имени файла для стиля произношения
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::Modern => "",
            Self::American => "-american",
        }
    }
}

/// Голос для сервиса синтеза
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    /// Мужской голос
    Male,
    /// Женский голос
    Female,
}

impl Default for VoiceGender {
    fn default() -> Self {
        Self::Male
    }
}

impl VoiceGender {
    /// Получить строковое представление голоса
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

/// Параметры генерации таймингов слов
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Верхняя граница тишины перед речью, мс
    pub leading_buffer_max_ms: f64,
    /// Доля длительности клипа для тишины перед речью
    pub leading_buffer_ratio: f64,
    /// Верхняя граница тишины после речи, мс
    pub trailing_buffer_max_ms: f64,
    /// Доля длительности клипа для тишины после речи
    pub trailing_buffer_ratio: f64,
    /// Доля длительности слова, отводимая под паузу после него
    pub word_gap_ratio: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            leading_buffer_max_ms: 200.0,
            leading_buffer_ratio: 0.03,
            trailing_buffer_max_ms: 150.0,
            trailing_buffer_ratio: 0.02,
            word_gap_ratio: 0.05,
        }
    }
}

/// Параметры воспроизведения
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Скорость воспроизведения по умолчанию
    pub default_speed: f32,
    /// Интервал опроса позиции во время воспроизведения, мс
    pub frame_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_speed: 1.0,
            frame_interval_ms: 16,
        }
    }
}

impl PlaybackConfig {
    /// Интервал кадра в виде Duration
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

/// Параметры сервиса синтеза речи
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    /// URL сервиса синтеза
    pub endpoint: String,
    /// Голос
    pub voice_gender: VoiceGender,
    /// Максимальная длина текста для синтеза
    pub max_text_chars: usize,
    /// Использовать кэширование
    pub use_caching: bool,
    /// Время жизни записи в кэше, секунды
    pub cache_ttl_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/tts".to_string(),
            voice_gender: VoiceGender::default(),
            max_text_chars: 5000,
            use_caching: true,
            cache_ttl_secs: 60 * 60 * 24, // 24 часа
        }
    }
}

impl SynthesisConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Расположение аудиофайлов молитв
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetConfig {
    /// Корневая директория или базовый URL
    pub root: String,
    /// Путь к молитвам относительно корня
    pub prayers_dir: String,
    /// Стиль произношения
    pub pronunciation: Pronunciation,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: "public".to_string(),
            prayers_dir: "audio/prayers".to_string(),
            pronunciation: Pronunciation::default(),
        }
    }
}

/// Конфигурация библиотеки
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KaraokeConfig {
    pub timing: TimingConfig,
    pub playback: PlaybackConfig,
    pub synthesis: SynthesisConfig,
    pub assets: AssetConfig,
}

impl KaraokeConfig {
    /// Загрузить конфигурацию из JSON файла
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            KaraokeError::Configuration(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| KaraokeError::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Проверить значения конфигурации
    pub fn validate(&self) -> Result<()> {
        let t = &self.timing;
        for (name, value) in [
            ("leading_buffer_max_ms", t.leading_buffer_max_ms),
            ("leading_buffer_ratio", t.leading_buffer_ratio),
            ("trailing_buffer_max_ms", t.trailing_buffer_max_ms),
            ("trailing_buffer_ratio", t.trailing_buffer_ratio),
            ("word_gap_ratio", t.word_gap_ratio),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(KaraokeError::Configuration(format!(
                    "timing.{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if t.word_gap_ratio >= 1.0 {
            return Err(KaraokeError::Configuration(
                "timing.word_gap_ratio must be below 1.0".to_string(),
            ));
        }
        if !(self.playback.default_speed > 0.0) {
            return Err(KaraokeError::Configuration(format!(
                "playback.default_speed must be positive, got {}",
                self.playback.default_speed
            )));
        }
        Ok(())
    }
}
