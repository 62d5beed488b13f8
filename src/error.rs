//! Модуль обработки ошибок библиотеки siddur-karaoke
//!
//! Генерация таймингов и синхронизация курсора не имеют ошибочных путей:
//! вырожденные входы обрабатываются запасными ветками. Ошибки возникают
//! только при получении и воспроизведении аудио.

use thiserror::Error;

/// Ошибки библиотеки siddur-karaoke
#[derive(Debug, Error)]
pub enum KaraokeError {
    /// Ошибка HTTP запроса
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ни один источник аудио не найден, включая синтез
    #[error("Audio unavailable: {0}")]
    ResourceUnavailable(String),

    /// Ресурс загружен, но воспроизведение не удалось
    #[error("Playback error: {0}")]
    PlaybackFailure(String),

    /// Запрос воспроизведения вытеснен более новым запросом или остановкой
    #[error("Playback request was superseded")]
    Superseded,

    /// Ошибка сервиса синтеза речи
    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Некорректные входные данные
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(String),
}

impl From<&str> for KaraokeError {
    fn from(s: &str) -> Self {
        KaraokeError::Other(s.to_string())
    }
}

impl From<String> for KaraokeError {
    fn from(s: String) -> Self {
        KaraokeError::Other(s)
    }
}

/// Тип Result для библиотеки siddur-karaoke
pub type Result<T> = std::result::Result<T, KaraokeError>;
