//! Абстракция платформенного аудиовывода
//!
//! Контроллер не знает, как именно декодируется и воспроизводится звук:
//! платформа предоставляет `AudioOutput`, который открывает поток по
//! дескриптору источника.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use tempfile::NamedTempFile;
use crate::error::Result;

/// Синтезированное аудио во временном файле
///
/// Файл удаляется при уничтожении значения, то есть когда сессия
/// воспроизведения освобождает свой ресурс.
pub struct SynthesizedAudio {
    file: NamedTempFile,
    size: usize,
}

impl SynthesizedAudio {
    /// Записать полученные байты во временный файл
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let prefix = format!("tts_{}_", uuid::Uuid::new_v4());
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".mp3")
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self {
            file,
            size: bytes.len(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl fmt::Debug for SynthesizedAudio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesizedAudio")
            .field("path", &self.file.path())
            .field("size", &self.size)
            .finish()
    }
}

/// Дескриптор воспроизводимого источника
#[derive(Debug)]
pub enum AudioHandle {
    /// Удаленный ресурс
    Url(String),
    /// Локальный файл
    File(PathBuf),
    /// Временный результат синтеза, принадлежит сессии
    Synthesized(SynthesizedAudio),
}

impl AudioHandle {
    /// Ресурс, который нужно освободить после воспроизведения
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Synthesized(_))
    }

    /// Строка для логов
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::File(path) => path.display().to_string(),
            Self::Synthesized(audio) => format!("synthesized:{}", audio.path().display()),
        }
    }
}

/// Открытый аудиопоток
///
/// Позиция и длительность в секундах абсолютного времени ресурса.
pub trait AudioStream: Send {
    /// Длительность, если она уже известна
    fn duration(&self) -> Option<f64>;
    fn position(&self) -> f64;
    fn set_position(&mut self, seconds: f64);
    fn set_playback_rate(&mut self, rate: f32);
    /// Начать или продолжить воспроизведение
    fn start(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    /// Воспроизведение дошло до конца ресурса
    fn has_ended(&self) -> bool;
    /// Ошибка декодирования или вывода, возникшая во время воспроизведения
    fn take_error(&mut self) -> Option<String>;
}

/// Платформенный аудиовывод
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Загрузить ресурс и вернуть готовый к запуску поток
    async fn open(&self, handle: &AudioHandle) -> Result<Box<dyn AudioStream>>;
}
