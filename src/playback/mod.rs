//! Модуль управления воспроизведением
//!
//! Контроллер владеет ровно одним аудиоресурсом, управляет его жизненным
//! циклом и ведет цикл опроса позиции, пока идет воспроизведение.

pub mod output;
pub mod scheduler;
pub mod events;
pub mod controller;

#[cfg(test)]
mod tests;

pub use output::{AudioHandle, AudioOutput, AudioStream, SynthesizedAudio};
pub use scheduler::{FrameLoop, FrameScheduler, ManualFrameScheduler, TickFlow, TickFn, TokioFrameScheduler};
pub use events::{LogObserver, ObserverHub, PlaybackEvent, PlaybackObserver};
pub use controller::PlaybackController;

use serde::{Deserialize, Serialize};
use crate::error::{KaraokeError, Result};

/// Поддиапазон длинного аудиофайла, воспроизводимый как отдельный клип
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTimeRange {
    /// Начало, секунды от начала ресурса
    pub start_time: f64,
    /// Конец, секунды от начала ресурса; без него клип идет до конца файла
    pub end_time: Option<f64>,
}

impl AudioTimeRange {
    pub fn new(start_time: f64, end_time: Option<f64>) -> Self {
        Self { start_time, end_time }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.start_time.is_finite() || self.start_time < 0.0 {
            return Err(KaraokeError::InvalidInput(format!(
                "Time range start must be non-negative, got {}",
                self.start_time
            )));
        }
        if let Some(end) = self.end_time {
            if !end.is_finite() || end <= self.start_time {
                return Err(KaraokeError::InvalidInput(format!(
                    "Time range end {} must be after start {}",
                    end, self.start_time
                )));
            }
        }
        Ok(())
    }

    /// Длительность клипа при известной длительности ресурса
    pub fn clip_duration(&self, resource_duration: Option<f64>) -> Option<f64> {
        self.end_time
            .or(resource_duration)
            .map(|end| (end - self.start_time).max(0.0))
    }
}

/// Состояние конечного автомата воспроизведения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
}

/// Снимок наблюдаемого состояния контроллера
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub error: Option<String>,
    /// Секунды от начала логического клипа
    pub current_time: f64,
    /// Длительность логического клипа, секунды
    pub duration: f64,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn is_loading(&self) -> bool {
        self.status == PlaybackStatus::Loading
    }
}
