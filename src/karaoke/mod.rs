//! Модуль синхронизации караоке
//!
//! Сопоставляет прошедшее время клипа с таблицей таймингов и выдает
//! текущее слово и долю его прохождения. Ошибочных путей нет: время вне
//! таблицы обрабатывается маркерами "до первого слова" и "после последнего".

pub mod sync;
pub mod observer;

pub use sync::KaraokeSync;
pub use observer::KaraokeObserver;

use serde::{Deserialize, Serialize};
use crate::timing::WordTiming;

/// Положение курсора в таблице
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorPosition {
    /// Речь еще не началась
    #[default]
    BeforeFirst,
    /// Индекс текущего слова
    Word(usize),
}

/// Текущее слово и доля его прохождения от 0 до 1
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KaraokeCursor {
    pub position: CursorPosition,
    pub progress: f32,
}

impl KaraokeCursor {
    pub fn before_first() -> Self {
        Self::default()
    }

    pub fn word(index: usize, progress: f32) -> Self {
        Self {
            position: CursorPosition::Word(index),
            progress,
        }
    }

    pub fn word_index(&self) -> Option<usize> {
        match self.position {
            CursorPosition::Word(i) => Some(i),
            CursorPosition::BeforeFirst => None,
        }
    }

    /// Курсор на конце таблицы
    pub fn finished(timings: &[WordTiming]) -> Self {
        match timings.len() {
            0 => Self::before_first(),
            n => Self::word(n - 1, 1.0),
        }
    }
}

/// Привести время к неотрицательному числу
pub(crate) fn sanitize_elapsed(elapsed_ms: f64) -> f64 {
    if elapsed_ms.is_nan() || elapsed_ms < 0.0 {
        0.0
    } else {
        elapsed_ms
    }
}

pub(crate) fn word_progress(timing: &WordTiming, elapsed_ms: f64) -> f32 {
    let start = timing.start_ms as f64;
    let end = timing.end_ms as f64;
    if end <= start {
        return 1.0;
    }
    ((elapsed_ms - start) / (end - start)).clamp(0.0, 1.0) as f32
}

/// Курсор для момента `elapsed_ms` без состояния
///
/// Текущее слово: слово с наибольшим началом, не превосходящим время.
/// В паузе после конца слова курсор остается на нем с прогрессом 1.
pub fn locate_cursor(timings: &[WordTiming], elapsed_ms: f64) -> KaraokeCursor {
    let (Some(first), Some(last)) = (timings.first(), timings.last()) else {
        return KaraokeCursor::before_first();
    };
    let elapsed = sanitize_elapsed(elapsed_ms);

    if elapsed < first.start_ms as f64 {
        return KaraokeCursor::before_first();
    }
    if elapsed >= last.end_ms as f64 {
        return KaraokeCursor::finished(timings);
    }

    let index = timings
        .partition_point(|t| t.start_ms as f64 <= elapsed)
        .saturating_sub(1);
    KaraokeCursor::word(index, word_progress(&timings[index], elapsed))
}
