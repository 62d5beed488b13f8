//! Модуль генерации таймингов слов
//!
//! Оценивает границы каждого слова по общей длительности аудио и весу слов,
//! без анализа самого звука. Результат сохраняется в статическую таблицу,
//! которую читает синхронизатор караоке.

pub mod weight;
pub mod generator;
pub mod table;
pub mod batch;

pub use weight::{split_words, word_weight, AlphabeticRule, HebrewConsonantRule, WeightRule};
pub use generator::{generate_timings, generate_timings_with_rule, timing_warnings, TimingWarning};
pub use table::TimingTable;
pub use batch::{build_timing_table, BatchReport, ManifestSection, TimingManifest};

use serde::{Deserialize, Serialize};

/// Тайминг одного слова относительно начала клипа
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordTiming {
    /// Слово в том виде, в каком оно получено при разбиении текста
    pub word: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl WordTiming {
    pub fn new(word: impl Into<String>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            word: word.into(),
            start_ms,
            end_ms,
        }
    }

    /// Длительность интервала; ноль для вырожденных слов
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}
