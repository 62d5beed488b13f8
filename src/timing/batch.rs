//! Пакетная генерация таблицы таймингов
//!
//! Манифест перечисляет секции с текстом и аудиофайлом (или явной
//! длительностью). Для каждой секции с известной длительностью строятся
//! тайминги; остальные попадают в список пропущенных.

use std::path::Path;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use crate::config::TimingConfig;
use crate::error::Result;
use crate::utils::DurationProbe;
use super::generator::{generate_timings, timing_warnings};
use super::table::TimingTable;
use super::weight::split_words;

/// Секция в манифесте
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSection {
    pub id: String,
    pub text: String,
    /// Аудиофайл относительно директории манифеста
    #[serde(default)]
    pub audio: Option<String>,
    /// Явная длительность; имеет приоритет над файлом
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingManifest {
    pub sections: Vec<ManifestSection>,
}

impl TimingManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Итог пакетной генерации
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Секции, для которых построены тайминги
    pub matched: Vec<String>,
    /// Секции без длительности или текста
    pub unmatched: Vec<String>,
    /// Число слов с неположительной длительностью
    pub warnings: usize,
}

/// Построить таблицу таймингов по манифесту
///
/// Ошибка чтения длительности отдельной секции не прерывает обработку:
/// секция считается пропущенной.
pub fn build_timing_table(
    manifest: &TimingManifest,
    base_dir: &Path,
    config: &TimingConfig,
    probe: &dyn DurationProbe,
) -> (TimingTable, BatchReport) {
    let mut table = TimingTable::new();
    let mut report = BatchReport::default();

    for section in &manifest.sections {
        let words = split_words(&section.text);
        if words.is_empty() {
            warn!("{}: no words in text, skipping", section.id);
            report.unmatched.push(section.id.clone());
            continue;
        }

        let duration_ms = match (section.duration_ms, &section.audio) {
            (Some(ms), _) => Some(ms),
            (None, Some(audio)) => match probe.duration_ms(&base_dir.join(audio)) {
                Ok(ms) => Some(ms),
                Err(e) => {
                    warn!("{}: failed to read duration of {}: {}", section.id, audio, e);
                    None
                }
            },
            (None, None) => None,
        };

        let Some(duration_ms) = duration_ms.filter(|ms| *ms > 0) else {
            warn!("{}: no audio duration, skipping", section.id);
            report.unmatched.push(section.id.clone());
            continue;
        };

        let timings = generate_timings(&words, duration_ms, config);
        report.warnings += timing_warnings(&timings).len();
        info!(
            "{}: {} words, {:.1}s audio",
            section.id,
            words.len(),
            duration_ms as f64 / 1000.0
        );

        table.insert(section.id.clone(), timings);
        report.matched.push(section.id.clone());
    }

    info!(
        "Generated timings for {} sections ({} skipped)",
        report.matched.len(),
        report.unmatched.len()
    );
    (table, report)
}
