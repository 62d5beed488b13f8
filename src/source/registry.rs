//! Реестр записей молитв
//!
//! Для каждой молитвы может быть несколько записей разных чтецов. Реестр
//! также хранит диапазоны секций внутри записей целой молитвы.

use std::collections::HashMap;
use std::path::Path;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::playback::AudioTimeRange;
use super::assets::AssetStore;

/// Идентификатор источника записей
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioSourceId {
    SiddurAudio,
    Chabad,
    HadarWeiss,
    HadarRichman,
    HadarDiamond,
    HadarRosenbaum,
}

impl AudioSourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SiddurAudio => "siddur-audio",
            Self::Chabad => "chabad",
            Self::HadarWeiss => "hadar-weiss",
            Self::HadarRichman => "hadar-richman",
            Self::HadarDiamond => "hadar-diamond",
            Self::HadarRosenbaum => "hadar-rosenbaum",
        }
    }

    /// Название для интерфейса
    pub fn label(&self) -> &'static str {
        match self {
            Self::SiddurAudio => "Siddur Audio",
            Self::Chabad => "Chabad.org",
            Self::HadarWeiss => "Hadar - Rabbi Dena Weiss",
            Self::HadarRichman => "Hadar - Rabbi Aviva Richman",
            Self::HadarDiamond => "Hadar - Rabbi Eliezer Diamond",
            Self::HadarRosenbaum => "Hadar - Rosenbaum",
        }
    }
}

/// Тип записи
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioKind {
    /// Чтение всей молитвы
    FullPrayer,
    /// Демонстрация напева
    Nusach,
    /// Отдельная секция
    Section,
}

/// Запись молитвы
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerAudioEntry {
    pub source_id: AudioSourceId,
    /// Путь относительно корня хранилища
    pub path: String,
    #[serde(rename = "type")]
    pub kind: AudioKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioRegistry {
    /// Записи по идентификатору молитвы
    prayers: HashMap<String, Vec<PrayerAudioEntry>>,
    /// Диапазоны секций внутри записей целой молитвы
    section_ranges: HashMap<String, AudioTimeRange>,
}

impl AudioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn add_entry(&mut self, prayer_id: impl Into<String>, entry: PrayerAudioEntry) {
        self.prayers.entry(prayer_id.into()).or_default().push(entry);
    }

    pub fn set_section_range(&mut self, section_id: impl Into<String>, range: AudioTimeRange) {
        self.section_ranges.insert(section_id.into(), range);
    }

    /// Все записи молитвы
    pub fn audio_for_prayer(&self, prayer_id: &str) -> &[PrayerAudioEntry] {
        self.prayers.get(prayer_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Запись конкретного источника, если есть
    pub fn audio_by_source(&self, prayer_id: &str, source: AudioSourceId) -> Option<&PrayerAudioEntry> {
        self.audio_for_prayer(prayer_id)
            .iter()
            .find(|e| e.source_id == source)
    }

    pub fn available_sources(&self, prayer_id: &str) -> Vec<AudioSourceId> {
        self.audio_for_prayer(prayer_id)
            .iter()
            .map(|e| e.source_id)
            .collect()
    }

    /// Источники, файлы которых действительно есть в хранилище
    pub async fn existing_sources(&self, prayer_id: &str, store: &dyn AssetStore) -> Vec<AudioSourceId> {
        let entries = self.audio_for_prayer(prayer_id);
        let present = join_all(entries.iter().map(|e| store.exists(&e.path))).await;
        entries
            .iter()
            .zip(present)
            .filter(|(_, exists)| *exists)
            .map(|(e, _)| e.source_id)
            .collect()
    }

    pub fn section_range(&self, section_id: &str) -> Option<AudioTimeRange> {
        self.section_ranges.get(section_id).copied()
    }

    pub fn section_ranges(&self) -> HashMap<String, AudioTimeRange> {
        self.section_ranges.clone()
    }
}
