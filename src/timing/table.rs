//! Таблица таймингов по идентификатору секции молитвы

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::error::{KaraokeError, Result};
use super::WordTiming;

/// Неизменяемая таблица таймингов
///
/// Загружается один раз при старте. Секции хранятся в `Arc`, так что
/// синхронизаторы разных представлений делят одни и те же данные.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimingTable {
    sections: BTreeMap<String, Arc<[WordTiming]>>,
}

impl TimingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Загрузить таблицу из JSON файла
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let table = Self::from_json(&content)?;
        log::info!(
            "Loaded word timings for {} sections from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(content)?;
        for (id, timings) in &table.sections {
            if let Some(i) = timings.windows(2).position(|p| p[0].start_ms > p[1].start_ms) {
                return Err(KaraokeError::InvalidInput(format!(
                    "Section {} has decreasing start times at word {}",
                    id,
                    i + 1
                )));
            }
        }
        Ok(table)
    }

    /// Сохранить таблицу в JSON файл
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn insert(&mut self, section_id: impl Into<String>, timings: Vec<WordTiming>) {
        self.sections.insert(section_id.into(), timings.into());
    }

    /// Тайминги секции, если они есть
    pub fn get(&self, section_id: &str) -> Option<Arc<[WordTiming]>> {
        self.sections.get(section_id).cloned()
    }

    pub fn contains(&self, section_id: &str) -> bool {
        self.sections.contains_key(section_id)
    }

    pub fn section_ids(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_format_uses_camel_case() {
        let mut table = TimingTable::new();
        table.insert("modeh-ani-1", vec![WordTiming::new("מוֹדֶה", 60, 500)]);

        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"modeh-ani-1":[{"word":"מוֹדֶה","startMs":60,"endMs":500}]}"#);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("word-timings.json");

        let mut table = TimingTable::new();
        table.insert(
            "shema-1",
            vec![WordTiming::new("שְׁמַע", 200, 600), WordTiming::new("יִשְׂרָאֵל", 650, 1400)],
        );
        table.save(&path).unwrap();

        let loaded = TimingTable::load(&path).unwrap();
        assert_eq!(loaded, table);
        assert_eq!(loaded.get("shema-1").unwrap().len(), 2);
        assert!(loaded.get("shema-2").is_none());
        assert_eq!(loaded.section_ids().collect::<Vec<_>>(), vec!["shema-1"]);
    }

    #[test]
    fn test_rejects_decreasing_starts() {
        let json = r#"{"x":[{"word":"a","startMs":500,"endMs":600},{"word":"b","startMs":100,"endMs":200}]}"#;
        assert!(matches!(TimingTable::from_json(json), Err(KaraokeError::InvalidInput(_))));
    }
}
