//! Модуль для кэширования результатов синтеза
//!
//! Кэш передается явно; процесс не держит глобальной карты.

use std::collections::HashMap;
use std::time::Duration;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use crate::config::VoiceGender;

/// Кэш синтезированного аудио
pub trait SynthesisCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Bytes>;
    fn put(&self, key: &str, audio: Bytes);
    /// Удалить просроченные записи; возвращает число удаленных
    fn evict_expired(&self) -> usize;
}

/// Сгенерировать ключ для кэша
pub fn cache_key(voice: VoiceGender, speed: f32, text: &str) -> String {
    let mut hasher = md5::Context::new();
    hasher.consume(voice.as_str().as_bytes());
    hasher.consume(b":");
    hasher.consume(speed.to_string().as_bytes());
    hasher.consume(b":");
    hasher.consume(text.as_bytes());

    format!("{:x}", hasher.compute())
}

struct CachedAudio {
    data: Bytes,
    stored_at: DateTime<Utc>,
}

/// Кэш в памяти с временем жизни записей
pub struct MemorySynthesisCache {
    ttl: chrono::Duration,
    entries: Mutex<HashMap<String, CachedAudio>>,
}

impl MemorySynthesisCache {
    pub fn new(ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Удалить записи, просроченные к моменту `now`
    pub fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| now - entry.stored_at <= self.ttl);
        let evicted = before - entries.len();
        if evicted > 0 {
            log::debug!("Evicted {} expired synthesis cache entries", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SynthesisCache for MemorySynthesisCache {
    fn get(&self, key: &str) -> Option<Bytes> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|entry| Utc::now() - entry.stored_at <= self.ttl)
            .map(|entry| entry.data.clone())
    }

    fn put(&self, key: &str, audio: Bytes) {
        self.entries.lock().insert(
            key.to_string(),
            CachedAudio {
                data: audio,
                stored_at: Utc::now(),
            },
        );
    }

    fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now())
    }
}

/// Отключенный кэш
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl SynthesisCache for NoCache {
    fn get(&self, _key: &str) -> Option<Bytes> {
        None
    }

    fn put(&self, _key: &str, _audio: Bytes) {}

    fn evict_expired(&self) -> usize {
        0
    }
}
