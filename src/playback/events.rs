//! События воспроизведения и наблюдатели
//!
//! Реализация паттерна Observer: контроллер уведомляет подписчиков об
//! изменениях сессии. Уведомления отправляются вне блокировки сессии и вне
//! блокировки списка, так что наблюдатель может читать состояние контроллера
//! и менять набор наблюдателей.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Событие сессии воспроизведения
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Звук пошел; длительность логического клипа в секундах
    Started { duration: f64 },
    /// Очередной тик; время от начала логического клипа в секундах
    TimeUpdate { current_time: f64 },
    Paused,
    Resumed,
    /// Естественное окончание или достижение конца диапазона
    Ended,
    /// Сессия остановлена и ресурс освобожден
    Stopped,
    /// Ошибка получения или воспроизведения аудио
    Error(String),
}

/// Наблюдатель за воспроизведением
pub trait PlaybackObserver: Send + Sync {
    fn on_playback_event(&self, event: &PlaybackEvent);
}

/// Набор наблюдателей с идентификаторами
pub struct ObserverHub {
    observers: RwLock<HashMap<usize, Arc<dyn PlaybackObserver>>>,
    next_id: AtomicUsize,
}

impl ObserverHub {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Добавить наблюдателя
    ///
    /// Возвращает идентификатор, по которому наблюдателя можно удалить.
    pub fn add_observer(&self, observer: Box<dyn PlaybackObserver>) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.observers.write().insert(id, Arc::from(observer));
        id
    }

    pub fn remove_observer(&self, id: usize) -> Option<Arc<dyn PlaybackObserver>> {
        self.observers.write().remove(&id)
    }

    /// Уведомить всех наблюдателей
    pub fn notify(&self, event: &PlaybackEvent) {
        let observers: Vec<Arc<dyn PlaybackObserver>> = self.observers.read().values().cloned().collect();
        for observer in &observers {
            observer.on_playback_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ObserverHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Наблюдатель, пишущий события в лог
pub struct LogObserver;

impl PlaybackObserver for LogObserver {
    fn on_playback_event(&self, event: &PlaybackEvent) {
        match event {
            PlaybackEvent::TimeUpdate { .. } => {}
            PlaybackEvent::Error(message) => log::error!("Playback event: error: {}", message),
            other => log::debug!("Playback event: {:?}", other),
        }
    }
}
