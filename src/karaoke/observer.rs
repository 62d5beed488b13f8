//! Наблюдатель воспроизведения, публикующий курсор караоке

use std::sync::Arc;
use parking_lot::Mutex;
use tokio::sync::watch;
use crate::playback::{PlaybackEvent, PlaybackObserver};
use crate::timing::WordTiming;
use super::{KaraokeCursor, KaraokeSync};

struct Inner {
    sync: Mutex<KaraokeSync>,
    sender: watch::Sender<KaraokeCursor>,
}

/// Пересчитывает курсор на каждом тике и публикует его в канал `watch`
///
/// Клоны делят одно состояние: один экземпляр регистрируется в
/// контроллере, другой остается у владельца для смены секции.
#[derive(Clone)]
pub struct KaraokeObserver {
    inner: Arc<Inner>,
}

impl KaraokeObserver {
    pub fn new(timings: Arc<[WordTiming]>) -> (Self, watch::Receiver<KaraokeCursor>) {
        let (sender, receiver) = watch::channel(KaraokeCursor::before_first());
        let observer = Self {
            inner: Arc::new(Inner {
                sync: Mutex::new(KaraokeSync::new(timings)),
                sender,
            }),
        };
        (observer, receiver)
    }

    pub fn subscribe(&self) -> watch::Receiver<KaraokeCursor> {
        self.inner.sender.subscribe()
    }

    /// Последний опубликованный курсор
    pub fn current(&self) -> KaraokeCursor {
        *self.inner.sender.borrow()
    }

    /// Переключиться на тайминги другой секции
    pub fn load_section(&self, timings: Arc<[WordTiming]>) {
        *self.inner.sync.lock() = KaraokeSync::new(timings);
        self.publish(KaraokeCursor::before_first());
    }

    fn publish(&self, cursor: KaraokeCursor) {
        self.inner.sender.send_if_modified(|current| {
            if *current == cursor {
                false
            } else {
                *current = cursor;
                true
            }
        });
    }
}

impl PlaybackObserver for KaraokeObserver {
    fn on_playback_event(&self, event: &PlaybackEvent) {
        let cursor = {
            let mut sync = self.inner.sync.lock();
            match event {
                PlaybackEvent::Started { .. } => {
                    sync.reset();
                    sync.cursor_at(0.0)
                }
                PlaybackEvent::TimeUpdate { current_time } => sync.cursor_at(current_time * 1000.0),
                PlaybackEvent::Ended => sync.finished(),
                PlaybackEvent::Stopped | PlaybackEvent::Error(_) => {
                    sync.reset();
                    KaraokeCursor::before_first()
                }
                PlaybackEvent::Paused | PlaybackEvent::Resumed => return,
            }
        };
        self.publish(cursor);
    }
}
