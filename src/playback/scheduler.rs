//! Планировщик кадров для цикла опроса позиции
//!
//! Пока идет воспроизведение, контроллер вызывает `tick()` с частотой кадров.
//! Сам `tick()` проверяет состояние сессии и решает, продолжать ли цикл.

use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use crate::error::{KaraokeError, Result};

/// Решение тика: продолжать цикл или остановить
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    Stop,
}

pub type TickFn = Box<dyn FnMut() -> TickFlow + Send + 'static>;

/// Дескриптор запущенного цикла; отменяет цикл при уничтожении
#[derive(Debug)]
pub struct FrameLoop {
    token: CancellationToken,
}

impl FrameLoop {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Цикл еще не остановлен ни отменой, ни собственным тиком
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Планировщик, вызывающий тик с частотой кадров
pub trait FrameScheduler: Send + Sync {
    fn schedule(&self, tick: TickFn) -> FrameLoop;
}

/// Цикл на таймере Tokio
pub struct TokioFrameScheduler {
    interval: Duration,
    runtime: Handle,
}

impl TokioFrameScheduler {
    pub fn new(interval: Duration, runtime: Handle) -> Self {
        Self { interval, runtime }
    }

    /// Использовать текущий рантайм Tokio
    pub fn from_current(interval: Duration) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| KaraokeError::Configuration(format!("No Tokio runtime: {}", e)))?;
        Ok(Self::new(interval, runtime))
    }
}

impl FrameScheduler for TokioFrameScheduler {
    fn schedule(&self, mut tick: TickFn) -> FrameLoop {
        let token = CancellationToken::new();
        let child = token.clone();
        let period = self.interval;

        self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = child.cancelled() => break,
                    _ = interval.tick() => {
                        if tick() == TickFlow::Stop {
                            break;
                        }
                    }
                }
            }
            // Цикл завершился сам, помечаем дескриптор неактивным
            child.cancel();
        });

        FrameLoop::new(token)
    }
}

struct ManualLoop {
    token: CancellationToken,
    tick: Arc<Mutex<TickFn>>,
}

/// Планировщик, кадры которого продвигает сам хост
///
/// Подходит для UI-циклов с собственным событием кадра.
#[derive(Default)]
pub struct ManualFrameScheduler {
    loops: Mutex<Vec<ManualLoop>>,
}

impl ManualFrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Выполнить один кадр для всех активных циклов
    ///
    /// Возвращает число выполненных тиков.
    pub fn run_frame(&self) -> usize {
        let active: Vec<(CancellationToken, Arc<Mutex<TickFn>>)> = {
            let mut loops = self.loops.lock();
            loops.retain(|l| !l.token.is_cancelled());
            loops.iter().map(|l| (l.token.clone(), l.tick.clone())).collect()
        };

        let mut ran = 0;
        for (token, tick) in active {
            if token.is_cancelled() {
                continue;
            }
            ran += 1;
            let flow = {
                let mut f = tick.lock();
                (&mut **f)()
            };
            if flow == TickFlow::Stop {
                token.cancel();
            }
        }
        ran
    }

    /// Число циклов, которые выполнятся в следующем кадре
    pub fn active_loops(&self) -> usize {
        self.loops
            .lock()
            .iter()
            .filter(|l| !l.token.is_cancelled())
            .count()
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn schedule(&self, tick: TickFn) -> FrameLoop {
        let token = CancellationToken::new();
        self.loops.lock().push(ManualLoop {
            token: token.clone(),
            tick: Arc::new(Mutex::new(tick)),
        });
        FrameLoop::new(token)
    }
}
