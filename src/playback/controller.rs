//! Контроллер воспроизведения
//!
//! Владеет единственной сессией: потоком, дескриптором источника, диапазоном
//! и циклом опроса. Каждый новый `play` и `stop` увеличивает поколение
//! сессии, поэтому запоздавшая загрузка или тик старой сессии ничего не
//! меняют.
//!
//! События доставляются под отдельной блокировкой доставки, которую берут
//! до блокировки сессии. Смена поколения и уведомления о ней не могут
//! вклиниться между проверкой поколения в тике и его событием.

use std::sync::{Arc, Weak};
use log::{debug, error, info};
use parking_lot::{Mutex, ReentrantMutex};
use crate::config::PlaybackConfig;
use crate::error::{KaraokeError, Result};
use crate::source::{SourceRequest, SourceResolver};
use super::events::{ObserverHub, PlaybackEvent, PlaybackObserver};
use super::output::{AudioHandle, AudioOutput, AudioStream};
use super::scheduler::{FrameLoop, FrameScheduler, TickFlow, TickFn};
use super::{AudioTimeRange, PlaybackState, PlaybackStatus};

#[derive(Default)]
struct Session {
    generation: u64,
    status: PlaybackStatus,
    error: Option<String>,
    current_time: f64,
    duration: f64,
    stream: Option<Box<dyn AudioStream>>,
    handle: Option<AudioHandle>,
    range: Option<AudioTimeRange>,
    frame_loop: Option<FrameLoop>,
}

impl Session {
    /// Освободить ресурс текущей сессии
    ///
    /// Возвращает `true`, если было что освобождать.
    fn release(&mut self) -> bool {
        let had_resource = self.stream.is_some() || self.handle.is_some();

        if let Some(frame_loop) = self.frame_loop.take() {
            frame_loop.cancel();
        }
        if let Some(mut stream) = self.stream.take() {
            stream.pause();
            stream.set_position(0.0);
        }
        if let Some(handle) = self.handle.take() {
            if handle.is_temporary() {
                debug!("Releasing temporary audio {}", handle.describe());
            }
        }
        self.range = None;

        had_resource
    }

    fn range_start(&self) -> f64 {
        self.range.map(|r| r.start_time).unwrap_or(0.0)
    }

    fn logical_duration(&self, resource_duration: Option<f64>) -> f64 {
        let duration = match self.range {
            Some(range) => range.clip_duration(resource_duration),
            None => resource_duration,
        };
        duration.filter(|d| d.is_finite()).unwrap_or(0.0)
    }

    fn fail(&mut self, message: String) {
        self.release();
        self.status = PlaybackStatus::Idle;
        self.error = Some(message);
        self.current_time = 0.0;
        self.duration = 0.0;
    }

    fn snapshot(&self) -> PlaybackState {
        PlaybackState {
            status: self.status,
            error: self.error.clone(),
            current_time: self.current_time,
            duration: self.duration,
        }
    }
}

/// Контроллер воспроизведения одной секции
pub struct PlaybackController {
    output: Arc<dyn AudioOutput>,
    scheduler: Arc<dyn FrameScheduler>,
    resolver: Option<Arc<dyn SourceResolver>>,
    config: PlaybackConfig,
    session: Arc<Mutex<Session>>,
    observers: Arc<ObserverHub>,
    /// Порядок доставки событий; реентерабельна, чтобы наблюдатель мог
    /// вызывать контроллер из обработчика
    delivery: Arc<ReentrantMutex<()>>,
}

impl PlaybackController {
    pub fn new(
        output: Arc<dyn AudioOutput>,
        scheduler: Arc<dyn FrameScheduler>,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            output,
            scheduler,
            resolver: None,
            config,
            session: Arc::new(Mutex::new(Session::default())),
            observers: Arc::new(ObserverHub::new()),
            delivery: Arc::new(ReentrantMutex::new(())),
        }
    }

    /// Стратегия поиска источника для `play`
    pub fn with_resolver(mut self, resolver: Arc<dyn SourceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn add_observer(&self, observer: Box<dyn PlaybackObserver>) -> usize {
        self.observers.add_observer(observer)
    }

    pub fn remove_observer(&self, id: usize) -> bool {
        self.observers.remove_observer(id).is_some()
    }

    /// Найти аудио для секции и начать воспроизведение
    ///
    /// Завершается, когда звук пошел или произошла ошибка. Ошибка также
    /// сохраняется в состоянии контроллера.
    pub async fn play(&self, request: &SourceRequest) -> Result<()> {
        let generation = self.begin_loading();
        info!("Loading audio for {}", request.describe());
        let result = self.resolve_and_start(generation, request).await;
        self.finish(generation, result)
    }

    /// Воспроизвести известный источник
    pub async fn play_source(
        &self,
        handle: AudioHandle,
        speed: Option<f32>,
        range: Option<AudioTimeRange>,
    ) -> Result<()> {
        let generation = self.begin_loading();
        let speed = speed.unwrap_or(self.config.default_speed);
        let result = self.start_stream(generation, handle, speed, range).await;
        self.finish(generation, result)
    }

    async fn resolve_and_start(&self, generation: u64, request: &SourceRequest) -> Result<()> {
        let resolver = self.resolver.as_ref().ok_or_else(|| {
            KaraokeError::Configuration("No audio source resolver configured".to_string())
        })?;

        let source = resolver.resolve(request).await?.ok_or_else(|| {
            KaraokeError::ResourceUnavailable(format!("no audio source for {}", request.describe()))
        })?;

        // Скорость синтезированного аудио уже заложена в сам файл
        let speed = if source.speed_applied {
            1.0
        } else {
            request.speed.unwrap_or(self.config.default_speed)
        };
        debug!("Starting {} audio at rate {}", source.tier, speed);

        self.start_stream(generation, source.handle, speed, source.time_range)
            .await
    }

    async fn start_stream(
        &self,
        generation: u64,
        handle: AudioHandle,
        speed: f32,
        range: Option<AudioTimeRange>,
    ) -> Result<()> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(KaraokeError::InvalidInput(format!(
                "Playback speed must be positive, got {}",
                speed
            )));
        }
        if let Some(range) = &range {
            range.validate()?;
        }

        // Единственная точка ожидания: загрузка ресурса
        let mut stream = self.output.open(&handle).await?;

        let _delivery = self.delivery.lock();
        let duration = {
            let mut guard = self.session.lock();
            let s = &mut *guard;
            if s.generation != generation {
                debug!("Discarding superseded load of {}", handle.describe());
                return Err(KaraokeError::Superseded);
            }

            stream.set_playback_rate(speed);
            if let Some(range) = &range {
                stream.set_position(range.start_time);
            }
            stream.start()?;

            let resource_duration = stream.duration();
            s.range = range;
            s.stream = Some(stream);
            s.handle = Some(handle);
            s.status = PlaybackStatus::Playing;
            s.current_time = 0.0;
            s.duration = s.logical_duration(resource_duration);
            s.frame_loop = Some(self.scheduler.schedule(self.tick_fn(generation)));
            s.duration
        };

        info!("Playback started ({:.1}s)", duration);
        self.observers.notify(&PlaybackEvent::Started { duration });
        Ok(())
    }

    /// Освободить предыдущую сессию и перейти в `Loading`
    fn begin_loading(&self) -> u64 {
        let _delivery = self.delivery.lock();
        let (generation, released) = {
            let mut s = self.session.lock();
            let released = s.release();
            s.generation += 1;
            s.status = PlaybackStatus::Loading;
            s.error = None;
            s.current_time = 0.0;
            s.duration = 0.0;
            (s.generation, released)
        };
        if released {
            self.observers.notify(&PlaybackEvent::Stopped);
        }
        generation
    }

    fn finish(&self, generation: u64, result: Result<()>) -> Result<()> {
        let err = match result {
            Ok(()) => return Ok(()),
            Err(KaraokeError::Superseded) => return Err(KaraokeError::Superseded),
            Err(e) => e,
        };

        let message = err.to_string();
        let _delivery = self.delivery.lock();
        let current = {
            let mut s = self.session.lock();
            if s.generation == generation {
                s.fail(message.clone());
                true
            } else {
                false
            }
        };
        if current {
            error!("{}", message);
            self.observers.notify(&PlaybackEvent::Error(message));
        }
        Err(err)
    }

    /// Пауза; ничего не делает, если звук не идет
    pub fn pause(&self) {
        let _delivery = self.delivery.lock();
        {
            let mut guard = self.session.lock();
            let s = &mut *guard;
            if s.status != PlaybackStatus::Playing {
                return;
            }
            if let Some(frame_loop) = s.frame_loop.take() {
                frame_loop.cancel();
            }
            let start = s.range_start();
            if let Some(stream) = s.stream.as_mut() {
                stream.pause();
                s.current_time = (stream.position() - start).max(0.0);
            }
            s.status = PlaybackStatus::Paused;
        }
        debug!("Playback paused");
        self.observers.notify(&PlaybackEvent::Paused);
    }

    /// Продолжить после паузы; ничего не делает вне паузы
    pub fn resume(&self) -> Result<()> {
        let _delivery = self.delivery.lock();
        let result = {
            let mut guard = self.session.lock();
            let s = &mut *guard;
            if s.status != PlaybackStatus::Paused {
                return Ok(());
            }
            let generation = s.generation;
            let started = match s.stream.as_mut() {
                Some(stream) => stream.start(),
                None => Err(KaraokeError::PlaybackFailure("no active stream".to_string())),
            };
            match started {
                Ok(()) => {
                    s.status = PlaybackStatus::Playing;
                    s.frame_loop = Some(self.scheduler.schedule(self.tick_fn(generation)));
                    Ok(())
                }
                Err(e) => {
                    s.fail(e.to_string());
                    Err(e)
                }
            }
        };

        match &result {
            Ok(()) => {
                debug!("Playback resumed");
                self.observers.notify(&PlaybackEvent::Resumed);
            }
            Err(e) => {
                error!("Failed to resume playback: {}", e);
                self.observers.notify(&PlaybackEvent::Error(e.to_string()));
            }
        }
        result
    }

    /// Перейти на смещение в секундах от начала клипа
    pub fn seek(&self, offset: f64) {
        let _delivery = self.delivery.lock();
        let current_time = {
            let mut guard = self.session.lock();
            let s = &mut *guard;
            let start = s.range_start();
            let duration = s.duration;
            let Some(stream) = s.stream.as_mut() else {
                return;
            };

            let mut offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
            if duration > 0.0 {
                offset = offset.min(duration);
            }
            stream.set_position(start + offset);
            s.current_time = offset;
            offset
        };
        self.observers.notify(&PlaybackEvent::TimeUpdate { current_time });
    }

    /// Остановить воспроизведение и освободить ресурс
    ///
    /// Безопасно в любом состоянии, повторный вызов ничего не меняет.
    pub fn stop(&self) {
        let _delivery = self.delivery.lock();
        let changed = {
            let mut s = self.session.lock();
            let active = s.status != PlaybackStatus::Idle;
            let released = s.release();
            let moved = s.current_time != 0.0;
            s.generation += 1;
            s.status = PlaybackStatus::Idle;
            s.current_time = 0.0;
            s.duration = 0.0;
            active || released || moved
        };
        if changed {
            info!("Playback stopped");
            self.observers.notify(&PlaybackEvent::Stopped);
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.session.lock().snapshot()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.session.lock().status
    }

    pub fn is_playing(&self) -> bool {
        self.status() == PlaybackStatus::Playing
    }

    pub fn is_loading(&self) -> bool {
        self.status() == PlaybackStatus::Loading
    }

    pub fn error(&self) -> Option<String> {
        self.session.lock().error.clone()
    }

    pub fn current_time(&self) -> f64 {
        self.session.lock().current_time
    }

    pub fn duration(&self) -> f64 {
        self.session.lock().duration
    }

    fn tick_fn(&self, generation: u64) -> TickFn {
        let session = Arc::downgrade(&self.session);
        let observers = Arc::downgrade(&self.observers);
        let delivery = Arc::downgrade(&self.delivery);
        Box::new(move || run_tick(&session, &observers, &delivery, generation))
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.session.lock().release();
    }
}

fn run_tick(
    session: &Weak<Mutex<Session>>,
    observers: &Weak<ObserverHub>,
    delivery: &Weak<ReentrantMutex<()>>,
    generation: u64,
) -> TickFlow {
    let (Some(session), Some(delivery)) = (session.upgrade(), delivery.upgrade()) else {
        return TickFlow::Stop;
    };
    // Поколение проверяется и событие доставляется под одной блокировкой
    let _delivery = delivery.lock();
    let (flow, event) = tick(&session, generation);
    if let (Some(event), Some(observers)) = (event, observers.upgrade()) {
        observers.notify(&event);
    }
    flow
}

/// Один кадр цикла опроса
fn tick(session: &Mutex<Session>, generation: u64) -> (TickFlow, Option<PlaybackEvent>) {
    let mut guard = session.lock();
    let s = &mut *guard;
    if s.generation != generation || s.status != PlaybackStatus::Playing {
        return (TickFlow::Stop, None);
    }

    let start = s.range_start();
    let range_end = s.range.and_then(|r| r.end_time);
    let Some(stream) = s.stream.as_mut() else {
        return (TickFlow::Stop, None);
    };
    let failure = stream.take_error();
    let position = stream.position();
    let resource_duration = stream.duration();
    let ended = stream.has_ended() || range_end.map_or(false, |end| position >= end);
    let paused = stream.is_paused();

    if let Some(message) = failure {
        let err = KaraokeError::PlaybackFailure(message);
        error!("{}", err);
        s.fail(err.to_string());
        return (TickFlow::Stop, Some(PlaybackEvent::Error(err.to_string())));
    }

    if s.duration <= 0.0 {
        s.duration = s.logical_duration(resource_duration);
    }

    if ended {
        s.current_time = if s.duration > 0.0 {
            s.duration
        } else {
            (position - start).max(0.0)
        };
        s.release();
        s.status = PlaybackStatus::Idle;
        info!("Playback finished");
        return (TickFlow::Stop, Some(PlaybackEvent::Ended));
    }

    if paused {
        s.frame_loop = None;
        s.current_time = (position - start).max(0.0);
        s.status = PlaybackStatus::Paused;
        return (TickFlow::Stop, Some(PlaybackEvent::Paused));
    }

    let mut current_time = (position - start).max(0.0);
    if s.duration > 0.0 {
        current_time = current_time.min(s.duration);
    }
    s.current_time = current_time;
    (TickFlow::Continue, Some(PlaybackEvent::TimeUpdate { current_time }))
}
