use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use crate::config::PlaybackConfig;
use crate::error::{KaraokeError, Result};
use crate::source::{FallbackChain, ResolvedSource, SourceRequest, SourceResolver};
use super::*;

/// Состояние поддельного потока, доступное тесту
struct StreamState {
    position: f64,
    paused: bool,
    ended: bool,
    error: Option<String>,
    rate: f32,
}

struct FakeStream {
    state: Arc<Mutex<StreamState>>,
    duration: Option<f64>,
    live: Arc<AtomicUsize>,
}

impl AudioStream for FakeStream {
    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn position(&self) -> f64 {
        self.state.lock().position
    }

    fn set_position(&mut self, seconds: f64) {
        self.state.lock().position = seconds;
    }

    fn set_playback_rate(&mut self, rate: f32) {
        self.state.lock().rate = rate;
    }

    fn start(&mut self) -> Result<()> {
        self.state.lock().paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn has_ended(&self) -> bool {
        self.state.lock().ended
    }

    fn take_error(&mut self) -> Option<String> {
        self.state.lock().error.take()
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

struct FakeOutput {
    duration: Option<f64>,
    fail_open: bool,
    gate: Mutex<Option<Arc<Notify>>>,
    streams: Mutex<Vec<Arc<Mutex<StreamState>>>>,
    live: Arc<AtomicUsize>,
}

impl FakeOutput {
    fn new(duration: f64) -> Arc<Self> {
        Arc::new(Self::with(Some(duration), false))
    }

    fn with(duration: Option<f64>, fail_open: bool) -> Self {
        Self {
            duration,
            fail_open,
            gate: Mutex::new(None),
            streams: Mutex::new(Vec::new()),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn last(&self) -> Arc<Mutex<StreamState>> {
        self.streams.lock().last().cloned().expect("no stream opened")
    }

    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioOutput for FakeOutput {
    async fn open(&self, _handle: &AudioHandle) -> Result<Box<dyn AudioStream>> {
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_open {
            return Err(KaraokeError::ResourceUnavailable("HTTP 404".to_string()));
        }

        let state = Arc::new(Mutex::new(StreamState {
            position: 0.0,
            paused: true,
            ended: false,
            error: None,
            rate: 1.0,
        }));
        self.streams.lock().push(state.clone());
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            state,
            duration: self.duration,
            live: self.live.clone(),
        }))
    }
}

struct Recorder {
    events: Arc<Mutex<Vec<PlaybackEvent>>>,
}

impl PlaybackObserver for Recorder {
    fn on_playback_event(&self, event: &PlaybackEvent) {
        self.events.lock().push(event.clone());
    }
}

struct Harness {
    controller: PlaybackController,
    output: Arc<FakeOutput>,
    scheduler: Arc<ManualFrameScheduler>,
    events: Arc<Mutex<Vec<PlaybackEvent>>>,
}

impl Harness {
    fn new(output: Arc<FakeOutput>) -> Self {
        let scheduler = Arc::new(ManualFrameScheduler::new());
        let controller = PlaybackController::new(output.clone(), scheduler.clone(), PlaybackConfig::default());
        let events = Arc::new(Mutex::new(Vec::new()));
        controller.add_observer(Box::new(Recorder { events: events.clone() }));
        Self {
            controller,
            output,
            scheduler,
            events,
        }
    }

    fn count(&self, event: &PlaybackEvent) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }

    fn last_event(&self) -> Option<PlaybackEvent> {
        self.events.lock().last().cloned()
    }
}

fn url(name: &str) -> AudioHandle {
    AudioHandle::Url(name.to_string())
}

#[tokio::test]
async fn test_second_play_releases_first_session() {
    let h = Harness::new(FakeOutput::new(200.0));

    h.controller.play_source(url("a.mp3"), None, None).await.unwrap();
    let first = h.output.last();
    first.lock().position = 12.0;

    h.controller.play_source(url("b.mp3"), None, None).await.unwrap();
    assert_eq!(h.output.live(), 1);
    assert_eq!(h.scheduler.active_loops(), 1);
    assert!(first.lock().paused);
    assert_eq!(first.lock().position, 0.0);
    assert!(h.controller.is_playing());

    h.controller.stop();
    assert_eq!(h.output.live(), 0);
    assert_eq!(h.scheduler.active_loops(), 0);
    assert_eq!(h.controller.status(), PlaybackStatus::Idle);
    assert_eq!(h.controller.current_time(), 0.0);
}

#[tokio::test]
async fn test_time_range_is_played_as_clip() {
    let h = Harness::new(FakeOutput::new(200.0));
    let range = AudioTimeRange::new(30.0, Some(45.0));

    h.controller.play_source(url("full.mp3"), None, Some(range)).await.unwrap();
    let stream = h.output.last();
    assert_eq!(stream.lock().position, 30.0);
    assert_eq!(h.controller.duration(), 15.0);
    assert_eq!(h.controller.current_time(), 0.0);
    assert_eq!(h.events.lock()[0], PlaybackEvent::Started { duration: 15.0 });

    stream.lock().position = 40.0;
    assert_eq!(h.scheduler.run_frame(), 1);
    assert!((h.controller.current_time() - 10.0).abs() < 1e-9);

    stream.lock().position = 45.0;
    h.scheduler.run_frame();
    assert_eq!(h.last_event(), Some(PlaybackEvent::Ended));
    assert_eq!(h.controller.status(), PlaybackStatus::Idle);
    assert_eq!(h.controller.current_time(), 15.0);
    assert_eq!(h.scheduler.active_loops(), 0);
    assert_eq!(h.output.live(), 0);
}

#[tokio::test]
async fn test_natural_end() {
    let h = Harness::new(FakeOutput::new(8.0));
    h.controller.play_source(url("a.mp3"), None, None).await.unwrap();
    let stream = h.output.last();

    {
        let mut s = stream.lock();
        s.position = 8.0;
        s.ended = true;
    }
    h.scheduler.run_frame();
    assert_eq!(h.count(&PlaybackEvent::Ended), 1);
    assert_eq!(h.controller.current_time(), 8.0);
    assert!(!h.controller.is_playing());
    assert_eq!(h.scheduler.run_frame(), 0);
}

#[tokio::test]
async fn test_pause_and_resume() {
    let h = Harness::new(FakeOutput::new(60.0));

    h.controller.pause();
    assert!(h.controller.resume().is_ok());
    assert!(h.events.lock().is_empty());

    h.controller.play_source(url("a.mp3"), None, None).await.unwrap();
    let stream = h.output.last();
    stream.lock().position = 3.5;

    h.controller.pause();
    h.controller.pause();
    assert_eq!(h.controller.status(), PlaybackStatus::Paused);
    assert_eq!(h.controller.current_time(), 3.5);
    assert!(stream.lock().paused);
    assert_eq!(h.scheduler.active_loops(), 0);
    assert_eq!(h.count(&PlaybackEvent::Paused), 1);

    h.controller.resume().unwrap();
    h.controller.resume().unwrap();
    assert!(h.controller.is_playing());
    assert!(!stream.lock().paused);
    assert_eq!(h.scheduler.active_loops(), 1);
    assert_eq!(h.count(&PlaybackEvent::Resumed), 1);
}

#[tokio::test]
async fn test_external_pause_stops_loop() {
    let h = Harness::new(FakeOutput::new(60.0));
    h.controller.play_source(url("a.mp3"), None, None).await.unwrap();

    h.output.last().lock().paused = true;
    h.scheduler.run_frame();
    assert_eq!(h.controller.status(), PlaybackStatus::Paused);
    assert_eq!(h.scheduler.active_loops(), 0);

    h.controller.resume().unwrap();
    assert_eq!(h.scheduler.active_loops(), 1);
}

#[tokio::test]
async fn test_seek_relative_to_range() {
    let h = Harness::new(FakeOutput::new(200.0));
    h.controller
        .play_source(url("full.mp3"), None, Some(AudioTimeRange::new(30.0, Some(45.0))))
        .await
        .unwrap();
    let stream = h.output.last();

    h.controller.seek(5.0);
    assert_eq!(stream.lock().position, 35.0);
    assert_eq!(h.controller.current_time(), 5.0);

    h.controller.seek(100.0);
    assert_eq!(stream.lock().position, 45.0);
    assert_eq!(h.controller.current_time(), 15.0);

    h.controller.seek(-3.0);
    assert_eq!(stream.lock().position, 30.0);

    h.controller.stop();
    h.controller.seek(5.0);
    assert_eq!(h.controller.current_time(), 0.0);
}

#[tokio::test]
async fn test_playback_error_moves_to_idle() {
    let h = Harness::new(FakeOutput::new(60.0));
    h.controller.play_source(url("a.mp3"), None, None).await.unwrap();

    h.output.last().lock().error = Some("decode failed".to_string());
    h.scheduler.run_frame();

    let state = h.controller.state();
    assert_eq!(state.status, PlaybackStatus::Idle);
    assert_eq!(state.error.as_deref(), Some("Playback error: decode failed"));
    assert_eq!(h.output.live(), 0);
    assert!(matches!(h.last_event(), Some(PlaybackEvent::Error(_))));

    // новый запуск сбрасывает ошибку
    h.controller.play_source(url("b.mp3"), None, None).await.unwrap();
    assert!(h.controller.error().is_none());
}

#[tokio::test]
async fn test_open_failure_is_reported() {
    let h = Harness::new(Arc::new(FakeOutput::with(Some(10.0), true)));

    let err = h.controller.play_source(url("missing.mp3"), None, None).await.unwrap_err();
    assert!(matches!(err, KaraokeError::ResourceUnavailable(_)));
    assert_eq!(h.controller.status(), PlaybackStatus::Idle);
    assert!(h.controller.error().unwrap().starts_with("Audio unavailable"));
    assert_eq!(h.scheduler.active_loops(), 0);
}

#[tokio::test]
async fn test_invalid_speed_rejected() {
    let h = Harness::new(FakeOutput::new(10.0));
    let err = h.controller.play_source(url("a.mp3"), Some(0.0), None).await.unwrap_err();
    assert!(matches!(err, KaraokeError::InvalidInput(_)));
    assert_eq!(h.output.live(), 0);
}

#[tokio::test]
async fn test_no_source_resolved() {
    let output = FakeOutput::new(10.0);
    let controller = PlaybackController::new(
        output.clone(),
        Arc::new(ManualFrameScheduler::new()),
        PlaybackConfig::default(),
    )
    .with_resolver(Arc::new(FallbackChain::new()));

    let request = SourceRequest::section("shema", "shema-1", "שְׁמַע יִשְׂרָאֵל");
    let err = controller.play(&request).await.unwrap_err();
    assert!(matches!(err, KaraokeError::ResourceUnavailable(_)));
    assert!(controller.error().unwrap().starts_with("Audio unavailable"));
    assert_eq!(controller.status(), PlaybackStatus::Idle);
}

struct SynthesizedTier;

#[async_trait]
impl SourceResolver for SynthesizedTier {
    fn name(&self) -> &str {
        "synthesis"
    }

    async fn resolve(&self, _request: &SourceRequest) -> Result<Option<ResolvedSource>> {
        let audio = SynthesizedAudio::from_bytes(b"ID3synth")?;
        let mut source = ResolvedSource::new(AudioHandle::Synthesized(audio), "synthesis");
        source.speed_applied = true;
        Ok(Some(source))
    }
}

struct FileTier;

#[async_trait]
impl SourceResolver for FileTier {
    fn name(&self) -> &str {
        "file"
    }

    async fn resolve(&self, _request: &SourceRequest) -> Result<Option<ResolvedSource>> {
        Ok(Some(ResolvedSource::new(url("section.mp3"), "file")))
    }
}

#[tokio::test]
async fn test_playback_rate_from_request() {
    let output = FakeOutput::new(10.0);
    let scheduler = Arc::new(ManualFrameScheduler::new());
    let request = SourceRequest::section("hodu", "hodu-1", "הוֹדוּ").with_speed(0.75);

    let file = PlaybackController::new(output.clone(), scheduler.clone(), PlaybackConfig::default())
        .with_resolver(Arc::new(FileTier));
    file.play(&request).await.unwrap();
    assert_eq!(output.last().lock().rate, 0.75);
    file.stop();

    let synth = PlaybackController::new(output.clone(), scheduler, PlaybackConfig::default())
        .with_resolver(Arc::new(SynthesizedTier));
    synth.play(&request).await.unwrap();
    assert_eq!(output.last().lock().rate, 1.0);
}

#[tokio::test]
async fn test_synthesized_file_removed_on_stop() {
    let h = Harness::new(FakeOutput::new(4.0));
    let audio = SynthesizedAudio::from_bytes(b"ID3synth").unwrap();
    let path = audio.path().to_path_buf();

    h.controller
        .play_source(AudioHandle::Synthesized(audio), Some(1.0), None)
        .await
        .unwrap();
    assert!(path.exists());

    h.controller.stop();
    assert!(!path.exists());
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let h = Harness::new(FakeOutput::new(10.0));
    h.controller.stop();
    assert!(h.events.lock().is_empty());

    h.controller.play_source(url("a.mp3"), None, None).await.unwrap();
    h.controller.stop();
    h.controller.stop();
    assert_eq!(h.count(&PlaybackEvent::Stopped), 1);
    assert_eq!(h.controller.state(), PlaybackState::default());
}

#[tokio::test]
async fn test_stop_during_load_supersedes() {
    let output = FakeOutput::new(10.0);
    let gate = Arc::new(Notify::new());
    *output.gate.lock() = Some(gate.clone());
    let h = Harness::new(output);

    let play = h.controller.play_source(url("slow.mp3"), None, None);
    let interrupt = async {
        tokio::task::yield_now().await;
        assert!(h.controller.is_loading());
        h.controller.stop();
        gate.notify_one();
    };
    let (result, ()) = tokio::join!(play, interrupt);

    assert!(matches!(result, Err(KaraokeError::Superseded)));
    assert_eq!(h.controller.status(), PlaybackStatus::Idle);
    assert!(h.controller.error().is_none());
    assert_eq!(h.output.live(), 0);
    assert_eq!(h.scheduler.active_loops(), 0);
}

#[tokio::test]
async fn test_dropping_controller_releases_resource() {
    let h = Harness::new(FakeOutput::new(10.0));
    h.controller.play_source(url("a.mp3"), None, None).await.unwrap();

    let Harness { controller, output, scheduler, .. } = h;
    drop(controller);
    assert_eq!(output.live(), 0);
    assert_eq!(scheduler.run_frame(), 0);
}
