//! Transport and frame pump.
//!
//! [`Player`] owns every piece of mutable playback state and is driven by
//! the host calling [`Player::frame`] once per display refresh. Control calls
//! (`play`, `pause`, `seek`, `set_mods`) run between frames and leave the
//! clock, drawables and hitsound cursor consistent before the next one.

use tracing::{debug, error, info, trace, warn};

use crate::{
    events::{LoadedEvent, TimeUpdate},
    AudioBackend, Chart, DrawableCache, DrawableSet, ErrorEvent, FrameRenderer, FrameStats,
    HitsoundScheduler, Mods, PlaybackClock, PlayerConfig, PlayerError, PlayerEvents, PreparedChart,
    RenderBackend, Result, Viewport,
};

/// Tail kept after the last object when the audio length is unknown.
const TRAILING_MS: f64 = 2000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Unloaded,
    /// Loaded and paused.
    Ready,
    Playing,
    Ended,
    Disposed,
}

impl PlayerState {
    pub fn is_loaded(self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Ended)
    }
}

/// Handle for a pending frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No frame was pending, or nothing is loaded.
    Idle,
    Rendered(FrameStats),
    /// The track reached its end on this frame.
    Ended(FrameStats),
}

#[derive(Debug)]
struct Session {
    chart: PreparedChart,
    scheduler: HitsoundScheduler,
    duration: f64,
}

pub struct Player<A: AudioBackend> {
    config: PlayerConfig,
    audio: A,
    state: PlayerState,
    session: Option<Session>,
    cache: DrawableCache,
    renderer: FrameRenderer,
    clock: PlaybackClock,
    mods: Mods,
    speed: f64,
    events: PlayerEvents,
    visible: Vec<usize>,
    pending_frame: Option<FrameRequest>,
    next_request: u64,
}

impl<A: AudioBackend> Player<A> {
    pub fn new(audio: A, config: PlayerConfig) -> Self {
        Self {
            clock: PlaybackClock::new(config.clock.clone()),
            config,
            audio,
            state: PlayerState::Unloaded,
            session: None,
            cache: DrawableCache::new(),
            renderer: FrameRenderer::default(),
            mods: Mods::empty(),
            speed: 1.0,
            events: PlayerEvents::default(),
            visible: Vec::new(),
            pending_frame: None,
            next_request: 0,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }

    pub fn render_time(&self) -> f64 {
        self.clock.render_time()
    }

    /// Track length in milliseconds, once loaded.
    pub fn duration(&self) -> Option<f64> {
        self.session.as_ref().map(|session| session.duration)
    }

    pub fn chart(&self) -> Option<&PreparedChart> {
        self.session.as_ref().map(|session| &session.chart)
    }

    pub fn scheduler(&self) -> Option<&HitsoundScheduler> {
        self.session.as_ref().map(|session| &session.scheduler)
    }

    pub fn drawables(&self) -> Option<&DrawableSet> {
        self.cache.current()
    }

    /// Indices of the objects drawn by the last frame.
    pub fn visible(&self) -> &[usize] {
        &self.visible
    }

    pub fn mods(&self) -> Mods {
        self.mods
    }

    /// Effective rate: the user speed times the rate implied by the mods.
    pub fn playback_rate(&self) -> f64 {
        self.speed * self.mods.playback_rate()
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    pub fn events_mut(&mut self) -> &mut PlayerEvents {
        &mut self.events
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.renderer.set_viewport(viewport);
    }

    /// Validates `chart`, decodes the track and precomputes every drawable.
    ///
    /// On failure the `error` notification fires once and the player is left
    /// unloaded.
    pub fn load(&mut self, chart: Chart, audio_bytes: &[u8]) -> Result<()> {
        if self.state == PlayerState::Disposed {
            warn!("load called on a disposed player");
            return Err(PlayerError::NotReady("load"));
        }

        self.unload();

        match self.prepare_session(chart, audio_bytes) {
            Ok(session) => {
                let loaded = LoadedEvent {
                    metadata: session.chart.metadata().clone(),
                    object_count: session.chart.hit_objects().len(),
                    duration: session.duration,
                    sound_events: session.scheduler.events().len(),
                };

                info!(
                    title = %loaded.metadata.title,
                    objects = loaded.object_count,
                    duration = loaded.duration,
                    "chart loaded"
                );

                self.session = Some(session);
                self.state = PlayerState::Ready;
                self.events.loaded.emit(&loaded);
                Ok(())
            }
            Err(err) => {
                error!(code = %err.code(), "failed to load chart: {err}");
                self.cache.clear();
                self.events.error.emit(&ErrorEvent::from(&err));
                Err(err)
            }
        }
    }

    fn prepare_session(&mut self, chart: Chart, audio_bytes: &[u8]) -> Result<Session> {
        let chart = chart.prepare()?;
        let track = self.audio.load(audio_bytes)?;
        self.audio.set_playback_rate(self.playback_rate());

        let set = self.cache.rebuild(&chart, self.mods, &self.config.curve);
        let scheduler = HitsoundScheduler::from_chart(&chart, set, self.config.hitsounds.clone());

        let duration = match track.duration {
            Some(duration) if duration.is_finite() && duration > 0.0 => duration,
            _ => set.last_end_time().unwrap_or(0.0) + TRAILING_MS,
        };

        Ok(Session {
            chart,
            scheduler,
            duration,
        })
    }

    fn unload(&mut self) {
        if self.state == PlayerState::Playing {
            self.audio.pause();
        }

        self.session = None;
        self.cache.clear();
        self.clock.reset();
        self.visible.clear();
        self.pending_frame = None;
        self.state = PlayerState::Unloaded;
    }

    /// Starts or resumes playback. After the end of the track, playback
    /// restarts from the beginning.
    pub fn play(&mut self) -> Result<()> {
        match self.state {
            PlayerState::Unloaded | PlayerState::Disposed => {
                warn!(state = ?self.state, "play ignored, nothing loaded");
                return Ok(());
            }
            PlayerState::Playing => return Ok(()),
            PlayerState::Ended => self.relocate(0.0)?,
            PlayerState::Ready => {}
        }

        let offset = self.audio.current_time();
        if let Err(err) = self.audio.play(offset) {
            return Err(self.report(err));
        }

        self.clock.relocate(offset);
        self.clock.suspend();
        self.state = PlayerState::Playing;
        self.request_frame();
        self.events.state_change.emit(&true);
        Ok(())
    }

    pub fn pause(&mut self) {
        match self.state {
            PlayerState::Playing => {
                self.audio.pause();
                self.clock.suspend();
                self.state = PlayerState::Ready;
                self.events.state_change.emit(&false);
            }
            PlayerState::Unloaded | PlayerState::Disposed => {
                warn!(state = ?self.state, "pause ignored, nothing loaded");
            }
            PlayerState::Ready | PlayerState::Ended => {}
        }
    }

    pub fn toggle(&mut self) -> Result<()> {
        if self.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Jumps to `target` milliseconds, clamped to the track.
    pub fn seek(&mut self, target: f64) -> Result<()> {
        let Some(duration) = self.duration() else {
            warn!(target, "seek ignored, nothing loaded");
            return Ok(());
        };

        let target = if target.is_finite() {
            target.clamp(0.0, duration)
        } else {
            0.0
        };

        self.relocate(target)?;

        if self.state == PlayerState::Ended {
            self.state = PlayerState::Ready;
        }

        debug!(target, "seeked");
        self.request_frame();
        self.events.seeked.emit(&target);
        Ok(())
    }

    fn relocate(&mut self, target: f64) -> Result<()> {
        if let Err(err) = self.audio.seek(target) {
            return Err(self.report(err));
        }

        self.clock.relocate(target);
        if let Some(set) = self.cache.current_mut() {
            set.relocate(target);
        }
        if let Some(session) = &mut self.session {
            session.scheduler.seek(target);
        }

        Ok(())
    }

    /// Applies a new mod combination. Drawables are rebuilt off to the side
    /// and swapped in, then fast-forwarded to the current time.
    pub fn set_mods(&mut self, mods: Mods) {
        self.mods = mods;
        self.audio.set_playback_rate(self.playback_rate());

        let Some(session) = &mut self.session else {
            return;
        };

        if !self.cache.ensure(&session.chart, mods, &self.config.curve) {
            return;
        }

        let now = self.clock.render_time();
        if let Some(set) = self.cache.current_mut() {
            set.relocate(now);
            let mut scheduler =
                HitsoundScheduler::from_chart(&session.chart, set, self.config.hitsounds.clone());
            scheduler.resume_after(&session.scheduler, now);
            session.scheduler = scheduler;
        }

        self.request_frame();
    }

    /// Sets the user speed multiplier. Non-positive or non-finite speeds are
    /// ignored.
    pub fn set_playback_rate(&mut self, speed: f64) {
        if !speed.is_finite() || speed <= 0.0 {
            warn!(speed, "ignoring invalid playback rate");
            return;
        }

        self.speed = speed;
        self.audio.set_playback_rate(self.playback_rate());
    }

    /// Stops playback and drops everything. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.state == PlayerState::Disposed {
            return;
        }

        self.unload();
        self.events.clear();
        self.state = PlayerState::Disposed;
        debug!("player disposed");
    }

    /// Schedules the next frame. Returns `None` once disposed.
    pub fn request_frame(&mut self) -> Option<FrameRequest> {
        if self.state == PlayerState::Disposed {
            return None;
        }

        if let Some(pending) = self.pending_frame {
            return Some(pending);
        }

        let request = FrameRequest(self.next_request);
        self.next_request += 1;
        self.pending_frame = Some(request);
        Some(request)
    }

    /// Cancels `request` if it is still pending.
    pub fn cancel_frame(&mut self, request: FrameRequest) -> bool {
        if self.pending_frame == Some(request) {
            self.pending_frame = None;
            true
        } else {
            false
        }
    }

    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.pending_frame
    }

    /// Runs one pending frame at host `timestamp` (milliseconds).
    ///
    /// While playing this advances the render clock, draws, fires due
    /// hitsounds and re-arms itself. While paused it redraws the current
    /// time once.
    pub fn frame(&mut self, timestamp: f64, backend: &mut dyn RenderBackend) -> FrameOutcome {
        if self.pending_frame.take().is_none() {
            return FrameOutcome::Idle;
        }

        let playing = self.is_playing();
        let rate = self.playback_rate();

        let time = if playing {
            let audio_time = self.audio.current_time();
            self.clock.tick(timestamp, audio_time, rate).render_time
        } else {
            self.clock.render_time()
        };

        let (Some(session), Some(set)) = (&mut self.session, self.cache.current_mut()) else {
            return FrameOutcome::Idle;
        };

        let armed = set.update(time, &mut self.visible);
        if armed > 0 {
            trace!(armed, time, "objects armed");
        }

        let stats = FrameStats {
            armed,
            ..self.renderer.render(set, &self.visible, time, backend)
        };

        if !playing {
            return FrameOutcome::Rendered(stats);
        }

        session.scheduler.update(time, rate, &mut self.audio);

        let duration = session.duration;
        self.events.time_update.emit(&TimeUpdate {
            time: time.min(duration),
            duration,
        });

        if time >= duration {
            self.audio.pause();
            self.clock.suspend();
            self.state = PlayerState::Ended;
            debug!(time, duration, "track ended");
            self.events.state_change.emit(&false);
            self.events.ended.emit(&());
            return FrameOutcome::Ended(stats);
        }

        self.request_frame();
        FrameOutcome::Rendered(stats)
    }

    fn report(&mut self, err: PlayerError) -> PlayerError {
        error!(code = %err.code(), "{err}");
        self.events.error.emit(&ErrorEvent::from(&err));
        err
    }
}

impl<A: AudioBackend + std::fmt::Debug> std::fmt::Debug for Player<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("state", &self.state)
            .field("mods", &self.mods)
            .field("speed", &self.speed)
            .field("render_time", &self.clock.render_time())
            .field("audio", &self.audio)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{CountingBackend, HitObject, Pos2, SyntheticAudio, TimingPoint};

    fn chart() -> Chart {
        Chart {
            timing_points: vec![TimingPoint::uninherited(0.0, 500.0)],
            hit_objects: vec![
                HitObject::circle(500.0, Pos2::new(100.0, 100.0)),
                HitObject::circle(1000.0, Pos2::new(200.0, 100.0)),
            ],
            ..Chart::default()
        }
    }

    fn loaded() -> (Player<SyntheticAudio>, SyntheticAudio) {
        let audio = SyntheticAudio::new(None);
        let handle = audio.clone();
        let mut player = Player::new(audio, PlayerConfig::default());
        player.load(chart(), b"track").unwrap();
        (player, handle)
    }

    #[test]
    fn duration_falls_back_to_last_object() {
        let (player, _) = loaded();

        assert_eq!(player.state(), PlayerState::Ready);
        assert_eq!(player.duration(), Some(3000.0));
    }

    #[test]
    fn controls_before_load_are_noops() {
        let mut player = Player::new(SyntheticAudio::default(), PlayerConfig::default());
        let mut backend = CountingBackend::default();

        player.play().unwrap();
        player.pause();
        player.seek(1000.0).unwrap();

        assert_eq!(player.state(), PlayerState::Unloaded);
        assert!(!player.audio().is_playing());
        assert_eq!(player.frame(0.0, &mut backend), FrameOutcome::Idle);
    }

    #[test]
    fn cancelled_frame_does_not_run() {
        let (mut player, _) = loaded();
        let mut backend = CountingBackend::default();

        player.play().unwrap();
        let request = player.pending_frame().unwrap();
        assert!(player.cancel_frame(request));
        assert!(!player.cancel_frame(request));

        assert_eq!(player.frame(0.0, &mut backend), FrameOutcome::Idle);
        assert_eq!(backend.draw_calls(), 0);
    }

    #[test]
    fn toggle_emits_state_changes() {
        let (mut player, _) = loaded();
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        player
            .events_mut()
            .state_change
            .subscribe(move |playing| sink.borrow_mut().push(*playing));

        player.toggle().unwrap();
        player.toggle().unwrap();

        assert_eq!(*changes.borrow(), vec![true, false]);
        assert_eq!(player.state(), PlayerState::Ready);
    }

    #[test]
    fn mods_change_rate_and_rebuild() {
        let (mut player, handle) = loaded();
        let generation = player.drawables().unwrap().generation();

        player.set_mods(Mods::DOUBLE_TIME);
        assert_eq!(handle.rate(), 1.5);
        assert_eq!(player.drawables().unwrap().generation(), generation + 1);

        player.set_playback_rate(2.0);
        assert_eq!(player.playback_rate(), 3.0);
        player.set_playback_rate(-1.0);
        assert_eq!(player.playback_rate(), 3.0);
    }

    #[test]
    fn paused_frame_redraws_without_advancing() {
        let (mut player, _) = loaded();
        let mut backend = CountingBackend::default();

        player.seek(400.0).unwrap();
        let outcome = player.frame(1000.0, &mut backend);

        assert!(matches!(outcome, FrameOutcome::Rendered(stats) if stats.objects == 2));
        assert_eq!(player.render_time(), 400.0);
        assert_eq!(player.frame(2000.0, &mut backend), FrameOutcome::Idle);
    }

    #[test]
    fn dispose_is_idempotent_and_silences_listeners() {
        let (mut player, _) = loaded();
        let fired = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&fired);
        player
            .events_mut()
            .seeked
            .subscribe(move |_| *counter.borrow_mut() += 1);

        player.dispose();
        player.dispose();
        player.seek(100.0).unwrap();

        assert_eq!(player.state(), PlayerState::Disposed);
        assert_eq!(player.request_frame(), None);
        assert_eq!(*fired.borrow(), 0);
        assert!(player.load(chart(), b"track").is_err());
    }
}
