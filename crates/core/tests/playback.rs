use std::{cell::RefCell, rc::Rc};

use beatmap_player_core::{
    AudioBackend, Chart, CountingBackend, ErrorCode, FrameOutcome, HitObject, Mods, PathKind,
    Player, PlayerConfig, PlayerState, Pos2, SliderData, SoundKind, SyntheticAudio, TimingPoint,
};

const FRAME_MS: f64 = 16.0;

fn chart() -> Chart {
    Chart {
        timing_points: vec![TimingPoint::uninherited(0.0, 500.0)],
        hit_objects: vec![
            HitObject::circle(500.0, Pos2::new(100.0, 100.0)),
            HitObject::circle(1000.0, Pos2::new(300.0, 200.0)).with_new_combo(),
            HitObject::slider(
                2000.0,
                SliderData {
                    path_kind: PathKind::Linear,
                    control_points: vec![Pos2::new(50.0, 300.0), Pos2::new(330.0, 300.0)],
                    repeat_count: 0,
                    pixel_length: 280.0,
                    edge_sounds: Vec::new(),
                    edge_sets: Vec::new(),
                },
            ),
        ],
        ..Chart::default()
    }
}

struct Harness {
    player: Player<SyntheticAudio>,
    audio: SyntheticAudio,
    backend: CountingBackend,
    timestamp: f64,
    armed: usize,
}

impl Harness {
    fn new() -> Self {
        let audio = SyntheticAudio::new(None);
        let handle = audio.clone();
        let mut player = Player::new(audio, PlayerConfig::default());
        player.load(chart(), b"track").unwrap();

        Self {
            player,
            audio: handle,
            backend: CountingBackend::default(),
            timestamp: 0.0,
            armed: 0,
        }
    }

    /// Pumps frames until the player stops asking for them.
    fn run(&mut self, max_frames: usize) -> Option<FrameOutcome> {
        let mut last = None;

        for _ in 0..max_frames {
            if self.player.pending_frame().is_none() {
                break;
            }

            self.timestamp += FRAME_MS;
            self.audio.advance(FRAME_MS);
            let outcome = self.player.frame(self.timestamp, &mut self.backend);
            if let FrameOutcome::Rendered(stats) | FrameOutcome::Ended(stats) = outcome {
                self.armed += stats.armed;
            }
            last = Some(outcome);
        }

        last
    }

    /// Pumps frames until the render clock reaches `time`.
    fn run_until(&mut self, time: f64) {
        while self.player.render_time() < time && self.player.pending_frame().is_some() {
            self.run(1);
        }
    }

    fn hit_objects_played(&self) -> Vec<usize> {
        self.audio
            .played()
            .iter()
            .filter(|sample| sample.kind == SoundKind::Hit)
            .map(|sample| sample.object_index)
            .collect()
    }
}

#[test]
fn plays_through_to_the_end() {
    let mut harness = Harness::new();
    let ended = Rc::new(RefCell::new(0));
    let updates = Rc::new(RefCell::new(Vec::new()));

    let counter = Rc::clone(&ended);
    harness
        .player
        .events_mut()
        .ended
        .subscribe(move |_| *counter.borrow_mut() += 1);
    let times = Rc::clone(&updates);
    harness
        .player
        .events_mut()
        .time_update
        .subscribe(move |update| times.borrow_mut().push(update.time));

    assert_eq!(harness.player.duration(), Some(5000.0));
    harness.player.play().unwrap();

    let last = harness.run(1000);

    assert!(matches!(last, Some(FrameOutcome::Ended(_))));
    assert_eq!(harness.player.state(), PlayerState::Ended);
    assert_eq!(*ended.borrow(), 1);
    assert!(!harness.audio.is_playing());
    assert!(harness.backend.draw_calls() > 0);
    assert_eq!(harness.backend.depth, 0);
    assert_eq!(harness.armed, 3);

    let times = updates.borrow();
    assert!(times.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(times.last().copied(), Some(5000.0));
}

#[test]
fn every_hit_sound_fires_once_in_order() {
    let mut harness = Harness::new();
    harness.player.play().unwrap();
    harness.run(1000);

    assert_eq!(harness.hit_objects_played(), vec![0, 1, 2]);

    let played = harness.audio.played();
    assert!(played.iter().any(|sample| sample.kind == SoundKind::SliderTick));
    assert!(played.iter().all(|sample| sample.delay >= 0.0));
    assert!(played.windows(2).all(|pair| pair[0].time <= pair[1].time));
}

#[test]
fn seeking_back_replays_only_later_objects() {
    let mut harness = Harness::new();
    let seeks = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seeks);
    harness
        .player
        .events_mut()
        .seeked
        .subscribe(move |time| sink.borrow_mut().push(*time));

    harness.player.play().unwrap();
    harness.run(1000);
    harness.audio.clear_played();

    harness.player.seek(900.0).unwrap();
    assert_eq!(harness.player.state(), PlayerState::Ready);
    assert_eq!(harness.player.render_time(), 900.0);

    harness.player.play().unwrap();
    harness.run(1000);

    assert_eq!(harness.hit_objects_played(), vec![1, 2]);
    assert_eq!(*seeks.borrow(), vec![900.0]);
}

#[test]
fn render_clock_snaps_after_audio_jump() {
    let mut harness = Harness::new();
    harness.player.play().unwrap();
    harness.run(20);

    harness.audio.jump(50.0);
    harness.run(1);

    let audio_time = harness.audio.current_time();
    assert!((harness.player.render_time() - audio_time).abs() <= 30.0);
}

#[test]
fn double_time_keeps_hit_sounds_single() {
    let mut harness = Harness::new();
    harness.player.set_mods(Mods::DOUBLE_TIME);
    assert_eq!(harness.audio.rate(), 1.5);

    harness.player.play().unwrap();
    let last = harness.run(1000);

    assert!(matches!(last, Some(FrameOutcome::Ended(_))));
    assert_eq!(harness.hit_objects_played(), vec![0, 1, 2]);
}

#[test]
fn mods_change_mid_play_does_not_replay_passed_objects() {
    let mut harness = Harness::new();
    harness.player.play().unwrap();
    harness.run(80);

    harness.player.set_mods(Mods::HIDDEN | Mods::HARD_ROCK);
    harness.run(1000);

    assert_eq!(harness.hit_objects_played(), vec![0, 1, 2]);
}

#[test]
fn audio_failure_reports_once_and_stays_unloaded() {
    let mut player = Player::new(SyntheticAudio::rejecting_input(), PlayerConfig::default());
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    player
        .events_mut()
        .error
        .subscribe(move |event| sink.borrow_mut().push(event.code));

    assert!(player.load(chart(), b"garbage").is_err());
    player.play().unwrap();

    assert_eq!(*errors.borrow(), vec![ErrorCode::AudioDecodeFailure]);
    assert_eq!(player.state(), PlayerState::Unloaded);
    assert_eq!(player.pending_frame(), None);
}

#[test]
fn invalid_chart_is_rejected() {
    let mut player = Player::new(SyntheticAudio::default(), PlayerConfig::default());
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    player
        .events_mut()
        .error
        .subscribe(move |event| sink.borrow_mut().push(event.code));

    let mut broken = chart();
    broken.hit_objects.push(HitObject::circle(f64::NAN, Pos2::ZERO));

    assert!(player.load(broken, b"track").is_err());
    assert_eq!(*errors.borrow(), vec![ErrorCode::InvalidChart]);
    assert!(player.drawables().is_none());
}

#[test]
fn mods_change_inside_lookahead_keeps_hit_sounds_single() {
    for mods in [Mods::HIDDEN, Mods::HARD_ROCK, Mods::DOUBLE_TIME] {
        let mut harness = Harness::new();
        harness.player.play().unwrap();

        // the circle at 1000 has already been handed to the audio engine
        harness.run_until(950.0);
        assert_eq!(harness.hit_objects_played(), vec![0, 1]);

        harness.player.set_mods(mods);
        harness.run(1000);

        assert_eq!(harness.hit_objects_played(), vec![0, 1, 2], "mods {mods:?}");
    }
}
