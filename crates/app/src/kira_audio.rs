//! Audio backend on top of kira.

use std::{collections::HashMap, fs, io, io::Cursor, path::Path, time::Duration};

use beatmap_player_core::{
    AudioBackend, PlayerError, Result, SampleSink, ScheduledSample, TrackInfo,
};
use kira::{
    sound::{
        static_sound::{StaticSoundData, StaticSoundHandle},
        PlaybackState,
    },
    AudioManager, AudioManagerSettings, Decibels, DefaultBackend, StartTime, Tween,
};
use tracing::{debug, trace, warn};

const SAMPLE_EXTENSIONS: [&str; 3] = ["wav", "ogg", "mp3"];

pub struct KiraAudio {
    manager: AudioManager<DefaultBackend>,
    track: Option<StaticSoundHandle>,
    samples: HashMap<String, StaticSoundData>,
    rate: f64,
}

impl KiraAudio {
    pub fn new() -> Result<Self> {
        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .map_err(|err| PlayerError::Io(io::Error::other(err.to_string())))?;

        Ok(Self {
            manager,
            track: None,
            samples: HashMap::new(),
            rate: 1.0,
        })
    }

    /// Loads every sample file in `dir` except `exclude`, keyed by file stem.
    /// Files that fail to decode are skipped.
    pub fn load_samples(&mut self, dir: &Path, exclude: Option<&Path>) -> Result<usize> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if exclude.is_some_and(|skip| skip.file_name() == path.file_name()) {
                continue;
            }

            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase);
            let is_sample = extension.is_some_and(|ext| SAMPLE_EXTENSIONS.contains(&ext.as_str()));

            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if !is_sample {
                continue;
            }

            match StaticSoundData::from_file(&path) {
                Ok(data) => {
                    self.samples.insert(stem.to_ascii_lowercase(), data);
                }
                Err(err) => warn!(path = %path.display(), "skipping hit sound: {err}"),
            }
        }

        debug!(count = self.samples.len(), dir = %dir.display(), "hit sounds loaded");
        Ok(self.samples.len())
    }

    /// Looks a sample up by name, falling back to the unnumbered bank sample.
    fn sample(&self, name: &str) -> Option<&StaticSoundData> {
        let stem = Path::new(name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(name)
            .to_ascii_lowercase();

        self.samples
            .get(&stem)
            .or_else(|| self.samples.get(stem.trim_end_matches(|c: char| c.is_ascii_digit())))
    }
}

fn to_decibels(amplitude: f32) -> Decibels {
    if amplitude <= 0.001 {
        Decibels::SILENCE
    } else {
        Decibels(20.0 * amplitude.log10())
    }
}

impl SampleSink for KiraAudio {
    fn play_sample(&mut self, sample: &ScheduledSample) {
        let Some(data) = self.sample(&sample.name) else {
            trace!(name = %sample.name, "no sample loaded");
            return;
        };

        let data = data
            .clone()
            .volume(to_decibels(sample.volume))
            .start_time(StartTime::Delayed(Duration::from_secs_f64(
                sample.delay.max(0.0) / 1000.0,
            )));

        if let Err(err) = self.manager.play(data) {
            warn!(name = %sample.name, "failed to play hit sound: {err}");
        }
    }
}

impl AudioBackend for KiraAudio {
    fn load(&mut self, bytes: &[u8]) -> Result<TrackInfo> {
        let data = StaticSoundData::from_cursor(Cursor::new(bytes.to_vec()))
            .map_err(|err| PlayerError::AudioDecodeFailure(err.to_string()))?;
        let duration = data.duration().as_secs_f64() * 1000.0;

        if let Some(mut previous) = self.track.take() {
            let _ = previous.stop(Tween::default());
        }

        let mut handle = self
            .manager
            .play(data)
            .map_err(|err| PlayerError::AudioDecodeFailure(err.to_string()))?;
        let _ = handle.pause(Tween::default());
        let _ = handle.set_playback_rate(self.rate, Tween::default());
        self.track = Some(handle);

        Ok(TrackInfo {
            duration: Some(duration),
        })
    }

    fn play(&mut self, offset: f64) -> Result<()> {
        let handle = self.track.as_mut().ok_or(PlayerError::NotReady("play"))?;
        let _ = handle.seek_to(offset / 1000.0);
        let _ = handle.resume(Tween::default());
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(handle) = &mut self.track {
            let _ = handle.pause(Tween::default());
        }
    }

    fn seek(&mut self, time: f64) -> Result<()> {
        let handle = self.track.as_mut().ok_or(PlayerError::NotReady("seek"))?;
        let _ = handle.seek_to(time / 1000.0);
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.track
            .as_ref()
            .map_or(0.0, |handle| handle.position() * 1000.0)
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.rate = rate;

        if let Some(handle) = &mut self.track {
            let _ = handle.set_playback_rate(rate, Tween::default());
        }
    }

    fn is_playing(&self) -> bool {
        self.track
            .as_ref()
            .is_some_and(|handle| handle.state() == PlaybackState::Playing)
    }
}
