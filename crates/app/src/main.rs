use std::{
    cell::Cell,
    path::{Path, PathBuf},
    rc::Rc,
    thread,
    time::{Duration, Instant},
};

use beatmap_player_core::{
    AudioBackend, Chart, CountingBackend, CurveConfig, DrawableSet, FrameOutcome, HitObjectKind,
    Mods, Player, PlayerConfig, PlayerError, SyntheticAudio,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod convert;
mod kira_audio;

use convert::chart_from_beatmap;
use kira_audio::KiraAudio;

fn main() -> beatmap_player_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { chart, mods } => run_inspect(&chart, &mods),
        Commands::Simulate {
            chart,
            mods,
            fps,
            config,
        } => run_simulate(&chart, &mods, fps, config.as_deref()),
        Commands::Play {
            chart,
            mods,
            config,
            samples,
        } => run_play(&chart, &mods, config.as_deref(), samples.as_deref()),
    }
}

fn load_chart(path: &Path) -> beatmap_player_core::Result<Chart> {
    tracing::info!(path = %path.display(), "parsing chart");
    let beatmap: rosu_map::Beatmap = rosu_map::from_path(path)?;
    Ok(chart_from_beatmap(&beatmap))
}

fn load_config(path: Option<&Path>) -> beatmap_player_core::Result<PlayerConfig> {
    path.map_or_else(|| Ok(PlayerConfig::default()), PlayerConfig::load)
}

fn audio_path(chart_path: &Path, chart: &Chart) -> Option<PathBuf> {
    let name = chart.audio_file.as_deref()?;
    chart_path.parent().map(|dir| dir.join(name))
}

fn run_inspect(path: &Path, mods: &str) -> beatmap_player_core::Result<()> {
    let mods = Mods::parse(mods)?;
    let chart = load_chart(path)?;
    let prepared = chart.prepare()?;
    let adjusted = mods.apply(prepared.difficulty());
    let set = DrawableSet::build(&prepared, mods, &CurveConfig::default(), 0);
    let ticks: usize = set
        .drawables()
        .iter()
        .filter_map(|drawable| drawable.slider())
        .map(|geometry| geometry.ticks().count())
        .sum();

    let (mut circles, mut sliders, mut spinners, mut holds) = (0, 0, 0, 0);
    for object in prepared.hit_objects() {
        match object.kind {
            HitObjectKind::Circle => circles += 1,
            HitObjectKind::Slider(_) => sliders += 1,
            HitObjectKind::Spinner { .. } => spinners += 1,
            HitObjectKind::Hold { .. } => holds += 1,
        }
    }

    let metadata = prepared.metadata();
    println!(
        "{} - {} [{}] by {}",
        metadata.artist, metadata.title, metadata.version, metadata.creator
    );
    println!("format v{}", prepared.format_version());
    println!(
        "objects: {circles} circles, {sliders} sliders, {spinners} spinners, {holds} holds"
    );
    println!("timing points: {}", prepared.timing_points().len());
    println!(
        "last object ends at {:.0} ms, {ticks} slider ticks",
        set.last_end_time().unwrap_or(0.0)
    );
    println!(
        "difficulty ({}): CS {:.1} AR {:.1} OD {:.1} HP {:.1}, rate x{}",
        if mods.is_empty() { "NM".to_owned() } else { mods.acronyms() },
        adjusted.circle_size,
        adjusted.approach_rate,
        adjusted.overall_difficulty,
        adjusted.hp_drain_rate,
        mods.playback_rate(),
    );

    Ok(())
}

/// Plays the chart against a synthetic clock as fast as possible.
fn run_simulate(
    path: &Path,
    mods: &str,
    fps: u32,
    config: Option<&Path>,
) -> beatmap_player_core::Result<()> {
    let mods = Mods::parse(mods)?;
    let config = load_config(config)?;
    let chart = load_chart(path)?;
    let frame_ms = 1000.0 / f64::from(fps.max(1));

    let audio = SyntheticAudio::new(None);
    let clock = audio.clone();
    let mut player = Player::new(audio, config);
    subscribe_lifecycle(&mut player);
    player.set_mods(mods);
    player.load(chart, &[])?;
    player.play()?;

    let mut backend = CountingBackend::default();
    let mut timestamp = 0.0;
    let mut frames = 0u64;
    let mut peak_visible = 0;

    while player.pending_frame().is_some() {
        timestamp += frame_ms;
        clock.advance(frame_ms);
        frames += 1;

        let outcome = player.frame(timestamp, &mut backend);
        peak_visible = peak_visible.max(player.visible().len());

        if matches!(outcome, FrameOutcome::Ended(_)) {
            break;
        }
    }

    let played = clock.played();
    let scheduler = player.scheduler();
    println!(
        "{frames} frames, {} draw calls, peak {peak_visible} visible objects",
        backend.draw_calls()
    );
    println!(
        "{} samples played, {} events skipped",
        played.len(),
        scheduler.map_or(0, |scheduler| scheduler.skipped()),
    );

    Ok(())
}

/// Plays the chart in real time through the system audio device.
fn run_play(
    path: &Path,
    mods: &str,
    config: Option<&Path>,
    samples: Option<&Path>,
) -> beatmap_player_core::Result<()> {
    let mods = Mods::parse(mods)?;
    let config = load_config(config)?;
    let chart = load_chart(path)?;
    let track = audio_path(path, &chart)
        .ok_or_else(|| PlayerError::invalid_chart("chart names no audio file"))?;
    let bytes = std::fs::read(&track)?;

    let mut audio = KiraAudio::new()?;
    let chart_dir = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = samples.or(chart_dir) {
        audio.load_samples(dir, Some(track.as_path()))?;
    }

    let mut player = Player::new(audio, config);
    subscribe_lifecycle(&mut player);
    let seconds = Rc::new(Cell::new(-1i64));
    player.events_mut().time_update.subscribe(move |update| {
        let second = (update.time / 1000.0) as i64;
        if second != seconds.get() {
            seconds.set(second);
            tracing::info!(
                time = second,
                duration = (update.duration / 1000.0) as i64,
                "playing"
            );
        }
    });

    player.set_mods(mods);
    player.load(chart, &bytes)?;
    player.play()?;

    let start = Instant::now();
    let mut backend = CountingBackend::default();

    while player.pending_frame().is_some() {
        let timestamp = start.elapsed().as_secs_f64() * 1000.0;
        player.frame(timestamp, &mut backend);
        thread::sleep(Duration::from_millis(4));
    }

    player.dispose();
    Ok(())
}

/// Logs every player notification.
fn subscribe_lifecycle<A: AudioBackend>(player: &mut Player<A>) {
    let events = player.events_mut();

    events.loaded.subscribe(|loaded| {
        tracing::info!(
            objects = loaded.object_count,
            duration = loaded.duration,
            sound_events = loaded.sound_events,
            "loaded {}",
            loaded.metadata.title
        );
    });
    events
        .state_change
        .subscribe(|playing| tracing::info!(playing = *playing, "state changed"));
    events.seeked.subscribe(|time| tracing::info!(time = *time, "seeked"));
    events.ended.subscribe(|_| tracing::info!("track ended"));
    events
        .error
        .subscribe(|err| tracing::error!(code = %err.code, "{}", err.reason));
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Rhythm game beatmap player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a summary of a chart.
    Inspect {
        /// Path to the `.osu` file.
        chart: PathBuf,
        /// Mod acronyms, e.g. `HDDT`.
        #[arg(short, long, default_value = "")]
        mods: String,
    },
    /// Run a chart headlessly against a synthetic audio clock.
    Simulate {
        chart: PathBuf,
        #[arg(short, long, default_value = "")]
        mods: String,
        /// Simulated display refresh rate.
        #[arg(long, default_value_t = 60)]
        fps: u32,
        /// JSON player configuration.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Play a chart with its audio track and hit sounds.
    Play {
        chart: PathBuf,
        #[arg(short, long, default_value = "")]
        mods: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory with hit sound samples such as `soft-hitclap.wav`.
        #[arg(short, long)]
        samples: Option<PathBuf>,
    },
}
