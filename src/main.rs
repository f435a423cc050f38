//! ALMOST TETRIS - headless driver
//!
//! Plays seeded games, replays recordings and converts them between formats.

use almost_tetris::input::InputKind;
use almost_tetris::replay::{ReplayFormat, ReplayRecord, SPEED_PRESETS};
use almost_tetris::{Game, Session, Settings, Snapshot};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Directive;

/// Falling-block engine with deterministic replays
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Let a random bot play a game and record it
    Run(RunArgs),
    /// Play a recording back without a display
    Play(PlayArgs),
    /// Print the contents of a recording
    Dump {
        path: PathBuf,
    },
    /// Convert a recording between the binary and text formats
    Convert {
        input: PathBuf,
        output: PathBuf,
    },
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Stop after this many ticks
    #[clap(short, long, default_value_t = 3000)]
    ticks: u64,
    /// Seed for both the pieces and the bot
    #[clap(short, long)]
    seed: Option<u64>,
    /// Replay output; `.txt` selects the text format
    #[clap(short, long)]
    out: Option<PathBuf>,
    /// Step as fast as possible instead of in real time
    #[clap(long)]
    fast: bool,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    path: PathBuf,
    /// Playback speed, one of 8 6 4 2 1 -2 -4 -6 -8
    #[clap(long, allow_negative_numbers = true)]
    speed: Option<i32>,
    /// Give up after this many ticks
    #[clap(long, default_value_t = 1_000_000)]
    ticks: u64,
    /// Print the final state as JSON
    #[clap(long)]
    json: bool,
}

/// Get the temp directory for logs, creating it if needed
fn log_dir() -> PathBuf {
    let dir = std::env::temp_dir().join("almost-tetris");
    let _ = std::fs::create_dir_all(&dir);
    dir
}

fn init_logging(settings: &Settings) -> Result<WorkerGuard> {
    let session_id: u32 = rand::random();
    let dir = log_dir();
    let log_file = format!("{:08x}.log", session_id);

    let file_appender = tracing_appender::rolling::never(&dir, &log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                settings
                    .logging
                    .filter
                    .parse::<Directive>()
                    .context("invalid logging filter")?,
            ),
        )
        .with_ansi(false)
        .init();

    tracing::info!(
        "ALMOST TETRIS starting up, session={:08x}, log={}",
        session_id,
        dir.join(&log_file).display()
    );
    Ok(guard)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load();
    let _guard = init_logging(&settings)?;

    match args.cmd {
        Command::Run(run_args) => run(&settings, run_args),
        Command::Play(play_args) => play(&settings, play_args),
        Command::Dump { path } => dump(&path),
        Command::Convert { input, output } => convert(&input, &output),
    }
}

fn load_record(path: &Path) -> Result<ReplayRecord> {
    ReplayRecord::load(path, ReplayFormat::from_path(path))
        .with_context(|| format!("failed to load replay {}", path.display()))
}

/// Random key presses, with hard drops kept rare
fn bot_press(rng: &mut ChaCha8Rng) -> InputKind {
    match rng.gen_range(0..16) {
        0..4 => InputKind::MoveLeft,
        4..8 => InputKind::MoveRight,
        8..11 => InputKind::Rotate,
        11..15 => InputKind::SoftDrop,
        _ => InputKind::HardDrop,
    }
}

fn run(settings: &Settings, args: RunArgs) -> Result<()> {
    let mut config = settings.engine_config();
    config.record = true;
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    let game = Game::new(config)?;
    let tick = game.config().tick;
    let session = Session::new(game);

    let interval = if args.fast { Duration::ZERO } else { tick };
    let driver = session.spawn_driver(interval, Some(args.ticks));

    let mut bot = ChaCha8Rng::seed_from_u64(args.seed.unwrap_or_else(rand::random));
    let pause = if args.fast {
        Duration::from_millis(1)
    } else {
        tick * 8
    };
    while !driver.is_finished() {
        session.push_input(bot_press(&mut bot));
        thread::sleep(pause);
    }
    let ticks = driver.join();

    let snapshot = session.snapshot();
    print_summary(&session, &snapshot);
    println!("Ticks run: {}", ticks);

    let (path, format) = match args.out {
        Some(path) => {
            let format = ReplayFormat::from_path(&path);
            (path, format)
        }
        None => (settings.replay.path.clone(), settings.replay.format),
    };
    session
        .save_replay(&path, format)
        .with_context(|| format!("failed to save replay {}", path.display()))?;
    println!("Replay saved to {}", path.display());
    Ok(())
}

fn play(settings: &Settings, args: PlayArgs) -> Result<()> {
    let record = load_record(&args.path)?;

    let speed = args.speed.unwrap_or(settings.replay.speed);
    if !SPEED_PRESETS.contains(&speed) {
        tracing::warn!("Speed {} is not a preset", speed);
    }

    let mut config = settings.engine_config();
    config.record = false;
    let mut game = Game::new(config)?;
    game.set_replay_speed(speed);
    game.start_playback(record)?;
    let session = Session::new(game);

    for _ in 0..args.ticks {
        if !session.step() || session.with_game(|g| g.is_replay_finished()) {
            break;
        }
    }

    let snapshot = session.snapshot();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_summary(&session, &snapshot);
    }
    Ok(())
}

fn print_summary(session: &Session, snapshot: &Snapshot) {
    print!("{}", session.with_game(|g| g.board().to_string()));
    println!(
        "Score: {} | Lines: {} | Combo: {}",
        snapshot.score, snapshot.lines, snapshot.combo
    );
    println!(
        "Tick: {}{}{}",
        snapshot.ticks,
        if snapshot.game_over { " | game over" } else { "" },
        if snapshot.replay_finished {
            " | replay finished"
        } else {
            ""
        }
    );
}

fn dump(path: &Path) -> Result<()> {
    let record = load_record(path)?;
    print!("{}", record.to_text());
    Ok(())
}

fn convert(input: &Path, output: &Path) -> Result<()> {
    let record = load_record(input)?;
    let format = ReplayFormat::from_path(output);
    record
        .save(output, format)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote {} ({:?})", output.display(), format);
    Ok(())
}
