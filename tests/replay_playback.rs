//! End-to-end recording and playback: a recorded session replayed from a
//! file must reproduce the live run tick for tick.

use almost_tetris::game::PieceView;
use almost_tetris::input::{InputIntent, InputKind};
use almost_tetris::replay::{InputEvent, ReplayFormat, ReplayRecord};
use almost_tetris::score::LOCK_BONUS;
use almost_tetris::tetromino::TetrominoType;
use almost_tetris::{EngineConfig, Game, Snapshot, TetrisError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("almost_tetris_{}_{}", nanos, name))
}

fn game(seed: u64) -> Game {
    Game::new(EngineConfig {
        seed: Some(seed),
        ..EngineConfig::default()
    })
    .unwrap()
}

fn random_intent(rng: &mut ChaCha8Rng) -> InputIntent {
    let mut intent = InputIntent::default();
    // Mostly idle ticks, like a human at 100 ticks per second
    if rng.gen_range(0..4) != 0 {
        return intent;
    }
    match rng.gen_range(0..20) {
        0..6 => intent.apply(InputKind::MoveLeft),
        6..12 => intent.apply(InputKind::MoveRight),
        12..15 => intent.apply(InputKind::Rotate),
        15..19 => intent.apply(InputKind::SoftDrop),
        _ => intent.apply(InputKind::HardDrop),
    }
    if rng.gen_range(0..5) == 0 {
        intent.apply(InputKind::Rotate);
    }
    intent
}

type State = (
    Vec<Vec<u8>>,
    PieceView,
    (i32, i32),
    (u64, u32, u32),
    u64,
    bool,
);

/// The parts of a snapshot that must match between a live run and its replay
fn state(snapshot: &Snapshot) -> State {
    (
        snapshot.grid.clone(),
        snapshot.piece.clone(),
        (snapshot.shadow_x, snapshot.shadow_y),
        (snapshot.score, snapshot.lines, snapshot.combo),
        snapshot.ticks,
        snapshot.game_over,
    )
}

/// Play `ticks` ticks of random input and keep a snapshot after each one
fn play_live(seed: u64, ticks: usize) -> (Game, Vec<Snapshot>) {
    let mut game = game(seed);
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);
    let mut snapshots = Vec::with_capacity(ticks);
    for _ in 0..ticks {
        game.step(random_intent(&mut rng));
        snapshots.push(game.snapshot());
    }
    (game, snapshots)
}

fn assert_replays(record: ReplayRecord, live: &[Snapshot]) {
    // A different seed proves pieces come from the record
    let mut replay = game(0xdead_beef);
    replay.start_playback(record).unwrap();
    for (tick, expected) in live.iter().enumerate() {
        // Live input is ignored during playback
        let intent = if replay.is_playing_back() {
            InputIntent::from(InputKind::HardDrop)
        } else {
            InputIntent::default()
        };
        replay.step(intent);
        assert_eq!(
            state(&replay.snapshot()),
            state(expected),
            "diverged at tick {}",
            tick
        );
    }
}

#[test]
fn test_replay_reproduces_live_run() {
    for seed in [1, 2, 3] {
        let (game, live) = play_live(seed, 3000);
        assert!(!game.replay_record().inputs.is_empty());
        assert!(game.replay_record().pieces.len() > 1);
        assert_replays(game.replay_record().clone(), &live);
    }
}

#[test]
fn test_binary_file_round_trip() {
    let (game, live) = play_live(11, 2000);
    let path = temp_path("run.trs");
    game.save_replay(&path, ReplayFormat::Binary).unwrap();

    let loaded = ReplayRecord::load(&path, ReplayFormat::from_path(&path)).unwrap();
    assert_eq!(&loaded, game.replay_record());
    assert_replays(loaded, &live);
    let _ = fs::remove_file(&path);
}

#[test]
fn test_text_file_round_trip() {
    let (game, live) = play_live(12, 1500);
    let path = temp_path("run.txt");
    let format = ReplayFormat::from_path(&path);
    assert_eq!(format, ReplayFormat::Text);
    game.save_replay(&path, format).unwrap();

    let loaded = ReplayRecord::load(&path, format).unwrap();
    assert_eq!(&loaded, game.replay_record());
    assert_replays(loaded, &live);
    let _ = fs::remove_file(&path);
}

#[test]
fn test_playback_then_live_play() {
    let (live_game, _) = play_live(21, 500);
    let record = live_game.replay_record().clone();
    let last_input = record.inputs.last().map_or(0, |e| e.tick as u64);

    let mut replay = game(21);
    replay.start_playback(record).unwrap();
    while !replay.is_replay_finished() && !replay.is_game_over() {
        replay.step(InputIntent::default());
    }
    assert!(replay.ticks() > last_input);
    if replay.is_game_over() {
        return;
    }
    assert!(!replay.is_playing_back());

    // Live input is honored again
    let points = replay.score().points;
    replay.step(InputIntent::from(InputKind::HardDrop));
    assert!(replay.score().points >= points + LOCK_BONUS);
}

#[test]
fn test_slow_playback_delays_inputs() {
    let record = ReplayRecord {
        pieces: vec![TetrominoType::O.id()],
        inputs: vec![InputEvent {
            tick: 10,
            kind: InputKind::MoveLeft,
        }],
    };
    let mut replay = game(5);
    replay.set_replay_speed(-2);
    replay.start_playback(record).unwrap();
    let x = replay.piece().x;
    for _ in 0..20 {
        replay.step(InputIntent::default());
    }
    assert_eq!(replay.piece().x, x);
    replay.step(InputIntent::default());
    assert_eq!(replay.piece().x, x - 1);
}

#[test]
fn test_fast_playback_merges_inputs() {
    let record = ReplayRecord {
        pieces: vec![TetrominoType::I.id()],
        inputs: vec![
            InputEvent {
                tick: 8,
                kind: InputKind::SoftDrop,
            },
            InputEvent {
                tick: 9,
                kind: InputKind::SoftDrop,
            },
        ],
    };
    let mut replay = game(5);
    replay.set_replay_speed(8);
    replay.start_playback(record).unwrap();
    // Both events map to tick 1 and land in the same intent
    replay.step(InputIntent::default());
    assert_eq!(replay.piece().y, 0);
    replay.step(InputIntent::default());
    assert_eq!(replay.piece().y, 2);
}

#[test]
fn test_corrupt_files_are_rejected() {
    let path = temp_path("garbage.trs");
    fs::write(&path, b"definitely not gzip").unwrap();
    assert!(matches!(
        ReplayRecord::load(&path, ReplayFormat::Binary),
        Err(TetrisError::CorruptReplay(_))
    ));

    let record = ReplayRecord {
        pieces: vec![1, 2, 3],
        inputs: vec![InputEvent {
            tick: 4,
            kind: InputKind::Rotate,
        }],
    };
    let bytes = record.to_bytes().unwrap();
    fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
    assert!(ReplayRecord::load(&path, ReplayFormat::Binary).is_err());

    let missing = temp_path("missing.trs");
    assert!(matches!(
        ReplayRecord::load(&missing, ReplayFormat::Binary),
        Err(TetrisError::Io(_))
    ));
    let _ = fs::remove_file(&path);
}
