//! Core game state and the per-tick simulation step

use crate::board::{BOARD_HEIGHT, BOARD_WIDTH, Board};
use crate::error::{Result, TetrisError};
use crate::input::InputIntent;
use crate::piece::{DEFAULT_FALL_SPEED, Piece};
use crate::randomizer::Randomizer;
use crate::replay::{Replay, ReplayFormat, ReplayMode, ReplayRecord};
use crate::score::Score;
use crate::tetromino::build_catalog;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Engine time that passes per tick unless configured otherwise
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

/// Fixed engine parameters, read once at construction
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub width: usize,
    pub height: usize,
    /// Engine time advanced by every tick
    pub tick: Duration,
    /// Rows per second of gravity for every spawned piece
    pub fall_speed: f32,
    /// Seed for the piece randomizer; `None` draws one from entropy
    pub seed: Option<u64>,
    /// Record a replay of every session
    pub record: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: BOARD_WIDTH,
            height: BOARD_HEIGHT,
            tick: DEFAULT_TICK,
            fall_speed: DEFAULT_FALL_SPEED,
            seed: None,
            record: true,
        }
    }
}

/// Position and rotation of the active piece, used as a rollback point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    x: i32,
    y: i32,
    rotation: usize,
}

/// Read-only view of the active piece
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PieceView {
    pub id: u8,
    pub x: i32,
    pub y: i32,
    pub rotation: usize,
    /// Occupied grid cells as (col, row)
    pub cells: Vec<(i32, i32)>,
}

impl PieceView {
    fn of(piece: &Piece) -> Self {
        Self {
            id: piece.id(),
            x: piece.x,
            y: piece.y,
            rotation: piece.rotation(),
            cells: piece.cells().collect(),
        }
    }
}

/// Settled state between two ticks, for presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub grid: Vec<Vec<u8>>,
    pub piece: PieceView,
    pub shadow_x: i32,
    pub shadow_y: i32,
    pub score: u64,
    pub lines: u32,
    pub combo: u32,
    pub ticks: u64,
    pub game_over: bool,
    pub replay_finished: bool,
    /// The grid changed since the last acknowledged snapshot
    pub grid_changed: bool,
}

/// The main game struct
pub struct Game {
    config: EngineConfig,
    /// The game grid
    board: Board,
    /// One piece per catalog entry, indexed by `id - 1`
    catalog: Vec<Piece>,
    /// Current falling piece
    piece: Piece,
    shadow_x: i32,
    shadow_y: i32,
    /// Score and combo tracking
    score: Score,
    randomizer: Randomizer,
    replay: Replay,
    /// Recorded piece choices keep feeding spawns after a playback ends
    replay_finished: bool,
    game_over: bool,
    grid_changed: bool,
    ticks: u64,
    /// Engine time since the session started
    clock: Duration,
    /// Engine time since gravity last pulled the piece down
    fall_elapsed: Duration,
}

impl Game {
    /// Create a game and spawn its first piece
    pub fn new(config: EngineConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(TetrisError::Config(format!(
                "grid must not be empty ({}x{})",
                config.width, config.height
            )));
        }
        let catalog = build_catalog()?;
        let piece = catalog
            .first()
            .cloned()
            .ok_or_else(|| TetrisError::InvalidPiece("piece catalog is empty".into()))?;
        if catalog
            .iter()
            .flat_map(|p| (0..4).filter_map(move |r| p.shape_at(r).ok()))
            .any(|shape| shape.size() > config.width || shape.size() > config.height)
        {
            return Err(TetrisError::Config(format!(
                "grid {}x{} is smaller than a piece",
                config.width, config.height
            )));
        }

        let randomizer = match config.seed {
            Some(seed) => Randomizer::with_seed(seed),
            None => Randomizer::new(),
        };
        let mut replay = Replay::new();
        if config.record {
            replay.start_recording();
        }

        let mut game = Self {
            board: Board::new(config.width, config.height),
            config,
            catalog,
            piece,
            shadow_x: 0,
            shadow_y: 0,
            score: Score::new(),
            randomizer,
            replay,
            replay_finished: false,
            game_over: false,
            grid_changed: true,
            ticks: 0,
            clock: Duration::ZERO,
            fall_elapsed: Duration::ZERO,
        };
        game.restart();
        Ok(game)
    }

    /// Start over with an empty grid. A running playback rewinds; otherwise
    /// a fresh recording starts if recording is on.
    pub fn restart(&mut self) {
        info!("New game");
        self.board.clear();
        self.score.reset();
        self.game_over = false;
        self.grid_changed = true;
        self.replay_finished = false;
        self.ticks = 0;
        self.clock = Duration::ZERO;
        self.fall_elapsed = Duration::ZERO;
        self.shadow_x = 0;
        self.shadow_y = 0;

        match self.replay.mode() {
            ReplayMode::Playback => self.replay.rewind(),
            ReplayMode::Recording => self.replay.start_recording(),
            ReplayMode::Idle if self.config.record => self.replay.start_recording(),
            ReplayMode::Idle => self.replay.rewind(),
        }
        self.spawn_piece();
    }

    /// Restart and replay `record` from its first tick.
    ///
    /// Fails without touching the current game if the record references a
    /// piece id outside the catalog.
    pub fn start_playback(&mut self, record: ReplayRecord) -> Result<()> {
        if let Some(&bad) = record
            .pieces
            .iter()
            .find(|&&id| id == 0 || id as usize > self.catalog.len())
        {
            return Err(TetrisError::CorruptReplay(format!(
                "piece id {} is not in the catalog",
                bad
            )));
        }
        info!(
            "Starting playback: {} pieces, {} inputs, speed {}",
            record.pieces.len(),
            record.inputs.len(),
            self.replay.speed()
        );
        self.replay.start_playback(record);
        self.restart();
        Ok(())
    }

    /// Advance the simulation by one tick.
    ///
    /// `intent` is ignored while a replay is playing back. Does nothing once
    /// the game is over.
    pub fn step(&mut self, intent: InputIntent) {
        if self.game_over {
            return;
        }
        self.clock += self.config.tick;
        self.fall_elapsed += self.config.tick;

        let input = self.resolve_input(intent);
        let before = self.placement();
        self.update_shadow();

        if input.hard_drop {
            self.piece.y = self.shadow_y;
            self.land(self.placement());
        } else {
            if input.rotate {
                self.rotate(before);
            }
            self.shift(input.move_x);
            self.fall(input.move_y, before);
        }

        if self.score.check_combo_timeout(self.clock) {
            debug!("Combo broken at tick {}", self.ticks);
        }
        if !self.game_over {
            self.update_shadow();
        }
        self.ticks += 1;
    }

    fn resolve_input(&mut self, intent: InputIntent) -> InputIntent {
        if self.replay.mode() == ReplayMode::Playback {
            let input = self.replay.poll_input(self.ticks).unwrap_or_default();
            if self.replay.is_finished() {
                info!("Replay finished at tick {}", self.ticks);
                self.replay_finished = true;
                self.replay.stop();
            }
            return input;
        }
        for kind in intent.kinds() {
            self.replay.record_input(self.ticks, kind);
        }
        intent
    }

    fn placement(&self) -> Placement {
        Placement {
            x: self.piece.x,
            y: self.piece.y,
            rotation: self.piece.rotation(),
        }
    }

    fn restore(&mut self, placement: Placement) {
        self.piece.x = placement.x;
        self.piece.y = placement.y;
        self.piece.restore_rotation(placement.rotation);
    }

    /// Whether the shape's bounding box top at `top` still fits above the
    /// floor
    fn above_floor(&self, top: i32) -> bool {
        let shape = self.piece.current_shape();
        top <= self.config.height as i32 - shape.height() as i32
    }

    /// Lowest row the piece can drop to in its current column
    fn update_shadow(&mut self) {
        let origin_y = self.piece.current_shape().origin_y() as i32;
        let x = self.piece.x;
        let mut y = self.piece.y;
        while self.above_floor(y + origin_y) && !self.board.collides(self.piece.cells_at(x, y)) {
            y += 1;
        }
        self.shadow_x = x;
        self.shadow_y = y - 1;
    }

    fn rotate(&mut self, before: Placement) {
        self.piece.rotate_next();

        // Wall kick: push the bounding box back inside the grid
        let shape = self.piece.current_shape();
        let (width, height) = (shape.width() as i32, shape.height() as i32);
        let right_overflow = self.piece.left() + width - self.config.width as i32;
        if right_overflow > 0 {
            self.piece.x -= right_overflow;
        } else if self.piece.left() < 0 {
            self.piece.x -= self.piece.left();
        }
        let floor_overflow = self.piece.top() + height - self.config.height as i32;
        if floor_overflow > 0 {
            self.piece.y -= floor_overflow;
        }

        let inside = self
            .piece
            .cells()
            .all(|(col, row)| self.board.in_bounds(col, row));
        if !inside || self.board.collides(self.piece.cells()) {
            trace!("Rotation rejected at ({}, {})", self.piece.x, self.piece.y);
            self.restore(before);
        }
    }

    /// Horizontal move, checked against the walls only
    fn shift(&mut self, move_x: i8) {
        let left = self.piece.left();
        let width = self.piece.current_shape().width() as i32;
        if move_x > 0 && left < self.config.width as i32 - width {
            self.piece.x += 1;
        } else if move_x < 0 && left > 0 {
            self.piece.x -= 1;
        }
    }

    fn fall(&mut self, soft_drop: u32, before: Placement) {
        let mut move_y = soft_drop as i32;
        if let Some(interval) = self.fall_interval() {
            if self.fall_elapsed > interval {
                move_y += 1;
                self.fall_elapsed = Duration::ZERO;
            }
        }
        self.piece.y += move_y;

        if !self.above_floor(self.piece.top()) {
            // Past the last row: it landed where it was
            self.land(before);
        } else if self.board.collides(self.piece.cells()) {
            if self.piece.y == 0 {
                self.end_game();
            } else if move_y > 0 {
                self.land(before);
            } else {
                trace!("Move rejected at ({}, {})", self.piece.x, self.piece.y);
                self.restore(before);
            }
        }
    }

    fn fall_interval(&self) -> Option<Duration> {
        let speed = self.piece.fall_speed();
        // Intervals too long for a Duration mean no gravity
        (speed.is_finite() && speed > 0.0)
            .then(|| Duration::try_from_secs_f32(1.0 / speed).ok())
            .flatten()
    }

    /// Lock the piece at `at`, clear lines and spawn the next piece
    fn land(&mut self, at: Placement) {
        self.restore(at);
        self.lock_piece();
        self.spawn_piece();
    }

    fn lock_piece(&mut self) {
        let id = self.piece.id();
        self.board.lock(self.piece.cells(), id);
        self.grid_changed = true;

        let top = self.piece.top().max(0) as usize;
        for row in top..self.config.height {
            if self.board.is_line_full(row) {
                self.board.collapse_row(row);
                let bonus = self.score.add_clear(self.clock);
                debug!(
                    "Line {} cleared, combo x{} (+{})",
                    row, self.score.combo, bonus
                );
            }
        }
        self.score.add_lock();
    }

    fn spawn_piece(&mut self) {
        let use_record = self.replay.mode() == ReplayMode::Playback || self.replay_finished;
        let recorded = if use_record && self.replay.remaining_piece_choices() > 0 {
            self.replay.next_piece_choice().ok()
        } else {
            None
        };
        let id = recorded
            .filter(|&id| id != 0 && id as usize <= self.catalog.len())
            .unwrap_or_else(|| self.randomizer.next().id());

        self.replay.record_piece_choice(id);
        self.piece = self.catalog[id as usize - 1].clone();
        self.piece.reset(self.config.fall_speed);
        debug!("Spawned piece {}", id);

        if self.board.collides(self.piece.cells()) {
            self.end_game();
        } else {
            self.update_shadow();
        }
    }

    fn end_game(&mut self) {
        info!(
            "Game over after {} ticks, score {}",
            self.ticks, self.score.points
        );
        self.game_over = true;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn piece(&self) -> &Piece {
        &self.piece
    }

    /// Catalog piece for a piece-type id
    pub fn catalog_piece(&self, id: u8) -> Option<&Piece> {
        (id as usize).checked_sub(1).and_then(|i| self.catalog.get(i))
    }

    pub fn shadow(&self) -> (i32, i32) {
        (self.shadow_x, self.shadow_y)
    }

    /// Copy of the active piece sitting at the shadow position
    pub fn shadow_piece(&self) -> Piece {
        let mut shadow = self.piece.clone();
        shadow.x = self.shadow_x;
        shadow.y = self.shadow_y;
        shadow
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Engine time elapsed this session
    pub fn elapsed(&self) -> Duration {
        self.clock
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn is_replay_finished(&self) -> bool {
        self.replay_finished
    }

    pub fn is_playing_back(&self) -> bool {
        self.replay.mode() == ReplayMode::Playback
    }

    pub fn grid_changed(&self) -> bool {
        self.grid_changed
    }

    /// Mark the current grid as drawn
    pub fn acknowledge_grid(&mut self) {
        self.grid_changed = false;
    }

    pub fn replay(&self) -> &Replay {
        &self.replay
    }

    pub fn set_replay_speed(&mut self, speed: i32) {
        self.replay.set_speed(speed);
    }

    pub fn replay_record(&self) -> &ReplayRecord {
        self.replay.record()
    }

    pub fn save_replay(&self, path: &Path, format: ReplayFormat) -> Result<()> {
        self.replay.record().save(path, format)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            grid: self.board.to_rows(),
            piece: PieceView::of(&self.piece),
            shadow_x: self.shadow_x,
            shadow_y: self.shadow_y,
            score: self.score.points,
            lines: self.score.lines,
            combo: self.score.combo,
            ticks: self.ticks,
            game_over: self.game_over,
            replay_finished: self.replay_finished,
            grid_changed: self.grid_changed,
        }
    }

    /// Replace the active piece with a fresh one of type `id`
    #[cfg(test)]
    fn force_piece(&mut self, id: u8) {
        self.piece = self.catalog[id as usize - 1].clone();
        self.piece.reset(self.config.fall_speed);
        self.update_shadow();
    }

    #[cfg(test)]
    fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }
}
