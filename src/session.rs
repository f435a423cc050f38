//! Shared game session for a tick driver and an input source on separate
//! threads.
//!
//! Input presses accumulate in a pending intent that the next tick takes.
//! Readers get copied-out snapshots so no lock is held while drawing.

use crate::error::Result;
use crate::game::{Game, Snapshot};
use crate::input::{InputIntent, InputKind};
use crate::replay::ReplayFormat;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct Session {
    game: Arc<Mutex<Game>>,
    pending: Arc<Mutex<InputIntent>>,
}

impl Session {
    pub fn new(game: Game) -> Self {
        Self {
            game: Arc::new(Mutex::new(game)),
            pending: Arc::new(Mutex::new(InputIntent::default())),
        }
    }

    /// Queue a press for the next tick
    pub fn push_input(&self, kind: InputKind) {
        self.pending.lock().apply(kind);
    }

    /// Run one tick with everything queued since the last one. Returns false
    /// once the game is over.
    pub fn step(&self) -> bool {
        let intent = self.pending.lock().take();
        let mut game = self.game.lock();
        game.step(intent);
        !game.is_game_over()
    }

    /// Copy of the settled state. Marks the grid as drawn.
    pub fn snapshot(&self) -> Snapshot {
        let mut game = self.game.lock();
        let snapshot = game.snapshot();
        game.acknowledge_grid();
        snapshot
    }

    /// Run `f` with exclusive access to the game
    pub fn with_game<R>(&self, f: impl FnOnce(&mut Game) -> R) -> R {
        f(&mut self.game.lock())
    }

    pub fn is_game_over(&self) -> bool {
        self.game.lock().is_game_over()
    }

    /// Write the current recording without holding the game lock during I/O
    pub fn save_replay(&self, path: &Path, format: ReplayFormat) -> Result<()> {
        let record = self.game.lock().replay_record().clone();
        record.save(path, format)
    }

    /// Step the game on a background thread every `interval` until stopped,
    /// the game ends, or `max_ticks` ticks have run.
    pub fn spawn_driver(&self, interval: Duration, max_ticks: Option<u64>) -> DriverHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let session = self.clone();
        let stop_flag = stop.clone();

        info!("Tick driver starting, interval {:?}", interval);
        let thread = thread::spawn(move || {
            let mut ticks = 0u64;
            while !stop_flag.load(Ordering::Relaxed) {
                if max_ticks.is_some_and(|max| ticks >= max) {
                    break;
                }
                let started = Instant::now();
                ticks += 1;
                if !session.step() {
                    debug!("Tick driver: game over");
                    break;
                }
                if let Some(rest) = interval.checked_sub(started.elapsed()) {
                    thread::sleep(rest);
                }
            }
            info!("Tick driver stopped after {} ticks", ticks);
            ticks
        });

        DriverHandle {
            stop,
            thread: Some(thread),
        }
    }
}

/// Owner of a running tick driver. Dropping it stops the driver.
pub struct DriverHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<u64>>,
}

impl DriverHandle {
    /// Ask the driver to stop after the current tick
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// The driver thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Wait for the driver to exit and return how many ticks it ran
    pub fn join(mut self) -> u64 {
        self.wait()
    }

    fn wait(&mut self) -> u64 {
        let Some(thread) = self.thread.take() else {
            return 0;
        };
        match thread.join() {
            Ok(ticks) => ticks,
            Err(_) => {
                warn!("Tick driver panicked");
                0
            }
        }
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        self.stop();
        self.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::EngineConfig;

    fn session() -> Session {
        let game = Game::new(EngineConfig {
            seed: Some(3),
            ..EngineConfig::default()
        })
        .unwrap();
        Session::new(game)
    }

    #[test]
    fn test_pending_input_is_taken_by_step() {
        let session = session();
        let x = session.with_game(|g| g.piece().left());
        session.push_input(InputKind::MoveLeft);
        session.push_input(InputKind::MoveLeft);
        assert!(session.step());
        assert_eq!(session.with_game(|g| g.piece().left()), x - 1);
        // Queue was consumed
        session.step();
        assert_eq!(session.with_game(|g| g.piece().left()), x - 1);
    }

    #[test]
    fn test_snapshot_acknowledges_grid() {
        let session = session();
        assert!(session.snapshot().grid_changed);
        assert!(!session.snapshot().grid_changed);
        session.push_input(InputKind::HardDrop);
        session.step();
        let snapshot = session.snapshot();
        assert!(snapshot.grid_changed);
        assert!(snapshot.grid.iter().flatten().any(|&v| v != 0));
    }

    #[test]
    fn test_driver_runs_to_tick_limit() {
        let session = session();
        let driver = session.spawn_driver(Duration::ZERO, Some(25));
        assert_eq!(driver.join(), 25);
        assert_eq!(session.with_game(|g| g.ticks()), 25);
    }

    #[test]
    fn test_driver_stops_on_request() {
        let session = session();
        let driver = session.spawn_driver(Duration::from_millis(1), None);
        thread::sleep(Duration::from_millis(20));
        driver.stop();
        let ticks = driver.join();
        assert!(ticks > 0);
        assert_eq!(session.with_game(|g| g.ticks()), ticks);
    }

    #[test]
    fn test_driver_stops_at_game_over() {
        let session = session();
        // Keep slamming pieces down until the stack tops out
        for _ in 0..200 {
            session.push_input(InputKind::HardDrop);
            if !session.step() {
                break;
            }
        }
        assert!(session.is_game_over());
        let driver = session.spawn_driver(Duration::ZERO, Some(10));
        assert_eq!(driver.join(), 1);
    }
}
