//! Scoring: a fixed bonus per locked piece plus time-windowed combos

use std::time::Duration;

/// Points awarded for every locked piece
pub const LOCK_BONUS: u64 = 2;
/// Points per combo step; the n-th clear of a combo is worth `n * COMBO_SCORE`
pub const COMBO_SCORE: u64 = 10;
/// A combo breaks once more than this much time passes without a clear
pub const COMBO_DELAY: Duration = Duration::from_secs(2);

/// Score and combo tracking
///
/// Times are engine time (elapsed simulation time), never wall-clock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Score {
    /// Current score
    pub points: u64,
    /// Total lines cleared
    pub lines: u32,
    /// Clears in the running combo (0 = no combo)
    pub combo: u32,
    /// Engine time of the last clear while a combo is running
    combo_started: Option<Duration>,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Add the per-piece lock bonus
    pub fn add_lock(&mut self) {
        self.points += LOCK_BONUS;
    }

    /// Register one cleared line at engine time `now` and return the combo
    /// bonus it earned.
    pub fn add_clear(&mut self, now: Duration) -> u64 {
        // A stale timer counts as broken even if the timeout check has not
        // run yet this tick
        if self.combo_expired(now) {
            self.break_combo();
        }
        self.combo_started = Some(now);
        self.combo += 1;
        self.lines += 1;

        let bonus = self.combo as u64 * COMBO_SCORE;
        self.points += bonus;
        bonus
    }

    /// Break the combo if its window elapsed. Returns true if it broke.
    pub fn check_combo_timeout(&mut self, now: Duration) -> bool {
        if self.combo_expired(now) {
            self.break_combo();
            return true;
        }
        false
    }

    pub fn combo_running(&self) -> bool {
        self.combo_started.is_some()
    }

    fn combo_expired(&self, now: Duration) -> bool {
        self.combo_started
            .is_some_and(|start| now.saturating_sub(start) > COMBO_DELAY)
    }

    fn break_combo(&mut self) {
        self.combo = 0;
        self.combo_started = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_lock_bonus() {
        let mut score = Score::new();
        score.add_lock();
        score.add_lock();
        assert_eq!(score.points, 2 * LOCK_BONUS);
        assert_eq!(score.combo, 0);
    }

    #[test]
    fn test_single_clear() {
        let mut score = Score::new();
        assert_eq!(score.add_clear(ms(0)), COMBO_SCORE);
        assert_eq!(score.combo, 1);
        assert_eq!(score.lines, 1);
        assert!(score.combo_running());
    }

    #[test]
    fn test_combo_within_window() {
        let mut score = Score::new();
        let first = score.add_clear(ms(0));
        let second = score.add_clear(ms(1500));
        let third = score.add_clear(ms(3400));
        assert!(first < second && second < third);
        assert_eq!(score.combo, 3);
        assert_eq!(score.points, 10 + 20 + 30);
    }

    #[test]
    fn test_combo_breaks_after_delay() {
        let mut score = Score::new();
        score.add_clear(ms(0));
        assert!(!score.check_combo_timeout(ms(2000)));
        assert!(score.check_combo_timeout(ms(2001)));
        assert_eq!(score.combo, 0);
        assert!(!score.combo_running());
        assert!(!score.check_combo_timeout(ms(9000)));
    }

    #[test]
    fn test_late_clear_starts_fresh_combo() {
        let mut score = Score::new();
        score.add_clear(ms(0));
        score.add_clear(ms(100));
        assert_eq!(score.combo, 2);
        // No timeout check in between: the clear itself notices the gap
        let bonus = score.add_clear(ms(5000));
        assert_eq!(score.combo, 1);
        assert_eq!(bonus, COMBO_SCORE);
    }
}
