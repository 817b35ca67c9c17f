use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// While pondering, deadlines are suspended; `ponderhit` re-arms them.
pub static PONDERING: AtomicBool = AtomicBool::new(false);

pub fn set_pondering(active: bool) {
    PONDERING.store(active, Ordering::Relaxed);
}

pub fn is_pondering() -> bool {
    PONDERING.load(Ordering::Relaxed)
}

#[derive(Clone, Copy, Debug)]
pub enum TimeControl {
    Infinite,
    MoveTime(u64),
    GameTime {
        wtime: u64,
        btime: u64,
        winc: u64,
        binc: u64,
        movestogo: Option<u32>,
    },
}

#[derive(Clone, Copy)]
pub struct TimeManager {
    pub start: Instant,
    /// Soft deadline: no new iteration starts past this point.
    pub optimal_ms: u64,
    /// Hard deadline: the running search is cancelled.
    pub max_ms: u64,
}

impl TimeManager {
    pub fn new(limit: TimeControl, side: usize, overhead_ms: u64) -> Self {
        let start = Instant::now();
        let (optimal, max) = match limit {
            TimeControl::Infinite => (u64::MAX, u64::MAX),
            TimeControl::MoveTime(t) => {
                let effective = t.saturating_sub(overhead_ms).max(1);
                (effective, effective)
            }
            TimeControl::GameTime {
                wtime,
                btime,
                winc,
                binc,
                movestogo,
            } => {
                let (my_time, my_inc) = if side == 0 { (wtime, winc) } else { (btime, binc) };
                let available = my_time.saturating_sub(overhead_ms).max(1);

                // Horizon: explicit movestogo, else tiers by remaining clock
                let horizon = match movestogo {
                    Some(mtg) => u64::from(mtg.max(1)),
                    None => match available {
                        a if a > 120_000 => 50,
                        a if a > 60_000 => 40,
                        a if a > 15_000 => 30,
                        a if a > 5_000 => 20,
                        _ => 15,
                    },
                };

                let base = available / horizon;
                // Increment is trimmed when the clock is already short
                let inc_fraction = if my_time < 60_000 { my_inc / 2 } else { my_inc };

                let mut optimal = base + inc_fraction;
                if available > 100 {
                    optimal = optimal.max(50);
                }

                let mut max = (available / 10).min(5 * optimal).min(available / 3);
                if my_time < 5_000 {
                    max = 2 * optimal;
                }
                let max = max.clamp(1, available);
                let optimal = optimal.min(max);

                (optimal, max)
            }
        };

        Self {
            start,
            optimal_ms: optimal,
            max_ms: max,
        }
    }

    #[inline(always)]
    pub fn check_soft_limit(&self) -> bool {
        !is_pondering() && self.start.elapsed().as_millis() as u64 >= self.optimal_ms
    }

    #[inline(always)]
    pub fn check_hard_limit(&self) -> bool {
        !is_pondering() && self.start.elapsed().as_millis() as u64 >= self.max_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_time(my_time: u64, my_inc: u64, movestogo: Option<u32>) -> TimeManager {
        TimeManager::new(
            TimeControl::GameTime {
                wtime: my_time,
                btime: 0,
                winc: my_inc,
                binc: 0,
                movestogo,
            },
            0,
            10,
        )
    }

    #[test]
    fn test_movestogo_drives_horizon() {
        let tm = game_time(30_000, 0, Some(10));
        // (30000 - 10) / 10
        assert_eq!(tm.optimal_ms, 2999);
        assert!(tm.max_ms >= tm.optimal_ms);
    }

    #[test]
    fn test_soft_never_exceeds_hard() {
        for time in [200, 900, 4_000, 20_000, 90_000, 600_000] {
            for inc in [0, 100, 2_000] {
                let tm = game_time(time, inc, None);
                assert!(
                    tm.optimal_ms <= tm.max_ms,
                    "soft {} > hard {} at time={} inc={}",
                    tm.optimal_ms,
                    tm.max_ms,
                    time,
                    inc
                );
                assert!(tm.max_ms <= time, "hard limit exceeds the clock");
            }
        }
    }

    #[test]
    fn test_short_clock_uses_double_optimal() {
        let tm = game_time(3_000, 0, None);
        assert_eq!(tm.max_ms, 2 * tm.optimal_ms);
    }

    #[test]
    fn test_one_second_budget_fits() {
        // Scramble scenario: one second on the clock, zero increment
        let tm = game_time(1_000, 0, None);
        assert!(tm.max_ms < 1_000);
        assert!(tm.optimal_ms >= 50);
    }

    #[test]
    fn test_movetime_subtracts_overhead() {
        let tm = TimeManager::new(TimeControl::MoveTime(500), 0, 10);
        assert_eq!(tm.optimal_ms, 490);
        assert_eq!(tm.max_ms, 490);
    }

    #[test]
    fn test_pondering_suppresses_deadlines() {
        let tm = TimeManager::new(TimeControl::MoveTime(1), 0, 0);
        std::thread::sleep(std::time::Duration::from_millis(5));
        set_pondering(true);
        assert!(!tm.check_hard_limit());
        assert!(!tm.check_soft_limit());
        set_pondering(false);
        assert!(tm.check_hard_limit());
    }
}
