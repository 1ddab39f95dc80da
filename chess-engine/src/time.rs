//! Time allocation and search limits (§4.9 "Time management").
//!
//! Grounded on `pleco_engine/src/time/time_management.rs`'s `TimeManager::init`/`remaining`
//! formula (move-importance curve, hypothetical-moves-to-go sweep, ideal/maximum split) and
//! `pleco_engine/src/time/uci_timer.rs`'s `LimitsType`/`PreLimits` shape. `TimeManager`
//! drops the `chrono` dependency in favor of `std::time::Instant::elapsed()` directly, and
//! replaces the `UnsafeCell`-wrapped fields with a plain owned struct computed once in
//! `init` and read thereafter.

use std::time::Instant;

const MOVE_HORIZON: i64 = 50;
const MAX_RATIO: f64 = 6.32;
const STEAL_RATIO: f64 = 0.34;
const MIN_THINKING_TIME: i64 = 20;
const MOVE_OVERHEAD: i64 = 100;
const SLOW_MOVER: i64 = 22;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct UciClock {
    pub white_time_msec: u64,
    pub black_time_msec: u64,
    pub white_inc_msec: u64,
    pub black_inc_msec: u64,
    pub moves_to_go: u32,
}

#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub limits_type: Option<LimitKindStorage>,
    pub search_moves: Vec<chess_core::Move>,
    pub ponder: bool,
    pub nodes: Option<u64>,
    pub mate: Option<i32>,
}

/// How the driver should decide when to stop (§4.9 "Time management modes"). Wrapped in
/// `Option` on `Limits` (rather than derived `Default`) since `go` parsing fills fields
/// incrementally as UCI subcommands are parsed.
#[derive(Clone, Debug)]
pub enum LimitKindStorage {
    Time(UciClock),
    MoveTime(u64),
    Depth(i32),
    Infinite,
}

impl Limits {
    pub fn infinite() -> Self {
        Limits { limits_type: Some(LimitKindStorage::Infinite), ..Default::default() }
    }

    pub fn is_infinite_or_ponder(&self) -> bool {
        self.ponder || matches!(self.limits_type, Some(LimitKindStorage::Infinite) | None)
    }
}

fn move_importance(ply: i64) -> f64 {
    const X_SCALE: f64 = 6.85;
    const X_SHIFT: f64 = 64.5;
    const SKEW: f64 = 0.171;
    let exp = ((ply as f64 - X_SHIFT) / X_SCALE).exp();
    (1.0 + exp).powf(-SKEW) + f64::MIN_POSITIVE
}

enum RatioKind {
    Ideal,
    Max,
}

impl RatioKind {
    fn max_ratio(&self) -> f64 {
        match self {
            RatioKind::Ideal => 1.0,
            RatioKind::Max => MAX_RATIO,
        }
    }

    fn steal_ratio(&self) -> f64 {
        match self {
            RatioKind::Ideal => 0.0,
            RatioKind::Max => STEAL_RATIO,
        }
    }
}

fn remaining(my_time: i64, moves_to_go: i64, move_num: i64, slow_mover: i64, kind: RatioKind) -> i64 {
    let move_imp = move_importance(move_num) * slow_mover as f64 / 100.0;
    let mut other_imp = 0.0;
    for i in 1..moves_to_go {
        other_imp += move_importance(move_num + 2 * i);
    }
    let ratio1 = (kind.max_ratio() * move_imp) / (kind.max_ratio() * move_imp + other_imp);
    let ratio2 = (move_imp + kind.steal_ratio() * other_imp) / (move_imp + other_imp);
    (my_time as f64 * ratio1.min(ratio2)) as i64
}

/// Soft/hard budget split for `LimitsType::Time`, plus plain fixed limits for the other
/// modes.
pub struct TimeManager {
    start: Instant,
    ideal_msec: i64,
    maximum_msec: i64,
    move_time_msec: Option<u64>,
    depth_limit: Option<i32>,
    infinite: bool,
}

impl TimeManager {
    /// Computes the ideal and maximum budgets for `limits` at ply `ply` for `us` (§4.9).
    pub fn init(start: Instant, limits: &Limits, us: chess_core::square::Color, ply: u16) -> Self {
        match &limits.limits_type {
            Some(LimitKindStorage::Time(clock)) => {
                let (my_time, my_inc) = match us {
                    chess_core::square::Color::White => (clock.white_time_msec as i64, clock.white_inc_msec as i64),
                    chess_core::square::Color::Black => (clock.black_time_msec as i64, clock.black_inc_msec as i64),
                };
                let moves_to_go = clock.moves_to_go as i64;

                let mut ideal = my_time.max(MIN_THINKING_TIME);
                let mut maximum = ideal;

                let max_mtg = if moves_to_go == 0 { MOVE_HORIZON } else { moves_to_go.min(MOVE_HORIZON) };
                for hyp_mtg in 1..=max_mtg {
                    let hyp_my_time = (my_time + my_inc * (hyp_mtg - 1) - MOVE_OVERHEAD * (2 + hyp_mtg.min(40))).max(0);
                    let t1 = MIN_THINKING_TIME
                        + remaining(hyp_my_time, hyp_mtg, ply as i64, SLOW_MOVER, RatioKind::Ideal);
                    let t2 = MIN_THINKING_TIME
                        + remaining(hyp_my_time, hyp_mtg, ply as i64, SLOW_MOVER - 5, RatioKind::Max);
                    ideal = ideal.min(t1);
                    maximum = maximum.min(t2);
                }

                TimeManager {
                    start,
                    ideal_msec: ideal,
                    maximum_msec: maximum,
                    move_time_msec: None,
                    depth_limit: None,
                    infinite: false,
                }
            }
            Some(LimitKindStorage::MoveTime(ms)) => TimeManager {
                start,
                ideal_msec: *ms as i64,
                maximum_msec: *ms as i64,
                move_time_msec: Some(*ms),
                depth_limit: None,
                infinite: false,
            },
            Some(LimitKindStorage::Depth(d)) => TimeManager {
                start,
                ideal_msec: i64::MAX,
                maximum_msec: i64::MAX,
                move_time_msec: None,
                depth_limit: Some(*d),
                infinite: false,
            },
            Some(LimitKindStorage::Infinite) | None => TimeManager {
                start,
                ideal_msec: i64::MAX,
                maximum_msec: i64::MAX,
                move_time_msec: None,
                depth_limit: None,
                infinite: true,
            },
        }
    }

    pub fn elapsed_msec(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn depth_limit(&self) -> Option<i32> {
        self.depth_limit
    }

    /// The driver should not *start* a new iteration once elapsed time crosses this bound
    /// (§4.9 "soft allotment (loop guard)").
    pub fn should_stop_before_next_iteration(&self) -> bool {
        if self.infinite || self.move_time_msec.is_some() {
            return false;
        }
        self.elapsed_msec() as i64 >= self.ideal_msec
    }

    /// The in-flight search must abort once elapsed time crosses this bound (§4.9 "hard max
    /// allotment").
    pub fn should_stop_now(&self) -> bool {
        if self.infinite {
            return false;
        }
        let bound = self.move_time_msec.map(|m| m as i64).unwrap_or(self.maximum_msec);
        self.elapsed_msec() as i64 >= bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::square::Color;

    #[test]
    fn time_mode_produces_sane_ideal_and_maximum() {
        let clock = UciClock { white_time_msec: 120_000, black_time_msec: 0, white_inc_msec: 6_000, black_inc_msec: 0, moves_to_go: 20 };
        let limits = Limits { limits_type: Some(LimitKindStorage::Time(clock)), ..Default::default() };
        let tm = TimeManager::init(Instant::now(), &limits, Color::White, 0);
        assert!(tm.ideal_msec > 0);
        assert!(tm.maximum_msec >= tm.ideal_msec);
    }

    #[test]
    fn infinite_mode_never_signals_stop() {
        let limits = Limits::infinite();
        let tm = TimeManager::init(Instant::now(), &limits, Color::White, 0);
        assert!(!tm.should_stop_before_next_iteration());
        assert!(!tm.should_stop_now());
    }

    #[test]
    fn movetime_mode_uses_fixed_bound() {
        let limits = Limits { limits_type: Some(LimitKindStorage::MoveTime(50)), ..Default::default() };
        let tm = TimeManager::init(Instant::now(), &limits, Color::White, 0);
        assert!(!tm.should_stop_now());
        std::thread::sleep(std::time::Duration::from_millis(60));
        assert!(tm.should_stop_now());
    }
}
