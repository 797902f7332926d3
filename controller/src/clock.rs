use std::time::{Duration, Instant};

use cozy_chess::Color;

/// Two-sided game clock.
///
/// Only the side to move loses time. Callers feed the current side and
/// instant through [`Clock::tick`]; the first tick after a turn change only
/// records the reference instant, so time is never charged across turns.
#[derive(Debug, Clone)]
pub struct Clock {
    white: Duration,
    black: Duration,
    reference: Option<(Instant, Color)>,
    enabled: bool,
    paused: bool,
}

impl Clock {
    /// Both sides start with `initial`. A disabled clock never ticks.
    pub fn start(initial: Duration, enabled: bool) -> Self {
        Self {
            white: initial,
            black: initial,
            reference: None,
            enabled,
            paused: false,
        }
    }

    pub fn disabled() -> Self {
        Self::start(Duration::ZERO, false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_running(&self) -> bool {
        self.enabled && !self.paused
    }

    /// Charge the time since the previous tick to `side_to_move`, if the
    /// previous tick was for the same side.
    pub fn tick(&mut self, side_to_move: Color, now: Instant) {
        if !self.is_running() {
            return;
        }

        if let Some((since, side)) = self.reference {
            if side == side_to_move {
                let elapsed = now.saturating_duration_since(since);
                let remaining = self.slot(side);
                *remaining = remaining.saturating_sub(elapsed);
            }
        }
        self.reference = Some((now, side_to_move));
    }

    /// Forget the reference instant; the next tick resynchronises.
    pub fn freeze(&mut self) {
        self.reference = None;
    }

    pub fn pause(&mut self) {
        self.paused = true;
        self.reference = None;
    }

    pub fn remaining(&self, side: Color) -> Duration {
        match side {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    pub fn is_flag_fallen(&self, side: Color) -> bool {
        self.enabled && self.remaining(side).is_zero()
    }

    fn slot(&mut self, side: Color) -> &mut Duration {
        match side {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }
}

/// Format a remaining time as `MM:SS`, or `MM:SS.s` under ten seconds.
pub fn format_clock(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;

    if total_secs < 10 {
        let tenths = duration.subsec_millis() / 100;
        format!("{:02}:{:02}.{}", minutes, seconds, tenths)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_first_tick_only_resyncs() {
        let t0 = Instant::now();
        let mut clock = Clock::start(secs(180), true);

        clock.tick(Color::White, t0 + secs(30));
        assert_eq!(clock.remaining(Color::White), secs(180));

        clock.tick(Color::White, t0 + secs(31));
        assert_eq!(clock.remaining(Color::White), secs(179));
        assert_eq!(clock.remaining(Color::Black), secs(180));
    }

    #[test]
    fn test_turn_change_resyncs() {
        let t0 = Instant::now();
        let mut clock = Clock::start(secs(60), true);
        clock.tick(Color::White, t0);
        clock.tick(Color::White, t0 + secs(5));

        // Black's first tick must not charge the five seconds White used.
        clock.tick(Color::Black, t0 + secs(8));
        assert_eq!(clock.remaining(Color::Black), secs(60));
        clock.tick(Color::Black, t0 + secs(10));
        assert_eq!(clock.remaining(Color::Black), secs(58));
        assert_eq!(clock.remaining(Color::White), secs(55));
    }

    #[test]
    fn test_saturates_at_zero() {
        let t0 = Instant::now();
        let mut clock = Clock::start(secs(3), true);
        clock.tick(Color::Black, t0);
        clock.tick(Color::Black, t0 + secs(10));
        assert_eq!(clock.remaining(Color::Black), Duration::ZERO);
        assert!(clock.is_flag_fallen(Color::Black));
        assert!(!clock.is_flag_fallen(Color::White));
    }

    #[test]
    fn test_disabled_never_ticks() {
        let t0 = Instant::now();
        let mut clock = Clock::start(secs(60), false);
        clock.tick(Color::White, t0);
        clock.tick(Color::White, t0 + secs(10));
        assert_eq!(clock.remaining(Color::White), secs(60));
        assert!(!clock.is_running());

        let off = Clock::disabled();
        assert!(!off.is_flag_fallen(Color::White));
    }

    #[test]
    fn test_pause_stops_charging() {
        let t0 = Instant::now();
        let mut clock = Clock::start(secs(60), true);
        clock.tick(Color::White, t0);
        clock.pause();
        clock.tick(Color::White, t0 + secs(10));
        assert_eq!(clock.remaining(Color::White), secs(60));
        assert!(!clock.is_running());
    }

    #[test]
    fn test_freeze_skips_gap() {
        let t0 = Instant::now();
        let mut clock = Clock::start(secs(60), true);
        clock.tick(Color::White, t0);
        clock.tick(Color::White, t0 + secs(1));
        assert_eq!(clock.remaining(Color::White), secs(59));

        clock.freeze();
        clock.tick(Color::White, t0 + secs(40));
        assert_eq!(clock.remaining(Color::White), secs(59));
        clock.tick(Color::White, t0 + secs(41));
        assert_eq!(clock.remaining(Color::White), secs(58));
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(secs(180)), "03:00");
        assert_eq!(format_clock(secs(65)), "01:05");
        assert_eq!(format_clock(Duration::from_millis(9_450)), "00:09.4");
        assert_eq!(format_clock(Duration::ZERO), "00:00.0");
    }
}
