//! Decides, once per tick, whether the user wants the screensaver gone.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Largest per-axis distance.
    pub fn displacement(self, other: Point) -> u64 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    PointerMoved(Point),
    KeyPressed,
    ButtonPressed,
    /// The window was asked to close.
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Input,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Abort(AbortReason),
}

/// `true` when the pointer went further than `threshold` from `baseline`.
pub fn exceeds(baseline: Point, current: Point, threshold: u32) -> bool {
    baseline.displacement(current) > u64::from(threshold)
}

#[derive(Debug, Clone)]
pub struct AbortController {
    threshold: u32,
    armed_at: Instant,
    baseline: Option<Point>,
    current: Option<Point>,
    verdict: Verdict,
}

impl AbortController {
    /// Input before `now + grace` only moves the baseline.
    pub fn new(threshold: u32, grace: Duration, now: Instant) -> Self {
        Self {
            threshold,
            armed_at: now + grace,
            baseline: None,
            current: None,
            verdict: Verdict::Continue,
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    fn armed(&self, now: Instant) -> bool {
        now >= self.armed_at
    }

    /// The first reason sticks, except that a quit request outranks input.
    fn trip(&mut self, reason: AbortReason) -> Verdict {
        if self.verdict == Verdict::Continue || reason == AbortReason::Quit {
            self.verdict = Verdict::Abort(reason);
        }
        self.verdict
    }

    pub fn observe(&mut self, event: InputEvent, now: Instant) -> Verdict {
        match event {
            InputEvent::Quit => self.trip(AbortReason::Quit),
            InputEvent::KeyPressed | InputEvent::ButtonPressed if self.armed(now) => {
                self.trip(AbortReason::Input)
            }
            InputEvent::KeyPressed | InputEvent::ButtonPressed => self.verdict,
            InputEvent::PointerMoved(point) => {
                self.current = Some(point);
                if !self.armed(now) || self.baseline.is_none() {
                    self.baseline = Some(point);
                }
                self.check_displacement(now)
            }
        }
    }

    /// The per-tick check: compares against the baseline, then takes the
    /// current position as the next baseline.
    pub fn check(&mut self, now: Instant) -> Verdict {
        let verdict = self.check_displacement(now);
        if verdict == Verdict::Continue {
            self.baseline = self.current.or(self.baseline);
        }
        verdict
    }

    fn check_displacement(&mut self, now: Instant) -> Verdict {
        if let (Some(baseline), Some(current)) = (self.baseline, self.current) {
            if self.armed(now) && exceeds(baseline, current, self.threshold) {
                return self.trip(AbortReason::Input);
            }
        }
        self.verdict
    }
}
