//! Tween state machine and easing functions for panorama transitions.
//!
//! A [`Tween`] interpolates a single value over time. It never runs on its own:
//! the owner calls [`Tween::advance`] once per frame with the elapsed time and
//! reacts to the returned [`TweenStep`]. Start and completion are reported
//! through the step instead of stored callbacks, so the owner decides what
//! "on start" and "on complete" mean while holding `&mut self`.
//!
//! # Example
//!
//! ```
//! use periscope::{Easing, Tween};
//!
//! let mut fade = Tween::between(0.0, 1.0, 1000.0).easing(Easing::Linear);
//! fade.start();
//!
//! let step = fade.advance(500.0);
//! assert!(step.started);
//! assert_eq!(step.value, 0.5);
//!
//! fade.stop();
//! assert!(!fade.advance(500.0).completed);
//! ```

/// Easing functions for smooth transitions.
///
/// These control the acceleration curve of transition animations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    /// Constant speed throughout.
    #[default]
    Linear,
    /// Start slow, accelerate.
    EaseIn,
    /// Start fast, decelerate.
    EaseOut,
    /// Start slow, speed up, then slow down.
    EaseInOut,
    /// Start very fast, settle gently. Used by every panorama transition.
    QuarticOut,
}

impl Easing {
    /// Apply the easing function to a linear progress value (0.0 to 1.0).
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::QuarticOut => 1.0 - (1.0 - t).powi(4),
        }
    }
}

/// Lifecycle of a single tween instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TweenState {
    /// Created but never started.
    #[default]
    Idle,
    /// Waiting out its delay or interpolating.
    Running,
    /// Stopped before finishing. Completion will never be reported.
    Cancelled,
    /// Reached the end value.
    Completed,
}

/// What happened to a tween during one [`Tween::advance`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TweenStep {
    /// The delay elapsed and the tween began interpolating this frame.
    pub started: bool,
    /// The tween reached its end value this frame.
    pub completed: bool,
    /// Current eased value.
    pub value: f32,
}

/// A time-based interpolation between two values.
///
/// Durations and delays share whatever time unit the caller feeds into
/// [`advance`](Tween::advance); panoramas use milliseconds.
#[derive(Clone, Debug)]
pub struct Tween {
    from: f32,
    to: f32,
    duration: f32,
    delay: f32,
    easing: Easing,
    elapsed: f32,
    started: bool,
    state: TweenState,
    value: f32,
}

impl Default for Tween {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Tween {
    /// Create a tween that only measures time (interpolates 0.0 to 1.0).
    pub fn new(duration: f32) -> Self {
        Self::between(0.0, 1.0, duration)
    }

    /// Create a tween interpolating `from` to `to` over `duration`.
    pub fn between(from: f32, to: f32, duration: f32) -> Self {
        Self {
            from,
            to,
            duration,
            delay: 0.0,
            easing: Easing::Linear,
            elapsed: 0.0,
            started: false,
            state: TweenState::Idle,
            value: from,
        }
    }

    /// Set the easing function for this tween.
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Wait `delay` before the tween starts interpolating.
    pub fn delay(mut self, delay: f32) -> Self {
        self.delay = delay.max(0.0);
        self
    }

    /// (Re)start the tween from its initial value.
    pub fn start(&mut self) {
        self.elapsed = 0.0;
        self.started = false;
        self.value = self.from;
        self.state = TweenState::Running;
    }

    /// Cancel a running tween. Its completion is never reported afterwards.
    pub fn stop(&mut self) {
        if self.state == TweenState::Running {
            self.state = TweenState::Cancelled;
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TweenState {
        self.state
    }

    /// Returns true while the tween is delayed or interpolating.
    pub fn is_running(&self) -> bool {
        self.state == TweenState::Running
    }

    /// Current eased value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Total duration, excluding the delay.
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Advance the tween by `dt`.
    pub fn advance(&mut self, dt: f32) -> TweenStep {
        let mut step = TweenStep {
            value: self.value,
            ..TweenStep::default()
        };
        if self.state != TweenState::Running {
            return step;
        }

        self.elapsed += dt.max(0.0);
        if self.elapsed < self.delay {
            return step;
        }

        if !self.started {
            self.started = true;
            step.started = true;
        }

        let active = self.elapsed - self.delay;
        let raw_progress = if self.duration <= 0.0 {
            1.0
        } else {
            (active / self.duration).clamp(0.0, 1.0)
        };
        self.value = self.from + (self.to - self.from) * self.easing.apply(raw_progress);
        step.value = self.value;

        if raw_progress >= 1.0 {
            self.state = TweenState::Completed;
            step.completed = true;
        }
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn easing_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::EaseIn,
            Easing::EaseOut,
            Easing::EaseInOut,
            Easing::QuarticOut,
        ] {
            assert_relative_eq!(easing.apply(0.0), 0.0);
            assert_relative_eq!(easing.apply(1.0), 1.0);
        }
        assert_relative_eq!(Easing::QuarticOut.apply(0.5), 0.9375);
    }

    #[test]
    fn idle_tween_does_nothing() {
        let mut tween = Tween::new(100.0);
        let step = tween.advance(50.0);
        assert!(!step.started);
        assert!(!step.completed);
        assert_eq!(tween.state(), TweenState::Idle);
    }

    #[test]
    fn start_fires_on_first_advance_and_completes_once() {
        let mut tween = Tween::between(0.0, 1.0, 100.0);
        tween.start();

        let first = tween.advance(40.0);
        assert!(first.started);
        assert!(!first.completed);
        assert_relative_eq!(first.value, 0.4);

        let second = tween.advance(60.0);
        assert!(!second.started);
        assert!(second.completed);
        assert_relative_eq!(second.value, 1.0);

        let third = tween.advance(10.0);
        assert!(!third.completed);
        assert_eq!(tween.state(), TweenState::Completed);
    }

    #[test]
    fn delay_postpones_start() {
        let mut tween = Tween::new(100.0).delay(50.0);
        tween.start();

        assert!(!tween.advance(30.0).started);
        let step = tween.advance(30.0);
        assert!(step.started);
        assert_relative_eq!(step.value, 0.1);
    }

    #[test]
    fn stop_suppresses_completion() {
        let mut tween = Tween::new(100.0);
        tween.start();
        tween.advance(10.0);
        tween.stop();

        let step = tween.advance(1000.0);
        assert!(!step.completed);
        assert_eq!(tween.state(), TweenState::Cancelled);
    }

    #[test]
    fn zero_duration_completes_on_first_advance() {
        let mut tween = Tween::between(1.0, 0.0, 0.0);
        tween.start();
        let step = tween.advance(0.0);
        assert!(step.started && step.completed);
        assert_relative_eq!(step.value, 0.0);
    }

    #[test]
    fn restart_after_cancel() {
        let mut tween = Tween::new(10.0);
        tween.start();
        tween.stop();
        tween.start();
        assert!(tween.advance(10.0).completed);
    }
}
