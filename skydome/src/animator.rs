//! Animated rotation of the sky dome.
//!
//! A rotation request interpolates the view linearly from wherever it is to
//! the target over a duration proportional to the distance travelled in
//! `(lambda, phi)` space. Intermediate frames draw a reduced sky
//! ([`DrawMode::Transition`]); the final frame is a single full redraw.
//!
//! Time is supplied from outside through a [`Scheduler`], so the same
//! animator runs against a fixed-step clock in tests and the CLI, or against
//! wall time.

use std::thread;
use std::time::{Duration, Instant};

use crate::projection::Rotation;
use crate::render::DrawMode;

/// Default transition speed in milliseconds per degree travelled
pub const DEFAULT_MS_PER_DEGREE: f64 = 15.0;

/// An in-flight interpolation between two rotations.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: Rotation,
    pub to: Rotation,
    pub duration: Duration,
    elapsed: Duration,
}

impl Transition {
    pub fn new(from: Rotation, to: Rotation, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
        }
    }

    /// Fraction of the transition completed, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn rotation(&self) -> Rotation {
        self.from.lerp(&self.to, self.progress())
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }
}

/// Something the host must draw after the animator advanced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationEvent {
    /// Intermediate frame at progress `t`
    Frame { rotation: Rotation, t: f64 },
    /// Transition finished; redraw everything at the final rotation
    Completed { rotation: Rotation },
}

impl AnimationEvent {
    pub fn rotation(&self) -> Rotation {
        match self {
            AnimationEvent::Frame { rotation, .. } | AnimationEvent::Completed { rotation } => {
                *rotation
            }
        }
    }

    pub fn draw_mode(&self) -> DrawMode {
        match self {
            AnimationEvent::Frame { .. } => DrawMode::Transition,
            AnimationEvent::Completed { .. } => DrawMode::Full,
        }
    }
}

/// Source of frame time deltas.
///
/// Successive deltas must be non-negative so transition progress never moves
/// backwards.
pub trait Scheduler {
    /// Block until the next frame is due and return the time since the last one
    fn next_frame(&mut self) -> Duration;
}

/// Deterministic scheduler advancing by a constant step without sleeping.
#[derive(Debug, Clone, Copy)]
pub struct FixedStepScheduler {
    step: Duration,
}

impl FixedStepScheduler {
    pub fn new(step: Duration) -> Self {
        Self { step }
    }
}

impl Scheduler for FixedStepScheduler {
    fn next_frame(&mut self) -> Duration {
        self.step
    }
}

/// Wall-clock scheduler sleeping between frames.
#[derive(Debug, Clone)]
pub struct RealTimeScheduler {
    frame_interval: Duration,
    last: Option<Instant>,
}

impl RealTimeScheduler {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            frame_interval,
            last: None,
        }
    }
}

impl Scheduler for RealTimeScheduler {
    fn next_frame(&mut self) -> Duration {
        let Some(last) = self.last else {
            thread::sleep(self.frame_interval);
            self.last = Some(Instant::now());
            return self.frame_interval;
        };
        let due = last + self.frame_interval;
        let now = Instant::now();
        if now < due {
            thread::sleep(due - now);
        }
        let now = Instant::now();
        self.last = Some(now);
        now.duration_since(last)
    }
}

/// Owns the view rotation and at most one transition.
#[derive(Debug, Clone)]
pub struct RotationAnimator {
    current: Rotation,
    transition: Option<Transition>,
    ms_per_degree: f64,
}

impl RotationAnimator {
    pub fn new(initial: Rotation) -> Self {
        Self::with_speed(initial, DEFAULT_MS_PER_DEGREE)
    }

    pub fn with_speed(initial: Rotation, ms_per_degree: f64) -> Self {
        Self {
            current: initial,
            transition: None,
            ms_per_degree,
        }
    }

    pub fn current(&self) -> Rotation {
        self.current
    }

    pub fn transition(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    /// Transition duration for travelling from the current rotation to `target`
    pub fn duration_to(&self, target: &Rotation) -> Duration {
        let ms = self.current.distance_to(target) * self.ms_per_degree;
        if ms.is_finite() && ms > 0.0 {
            Duration::from_secs_f64(ms / 1000.0)
        } else {
            Duration::ZERO
        }
    }

    /// Start rotating toward `target`, abandoning any transition in flight.
    ///
    /// The abandoned transition never completes; the new one starts from the
    /// rotation the old one had reached. A zero-length move still yields one
    /// [`AnimationEvent::Completed`].
    pub fn rotate(&mut self, target: Rotation) -> Duration {
        if let Some(old) = self.transition.take() {
            log::debug!(
                "preempting transition to ({:.2}, {:.2}) at t={:.3}",
                old.to.lambda,
                old.to.phi,
                old.progress()
            );
        }
        let duration = self.duration_to(&target);
        log::info!(
            "rotating ({:.2}, {:.2}) -> ({:.2}, {:.2}) over {} ms",
            self.current.lambda,
            self.current.phi,
            target.lambda,
            target.phi,
            duration.as_millis()
        );
        self.transition = Some(Transition::new(self.current, target, duration));
        duration
    }

    /// Move time forward by `dt` and report what to draw, if anything
    pub fn advance(&mut self, dt: Duration) -> Option<AnimationEvent> {
        let transition = self.transition.as_mut()?;
        transition.elapsed += dt;
        self.current = transition.rotation();

        if transition.is_finished() {
            self.current = transition.to;
            self.transition = None;
            return Some(AnimationEvent::Completed {
                rotation: self.current,
            });
        }
        Some(AnimationEvent::Frame {
            rotation: self.current,
            t: transition.progress(),
        })
    }

    /// Drive the current transition to completion with `scheduler`.
    ///
    /// A scheduler reporting a zero interval would never make progress; the
    /// transition then jumps straight to its completion.
    pub fn run<S, F>(&mut self, scheduler: &mut S, mut on_event: F)
    where
        S: Scheduler + ?Sized,
        F: FnMut(&AnimationEvent),
    {
        while let Some(remaining) = self
            .transition
            .as_ref()
            .map(|t| t.duration.saturating_sub(t.elapsed))
        {
            let mut dt = scheduler.next_frame();
            if dt.is_zero() && !remaining.is_zero() {
                log::warn!("scheduler reported a zero frame interval; completing transition");
                dt = remaining;
            }
            if let Some(event) = self.advance(dt) {
                on_event(&event);
            }
        }
    }
}
