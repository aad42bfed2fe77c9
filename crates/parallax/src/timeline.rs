//! Declarative transition timeline.
//!
//! A [`Timeline`] is a list of [`Track`] records sharing one start. Nothing
//! is stored per track while running: every evaluation recomputes each
//! track's value from the global elapsed time, which keeps restarts trivial
//! and lets tests inspect any instant without a live clock.

use crate::effects::PROGRESS_UNIFORM;

/// Easing shapes used by the transition tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    /// Cubic ease-in-out (`power3.inOut`).
    CubicInOut,
    /// Quartic ease-in-out (`power4.inOut`).
    QuartInOut,
}

impl Easing {
    pub fn sample(self, t: f32) -> f32 {
        let clamped = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => clamped,
            Easing::CubicInOut => {
                if clamped < 0.5 {
                    4.0 * clamped * clamped * clamped
                } else {
                    1.0 - (-2.0 * clamped + 2.0).powi(3) / 2.0
                }
            }
            Easing::QuartInOut => {
                if clamped < 0.5 {
                    8.0 * clamped.powi(4)
                } else {
                    1.0 - (-2.0 * clamped + 2.0).powi(4) / 2.0
                }
            }
        }
    }
}

/// The fixed set of properties the timeline can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackTarget {
    CameraX,
    CameraZ,
    /// `uProgress` of the pass at this chain index.
    PassProgress(usize),
}

impl std::fmt::Display for TrackTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackTarget::CameraX => write!(f, "camera.position.x"),
            TrackTarget::CameraZ => write!(f, "camera.position.z"),
            TrackTarget::PassProgress(index) => write!(f, "passes[{index}].{PROGRESS_UNIFORM}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub target: TrackTarget,
    pub from: f32,
    pub to: f32,
    /// Seconds after the timeline start at which this track begins.
    pub offset: f32,
    pub duration: f32,
    pub easing: Easing,
}

impl Track {
    pub fn new(target: TrackTarget, from: f32, to: f32) -> Self {
        Self {
            target,
            from,
            to,
            offset: 0.0,
            duration: 1.0,
            easing: Easing::Linear,
        }
    }

    pub fn at(mut self, offset: f32) -> Self {
        self.offset = offset.max(0.0);
        self
    }

    pub fn over(mut self, duration: f32) -> Self {
        self.duration = duration.max(0.0);
        self
    }

    pub fn eased(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn end(&self) -> f32 {
        self.offset + self.duration
    }

    /// `clamp(global - offset, 0, duration)`.
    pub fn local_elapsed(&self, global: f32) -> f32 {
        (global - self.offset).clamp(0.0, self.duration)
    }

    pub fn has_started(&self, global: f32) -> bool {
        global >= self.offset
    }

    /// Interpolated value at a global time; holds `from` before the offset
    /// and `to` after the end.
    pub fn value_at(&self, global: f32) -> f32 {
        let local = self.local_elapsed(global);
        let t = if self.duration <= f32::EPSILON {
            if global >= self.offset {
                1.0
            } else {
                0.0
            }
        } else {
            local / self.duration
        };
        self.from + (self.to - self.from) * self.easing.sample(t)
    }
}

/// One property write produced by evaluating the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackWrite {
    pub target: TrackTarget,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineState {
    Idle,
    Running { elapsed: f32 },
    Finished,
}

#[derive(Debug, Clone)]
pub struct Timeline {
    tracks: Vec<Track>,
    state: TimelineState,
    total: f32,
}

impl Timeline {
    pub fn new(tracks: Vec<Track>) -> Self {
        let total = tracks.iter().map(Track::end).fold(0.0, f32::max);
        Self {
            tracks,
            state: TimelineState::Idle,
            total,
        }
    }

    /// Camera pan with a dip in Z, wrapped by both transition passes
    /// ramping up and back down.
    pub fn run_animation(curtain_pass: usize, split_pass: usize) -> Self {
        let mut tracks = vec![
            Track::new(TrackTarget::CameraX, 0.0, 2500.0)
                .over(1.5)
                .eased(Easing::QuartInOut),
            Track::new(TrackTarget::CameraZ, 900.0, 700.0)
                .over(1.0)
                .eased(Easing::QuartInOut),
            Track::new(TrackTarget::CameraZ, 700.0, 900.0)
                .at(1.0)
                .over(1.0)
                .eased(Easing::QuartInOut),
        ];
        for pass in [curtain_pass, split_pass] {
            tracks.push(
                Track::new(TrackTarget::PassProgress(pass), 0.0, 1.0)
                    .over(1.0)
                    .eased(Easing::CubicInOut),
            );
            tracks.push(
                Track::new(TrackTarget::PassProgress(pass), 1.0, 0.0)
                    .at(1.0)
                    .over(1.0)
                    .eased(Easing::CubicInOut),
            );
        }
        Self::new(tracks)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn state(&self) -> TimelineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimelineState::Running { .. })
    }

    /// Latest `offset + duration` over all tracks.
    pub fn total_duration(&self) -> f32 {
        self.total
    }

    /// Starts from zero, whatever the current state.
    pub fn play(&mut self) {
        if self.is_running() {
            tracing::debug!("timeline retriggered while running; restarting");
        }
        self.state = TimelineState::Running { elapsed: 0.0 };
    }

    /// Advances a running timeline by `dt` seconds and returns the writes
    /// for the new instant. Idle and finished timelines write nothing.
    pub fn advance(&mut self, dt: f32) -> Vec<TrackWrite> {
        let TimelineState::Running { elapsed } = self.state else {
            return Vec::new();
        };
        let elapsed = (elapsed + dt.max(0.0)).min(self.total);
        let writes = self.evaluate(elapsed);
        self.state = if elapsed >= self.total {
            tracing::debug!(duration = self.total, "timeline finished");
            TimelineState::Finished
        } else {
            TimelineState::Running { elapsed }
        };
        writes
    }

    /// Writes for the current instant without advancing.
    pub fn sample(&self) -> Vec<TrackWrite> {
        match self.state {
            TimelineState::Running { elapsed } => self.evaluate(elapsed),
            TimelineState::Idle | TimelineState::Finished => Vec::new(),
        }
    }

    /// Evaluates every started track at `elapsed`, in insertion order.
    ///
    /// Tracks whose offset has not been reached are skipped, so when two
    /// tracks drive the same property the one that started last wins.
    pub fn evaluate(&self, elapsed: f32) -> Vec<TrackWrite> {
        self.tracks
            .iter()
            .filter(|track| track.has_started(elapsed))
            .map(|track| TrackWrite {
                target: track.target,
                value: track.value_at(elapsed),
            })
            .collect()
    }

    /// Resolved value of one target at `elapsed` (last write wins).
    pub fn value_of(&self, target: TrackTarget, elapsed: f32) -> Option<f32> {
        self.evaluate(elapsed)
            .into_iter()
            .rev()
            .find(|write| write.target == target)
            .map(|write| write.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn easings_hit_endpoints_and_midpoint() {
        for easing in [Easing::Linear, Easing::CubicInOut, Easing::QuartInOut] {
            assert!(easing.sample(0.0).abs() < 1e-6);
            assert!((easing.sample(1.0) - 1.0).abs() < 1e-6);
            assert!((easing.sample(0.5) - 0.5).abs() < 1e-6);
        }
        assert!(Easing::QuartInOut.sample(0.25) < Easing::CubicInOut.sample(0.25));
    }

    #[test]
    fn easings_increase_monotonically() {
        for easing in [Easing::CubicInOut, Easing::QuartInOut] {
            let mut last = 0.0;
            for step in 0..=100 {
                let sample = easing.sample(step as f32 / 100.0);
                assert!(sample >= last - f32::EPSILON);
                last = sample;
            }
        }
    }

    #[test]
    fn track_clamps_outside_its_window() {
        let track = Track::new(TrackTarget::CameraX, 10.0, 20.0)
            .at(1.0)
            .over(2.0)
            .eased(Easing::CubicInOut);
        assert_eq!(track.value_at(0.0), 10.0);
        assert_eq!(track.value_at(1.0), 10.0);
        assert_eq!(track.value_at(3.0), 20.0);
        assert_eq!(track.value_at(7.5), 20.0);
        assert!((track.value_at(2.0) - 15.0).abs() < EPS);
    }

    #[test]
    fn run_animation_spans_two_seconds() {
        let timeline = Timeline::run_animation(1, 2);
        assert!((timeline.total_duration() - 2.0).abs() < EPS);
        assert_eq!(timeline.tracks().len(), 7);
        assert_eq!(timeline.state(), TimelineState::Idle);
    }

    #[test]
    fn camera_z_is_continuous_at_the_handover() {
        let timeline = Timeline::run_animation(1, 2);
        let at = |t: f32| timeline.value_of(TrackTarget::CameraZ, t).expect("camera z");
        assert!((at(1.0) - 700.0).abs() < EPS);
        assert!((at(1.0 - 1e-3) - at(1.0 + 1e-3)).abs() < 0.01);
        assert!((at(0.5) - 800.0).abs() < EPS);
        assert!((at(2.0) - 900.0).abs() < EPS);
    }

    #[test]
    fn pending_track_does_not_override_active_one() {
        let timeline = Timeline::run_animation(1, 2);
        let progress = timeline
            .value_of(TrackTarget::PassProgress(1), 0.5)
            .expect("progress");
        assert!((progress - 0.5).abs() < EPS);
        let writes = timeline.evaluate(0.5);
        assert_eq!(
            writes
                .iter()
                .filter(|write| write.target == TrackTarget::CameraZ)
                .count(),
            1
        );
    }

    #[test]
    fn finishes_and_settles_at_end_values() {
        let mut timeline = Timeline::run_animation(1, 2);
        assert!(timeline.advance(0.1).is_empty());
        timeline.play();
        let mut last = Vec::new();
        for _ in 0..200 {
            let writes = timeline.advance(1.0 / 60.0);
            if !writes.is_empty() {
                last = writes;
            }
        }
        assert_eq!(timeline.state(), TimelineState::Finished);
        let resolve = |target: TrackTarget| {
            last.iter()
                .rev()
                .find(|write| write.target == target)
                .map(|write| write.value)
        };
        assert_eq!(resolve(TrackTarget::CameraX), Some(2500.0));
        assert_eq!(resolve(TrackTarget::CameraZ), Some(900.0));
        assert_eq!(resolve(TrackTarget::PassProgress(1)), Some(0.0));
        assert_eq!(resolve(TrackTarget::PassProgress(2)), Some(0.0));
        assert!(timeline.advance(1.0).is_empty());
    }

    #[test]
    fn retrigger_restarts_from_zero() {
        let mut timeline = Timeline::run_animation(1, 2);
        timeline.play();
        timeline.advance(0.5);
        let mid = timeline
            .value_of(TrackTarget::CameraX, 0.5)
            .expect("camera x");
        assert!(mid > 0.0);

        timeline.play();
        assert_eq!(timeline.state(), TimelineState::Running { elapsed: 0.0 });
        let writes = timeline.sample();
        let camera_x = writes
            .iter()
            .find(|write| write.target == TrackTarget::CameraX)
            .map(|write| write.value)
            .expect("camera x write");
        assert_eq!(camera_x, 0.0);

        let next = timeline.advance(1.0 / 60.0);
        let camera_x = next
            .iter()
            .find(|write| write.target == TrackTarget::CameraX)
            .map(|write| write.value)
            .expect("camera x write");
        assert!(camera_x < mid);
    }

    #[test]
    fn zero_duration_track_jumps_at_offset() {
        let track = Track::new(TrackTarget::CameraX, 0.0, 5.0).at(1.0).over(0.0);
        assert_eq!(track.value_at(0.5), 0.0);
        assert_eq!(track.value_at(1.0), 5.0);
    }
}
