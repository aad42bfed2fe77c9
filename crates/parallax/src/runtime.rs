use std::time::{Duration, Instant};

/// Decides when the next frame may be drawn.
///
/// With no cap every call to [`FramePacer::ready_for_frame`] succeeds and the
/// host draws as fast as presentation allows. With a cap the pacer spaces
/// frames at `1 / fps` and exposes the next deadline so event loops can
/// sleep until then instead of spinning.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Option<Duration>,
    last_frame: Option<Instant>,
    frames: u64,
}

impl FramePacer {
    /// Builds a pacer; non-positive or non-finite caps mean "uncapped".
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| Duration::from_secs_f32(1.0 / fps));
        Self {
            interval,
            last_frame: None,
            frames: 0,
        }
    }

    pub fn uncapped() -> Self {
        Self::new(None)
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Number of frames marked as rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// True when a frame is due at `now`.
    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match self.next_deadline() {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }

    /// Instant the next capped frame becomes due; `None` when uncapped or
    /// before the first frame.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.interval, self.last_frame) {
            (Some(interval), Some(last)) => Some(last + interval),
            _ => None,
        }
    }

    /// Time left until the next frame is due.
    pub fn wait_time(&self, now: Instant) -> Duration {
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_frame = Some(now);
        self.frames = self.frames.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.last_frame = None;
        self.frames = 0;
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::uncapped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncapped_pacer_is_always_ready() {
        let mut pacer = FramePacer::uncapped();
        let now = Instant::now();
        assert!(pacer.ready_for_frame(now));
        pacer.mark_rendered(now);
        assert!(pacer.ready_for_frame(now));
        assert_eq!(pacer.next_deadline(), None);
        assert_eq!(pacer.frames(), 1);
    }

    #[test]
    fn capped_pacer_waits_for_interval() {
        let mut pacer = FramePacer::new(Some(10.0));
        let start = Instant::now();
        assert!(pacer.ready_for_frame(start));
        pacer.mark_rendered(start);
        assert!(!pacer.ready_for_frame(start + Duration::from_millis(50)));
        assert!(pacer.ready_for_frame(start + Duration::from_millis(100)));
        let wait = pacer.wait_time(start + Duration::from_millis(40));
        assert!(wait >= Duration::from_millis(59) && wait <= Duration::from_millis(60));
    }

    #[test]
    fn invalid_caps_are_ignored() {
        assert_eq!(FramePacer::new(Some(0.0)).interval(), None);
        assert_eq!(FramePacer::new(Some(f32::NAN)).interval(), None);
        assert_eq!(FramePacer::new(Some(-5.0)).interval(), None);
    }
}
