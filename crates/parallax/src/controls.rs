//! Parameter panel: the three user-facing controls.

/// Action produced by a control change, routed by
/// [`RenderLoop::apply_control`](crate::render_loop::RenderLoop::apply_control).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    /// Placeholder slider with nothing bound to it.
    Progress(f32),
    /// Drives the second effect pass directly.
    Progress2(f32),
    RunAnimation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    value: f32,
}

impl Parameter {
    pub fn new(name: &'static str, min: f32, max: f32, step: f32) -> Self {
        Self {
            name,
            min,
            max,
            step,
            value: min,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Clamps to `[min, max]` and snaps to the nearest step; returns the
    /// stored value.
    pub fn set(&mut self, value: f32) -> f32 {
        let clamped = value.clamp(self.min, self.max);
        let snapped = if self.step > 0.0 {
            let steps = ((clamped - self.min) / self.step).round();
            (self.min + steps * self.step).min(self.max)
        } else {
            clamped
        };
        self.value = snapped;
        snapped
    }

    pub fn nudge(&mut self, steps: i32) -> f32 {
        self.set(self.value + steps as f32 * self.step)
    }
}

#[derive(Debug, Clone)]
pub struct ControlPanel {
    progress: Parameter,
    progress2: Parameter,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlPanel {
    pub const PROGRESS: &'static str = "progress";
    pub const PROGRESS2: &'static str = "progress2";
    pub const RUN_ANIMATION: &'static str = "runAnimation";

    pub fn new() -> Self {
        Self {
            progress: Parameter::new(Self::PROGRESS, 0.0, 1.0, 0.01),
            progress2: Parameter::new(Self::PROGRESS2, 0.0, 1.0, 0.01),
        }
    }

    pub fn progress(&self) -> &Parameter {
        &self.progress
    }

    pub fn progress2(&self) -> &Parameter {
        &self.progress2
    }

    pub fn set_progress(&mut self, value: f32) -> ControlAction {
        ControlAction::Progress(self.progress.set(value))
    }

    pub fn set_progress2(&mut self, value: f32) -> ControlAction {
        ControlAction::Progress2(self.progress2.set(value))
    }

    pub fn nudge_progress(&mut self, steps: i32) -> ControlAction {
        ControlAction::Progress(self.progress.nudge(steps))
    }

    pub fn nudge_progress2(&mut self, steps: i32) -> ControlAction {
        ControlAction::Progress2(self.progress2.nudge(steps))
    }

    pub fn run_animation(&self) -> ControlAction {
        ControlAction::RunAnimation
    }

    /// Looks a control up by its panel name. Sliders take `value`; the
    /// button ignores it.
    pub fn trigger(&mut self, name: &str, value: f32) -> Option<ControlAction> {
        match name {
            Self::PROGRESS => Some(self.set_progress(value)),
            Self::PROGRESS2 => Some(self.set_progress2(value)),
            Self::RUN_ANIMATION => Some(ControlAction::RunAnimation),
            other => {
                tracing::warn!(control = other, "unknown control");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_clamp_and_snap() {
        let mut panel = ControlPanel::new();
        assert_eq!(panel.set_progress2(1.7), ControlAction::Progress2(1.0));
        assert_eq!(panel.set_progress2(-3.0), ControlAction::Progress2(0.0));
        match panel.set_progress2(0.234) {
            ControlAction::Progress2(value) => assert!((value - 0.23).abs() < 1e-5),
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn nudge_moves_by_step() {
        let mut panel = ControlPanel::new();
        panel.nudge_progress2(5);
        assert!((panel.progress2().value() - 0.05).abs() < 1e-5);
        panel.nudge_progress2(-10);
        assert_eq!(panel.progress2().value(), 0.0);
        panel.nudge_progress(3);
        assert!((panel.progress().value() - 0.03).abs() < 1e-5);
    }

    #[test]
    fn trigger_by_name() {
        let mut panel = ControlPanel::new();
        assert_eq!(
            panel.trigger("runAnimation", 0.0),
            Some(ControlAction::RunAnimation)
        );
        assert_eq!(panel.trigger("progress", 0.5), Some(ControlAction::Progress(0.5)));
        assert_eq!(panel.trigger("speed", 1.0), None);
    }
}
