//! Per-frame driver tying pointer, layers, timeline and effects together.
//!
//! Simulation time advances by a fixed step per tick rather than by wall
//! clock, so a frame's content depends only on how many ticks ran before it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::Receiver;
use glam::Vec2;

use crate::controls::ControlAction;
use crate::effects::{EffectChain, PassExecutor, PROGRESS_UNIFORM};
use crate::error::RenderError;
use crate::pointer::{PointerInput, PointerTracker};
use crate::runtime::FramePacer;
use crate::scene::Scene;
use crate::textures::LoadedTexture;
use crate::timeline::{Timeline, TrackTarget, TrackWrite};

/// Chain index of the curtain pass in [`EffectChain::standard`].
pub const CURTAIN_PASS: usize = 1;
/// Chain index of the RGB split pass in [`EffectChain::standard`].
pub const SPLIT_PASS: usize = 2;
/// Consecutive failed frames after which [`RenderLoop::run_until_stopped`]
/// gives up.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 120;

/// `sin(sim_time * frequency) * 0.5 + 0.5`, always within `[0, 1]`.
pub fn oscillator(sim_time: f32, frequency: f32) -> f32 {
    (sim_time * frequency).sin() * 0.5 + 0.5
}

/// Clock constants for [`RenderLoop`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopTuning {
    /// Simulation seconds added per tick.
    pub time_step: f32,
    pub oscillator_frequency: f32,
    /// Seconds the timeline advances per tick.
    pub timeline_step: f32,
}

impl Default for LoopTuning {
    fn default() -> Self {
        Self {
            time_step: 0.05,
            oscillator_frequency: 0.1,
            timeline_step: 1.0 / 60.0,
        }
    }
}

/// Shared flag that ends [`RenderLoop::run_until_stopped`].
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub struct RenderLoop {
    pointer: PointerTracker,
    scene: Scene,
    effects: EffectChain,
    timeline: Timeline,
    tuning: LoopTuning,
    sim_time: f32,
    frame: u64,
    loads: Option<Receiver<LoadedTexture>>,
}

impl RenderLoop {
    /// Builds a loop whose timeline drives the curtain and split passes of
    /// the standard chain.
    pub fn new(scene: Scene, effects: EffectChain, tuning: LoopTuning) -> Self {
        Self {
            pointer: PointerTracker::default(),
            scene,
            effects,
            timeline: Timeline::run_animation(CURTAIN_PASS, SPLIT_PASS),
            tuning,
            sim_time: 0.0,
            frame: 0,
            loads: None,
        }
    }

    pub fn with_pointer(mut self, pointer: PointerTracker) -> Self {
        self.pointer = pointer;
        self
    }

    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = timeline;
        self
    }

    /// Texture results polled at the start of every tick.
    pub fn with_texture_loads(mut self, loads: Receiver<LoadedTexture>) -> Self {
        self.loads = Some(loads);
        self
    }

    /// Writer handle for input callbacks.
    pub fn pointer_input(&self) -> PointerInput {
        self.pointer.input()
    }

    pub fn pointer(&self) -> &PointerTracker {
        &self.pointer
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn effects(&self) -> &EffectChain {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectChain {
        &mut self.effects
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn tuning(&self) -> &LoopTuning {
        &self.tuning
    }

    pub fn sim_time(&self) -> f32 {
        self.sim_time
    }

    pub fn frame_index(&self) -> u64 {
        self.frame
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.scene.camera.set_viewport(width, height);
    }

    /// Starts (or restarts) the transition animation.
    pub fn play(&mut self) {
        self.timeline.play();
    }

    /// Routes a parameter panel action.
    pub fn apply_control(&mut self, action: ControlAction) {
        match action {
            ControlAction::Progress(value) => {
                tracing::debug!(value, "progress control has no bound effect");
            }
            ControlAction::Progress2(value) => {
                self.effects.set_uniform(SPLIT_PASS, PROGRESS_UNIFORM, value);
            }
            ControlAction::RunAnimation => self.play(),
        }
    }

    /// Updates all frame state without drawing. Returns the smoothed pointer
    /// and oscillator used for the frame.
    pub fn advance(&mut self) -> (Vec2, f32) {
        if let Some(loads) = &self.loads {
            let applied = self.scene.layers.textures_mut().poll(loads);
            if applied > 0 {
                tracing::debug!(applied, "applied texture loads");
            }
        }

        self.sim_time += self.tuning.time_step;
        self.frame = self.frame.saturating_add(1);
        let wave = oscillator(self.sim_time, self.tuning.oscillator_frequency);
        let pointer = self.pointer.tick();

        let writes = self.timeline.advance(self.tuning.timeline_step);
        self.apply_writes(&writes);

        self.scene.layers.apply_frame(pointer, wave);
        (pointer, wave)
    }

    /// Advances one frame and composites it. A composite failure is logged
    /// and returned; the frame state has already been updated.
    pub fn tick<E: PassExecutor>(&mut self, executor: &mut E) -> Result<(), RenderError> {
        self.advance();
        let result = self.effects.composite(executor, &self.scene);
        if let Err(err) = &result {
            tracing::error!(frame = self.frame, error = %err, "failed to composite frame");
        }
        result
    }

    /// Ticks until `stop` is raised, sleeping between frames as the pacer
    /// requires. The flag is checked after every tick. A single failed frame
    /// does not end the loop; [`MAX_CONSECUTIVE_FAILURES`] in a row do.
    /// Returns the number of frames ticked.
    pub fn run_until_stopped<E: PassExecutor>(
        &mut self,
        executor: &mut E,
        pacer: &mut FramePacer,
        stop: &StopHandle,
    ) -> u64 {
        let mut frames = 0;
        let mut failures = 0;
        loop {
            let wait = pacer.wait_time(Instant::now());
            if !wait.is_zero() {
                tracing::trace!(wait_ms = wait.as_millis() as u64, "pacer: sleeping until next frame");
                thread::sleep(wait);
            }
            match self.tick(executor) {
                Ok(()) => failures = 0,
                Err(_) => failures += 1,
            }
            pacer.mark_rendered(Instant::now());
            frames += 1;
            if failures >= MAX_CONSECUTIVE_FAILURES {
                tracing::error!(frames, failures, "render loop giving up after repeated failures");
                break;
            }
            if stop.is_stopped() {
                tracing::debug!(frames, "render loop stopped");
                break;
            }
        }
        frames
    }

    fn apply_writes(&mut self, writes: &[TrackWrite]) {
        for write in writes {
            match write.target {
                TrackTarget::CameraX => self.scene.camera.position.x = write.value,
                TrackTarget::CameraZ => self.scene.camera.position.z = write.value,
                TrackTarget::PassProgress(index) => {
                    self.effects.set_uniform(index, PROGRESS_UNIFORM, write.value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::TAU;

    use super::*;
    use crate::camera::Camera;
    use crate::effects::Pass;
    use crate::layers::{LayerStack, StackLayout};
    use crate::textures::TextureSet;

    #[derive(Default)]
    struct CountingExecutor {
        presented: usize,
        fail: bool,
        stop_after: Option<(usize, StopHandle)>,
    }

    impl PassExecutor for CountingExecutor {
        type Frame = ();

        fn render_scene(&mut self, _scene: &Scene) -> Result<(), RenderError> {
            if self.fail {
                return Err(RenderError::missing_surface("test"));
            }
            Ok(())
        }

        fn apply_effect(&mut self, _index: usize, _pass: &Pass, _input: ()) -> Result<(), RenderError> {
            Ok(())
        }

        fn present(&mut self, _frame: ()) -> Result<(), RenderError> {
            self.presented += 1;
            if let Some((limit, stop)) = &self.stop_after {
                if self.presented >= *limit {
                    stop.stop();
                }
            }
            Ok(())
        }
    }

    fn render_loop() -> RenderLoop {
        let mut textures = TextureSet::new("mask");
        textures.add_base("a");
        let scene = Scene::new(
            Camera::default(),
            LayerStack::build(textures, StackLayout::default()),
        );
        RenderLoop::new(scene, EffectChain::standard(), LoopTuning::default())
    }

    fn progress(render_loop: &RenderLoop, index: usize) -> f32 {
        render_loop
            .effects()
            .uniform(index, PROGRESS_UNIFORM)
            .and_then(|value| value.as_float())
            .expect("progress uniform")
    }

    #[test]
    fn oscillator_stays_in_range_and_repeats() {
        let period = TAU / 0.1;
        for step in 0..500 {
            let t = step as f32 * 0.37;
            let value = oscillator(t, 0.1);
            assert!((0.0..=1.0).contains(&value));
            assert!((value - oscillator(t + period, 0.1)).abs() < 1e-3);
        }
    }

    #[test]
    fn tick_uses_fixed_time_step() {
        let mut render_loop = render_loop();
        let mut executor = CountingExecutor::default();
        for _ in 0..4 {
            render_loop.tick(&mut executor).expect("tick");
        }
        assert!((render_loop.sim_time() - 0.2).abs() < 1e-6);
        assert_eq!(render_loop.frame_index(), 4);
        assert_eq!(executor.presented, 4);
    }

    #[test]
    fn failed_composite_still_updates_frame_state() {
        let mut render_loop = render_loop();
        let mut executor = CountingExecutor {
            fail: true,
            ..Default::default()
        };
        assert!(render_loop.tick(&mut executor).is_err());
        assert!((render_loop.sim_time() - 0.05).abs() < 1e-6);
        let expected = 100.0 - oscillator(0.05, 0.1) * 200.0;
        let depth = render_loop.scene().layers.groups()[0].planes()[0].depth();
        assert!((depth - expected).abs() < 1e-3);
    }

    #[test]
    fn pointer_tilts_layers_through_tick() {
        let mut render_loop = render_loop();
        render_loop.pointer_input().set_normalized(Vec2::new(1.0, 0.0));
        let (pointer, _) = render_loop.advance();
        assert!((pointer.x - 0.1).abs() < 1e-6);
        let group = &render_loop.scene().layers.groups()[0];
        assert!((group.rotation().y + 0.01).abs() < 1e-6);
    }

    #[test]
    fn run_animation_moves_camera_and_passes() {
        let mut render_loop = render_loop();
        render_loop.apply_control(ControlAction::RunAnimation);
        for _ in 0..30 {
            render_loop.advance();
        }
        assert!(render_loop.scene().camera.position.x > 0.0);
        assert!(render_loop.scene().camera.position.z < 900.0);
        assert!(progress(&render_loop, CURTAIN_PASS) > 0.0);
        assert!(progress(&render_loop, SPLIT_PASS) > 0.0);

        for _ in 0..200 {
            render_loop.advance();
        }
        assert_eq!(render_loop.scene().camera.position.x, 2500.0);
        assert_eq!(render_loop.scene().camera.position.z, 900.0);
        assert_eq!(progress(&render_loop, SPLIT_PASS), 0.0);
    }

    #[test]
    fn manual_progress_wins_after_timeline_finishes() {
        let mut render_loop = render_loop();
        render_loop.apply_control(ControlAction::Progress2(0.4));
        render_loop.advance();
        assert!((progress(&render_loop, SPLIT_PASS) - 0.4).abs() < 1e-6);

        render_loop.apply_control(ControlAction::RunAnimation);
        for _ in 0..200 {
            render_loop.advance();
        }
        render_loop.apply_control(ControlAction::Progress2(0.7));
        render_loop.advance();
        assert!((progress(&render_loop, SPLIT_PASS) - 0.7).abs() < 1e-6);
        assert_eq!(progress(&render_loop, CURTAIN_PASS), 0.0);
    }

    #[test]
    fn progress_control_is_inert() {
        let mut render_loop = render_loop();
        render_loop.apply_control(ControlAction::Progress(0.9));
        assert_eq!(progress(&render_loop, CURTAIN_PASS), 0.0);
        assert_eq!(progress(&render_loop, SPLIT_PASS), 0.0);
    }

    #[test]
    fn run_until_stopped_honours_stop_flag() {
        let mut render_loop = render_loop();
        let stop = StopHandle::new();
        let mut executor = CountingExecutor {
            stop_after: Some((5, stop.clone())),
            ..Default::default()
        };
        let mut pacer = FramePacer::uncapped();
        let frames = render_loop.run_until_stopped(&mut executor, &mut pacer, &stop);
        assert_eq!(frames, 5);
        assert_eq!(pacer.frames(), 5);
    }

    #[test]
    fn run_until_stopped_gives_up_on_persistent_failure() {
        let mut render_loop = render_loop();
        let stop = StopHandle::new();
        let mut executor = CountingExecutor {
            fail: true,
            stop_after: Some((1, stop.clone())),
            ..Default::default()
        };
        let mut pacer = FramePacer::uncapped();
        let frames = render_loop.run_until_stopped(&mut executor, &mut pacer, &stop);
        assert_eq!(frames, u64::from(MAX_CONSECUTIVE_FAILURES));
        assert_eq!(executor.presented, 0);
        assert!(!stop.is_stopped());
    }
}
