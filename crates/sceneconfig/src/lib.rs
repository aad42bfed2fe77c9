use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A scene preset: which images to stack and every tunable constant.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenePreset {
    pub version: u32,
    #[serde(default)]
    pub assets: Assets,
    #[serde(default)]
    pub layers: Layers,
    #[serde(default)]
    pub pointer: Pointer,
    #[serde(default)]
    pub clock: Clock,
    #[serde(default)]
    pub camera: CameraSection,
    #[serde(default)]
    pub effects: Effects,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Assets {
    #[serde(default)]
    pub images: Vec<PathBuf>,
    #[serde(default)]
    pub mask: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Layers {
    pub planes_per_group: usize,
    pub depth_spacing: f32,
    pub group_spacing: f32,
    pub plane_size: [f32; 2],
    pub tilt: f32,
    pub amplitude: f32,
}

impl Default for Layers {
    fn default() -> Self {
        Self {
            planes_per_group: 3,
            depth_spacing: 100.0,
            group_spacing: 2500.0,
            plane_size: [1920.0, 1080.0],
            tilt: 0.1,
            amplitude: 200.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Pointer {
    pub bias: [f32; 2],
    pub smoothing: f32,
}

impl Default for Pointer {
    fn default() -> Self {
        Self {
            bias: [0.55, 0.7],
            smoothing: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Clock {
    #[serde(default = "default_time_step")]
    pub time_step: f32,
    #[serde(default = "default_oscillator_frequency")]
    pub oscillator_frequency: f32,
    /// Timeline time consumed per tick.
    #[serde(
        default = "default_timeline_step",
        deserialize_with = "deserialize_duration"
    )]
    pub timeline_step: Duration,
    #[serde(default)]
    pub fps: Option<f32>,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            time_step: default_time_step(),
            oscillator_frequency: default_oscillator_frequency(),
            timeline_step: default_timeline_step(),
            fps: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraSection {
    pub position: [f32; 3],
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSection {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 900.0],
            fov: 60.0,
            near: 1.0,
            far: 10_000.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Effects {
    pub curtain_strips: f32,
    pub curtain_stagger: f32,
    pub rgb_amount: f32,
    pub rgb_direction: [f32; 2],
}

impl Default for Effects {
    fn default() -> Self {
        Self {
            curtain_strips: 10.0,
            curtain_stagger: 0.5,
            rgb_amount: 0.04,
            rgb_direction: [1.0, 0.0],
        }
    }
}

fn default_time_step() -> f32 {
    0.05
}

fn default_oscillator_frequency() -> f32 {
    0.1
}

fn default_timeline_step() -> Duration {
    Duration::from_secs_f64(1.0 / 60.0)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn positive(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be > 0")))
    }
}

fn finite(name: &str, values: &[f32]) -> Result<(), ConfigError> {
    if values.iter().all(|value| value.is_finite()) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be finite")))
    }
}

impl ScenePreset {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: ScenePreset = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        for image in &self.assets.images {
            if image.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "assets.images contains an empty path".into(),
                ));
            }
        }
        if let Some(mask) = &self.assets.mask {
            if mask.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("assets.mask may not be empty".into()));
            }
        }

        let layers = &self.layers;
        if layers.planes_per_group == 0 {
            return Err(ConfigError::Invalid(
                "layers.planes_per_group must be at least 1".into(),
            ));
        }
        positive("layers.depth_spacing", layers.depth_spacing)?;
        positive("layers.plane_size width", layers.plane_size[0])?;
        positive("layers.plane_size height", layers.plane_size[1])?;
        finite(
            "layers",
            &[layers.group_spacing, layers.tilt, layers.amplitude],
        )?;

        finite("pointer.bias", &self.pointer.bias)?;
        let smoothing = self.pointer.smoothing;
        if !(smoothing > 0.0 && smoothing <= 1.0) {
            return Err(ConfigError::Invalid(
                "pointer.smoothing must be within (0, 1]".into(),
            ));
        }

        positive("clock.time_step", self.clock.time_step)?;
        finite("clock.oscillator_frequency", &[self.clock.oscillator_frequency])?;
        if self.clock.timeline_step.is_zero() {
            return Err(ConfigError::Invalid(
                "clock.timeline_step must be greater than zero".into(),
            ));
        }
        if let Some(fps) = self.clock.fps {
            if fps < 0.0 {
                return Err(ConfigError::Invalid("clock.fps must be >= 0".into()));
            }
        }

        let camera = &self.camera;
        finite("camera.position", &camera.position)?;
        if !(camera.fov > 0.0 && camera.fov < 180.0) {
            return Err(ConfigError::Invalid(
                "camera.fov must be between 0 and 180 degrees".into(),
            ));
        }
        positive("camera.near", camera.near)?;
        if camera.far <= camera.near {
            return Err(ConfigError::Invalid(
                "camera.far must be greater than camera.near".into(),
            ));
        }

        let effects = &self.effects;
        positive("effects.curtain_strips", effects.curtain_strips)?;
        if !(0.0..=1.0).contains(&effects.curtain_stagger) {
            return Err(ConfigError::Invalid(
                "effects.curtain_stagger must be within 0..=1".into(),
            ));
        }
        finite("effects.rgb_amount", &[effects.rgb_amount])?;
        finite("effects.rgb_direction", &effects.rgb_direction)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[assets]
images = ["images/forest.jpg", "images/harbour.png"]
mask = "images/mask.png"

[layers]
planes_per_group = 4
depth_spacing = 80

[pointer]
bias = [0.5, 0.5]

[clock]
timeline_step = "20ms"
fps = 30

[camera]
position = [0.0, 0.0, 1200.0]

[effects]
curtain_strips = 6
rgb_direction = [0.0, 1.0]
"#;

    #[test]
    fn parses_sample_preset() {
        let preset = ScenePreset::from_toml_str(SAMPLE).expect("parse preset");
        assert_eq!(preset.assets.images.len(), 2);
        assert_eq!(
            preset.assets.mask.as_deref(),
            Some(std::path::Path::new("images/mask.png"))
        );
        assert_eq!(preset.layers.planes_per_group, 4);
        assert_eq!(preset.layers.depth_spacing, 80.0);
        assert_eq!(preset.layers.group_spacing, 2500.0);
        assert_eq!(preset.clock.timeline_step, Duration::from_millis(20));
        assert_eq!(preset.clock.fps, Some(30.0));
        assert_eq!(preset.camera.position, [0.0, 0.0, 1200.0]);
        assert_eq!(preset.effects.curtain_strips, 6.0);
        assert_eq!(preset.effects.curtain_stagger, 0.5);
    }

    #[test]
    fn minimal_preset_uses_defaults() {
        let preset = ScenePreset::from_toml_str("version = 1").expect("parse preset");
        assert!(preset.assets.images.is_empty());
        assert_eq!(preset.layers.planes_per_group, 3);
        assert_eq!(preset.pointer.bias, [0.55, 0.7]);
        assert_eq!(preset.clock.time_step, 0.05);
        assert!((preset.clock.timeline_step.as_secs_f32() - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(preset.camera.fov, 60.0);
        assert_eq!(preset.effects.rgb_amount, 0.04);
    }

    #[test]
    fn numeric_durations_are_seconds() {
        let preset = ScenePreset::from_toml_str(
            r#"
version = 1
[clock]
timeline_step = 0.5
"#,
        )
        .unwrap();
        assert_eq!(preset.clock.timeline_step, Duration::from_millis(500));
    }

    #[test]
    fn rejects_unknown_version() {
        let err = ScenePreset::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_empty_stack() {
        let err = ScenePreset::from_toml_str(
            r#"
version = 1
[layers]
planes_per_group = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_inverted_clip_range() {
        let err = ScenePreset::from_toml_str(
            r#"
version = 1
[camera]
near = 10
far = 5
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_timeline_step() {
        let err = ScenePreset::from_toml_str(
            r#"
version = 1
[clock]
timeline_step = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_overflowing_timeline_step() {
        let err = ScenePreset::from_toml_str(
            r#"
version = 1
[clock]
timeline_step = 1e30
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_zero_smoothing() {
        let err = ScenePreset::from_toml_str(
            r#"
version = 1
[pointer]
smoothing = 0.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let preset = ScenePreset::from_toml_str("version = 1\n[pointer]\nsmoothing = 1.0\n")
            .expect("full smoothing is allowed");
        assert_eq!(preset.pointer.smoothing, 1.0);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = ScenePreset::from_toml_str("version = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
