use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use parallax::ColorSpaceMode;

#[derive(Parser, Debug)]
#[command(
    name = "parallax-preview",
    author,
    version,
    about = "Parallax image stack preview",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Where the scene comes from: a preset, loose images, or both.
#[derive(Args, Debug, Clone, Default)]
pub struct SceneArgs {
    /// Scene preset TOML file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base image; repeat for one parallax group per image. Replaces the
    /// preset's image list when given.
    #[arg(long = "image", value_name = "FILE")]
    pub images: Vec<PathBuf>,

    /// Alpha mask (green channel) shared by the masked planes.
    #[arg(long, value_name = "FILE")]
    pub mask: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub scene: SceneArgs,

    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Optional FPS cap (0=uncapped). Overrides the preset's `clock.fps`.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Present without waiting for vertical blank.
    #[arg(long)]
    pub no_vsync: bool,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_color_space,
        default_value = "auto"
    )]
    pub color_space: ColorSpaceMode,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render headlessly on the CPU and write the last frame as PNG.
    Export(ExportArgs),
    /// Inspect scene presets.
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub scene: SceneArgs,

    /// Number of frames to simulate; the last one is written.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub frames: u64,

    /// Destination PNG path.
    #[arg(long, short, value_name = "PATH")]
    pub output: PathBuf,

    /// Start the transition animation before the first frame.
    #[arg(long)]
    pub animate: bool,

    /// Output size (e.g. `640x360`).
    #[arg(
        long,
        value_name = "WIDTHxHEIGHT",
        value_parser = parse_surface_size,
        default_value = "1280x720"
    )]
    pub size: (u32, u32),
}

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Parse and validate a preset, then print a summary as JSON.
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("size must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" => Ok(ColorSpaceMode::Auto),
        "gamma" | "srgb-off" => Ok(ColorSpaceMode::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceMode::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}

pub fn check_export_path(path: &Path) -> Result<(), String> {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => Ok(()),
        None => Err("export path has no extension; expected .png".to_string()),
        Some(other) => Err(format!(
            "unsupported export format '.{other}'; expected .png"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_surface_sizes() {
        assert_eq!(parse_surface_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_surface_size(" 64X48 ").unwrap(), (64, 48));
        assert!(parse_surface_size("0x720").is_err());
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("wide x tall").is_err());
    }

    #[test]
    fn parses_color_space_aliases() {
        assert_eq!(parse_color_space("AUTO").unwrap(), ColorSpaceMode::Auto);
        assert_eq!(parse_color_space("srgb").unwrap(), ColorSpaceMode::Linear);
        assert_eq!(parse_color_space("gamma").unwrap(), ColorSpaceMode::Gamma);
        assert!(parse_color_space("").is_err());
        assert!(parse_color_space("hdr").is_err());
    }

    #[test]
    fn export_path_must_be_png() {
        assert!(check_export_path(Path::new("frame.png")).is_ok());
        assert!(check_export_path(Path::new("frame.PNG")).is_ok());
        assert!(check_export_path(Path::new("frame")).is_err());
        assert!(check_export_path(Path::new("frame.exr")).is_err());
    }

    #[test]
    fn image_flag_repeats() {
        let cli = Cli::try_parse_from([
            "parallax-preview",
            "--image",
            "a.png",
            "--image",
            "b.png",
            "--mask",
            "m.png",
        ])
        .expect("parse");
        assert_eq!(cli.run.scene.images.len(), 2);
        assert_eq!(cli.run.scene.mask, Some(PathBuf::from("m.png")));
        assert!(cli.command.is_none());
    }

    #[test]
    fn export_subcommand_parses() {
        let cli = Cli::try_parse_from([
            "parallax-preview",
            "export",
            "--image",
            "a.png",
            "--frames",
            "12",
            "--animate",
            "--output",
            "out.png",
            "--size",
            "320x180",
        ])
        .expect("parse");
        match cli.command {
            Some(Command::Export(args)) => {
                assert_eq!(args.frames, 12);
                assert!(args.animate);
                assert_eq!(args.size, (320, 180));
                assert_eq!(args.scene.images, vec![PathBuf::from("a.png")]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
