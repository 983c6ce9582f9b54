use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use renderer::FilterMode;

#[derive(Parser, Debug)]
#[command(
    name = "shaderdesk",
    author,
    version,
    about = "Live GLSL shader preview with structured compile diagnostics"
)]
pub struct Args {
    /// Vertex shader file to watch; the builtin fullscreen triangle is used
    /// when omitted.
    #[arg(long, value_name = "FILE")]
    pub vertex: Option<PathBuf>,

    /// Fragment shader file to watch; a builtin demo shader is used when
    /// omitted.
    #[arg(long, value_name = "FILE")]
    pub fragment: Option<PathBuf>,

    /// Canvas resolution the shader renders at, independent of window size.
    #[arg(long, value_name = "WxH", default_value = "512x512", value_parser = parse_size)]
    pub canvas: (u32, u32),

    /// Initial window size.
    #[arg(long, value_name = "WxH", default_value = "1280x720", value_parser = parse_size)]
    pub window: (u32, u32),

    /// Sampling used when presenting the canvas.
    #[arg(long, value_enum, default_value = "linear")]
    pub filtering: FilterArg,

    /// Quiet period after the last edit before a recompile fires.
    #[arg(long, value_name = "MS", default_value_t = 500)]
    pub debounce_ms: u64,

    /// Restart the animation clock on every successful compile.
    #[arg(long)]
    pub reset_time_on_compile: bool,

    /// Project snapshot loaded at start-up and saved on exit.
    #[arg(long, value_name = "FILE")]
    pub project: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    Nearest,
    Linear,
}

impl From<FilterArg> for FilterMode {
    fn from(value: FilterArg) -> Self {
        match value {
            FilterArg::Nearest => FilterMode::Nearest,
            FilterArg::Linear => FilterMode::Linear,
        }
    }
}

fn parse_size(text: &str) -> Result<(u32, u32), String> {
    let (width, height) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{text}'"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{text}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{text}'"))?;
    if width == 0 || height == 0 {
        return Err("size components must be non-zero".to_string());
    }
    Ok((width, height))
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_parser_accepts_wxh() {
        assert_eq!(parse_size("512x512"), Ok((512, 512)));
        assert_eq!(parse_size("1920X1080"), Ok((1920, 1080)));
        assert!(parse_size("512").is_err());
        assert!(parse_size("0x10").is_err());
    }
}
