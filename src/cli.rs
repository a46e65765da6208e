use clap::Parser;
use std::path::PathBuf;

/// Video + map compositor preview
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings file (JSON); missing file means defaults
    #[arg(short = 's', long = "settings", value_name = "FILE", default_value = "orientview.json")]
    pub settings: PathBuf,

    /// Map image (PNG, JPEG); a generated grid is used when omitted
    #[arg(short = 'm', long = "map", value_name = "IMAGE")]
    pub map: Option<PathBuf>,

    /// Route points as a JSON array of [x, y] pairs in map pixels
    #[arg(short = 'r', long = "route", value_name = "FILE")]
    pub route: Option<PathBuf>,

    /// Write every composited frame as PNG into this directory
    #[arg(short = 'c', long = "capture", value_name = "DIR")]
    pub capture_dir: Option<PathBuf>,

    /// Width of the generated test video
    #[arg(long = "video-width", value_name = "PX", default_value_t = 1280)]
    pub video_width: u32,

    /// Height of the generated test video
    #[arg(long = "video-height", value_name = "PX", default_value_t = 720)]
    pub video_height: u32,

    /// Apply a slow synthetic stabilization wobble to the video panel
    #[arg(short = 'w', long = "wobble")]
    pub wobble: bool,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Args {
    /// Default log filter for the verbosity count
    pub fn log_level(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["orientview"]);
        assert_eq!(args.settings, PathBuf::from("orientview.json"));
        assert_eq!((args.video_width, args.video_height), (1280, 720));
        assert!(args.map.is_none() && args.capture_dir.is_none());
        assert_eq!(args.log_level(), "warn");
    }

    #[test]
    fn test_flags() {
        let args = Args::parse_from([
            "orientview", "-m", "map.jpg", "-r", "route.json", "-c", "out", "-w", "-vv",
        ]);
        assert_eq!(args.map, Some(PathBuf::from("map.jpg")));
        assert_eq!(args.route, Some(PathBuf::from("route.json")));
        assert_eq!(args.capture_dir, Some(PathBuf::from("out")));
        assert!(args.wobble);
        assert_eq!(args.log_level(), "debug");
    }
}
