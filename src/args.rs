use std::env;
use std::path::PathBuf;
use std::time::Duration;

use minimap_sense::capture::CaptureRegion;
use minimap_sense::perception::{PerceptionConfig, create_replay_config};

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Live,
    Replay(Vec<PathBuf>),
}

#[derive(Debug, PartialEq)]
pub struct Args {
    pub mode: Mode,
    pub assets_dir: PathBuf,
    pub interval_ms: Option<u64>,
    pub region: Option<CaptureRegion>,
    pub precise: bool,
    pub debug_mode: bool,
    pub timeout_secs: Option<u64>,
}

/// What the command line asked for
#[derive(Debug, PartialEq)]
pub enum Parsed {
    Run(Args),
    Help,
    Version,
}

impl Args {
    pub fn parse() -> Option<Self> {
        match Self::parse_from(env::args().skip(1)) {
            Ok(Parsed::Run(args)) => Some(args),
            Ok(Parsed::Help) => {
                print_help();
                None
            }
            Ok(Parsed::Version) => {
                println!("{}", version_line());
                None
            }
            Err(msg) => {
                eprintln!("❌ {}", msg);
                print_help();
                None
            }
        }
    }

    pub fn parse_from<I: IntoIterator<Item = String>>(args: I) -> Result<Parsed, String> {
        let mut mode = Mode::Live;
        let mut assets_dir = PathBuf::from("assets");
        let mut interval_ms: Option<u64> = None;
        let mut region: Option<CaptureRegion> = None;
        let mut precise = false;
        let mut debug_mode = false;
        let mut timeout_secs: Option<u64> = None;

        for arg in args {
            if arg == "--help" || arg == "-h" {
                return Ok(Parsed::Help);
            } else if arg == "--version" || arg == "-v" {
                return Ok(Parsed::Version);
            } else if arg == "--debug" {
                debug_mode = true;
            } else if arg == "--precise" {
                precise = true;
            } else if let Some(val) = arg.strip_prefix("--assets=") {
                assets_dir = PathBuf::from(val);
            } else if let Some(val) = arg.strip_prefix("--interval-ms=") {
                match val.parse::<u64>() {
                    Ok(ms) if ms > 0 => interval_ms = Some(ms),
                    _ => return Err(format!("Invalid interval value: {}", val)),
                }
            } else if let Some(val) = arg.strip_prefix("--region=") {
                region = Some(parse_region(val)?);
            } else if let Some(val) = arg.strip_prefix("--replay=") {
                let files: Vec<PathBuf> = val
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect();
                if files.is_empty() {
                    return Err("--replay needs at least one file".to_string());
                }
                mode = Mode::Replay(files);
            } else if let Some(val) = arg.strip_prefix("--timeout=") {
                match val.parse::<u64>() {
                    Ok(secs) => timeout_secs = Some(secs),
                    Err(_) => return Err(format!("Invalid timeout value: {}", val)),
                }
            } else {
                return Err(format!("Unknown argument: {}", arg));
            }
        }

        Ok(Parsed::Run(Args {
            mode,
            assets_dir,
            interval_ms,
            region,
            precise,
            debug_mode,
            timeout_secs,
        }))
    }

    /// Perception settings implied by the flags
    pub fn config(&self) -> PerceptionConfig {
        let mut config = match self.mode {
            Mode::Replay(_) => create_replay_config(),
            Mode::Live => PerceptionConfig::default(),
        };
        if self.precise {
            config = config.with_precise_thresholds();
        }
        if let Some(ms) = self.interval_ms {
            config = config.with_interval(Duration::from_millis(ms));
        }
        if let Some(region) = self.region {
            config = config.with_region(region);
        }
        config
    }
}

fn version_line() -> String {
    format!(
        "Minimap Sense v{} (built {})",
        env!("APP_VERSION_DISPLAY"),
        env!("APP_BUILD_YEAR")
    )
}

/// Parse `LEFT,TOP,WIDTH,HEIGHT`
fn parse_region(val: &str) -> Result<CaptureRegion, String> {
    let parts: Vec<&str> = val.split(',').map(str::trim).collect();
    let [left, top, width, height] = parts.as_slice() else {
        return Err(format!("Region must be LEFT,TOP,WIDTH,HEIGHT: {}", val));
    };
    let invalid = || format!("Invalid region value: {}", val);
    let region = CaptureRegion::new(
        left.parse().map_err(|_| invalid())?,
        top.parse().map_err(|_| invalid())?,
        width.parse().map_err(|_| invalid())?,
        height.parse().map_err(|_| invalid())?,
    );
    if region.width == 0 || region.height == 0 {
        return Err(format!("Region must not be empty: {}", val));
    }
    Ok(region)
}

fn print_help() {
    println!("🗺️ Minimap Sense - screen perception for minimap-driven automation");
    println!();
    println!("USAGE:");
    println!("    minimap-sense [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    --assets=DIR              Directory with the marker templates (default: assets)");
    println!("    --interval-ms=N           Milliseconds between perception cycles (default: 50)");
    println!("    --region=L,T,W,H          Capture only this screen region");
    println!("    --replay=FILE[,FILE...]   Perceive recorded screenshots instead of the screen");
    println!("    --precise                 Use 0.95 match thresholds");
    println!("    --debug                   Enable debug logging");
    println!("    --timeout=N               Auto-exit after N seconds (for testing)");
    println!("    --help, -h                Show this help message");
    println!("    --version, -v             Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    minimap-sense --assets=assets --region=0,0,1366,768");
    println!("    minimap-sense --replay=shot1.png,shot2.png --debug");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Parsed, String> {
        Args::parse_from(args.iter().map(|s| s.to_string()))
    }

    fn run_args(args: &[&str]) -> Args {
        match parse(args) {
            Ok(Parsed::Run(args)) => args,
            other => panic!("Expected run arguments, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let args = run_args(&[]);
        assert_eq!(args.mode, Mode::Live);
        assert_eq!(args.assets_dir, PathBuf::from("assets"));
        assert!(!args.debug_mode && !args.precise);
        assert_eq!(args.config().tick_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_all_flags() {
        let args = run_args(&[
            "--assets=/tmp/tpl",
            "--interval-ms=20",
            "--region=-1920,0,1366,768",
            "--replay=a.png,b.png",
            "--precise",
            "--debug",
            "--timeout=5",
        ]);
        assert_eq!(args.assets_dir, PathBuf::from("/tmp/tpl"));
        assert_eq!(
            args.mode,
            Mode::Replay(vec![PathBuf::from("a.png"), PathBuf::from("b.png")])
        );
        assert_eq!(args.region, Some(CaptureRegion::new(-1920, 0, 1366, 768)));
        assert_eq!(args.timeout_secs, Some(5));
        assert!(args.debug_mode);

        let config = args.config();
        assert_eq!(config.tick_interval, Duration::from_millis(20));
        assert_eq!(config.player_threshold, 0.95);
        assert_eq!(config.capture_region, args.region);
    }

    #[test]
    fn test_precise_keeps_replay_timing() {
        let config = run_args(&["--replay=a.png", "--precise"]).config();
        assert_eq!(config.tick_interval, create_replay_config().tick_interval);
        assert_eq!(config.capture_retry.backoff, Duration::ZERO);
        assert_eq!(config.rune_threshold, 0.95);
        assert_eq!(config.calibration_threshold, 0.95);

        let live = run_args(&["--precise"]).config();
        assert_eq!(live.tick_interval, Duration::from_millis(50));
        assert_eq!(live.elite_threshold, 0.95);
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse(&["--debug", "--help"]), Ok(Parsed::Help));
        assert_eq!(parse(&["-v"]), Ok(Parsed::Version));

        let line = version_line();
        assert!(line.contains(env!("APP_VERSION_DISPLAY")));
        assert!(line.ends_with(&format!("(built {})", env!("APP_BUILD_YEAR"))));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(parse(&["--interval-ms=0"]).is_err());
        assert!(parse(&["--timeout=soon"]).is_err());
        assert!(parse(&["--region=1,2,3"]).is_err());
        assert!(parse(&["--region=0,0,0,10"]).is_err());
        assert!(parse(&["--replay="]).is_err());
        assert!(parse(&["--gui"]).is_err());
    }
}
